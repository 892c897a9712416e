use std::time::Duration;

use storefront_engine::{
    db_types::{Money, NewProduct, OrderStatusType, Product, ShippingInfo},
    events::EventProducers,
    order_number::OrderNumberGenerator,
    traits::{CatalogManagement, InventoryManagement},
    Cart,
    CartEntry,
    CheckoutApi,
    CheckoutConfig,
    CheckoutRequest,
    OrderFlowApi,
    SimulatedGateway,
    SqliteDatabase,
};

use super::prepare_env::{prepare_test_env, random_db_path, tear_down};

pub type Checkout = CheckoutApi<SqliteDatabase, SimulatedGateway>;

/// A migrated database with the checkout and order flow APIs wired to it.
#[derive(Debug)]
pub struct TestStore {
    pub db: SqliteDatabase,
    pub gateway: SimulatedGateway,
    pub checkout: Checkout,
    pub orders: OrderFlowApi<SqliteDatabase>,
}

impl TestStore {
    pub async fn new() -> Self {
        Self::with_producers(EventProducers::default()).await
    }

    pub async fn with_producers(producers: EventProducers) -> Self {
        let url = random_db_path();
        let db = prepare_test_env(&url, 5).await;
        let gateway = SimulatedGateway::default().with_hang_time(Duration::from_secs(5));
        let config = CheckoutConfig { payment_timeout: Duration::from_millis(150), max_attempts: 3 };
        let checkout = CheckoutApi::new(db.clone(), gateway.clone(), producers.clone()).with_config(config);
        let orders = OrderFlowApi::new(db.clone(), producers);
        Self { db, gateway, checkout, orders }
    }

    pub fn checkout_with_numbers(&self, numbers: OrderNumberGenerator, max_attempts: u32) -> Checkout {
        let config = CheckoutConfig { max_attempts, ..self.checkout.config().clone() };
        CheckoutApi::new(self.db.clone(), self.gateway.clone(), EventProducers::default())
            .with_config(config)
            .with_order_numbers(numbers)
    }

    /// A second checkout over the same database, paying through `gateway`.
    pub fn checkout_with_gateway(&self, gateway: SimulatedGateway, payment_timeout: Duration) -> Checkout {
        let config = CheckoutConfig { payment_timeout, ..self.checkout.config().clone() };
        CheckoutApi::new(self.db.clone(), gateway, EventProducers::default()).with_config(config)
    }

    pub async fn add_product(&self, name: &str, sku: &str, price: i64, stock: i64) -> Product {
        self.db.insert_product(NewProduct::new(name, sku, Money::from(price), stock)).await.expect("Error adding product")
    }

    pub async fn stock_of(&self, product_id: i64) -> i64 {
        self.db.fetch_product(product_id).await.unwrap().expect("Product should exist").stock_quantity
    }

    pub async fn stock_log_delta(&self, product_id: i64) -> i64 {
        self.db.fetch_stock_logs(product_id).await.unwrap().iter().map(|l| l.quantity).sum()
    }

    /// Walks a paid order along the fulfilment path until it reaches `status`.
    pub async fn advance_to(&self, order_number: &storefront_engine::db_types::OrderNumber, status: OrderStatusType) {
        loop {
            let order = self.orders.order_with_items(order_number).await.unwrap().order;
            if order.status == status {
                return;
            }
            let next = order.status.next_fulfilment_step().expect("Order cannot move any further");
            self.orders.modify_status_for_order(order_number, next).await.unwrap();
        }
    }

    pub async fn finish(self) {
        let Self { db, .. } = self;
        tear_down(db).await;
    }
}

pub fn shipping() -> ShippingInfo {
    ShippingInfo::new("12 Valiasr St", "Tehran", "1136915", "09120000000")
}

pub fn request(user_id: &str) -> CheckoutRequest {
    CheckoutRequest::new(user_id.to_string(), format!("{user_id}@example.com"), shipping())
}

pub fn cart_of(items: &[(&Product, i64)]) -> Cart {
    let mut cart = Cart::new();
    for (product, quantity) in items {
        let entry = CartEntry::new(product.id, product.name.clone(), product.effective_price(), *quantity);
        cart.add(entry).expect("Invalid cart entry");
    }
    cart
}
