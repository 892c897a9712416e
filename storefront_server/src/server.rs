use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use storefront_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    CartApi,
    CheckoutApi,
    InventoryApi,
    MemorySessionStore,
    OrderFlowApi,
    ReviewApi,
    SimulatedGateway,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{
        health,
        AddToCartRoute,
        AdjustStockRoute,
        CheckoutRoute,
        ClearCartRoute,
        ConfirmPaymentRoute,
        ModerateReviewRoute,
        MyCartRoute,
        MyOrderRoute,
        MyOrdersRoute,
        ProductReviewsRoute,
        RemoveCartItemRoute,
        RetryPaymentRoute,
        ReviewEligibilityRoute,
        SearchOrdersRoute,
        StockHistoryRoute,
        SubmitReviewRoute,
        UpdateCartItemRoute,
        UpdateOrderStatusRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    } else {
        warn!("🚀️ Database migrations are disabled. Make sure the schema at {} is current.", config.database_url);
    }
    let gateway = SimulatedGateway::new(config.simulated_payments).with_api_key(config.gateway_api_key.clone());
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, logging_hooks());
    let producers = handlers.producers();
    handlers.start_handlers();
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Hooks that write a line to the log whenever an order is paid or changes status.
fn logging_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_paid(|ev| {
            Box::pin(async move {
                info!(
                    "📬️ Order {} for {} was paid. {} items, {} in total",
                    ev.order.order_number,
                    ev.order.user_id,
                    ev.items.len(),
                    ev.order.total_amount
                );
            })
        })
        .on_status_changed(|ev| {
            Box::pin(async move {
                info!("📬️ Order {} moved from {} to {}", ev.order.order_number, ev.old_status, ev.new_status());
            })
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: SimulatedGateway,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    // Carts must outlive a single worker, so every worker shares the same session store.
    let sessions = MemorySessionStore::new();
    let checkout_config = config.checkout_config();
    let srv = HttpServer::new(move || {
        let cart_api = CartApi::new(sessions.clone(), db.clone());
        let checkout_api = CheckoutApi::new(db.clone(), gateway.clone(), producers.clone())
            .with_config(checkout_config.clone());
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let inventory_api = InventoryApi::new(db.clone());
        let review_api = ReviewApi::new(db.clone());
        let json_config = web::JsonConfig::default()
            .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into());
        let admin_scope = web::scope("/admin")
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(SearchOrdersRoute::<SqliteDatabase>::new())
            .service(AdjustStockRoute::<SqliteDatabase>::new())
            .service(StockHistoryRoute::<SqliteDatabase>::new())
            .service(ModerateReviewRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sf::access_log"))
            .app_data(json_config)
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(inventory_api))
            .app_data(web::Data::new(review_api))
            .service(health)
            .service(MyCartRoute::<MemorySessionStore, SqliteDatabase>::new())
            .service(ClearCartRoute::<MemorySessionStore, SqliteDatabase>::new())
            .service(AddToCartRoute::<MemorySessionStore, SqliteDatabase>::new())
            .service(UpdateCartItemRoute::<MemorySessionStore, SqliteDatabase>::new())
            .service(RemoveCartItemRoute::<MemorySessionStore, SqliteDatabase>::new())
            .service(CheckoutRoute::<SqliteDatabase, SimulatedGateway, MemorySessionStore>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(MyOrderRoute::<SqliteDatabase>::new())
            .service(RetryPaymentRoute::<SqliteDatabase, SimulatedGateway>::new())
            .service(ConfirmPaymentRoute::<SqliteDatabase, SimulatedGateway>::new())
            .service(ProductReviewsRoute::<SqliteDatabase>::new())
            .service(ReviewEligibilityRoute::<SqliteDatabase>::new())
            .service(SubmitReviewRoute::<SqliteDatabase>::new())
            .service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
