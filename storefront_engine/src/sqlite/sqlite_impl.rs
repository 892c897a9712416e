//! `SqliteDatabase` is the SQLite implementation of the storefront backend.
//!
//! It implements every trait in [`crate::traits`]. The checkout primitives hand out [`SqliteReservation`]s. A
//! reservation keeps the product locks from [`StockHolds`] until the payment outcome is known, and only opens a
//! database transaction to commit the sale.
use std::{collections::BTreeMap, fmt::Debug};

use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::{
    db::{db_url, new_pool, orders, products, reviews, settings, stock},
    holds::{Hold, HoldKey, StockHolds},
};
use crate::{
    db_types::{
        NewOrder,
        NewProduct,
        NewReview,
        NewStockLog,
        Order,
        OrderItem,
        OrderNumber,
        OrderStatusType,
        Product,
        ProductReview,
        StockAction,
        StockLog,
    },
    sf_api::order_objects::OrderQueryFilter,
    traits::{
        CatalogManagement,
        InventoryManagement,
        OrderManagement,
        PaymentReceipt,
        ReviewManagement,
        StockReservation,
        StoreError,
        StorefrontDatabase,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    holds: StockHolds,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using `SF_DATABASE_URL` or the default location.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool, holds: StockHolds::default() })
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Migrations failed. {e}")))?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The product and order locks shared by every clone of this database.
    pub fn holds(&self) -> &StockHolds {
        &self.holds
    }

    /// The total number of units sold for a product, as recorded in the stock log.
    pub async fn units_sold(&self, product_id: i64) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let sold = stock::total_for_action(product_id, StockAction::Sold, &mut conn).await?;
        Ok(-sold)
    }

    /// Fails unless every product in `wanted` is on sale with enough units in stock. Call this while holding the
    /// product locks.
    async fn check_stock(wanted: &BTreeMap<i64, i64>, conn: &mut SqliteConnection) -> Result<(), StoreError> {
        let ids = wanted.keys().copied().collect::<Vec<_>>();
        let found = products::fetch_products(&ids, conn).await?;
        for (&product_id, &quantity) in wanted {
            let product = found.iter().find(|p| p.id == product_id).ok_or(StoreError::ProductNotFound(product_id))?;
            if !product.is_active {
                return Err(StoreError::ProductUnavailable(product_id));
            }
            if product.stock_quantity < quantity {
                return Err(StoreError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available: product.stock_quantity,
                });
            }
        }
        Ok(())
    }
}

/// Quantities per product in ascending product id order.
fn merged_quantities<I: IntoIterator<Item = (i64, i64)>>(items: I) -> BTreeMap<i64, i64> {
    items.into_iter().fold(BTreeMap::new(), |mut acc, (product_id, quantity)| {
        *acc.entry(product_id).or_default() += quantity;
        acc
    })
}

fn item_quantities(items: &[OrderItem]) -> BTreeMap<i64, i64> {
    merged_quantities(items.iter().map(|i| (i.product_id, i.quantity)))
}

fn product_keys(wanted: &BTreeMap<i64, i64>) -> impl Iterator<Item = HoldKey> + '_ {
    wanted.keys().map(|&id| HoldKey::Product(id))
}

impl StorefrontDatabase for SqliteDatabase {
    type Reservation = SqliteReservation;

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn reserve_new_order(&self, order: NewOrder) -> Result<Self::Reservation, StoreError> {
        let wanted = merged_quantities(order.items.iter().map(|i| (i.product_id, i.quantity)));
        let hold = self.holds.acquire(product_keys(&wanted)).await;
        let mut tx = self.pool.begin().await?;
        // The insert comes first so that the transaction takes the write lock straight away.
        let (order, items) = orders::insert_order(order, &mut tx).await?;
        Self::check_stock(&wanted, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} stored as Pending with its stock set aside", order.order_number);
        Ok(SqliteReservation { pool: self.pool.clone(), order, items, _hold: hold })
    }

    async fn reserve_pending_order(&self, order_number: &OrderNumber) -> Result<Self::Reservation, StoreError> {
        let mut hold = self.holds.acquire([HoldKey::Order(order_number.as_str().to_string())]).await;
        let (order, items) = {
            let mut conn = self.pool.acquire().await?;
            let order = match orders::fetch_order_by_number(order_number, &mut conn).await? {
                None => return Err(StoreError::OrderNotFound(order_number.clone())),
                Some(o) if o.status != OrderStatusType::Pending => {
                    return Err(StoreError::OrderModificationForbidden { from: o.status, to: OrderStatusType::Paid });
                },
                Some(o) => o,
            };
            let items = orders::fetch_order_items(order.id, &mut conn).await?;
            (order, items)
        };
        // The order lock keeps the status fixed while we wait for the products.
        let wanted = item_quantities(&items);
        self.holds.extend(&mut hold, product_keys(&wanted)).await;
        let mut conn = self.pool.acquire().await?;
        Self::check_stock(&wanted, &mut conn).await?;
        debug!("🗃️ Stock set aside for pending order {}", order.order_number);
        Ok(SqliteReservation { pool: self.pool.clone(), order, items, _hold: hold })
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}

/// Stock set aside for one `Pending` order. The product locks are released when this is dropped.
#[derive(Debug)]
pub struct SqliteReservation {
    pool: SqlitePool,
    order: Order,
    items: Vec<OrderItem>,
    _hold: Hold,
}

impl StockReservation for SqliteReservation {
    fn order(&self) -> &Order {
        &self.order
    }

    fn items(&self) -> &[OrderItem] {
        &self.items
    }

    async fn commit_paid(self, receipt: PaymentReceipt) -> Result<Order, StoreError> {
        let Self { pool, order, items, _hold } = self;
        let mut tx = pool.begin().await?;
        let paid = orders::mark_paid(
            order.id,
            &receipt.transaction_id,
            &receipt.payment_method,
            receipt.paid_at,
            &mut tx,
        )
        .await?;
        for (product_id, quantity) in item_quantities(&items) {
            let (previous, new) = products::take_stock(product_id, quantity, &mut tx).await?;
            let log = NewStockLog::for_change(product_id, StockAction::Sold, previous, new)
                .with_notes(format!("Sale via order {}", order.order_number))
                .with_user(Some(order.user_id.clone()));
            stock::insert_stock_log(log, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order {} is paid and its stock is committed", paid.order_number);
        Ok(paid)
    }

    async fn release(self) -> Result<(), StoreError> {
        debug!("🗃️ Stock for order {} released. The order stays Pending", self.order.order_number);
        Ok(())
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_product(product_id, &mut conn).await?)
    }

    async fn fetch_products(&self, ids: &[i64]) -> Result<Vec<Product>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_products(ids, &mut conn).await?)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut conn = self.pool.acquire().await?;
        products::insert_product(product, &mut conn).await
    }

    async fn fetch_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(settings::fetch_setting(key, &mut conn).await?.map(|s| s.value))
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        let setting = settings::upsert_setting(key, value, &mut conn).await?;
        debug!("🗃️ Site setting {} is now '{}'", setting.key, setting.value);
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_number(order_number, &mut conn).await?)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_items(order_id, &mut conn).await?)
    }

    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_orders_for_user(user_id, &mut conn).await?)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(query, &mut conn).await?)
    }

    async fn update_order_status(
        &self,
        order_number: &OrderNumber,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Order, StoreError> {
        let _hold = self.holds.acquire([HoldKey::Order(order_number.as_str().to_string())]).await;
        let mut tx = self.pool.begin().await?;
        let order = match orders::compare_and_set_status(order_number, from, to, &mut tx).await? {
            Some(order) => order,
            None => {
                let existing = orders::fetch_order_by_number(order_number, &mut tx).await?;
                return match existing {
                    None => Err(StoreError::OrderNotFound(order_number.clone())),
                    Some(o) => Err(StoreError::OrderModificationForbidden { from: o.status, to }),
                };
            },
        };
        let restock_action = match to {
            OrderStatusType::Returned => Some((StockAction::Returned, "Return")),
            OrderStatusType::Cancelled => Some((StockAction::Adjusted, "Cancellation")),
            _ => None,
        };
        if let Some((action, reason)) = restock_action.filter(|_| from.holds_stock()) {
            let items = orders::fetch_order_items(order.id, &mut tx).await?;
            for (product_id, quantity) in item_quantities(&items) {
                let (previous, new) = products::change_stock(product_id, quantity, &mut tx).await?;
                let log = NewStockLog::for_change(product_id, action, previous, new)
                    .with_notes(format!("{reason} of order {}", order.order_number));
                stock::insert_stock_log(log, &mut tx).await?;
                trace!("📉️ Restocked {quantity} units of product {product_id} for order {}", order.order_number);
            }
        }
        tx.commit().await?;
        debug!("🗃️ Order {} moved from {from} to {to}", order.order_number);
        Ok(order)
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn adjust_stock(
        &self,
        product_id: i64,
        delta: i64,
        action: StockAction,
        notes: Option<String>,
        user_id: Option<String>,
    ) -> Result<StockLog, StoreError> {
        // Removing units must not undercut a checkout that is waiting on the gateway.
        let _hold = if delta < 0 { Some(self.holds.acquire([HoldKey::Product(product_id)]).await) } else { None };
        let mut tx = self.pool.begin().await?;
        let (previous, new) = products::change_stock(product_id, delta, &mut tx).await?;
        let mut log = NewStockLog::for_change(product_id, action, previous, new).with_user(user_id);
        log.notes = notes;
        let log = stock::insert_stock_log(log, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Stock of product {product_id} adjusted from {previous} to {new} ({action})");
        Ok(log)
    }

    async fn fetch_stock_logs(&self, product_id: i64) -> Result<Vec<StockLog>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(stock::fetch_stock_logs(product_id, &mut conn).await?)
    }
}

impl ReviewManagement for SqliteDatabase {
    async fn has_delivered_item(&self, user_id: &str, product_id: i64) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(reviews::has_delivered_item(user_id, product_id, &mut conn).await?)
    }

    async fn fetch_review_by_user(&self, user_id: &str, product_id: i64) -> Result<Option<ProductReview>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(reviews::fetch_review_by_user(user_id, product_id, &mut conn).await?)
    }

    async fn insert_review(&self, review: NewReview) -> Result<ProductReview, StoreError> {
        let mut conn = self.pool.acquire().await?;
        reviews::insert_review(review, &mut conn).await
    }

    async fn fetch_approved_reviews(&self, product_id: i64) -> Result<Vec<ProductReview>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(reviews::fetch_approved_reviews(product_id, &mut conn).await?)
    }

    async fn set_review_approval(&self, review_id: i64, approved: bool) -> Result<ProductReview, StoreError> {
        let mut conn = self.pool.acquire().await?;
        reviews::set_approval(review_id, approved, &mut conn).await?.ok_or(StoreError::ReviewNotFound(review_id))
    }
}
