use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderItem, OrderNumber, OrderStatusType},
    traits::{CatalogManagement, InventoryManagement, OrderManagement},
};

/// This trait defines the highest level of behaviour for backends supporting the storefront checkout engine.
///
/// The checkout pipeline needs one thing from storage that plain CRUD calls cannot give it: the ability to set stock
/// aside for an order while the payment gateway is called, and then either take that stock and mark the order paid in
/// one step, or let it go again. Backends provide this through [`StockReservation`]s.
///
/// A reservation must not hold any database-wide lock while it is open. Only checkouts that compete for the same
/// products, or for the same order, wait for each other.
#[allow(async_fn_in_trait)]
pub trait StorefrontDatabase: Clone + CatalogManagement + OrderManagement + InventoryManagement {
    type Reservation: StockReservation;

    /// The URL of the database
    fn url(&self) -> &str;

    /// Sets stock aside for every item of `order`, checks that it can be filled, and stores the order as `Pending`.
    ///
    /// The order is visible to readers as soon as this returns. Its stock is only taken when the reservation is
    /// committed.
    ///
    /// ## Failure modes:
    /// * [`StoreError::OrderNumberConflict`] if the order number is already taken.
    /// * [`StoreError::InsufficientStock`] if any product has fewer units than requested.
    /// * [`StoreError::ProductNotFound`] if a product does not exist.
    /// * [`StoreError::ProductUnavailable`] if a product has been taken off sale.
    ///
    /// In all cases nothing is stored.
    async fn reserve_new_order(&self, order: NewOrder) -> Result<Self::Reservation, StoreError>;

    /// Like [`Self::reserve_new_order`], but for an order that is already stored and still `Pending`.
    ///
    /// Only one reservation per order can be open at a time. A second caller waits, and then fails with
    /// [`StoreError::OrderModificationForbidden`] if the first one paid the order.
    async fn reserve_pending_order(&self, order_number: &OrderNumber) -> Result<Self::Reservation, StoreError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Stock set aside for one `Pending` order.
///
/// Dropping a reservation without committing it is the same as releasing it.
#[allow(async_fn_in_trait)]
pub trait StockReservation {
    fn order(&self) -> &Order;

    fn items(&self) -> &[OrderItem];

    /// In one transaction, takes the stock with a conditional update, writes one `Sold` stock log per product, and
    /// marks the order as paid. If any product has run short, nothing changes and the order stays `Pending`.
    async fn commit_paid(self, receipt: PaymentReceipt) -> Result<Order, StoreError>;

    /// Lets the stock go. The order stays `Pending` and stock is untouched.
    async fn release(self) -> Result<(), StoreError>;
}

/// The parts of a successful gateway response that are stored on the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub transaction_id: String,
    pub payment_method: String,
    pub paid_at: DateTime<Utc>,
}

impl PaymentReceipt {
    pub fn new<S: Into<String>>(transaction_id: S, payment_method: S) -> Self {
        Self { transaction_id: transaction_id.into(), payment_method: payment_method.into(), paid_at: Utc::now() }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Internal database error. {0}")]
    DatabaseError(String),
    #[error("The database is busy with a concurrent write. {0}")]
    WriteConflict(String),
    #[error("Cannot insert order, since order number {0} is already in use")]
    OrderNumberConflict(OrderNumber),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Product {0} is no longer for sale")]
    ProductUnavailable(i64),
    #[error("Product {product_id} has {available} units in stock, but {requested} were requested")]
    InsufficientStock { product_id: i64, requested: i64, available: i64 },
    #[error("The requested order change would result in a no-op.")]
    OrderModificationNoOp,
    #[error("Order cannot move from {from} to {to}.")]
    OrderModificationForbidden { from: OrderStatusType, to: OrderStatusType },
    #[error("A review by this user already exists for product {0}")]
    ReviewAlreadyExists(i64),
    #[error("Only customers who received product {0} may review it")]
    ReviewNotEligible(i64),
    #[error("Review {0} does not exist")]
    ReviewNotFound(i64),
    #[error("Transaction {0} is already recorded against another order")]
    TransactionAlreadyUsed(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if is_busy(&e) {
            return StoreError::WriteConflict(e.to_string());
        }
        StoreError::DatabaseError(e.to_string())
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and their extended codes all mean another connection holds the write lock.
fn is_busy(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            let code = db.code().and_then(|c| c.parse::<i32>().ok()).unwrap_or_default();
            matches!(code & 0xff, 5 | 6) || db.message().contains("database is locked")
        },
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}
