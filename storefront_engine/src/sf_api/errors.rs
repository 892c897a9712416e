use thiserror::Error;

use crate::{
    db_types::{OrderNumber, OrderStatusType},
    payment::GatewayError,
    traits::{SessionStoreError, StoreError},
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Quantity must be at least 1, but was {0}")]
    InvalidQuantity(i64),
    #[error("Changing the quantity of product {product_id} by {delta} is out of range")]
    QuantityOutOfRange { product_id: i64, delta: i64 },
    #[error("Product {0} is not available")]
    ProductUnavailable(i64),
    #[error("Product {product_id} has {available} units in stock, but {requested} were requested")]
    InsufficientStock { product_id: i64, requested: i64, available: i64 },
    #[error("The stored cart could not be read or written. {0}")]
    Serialization(String),
    #[error("The stored cart has schema version {0}, which is newer than this server understands")]
    UnsupportedVersion(u32),
    #[error("Session error. {0}")]
    Session(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<SessionStoreError> for CartError {
    fn from(e: SessionStoreError) -> Self {
        Self::Session(e.to_string())
    }
}

impl From<StoreError> for CartError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ProductNotFound(id) | StoreError::ProductUnavailable(id) => Self::ProductUnavailable(id),
            StoreError::InsufficientStock { product_id, requested, available } => {
                Self::InsufficientStock { product_id, requested, available }
            },
            other => Self::DatabaseError(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Invalid checkout request. {0}")]
    ValidationError(String),
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Product {product_id} has {available} units in stock, but {requested} were requested")]
    InsufficientStock { product_id: i64, requested: i64, available: i64 },
    #[error("Product {0} is no longer available")]
    ProductUnavailable(i64),
    #[error("Payment for order {order_number} was declined. {message}")]
    PaymentDeclined { order_number: OrderNumber, message: String },
    #[error("The payment gateway did not answer in time for order {order_number}. The order is pending.")]
    PaymentTimeout { order_number: OrderNumber },
    #[error("The payment gateway is unavailable. {0}")]
    PaymentUnavailable(String),
    #[error("Transaction {0} could not be verified with the payment gateway")]
    PaymentNotVerified(String),
    #[error("Transaction {transaction_id} was not captured for order {order_number}, or not for its full amount")]
    PaymentMismatch { transaction_id: String, order_number: OrderNumber },
    #[error("The payment gateway holds no captured payment for order {0}")]
    NoCaptureFound(OrderNumber),
    #[error("Order {order_number} is {status} and cannot be paid")]
    OrderNotPayable { order_number: OrderNumber, status: OrderStatusType },
    #[error("The order could not be saved because of a concurrent update. {0}")]
    PersistenceConflict(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl CheckoutError {
    /// True for failures where the customer may simply try again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PaymentDeclined { .. } |
                Self::PaymentTimeout { .. } |
                Self::PaymentUnavailable(_) |
                Self::PersistenceConflict(_)
        )
    }
}

impl From<StoreError> for CheckoutError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InsufficientStock { product_id, requested, available } => {
                Self::InsufficientStock { product_id, requested, available }
            },
            StoreError::ProductNotFound(id) | StoreError::ProductUnavailable(id) => Self::ProductUnavailable(id),
            StoreError::OrderNotFound(n) => Self::OrderNotFound(n),
            StoreError::OrderModificationForbidden { .. } => Self::ValidationError(e.to_string()),
            StoreError::TransactionAlreadyUsed(txid) => Self::PaymentNotVerified(txid),
            StoreError::WriteConflict(_) | StoreError::OrderNumberConflict(_) => Self::PersistenceConflict(e.to_string()),
            other => Self::DatabaseError(other.to_string()),
        }
    }
}

impl From<CartError> for CheckoutError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::InvalidQuantity(_) | CartError::QuantityOutOfRange { .. } => Self::ValidationError(e.to_string()),
            CartError::ProductUnavailable(id) => Self::ProductUnavailable(id),
            CartError::InsufficientStock { product_id, requested, available } => {
                Self::InsufficientStock { product_id, requested, available }
            },
            other => Self::DatabaseError(other.to_string()),
        }
    }
}

impl From<GatewayError> for CheckoutError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Unavailable(s) => Self::PaymentUnavailable(s),
            GatewayError::InvalidRequest(s) => Self::ValidationError(s),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReviewError {
    #[error("Invalid review. {0}")]
    ValidationError(String),
    #[error("Only customers who received product {0} may review it")]
    NotEligible(i64),
    #[error("You have already reviewed product {0}")]
    AlreadyReviewed(i64),
    #[error("Review {0} does not exist")]
    ReviewNotFound(i64),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for ReviewError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ReviewNotEligible(id) => Self::NotEligible(id),
            StoreError::ReviewAlreadyExists(id) => Self::AlreadyReviewed(id),
            StoreError::ReviewNotFound(id) => Self::ReviewNotFound(id),
            other => Self::DatabaseError(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Invalid stock adjustment. {0}")]
    ValidationError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Product {product_id} has {available} units in stock. Cannot remove {requested}")]
    InsufficientStock { product_id: i64, requested: i64, available: i64 },
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for InventoryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ProductNotFound(id) => Self::ProductNotFound(id),
            StoreError::InsufficientStock { product_id, requested, available } => {
                Self::InsufficientStock { product_id, requested, available }
            },
            other => Self::DatabaseError(other.to_string()),
        }
    }
}
