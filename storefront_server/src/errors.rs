use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::*;
use storefront_engine::{traits::StoreError, CartError, CheckoutError, InventoryError, ReviewError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("The request does not carry a cart session id")]
    MissingSession,
    #[error("The request does not identify a customer")]
    MissingIdentity,
    #[error("Forbidden. {0}")]
    Forbidden(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state. {0}")]
    Conflict(String),
    #[error("Payment was not completed. {0}")]
    PaymentRequired(String),
    #[error("A downstream service is unavailable. {0}")]
    ServiceUnavailable(String),
    #[error("A downstream service did not answer in time. {0}")]
    GatewayTimeout(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::MissingSession => StatusCode::BAD_REQUEST,
            Self::MissingIdentity => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderNotFound(_) | StoreError::ProductNotFound(_) | StoreError::ReviewNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            StoreError::ProductUnavailable(_) |
            StoreError::InsufficientStock { .. } |
            StoreError::OrderModificationNoOp |
            StoreError::OrderModificationForbidden { .. } |
            StoreError::ReviewAlreadyExists(_) |
            StoreError::WriteConflict(_) |
            StoreError::TransactionAlreadyUsed(_) |
            StoreError::OrderNumberConflict(_) => Self::Conflict(e.to_string()),
            StoreError::ReviewNotEligible(_) => Self::Forbidden(e.to_string()),
            StoreError::DatabaseError(_) => {
                error!("💻️ Database error while handling a request. {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}

impl From<CartError> for ServerError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::InvalidQuantity(_) | CartError::QuantityOutOfRange { .. } => {
                Self::InvalidRequestBody(e.to_string())
            },
            CartError::ProductUnavailable(_) => Self::NoRecordFound(e.to_string()),
            CartError::InsufficientStock { .. } => Self::Conflict(e.to_string()),
            CartError::Serialization(_) |
            CartError::UnsupportedVersion(_) |
            CartError::Session(_) |
            CartError::DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::ValidationError(_) | CheckoutError::EmptyCart => Self::InvalidRequestBody(e.to_string()),
            CheckoutError::InsufficientStock { .. } |
            CheckoutError::ProductUnavailable(_) |
            CheckoutError::OrderNotPayable { .. } |
            CheckoutError::PersistenceConflict(_) => Self::Conflict(e.to_string()),
            CheckoutError::PaymentDeclined { .. } |
            CheckoutError::PaymentNotVerified(_) |
            CheckoutError::PaymentMismatch { .. } |
            CheckoutError::NoCaptureFound(_) => Self::PaymentRequired(e.to_string()),
            CheckoutError::PaymentTimeout { .. } => Self::GatewayTimeout(e.to_string()),
            CheckoutError::PaymentUnavailable(_) => Self::ServiceUnavailable(e.to_string()),
            CheckoutError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            CheckoutError::DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<ReviewError> for ServerError {
    fn from(e: ReviewError) -> Self {
        match e {
            ReviewError::ValidationError(_) => Self::InvalidRequestBody(e.to_string()),
            ReviewError::NotEligible(_) => Self::Forbidden(e.to_string()),
            ReviewError::AlreadyReviewed(_) => Self::Conflict(e.to_string()),
            ReviewError::ReviewNotFound(_) => Self::NoRecordFound(e.to_string()),
            ReviewError::DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<InventoryError> for ServerError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::ValidationError(_) => Self::InvalidRequestBody(e.to_string()),
            InventoryError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            InventoryError::InsufficientStock { .. } => Self::Conflict(e.to_string()),
            InventoryError::DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}
