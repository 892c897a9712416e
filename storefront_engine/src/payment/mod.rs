//! # Payment gateway boundary
//!
//! The checkout pipeline talks to exactly one [`PaymentGateway`], injected when the [`crate::CheckoutApi`] is built.
//! The engine never inspects gateway internals. It only needs to know whether funds were captured, and under which
//! transaction id.
//!
//! A gateway that takes too long is treated differently from one that declines: the pipeline wraps every
//! [`PaymentGateway::process`] call in a timeout, and a timed-out payment can be reconciled later through
//! [`PaymentGateway::verify`] or [`PaymentGateway::find_capture`]. Both report what was captured and for which order,
//! so a capture is only ever applied to the order it was taken for.
mod simulated;

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use simulated::{SimulatedGateway, SimulatedOutcome};

use crate::db_types::{Money, OrderNumber};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Money,
    pub order_reference: OrderNumber,
    pub customer_email: String,
    pub description: Option<String>,
}

impl PaymentRequest {
    pub fn new<S: Into<String>>(amount: Money, order_reference: OrderNumber, customer_email: S) -> Self {
        Self { amount, order_reference, customer_email: customer_email.into(), description: None }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The gateway's answer to a [`PaymentRequest`].
///
/// Funds are only ever considered captured when `success` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub success: bool,
    pub transaction_id: Option<String>,
    pub message: Option<String>,
}

impl PaymentResult {
    pub fn approved<S: Into<String>>(transaction_id: S) -> Self {
        Self { success: true, transaction_id: Some(transaction_id.into()), message: None }
    }

    pub fn declined<S: Into<String>>(message: S) -> Self {
        Self { success: false, transaction_id: None, message: Some(message.into()) }
    }

    pub fn decline_reason(&self) -> String {
        self.message.clone().unwrap_or_else(|| "The payment was declined".to_string())
    }
}

impl Display for PaymentResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.success, &self.transaction_id) {
            (true, Some(txid)) => write!(f, "approved ({txid})"),
            (true, None) => write!(f, "approved (no transaction id)"),
            (false, _) => write!(f, "declined ({})", self.decline_reason()),
        }
    }
}

/// What the gateway recorded for a captured payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureInfo {
    pub transaction_id: String,
    pub order_reference: OrderNumber,
    pub amount: Money,
}

impl CaptureInfo {
    /// True if this capture was taken for `order_number` and covers exactly `amount`.
    pub fn pays_for(&self, order_number: &OrderNumber, amount: Money) -> bool {
        &self.order_reference == order_number && self.amount == amount
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("The payment gateway could not be reached. {0}")]
    Unavailable(String),
    #[error("The payment gateway rejected the request. {0}")]
    InvalidRequest(String),
}

#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    fn name(&self) -> &str;

    /// Asks the gateway to capture `request.amount`.
    ///
    /// A declined payment is `Ok` with `success == false`. `Err` means the gateway could not give an answer at all.
    async fn process(&self, request: PaymentRequest) -> Result<PaymentResult, GatewayError>;

    /// Looks up a captured payment by its transaction id. `None` means nothing was captured under that id.
    ///
    /// Calling this any number of times has no side effects.
    async fn verify(&self, transaction_id: &str) -> Result<Option<CaptureInfo>, GatewayError>;

    /// Looks up the payment captured for `order_reference`. This is how a payment whose response was lost is found,
    /// since the customer never saw its transaction id.
    async fn find_capture(&self, order_reference: &OrderNumber) -> Result<Option<CaptureInfo>, GatewayError>;
}
