use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_engine::{
    db_types::{OrderNumber, OrderStatusType, ShippingInfo, StockAction},
    order_objects::{OrderQueryFilter, ReviewEligibility},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//----------------------------------------------   Cart  ----------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: i64,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

/// A relative change to a cart line. Quantities never drop below one; use the DELETE route to remove a line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateQuantityRequest {
    pub delta: i64,
}

//----------------------------------------------   Checkout  ----------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutParams {
    pub customer_email: String,
    pub shipping: ShippingInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPaymentParams {
    pub customer_email: String,
}

/// Leave `transaction_id` out to look the payment up by order number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfirmPaymentParams {
    #[serde(default)]
    pub transaction_id: Option<String>,
}

//----------------------------------------------   Admin  ----------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateParams {
    pub status: OrderStatusType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustmentParams {
    pub delta: i64,
    pub action: StockAction,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationParams {
    pub approved: bool,
}

/// Query string for the admin order search. `status` is a comma separated list, e.g. `status=Paid,Shipped`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSearchParams {
    pub order_number: Option<String>,
    pub user_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

impl OrderSearchParams {
    pub fn into_filter(self) -> Result<OrderQueryFilter, String> {
        let mut filter = OrderQueryFilter::default();
        if let Some(n) = self.order_number {
            filter = filter.with_order_number(OrderNumber::from(n));
        }
        if let Some(user_id) = self.user_id {
            filter = filter.with_user_id(user_id);
        }
        if let Some(since) = self.since {
            filter = filter.since(since);
        }
        if let Some(until) = self.until {
            filter = filter.until(until);
        }
        for status in self.status.iter().flat_map(|s| s.split(',')).map(str::trim).filter(|s| !s.is_empty()) {
            let status = status.parse::<OrderStatusType>().map_err(|e| e.to_string())?;
            filter = filter.with_status(status);
        }
        Ok(filter)
    }
}

//----------------------------------------------   Reviews  ----------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub rating: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityResponse {
    pub product_id: i64,
    pub can_review: bool,
    pub eligibility: ReviewEligibility,
}

impl EligibilityResponse {
    pub fn new(product_id: i64, eligibility: ReviewEligibility) -> Self {
        Self { product_id, can_review: eligibility.can_review(), eligibility }
    }
}
