use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Money, Order, OrderItem, OrderNumber, OrderStatusType, ProductReview};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub order_number: Option<OrderNumber>,
    pub user_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatusType>>,
}

impl OrderQueryFilter {
    pub fn with_order_number(mut self, order_number: OrderNumber) -> Self {
        self.order_number = Some(order_number);
        self
    }

    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_number.is_none() &&
            self.user_id.is_none() &&
            self.since.is_none() &&
            self.until.is_none() &&
            self.status.as_ref().map(Vec::is_empty).unwrap_or(true)
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(n) = &self.order_number {
            write!(f, "order_number: {n}. ")?;
        }
        if let Some(user_id) = &self.user_id {
            write!(f, "user_id: {user_id}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderWithItems {
    /// The line items total, recomputed from the stored snapshots.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(|i| i.total_price).sum()
    }
}

/// The approved reviews for a product, with their average rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub product_id: i64,
    pub count: usize,
    pub average_rating: Option<f64>,
    pub reviews: Vec<ProductReview>,
}

impl ReviewSummary {
    pub fn new(product_id: i64, reviews: Vec<ProductReview>) -> Self {
        let count = reviews.len();
        let average_rating = if count == 0 {
            None
        } else {
            let sum = reviews.iter().map(|r| r.rating).sum::<i64>() as f64;
            Some((sum / count as f64 * 10.0).round() / 10.0)
        };
        Self { product_id, count, average_rating, reviews }
    }
}

/// Whether a user may write a review for a product, and if not, why not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewEligibility {
    Eligible,
    NotDelivered,
    AlreadyReviewed,
}

impl ReviewEligibility {
    pub fn can_review(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}
