use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderItem, OrderStatusType};

/// Published once an order's payment has been captured and its stock committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderPaidEvent {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self { order, items }
    }
}

/// Published after an administrative status change has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub old_status: OrderStatusType,
    pub order: Order,
}

impl OrderStatusChangedEvent {
    pub fn new(old_status: OrderStatusType, order: Order) -> Self {
        Self { old_status, order }
    }

    pub fn new_status(&self) -> OrderStatusType {
        self.order.status
    }
}
