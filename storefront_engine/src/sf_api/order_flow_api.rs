use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderNumber, OrderStatusType},
    events::{EventProducers, OrderStatusChangedEvent},
    sf_api::order_objects::{OrderQueryFilter, OrderWithItems},
    traits::{OrderManagement, StoreError},
};

/// `OrderFlowApi` runs the order lifecycle after checkout: order queries for customers and admins, and the status
/// state machine.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    pub async fn order_with_items(&self, order_number: &OrderNumber) -> Result<OrderWithItems, StoreError> {
        let order = self
            .db
            .fetch_order_by_number(order_number)
            .await?
            .ok_or_else(|| StoreError::OrderNotFound(order_number.clone()))?;
        let items = self.db.fetch_order_items(order.id).await?;
        Ok(OrderWithItems { order, items })
    }

    /// A customer's order history, newest first.
    pub async fn orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, StoreError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError> {
        trace!("📦️ Searching orders. {query}");
        self.db.search_orders(query).await
    }

    /// Changes the status of an order.
    ///
    /// | From \ To  | Paid | Processing | Shipped | Delivered | Cancelled | Returned |
    /// |------------|------|------------|---------|-----------|-----------|----------|
    /// | Pending    | Err  | Err        | Err     | Err       | Ok        | Ok       |
    /// | Paid       | NoOp | Ok         | Err     | Err       | Ok (1)    | Ok (1)   |
    /// | Processing | Err  | NoOp       | Ok      | Err       | Ok (1)    | Ok (1)   |
    /// | Shipped    | Err  | Err        | NoOp    | Ok (2)    | Ok (1)    | Ok (1)   |
    /// | Delivered, Cancelled, Returned | Err | Err | Err | Err | Err | Err |
    ///
    /// `Pending -> Paid` only happens through a payment, so it is refused here.
    ///
    /// (1) Every item is put back in stock, with a `Returned` or `Adjusted` stock log.
    /// (2) `paid_at` is backfilled if it is missing.
    ///
    /// The change is a compare-and-set against the status read here. If another change lands first, this one fails
    /// with `OrderModificationForbidden` instead of overwriting it.
    pub async fn modify_status_for_order(
        &self,
        order_number: &OrderNumber,
        new_status: OrderStatusType,
    ) -> Result<Order, StoreError> {
        let order = self
            .db
            .fetch_order_by_number(order_number)
            .await?
            .ok_or_else(|| StoreError::OrderNotFound(order_number.clone()))?;
        let old_status = order.status;
        if old_status == new_status {
            debug!("📦️ Order {order_number} is already {new_status}");
            return Err(StoreError::OrderModificationNoOp);
        }
        if new_status == OrderStatusType::Paid || !old_status.can_transition_to(new_status) {
            warn!("📦️ Refusing to move order {order_number} from {old_status} to {new_status}");
            return Err(StoreError::OrderModificationForbidden { from: old_status, to: new_status });
        }
        let order = self.db.update_order_status(order_number, old_status, new_status).await?;
        info!("📦️ Order {order_number} moved from {old_status} to {new_status}");
        self.producers.publish_status_changed(OrderStatusChangedEvent::new(old_status, order.clone())).await;
        Ok(order)
    }
}
