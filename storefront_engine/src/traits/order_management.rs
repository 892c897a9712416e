use crate::{
    db_types::{Order, OrderItem, OrderNumber, OrderStatusType},
    sf_api::order_objects::OrderQueryFilter,
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, StoreError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StoreError>;

    /// All orders placed by `user_id`, newest first.
    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, StoreError>;

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError>;

    /// Moves an order from `from` to `to` in a single transaction.
    ///
    /// The update only applies if the order is still in the `from` state. Otherwise
    /// [`StoreError::OrderModificationForbidden`] is returned and nothing changes.
    ///
    /// Side effects, applied in the same transaction:
    /// * `Delivered` sets `paid_at` if it is still empty.
    /// * `Cancelled` or `Returned` from a state that holds stock puts every item back on the shelf and logs it.
    ///
    /// Callers are responsible for checking that the transition is legal.
    async fn update_order_status(
        &self,
        order_number: &OrderNumber,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Order, StoreError>;
}
