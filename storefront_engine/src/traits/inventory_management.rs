use crate::{
    db_types::{StockAction, StockLog},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    /// Applies a signed stock `delta` to a product and appends the matching [`StockLog`] in one transaction.
    ///
    /// The update is conditional: if it would take the stock level below zero, nothing is written and
    /// [`StoreError::InsufficientStock`] is returned.
    async fn adjust_stock(
        &self,
        product_id: i64,
        delta: i64,
        action: StockAction,
        notes: Option<String>,
        user_id: Option<String>,
    ) -> Result<StockLog, StoreError>;

    /// The stock audit trail for a product, oldest entry first.
    async fn fetch_stock_logs(&self, product_id: i64) -> Result<Vec<StockLog>, StoreError>;
}
