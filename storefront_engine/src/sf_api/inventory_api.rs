use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{StockAction, StockLog},
    sf_api::errors::InventoryError,
    traits::InventoryManagement,
};

/// Manual stock changes made by staff, outside the checkout flow.
pub struct InventoryApi<B> {
    db: B,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Applies a signed change to a product's stock and logs it.
    ///
    /// `Sold` and `Returned` are reserved for the order flow. `Received` must add stock and `Damaged` must remove it.
    pub async fn adjust_stock(
        &self,
        product_id: i64,
        delta: i64,
        action: StockAction,
        notes: Option<String>,
        user_id: Option<String>,
    ) -> Result<StockLog, InventoryError> {
        if delta == 0 {
            return Err(InventoryError::ValidationError("The stock change cannot be zero".into()));
        }
        match action {
            StockAction::Sold | StockAction::Returned => {
                return Err(InventoryError::ValidationError(format!("{action} entries are written by orders only")));
            },
            StockAction::Received if delta < 0 => {
                return Err(InventoryError::ValidationError("Received stock must be a positive change".into()));
            },
            StockAction::Damaged if delta > 0 => {
                return Err(InventoryError::ValidationError("Damaged stock must be a negative change".into()));
            },
            _ => {},
        }
        let notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let log = self.db.adjust_stock(product_id, delta, action, notes, user_id).await?;
        info!("📉️ Stock of product {product_id} changed from {} to {} ({action})", log.previous_stock, log.new_stock);
        Ok(log)
    }

    /// The audit trail for a product, oldest first.
    pub async fn stock_history(&self, product_id: i64) -> Result<Vec<StockLog>, InventoryError> {
        Ok(self.db.fetch_stock_logs(product_id).await?)
    }
}
