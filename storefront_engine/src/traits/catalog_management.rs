use log::*;

use crate::{
    db_types::{Money, NewProduct, Product},
    pricing::ShippingPolicy,
    traits::StoreError,
};

pub const SHIPPING_COST_KEY: &str = "ShippingCost";
pub const FREE_SHIPPING_THRESHOLD_KEY: &str = "FreeShippingThreshold";

/// The catalog and configuration collaborator.
///
/// The storefront does not own the catalog; it only needs to read prices, stock levels and the active flag, and to read
/// the shipping configuration. `insert_product` and `upsert_setting` exist so that the catalog can be seeded.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StoreError>;

    /// Fetches every product in `ids` that exists. Missing ids are silently skipped.
    async fn fetch_products(&self, ids: &[i64]) -> Result<Vec<Product>, StoreError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError>;

    async fn fetch_setting(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn upsert_setting(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Reads the flat shipping cost and the free-shipping threshold from the site settings.
    ///
    /// Missing or malformed settings fall back to [`ShippingPolicy::default`].
    async fn fetch_shipping_policy(&self) -> Result<ShippingPolicy, StoreError> {
        let defaults = ShippingPolicy::default();
        let flat_shipping_cost =
            parse_money_setting(SHIPPING_COST_KEY, self.fetch_setting(SHIPPING_COST_KEY).await?)
                .unwrap_or(defaults.flat_shipping_cost);
        let free_shipping_threshold = parse_money_setting(
            FREE_SHIPPING_THRESHOLD_KEY,
            self.fetch_setting(FREE_SHIPPING_THRESHOLD_KEY).await?,
        )
        .unwrap_or(defaults.free_shipping_threshold);
        Ok(ShippingPolicy { free_shipping_threshold, flat_shipping_cost })
    }
}

fn parse_money_setting(key: &str, value: Option<String>) -> Option<Money> {
    let value = value?;
    match value.parse::<Money>() {
        Ok(m) if m.value() >= 0 => Some(m),
        Ok(m) => {
            warn!("🪛️ Site setting {key} is negative ({m}). Using the default instead.");
            None
        },
        Err(e) => {
            warn!("🪛️ Site setting {key} is not a valid amount. {e}. Using the default instead.");
            None
        },
    }
}
