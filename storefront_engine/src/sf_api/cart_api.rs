use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    cart::{Cart, CartEntry, CartStore},
    pricing::{compute_totals, CartTotals},
    sf_api::errors::CartError,
    traits::{CatalogManagement, SessionStore},
};

/// The cart as shown to the customer: its entries and the totals they add up to under the current shipping policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub entries: Vec<CartEntry>,
    pub item_count: i64,
    pub totals: CartTotals,
}

/// `CartApi` manages the session cart against the live catalog.
pub struct CartApi<S, C> {
    carts: CartStore<S>,
    catalog: C,
}

impl<S, C> Debug for CartApi<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi")
    }
}

impl<S, C> CartApi<S, C>
where
    S: SessionStore,
    C: CatalogManagement,
{
    pub fn new(sessions: S, catalog: C) -> Self {
        Self { carts: CartStore::new(sessions), catalog }
    }

    pub fn store(&self) -> &CartStore<S> {
        &self.carts
    }

    pub async fn cart(&self, session_id: &str) -> Result<Cart, CartError> {
        self.carts.load(session_id).await
    }

    pub async fn view(&self, session_id: &str) -> Result<CartView, CartError> {
        let cart = self.carts.load(session_id).await?;
        let policy = self.catalog.fetch_shipping_policy().await?;
        let totals = compute_totals(cart.entries(), &policy);
        Ok(CartView { item_count: cart.item_count(), entries: cart.entries().to_vec(), totals })
    }

    /// Adds `quantity` units of a catalog product to the session's cart.
    ///
    /// The product must exist and be active, and the stock on hand must cover the quantity already in the cart plus
    /// `quantity`. The name, price (the discounted price if there is one) and image are snapshotted into the cart
    /// entry. Stock is not held: it is only taken at checkout.
    pub async fn add_product(&self, session_id: &str, product_id: i64, quantity: i64) -> Result<Cart, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        let product = match self.catalog.fetch_product(product_id).await? {
            Some(p) if p.is_active => p,
            _ => {
                debug!("🛒️ Product {product_id} cannot be added to a cart. It is missing or inactive.");
                return Err(CartError::ProductUnavailable(product_id));
            },
        };
        let in_cart = self.carts.load(session_id).await?.quantity_of(product_id);
        let requested = in_cart + quantity;
        if product.stock_quantity < requested {
            debug!("🛒️ Product {product_id} has {} in stock. {requested} requested", product.stock_quantity);
            return Err(CartError::InsufficientStock { product_id, requested, available: product.stock_quantity });
        }
        let mut entry = CartEntry::new(product.id, product.name.clone(), product.effective_price(), quantity);
        if let Some(image) = &product.main_image {
            entry = entry.with_image(image.clone());
        }
        self.carts.add(session_id, entry).await
    }

    /// Changes the quantity of a product already in the cart. Increases are held to the stock on hand, the same way
    /// [`Self::add_product`] is.
    pub async fn update_quantity(&self, session_id: &str, product_id: i64, delta: i64) -> Result<Cart, CartError> {
        let in_cart = self.carts.load(session_id).await?.quantity_of(product_id);
        if delta > 0 && in_cart > 0 {
            let requested = in_cart.checked_add(delta).ok_or(CartError::QuantityOutOfRange { product_id, delta })?;
            let product = match self.catalog.fetch_product(product_id).await? {
                Some(p) if p.is_active => p,
                _ => return Err(CartError::ProductUnavailable(product_id)),
            };
            if product.stock_quantity < requested {
                debug!("🛒️ Product {product_id} has {} in stock. {requested} requested", product.stock_quantity);
                return Err(CartError::InsufficientStock { product_id, requested, available: product.stock_quantity });
            }
        }
        self.carts.update_quantity(session_id, product_id, delta).await
    }

    pub async fn remove(&self, session_id: &str, product_id: i64) -> Result<Cart, CartError> {
        self.carts.remove(session_id, product_id).await
    }

    pub async fn clear(&self, session_id: &str) -> Result<(), CartError> {
        self.carts.clear(session_id).await
    }
}
