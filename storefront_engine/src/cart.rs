//! The session-scoped shopping cart.
//!
//! [`Cart`] holds the list operations and knows nothing about storage. [`CartStore`] is the repository that loads a
//! cart from a [`SessionStore`], applies one mutation, and writes the whole cart back.
//!
//! ## Serialized form
//! Carts are stored as a versioned JSON document:
//!
//! ```json
//! { "version": 1, "entries": [ { "product_id": 1, "product_name": "Lock", "unit_price": 1500000, "quantity": 2 } ] }
//! ```
//!
//! Fields that this version does not know about, on the document or on an entry, are kept and written back unchanged.
//! An unversioned JSON array of entries is read as version 0. A document from a newer version is rejected rather than
//! being silently truncated.
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    db_types::Money,
    sf_api::errors::CartError,
    traits::SessionStore,
};

pub const CART_SCHEMA_VERSION: u32 = 1;
pub const CART_SESSION_KEY: &str = "cart";

//--------------------------------------       CartEntry       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub product_id: i64,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl CartEntry {
    pub fn new<S: Into<String>>(product_id: i64, product_name: S, unit_price: Money, quantity: i64) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            unit_price,
            quantity,
            image_url: None,
            extra: Map::new(),
        }
    }

    pub fn with_image<S: Into<String>>(mut self, url: S) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------          Cart         ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    entries: Vec<CartEntry>,
    extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize)]
struct CartSnapshot {
    version: u32,
    entries: Vec<CartEntry>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCart {
    Versioned(CartSnapshot),
    Legacy(Vec<CartEntry>),
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The number of units across all entries.
    pub fn item_count(&self) -> i64 {
        self.entries.iter().map(|e| e.quantity).sum()
    }

    pub fn quantity_of(&self, product_id: i64) -> i64 {
        self.entry(product_id).map(|e| e.quantity).unwrap_or(0)
    }

    pub fn entry(&self, product_id: i64) -> Option<&CartEntry> {
        self.entries.iter().find(|e| e.product_id == product_id)
    }

    /// Adds `entry` to the cart. If the product is already in the cart, only its quantity is increased and the
    /// existing name and price snapshot are kept.
    pub fn add(&mut self, entry: CartEntry) -> Result<(), CartError> {
        if entry.quantity < 1 {
            return Err(CartError::InvalidQuantity(entry.quantity));
        }
        match self.entries.iter_mut().find(|e| e.product_id == entry.product_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(entry.quantity).ok_or(
                    CartError::QuantityOutOfRange { product_id: entry.product_id, delta: entry.quantity },
                )?;
            },
            None => self.entries.push(entry),
        }
        Ok(())
    }

    /// Changes the quantity of a product by `delta`. A change that would leave fewer than one unit is ignored.
    ///
    /// Returns true if the cart changed, and an error if the new quantity does not fit in an `i64`.
    pub fn update_quantity(&mut self, product_id: i64, delta: i64) -> Result<bool, CartError> {
        let Some(e) = self.entries.iter_mut().find(|e| e.product_id == product_id) else {
            return Ok(false);
        };
        let quantity = e.quantity.checked_add(delta).ok_or(CartError::QuantityOutOfRange { product_id, delta })?;
        if delta == 0 || quantity < 1 {
            return Ok(false);
        }
        e.quantity = quantity;
        Ok(true)
    }

    /// Returns true if the product was in the cart.
    pub fn remove(&mut self, product_id: i64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.product_id != product_id);
        before != self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn to_blob(&self) -> Result<String, CartError> {
        let snapshot =
            CartSnapshot { version: CART_SCHEMA_VERSION, entries: self.entries.clone(), extra: self.extra.clone() };
        serde_json::to_string(&snapshot).map_err(|e| CartError::Serialization(e.to_string()))
    }

    pub fn from_blob(blob: &str) -> Result<Self, CartError> {
        let stored =
            serde_json::from_str::<StoredCart>(blob).map_err(|e| CartError::Serialization(e.to_string()))?;
        match stored {
            StoredCart::Versioned(snapshot) if snapshot.version > CART_SCHEMA_VERSION => {
                Err(CartError::UnsupportedVersion(snapshot.version))
            },
            StoredCart::Versioned(snapshot) => Ok(Self { entries: snapshot.entries, extra: snapshot.extra }),
            StoredCart::Legacy(entries) => {
                debug!("🛒️ Upgrading an unversioned cart with {} entries", entries.len());
                Ok(Self { entries, extra: Map::new() })
            },
        }
    }
}

//--------------------------------------       CartStore       ---------------------------------------------------------
/// The cart repository. Each call loads the session's cart, applies one change and stores the complete cart again.
#[derive(Clone)]
pub struct CartStore<S> {
    sessions: S,
}

impl<S> std::fmt::Debug for CartStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartStore")
    }
}

impl<S: SessionStore> CartStore<S> {
    pub fn new(sessions: S) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    /// Returns the session's cart, or an empty cart if the session has none.
    pub async fn load(&self, session_id: &str) -> Result<Cart, CartError> {
        match self.sessions.get(session_id, CART_SESSION_KEY).await? {
            Some(blob) => Cart::from_blob(&blob),
            None => Ok(Cart::new()),
        }
    }

    pub async fn save(&self, session_id: &str, cart: &Cart) -> Result<(), CartError> {
        let blob = cart.to_blob()?;
        self.sessions.set(session_id, CART_SESSION_KEY, blob).await?;
        Ok(())
    }

    pub async fn add(&self, session_id: &str, entry: CartEntry) -> Result<Cart, CartError> {
        let mut cart = self.load(session_id).await?;
        let product_id = entry.product_id;
        cart.add(entry)?;
        self.save(session_id, &cart).await?;
        debug!("🛒️ Product {product_id} added to cart. Cart now holds {} units", cart.item_count());
        Ok(cart)
    }

    pub async fn update_quantity(&self, session_id: &str, product_id: i64, delta: i64) -> Result<Cart, CartError> {
        let mut cart = self.load(session_id).await?;
        if cart.update_quantity(product_id, delta)? {
            self.save(session_id, &cart).await?;
            debug!("🛒️ Quantity of product {product_id} changed by {delta}");
        } else {
            trace!("🛒️ Quantity change of {delta} for product {product_id} ignored");
        }
        Ok(cart)
    }

    pub async fn remove(&self, session_id: &str, product_id: i64) -> Result<Cart, CartError> {
        let mut cart = self.load(session_id).await?;
        if cart.remove(product_id) {
            self.save(session_id, &cart).await?;
            debug!("🛒️ Product {product_id} removed from cart");
        }
        Ok(cart)
    }

    pub async fn clear(&self, session_id: &str) -> Result<(), CartError> {
        self.sessions.clear(session_id, CART_SESSION_KEY).await?;
        debug!("🛒️ Cart cleared");
        Ok(())
    }
}
