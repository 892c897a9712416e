//! # Backend contracts
//!
//! This module defines the behaviour a storage backend must expose to drive the storefront checkout engine.
//!
//! * [`StorefrontDatabase`] is the highest level trait. It owns the atomic checkout primitives: reserving stock for an
//!   order inside an open transaction, and committing that reservation together with the order's `Paid` transition.
//! * [`CatalogManagement`] is the read/write view onto the product catalog and the site settings.
//! * [`OrderManagement`] provides order queries and the status transition primitive.
//! * [`InventoryManagement`] covers manual stock adjustments and the stock audit log.
//! * [`ReviewManagement`] stores product reviews and answers eligibility questions.
//! * [`SessionStore`] is the opaque per-session blob storage used by the cart.
mod catalog_management;
mod inventory_management;
mod order_management;
mod review_management;
mod session_store;
mod storefront_database;

pub use catalog_management::{CatalogManagement, FREE_SHIPPING_THRESHOLD_KEY, SHIPPING_COST_KEY};
pub use inventory_management::InventoryManagement;
pub use order_management::OrderManagement;
pub use review_management::ReviewManagement;
pub use session_store::{SessionStore, SessionStoreError};
pub use storefront_database::{PaymentReceipt, StockReservation, StoreError, StorefrontDatabase};
