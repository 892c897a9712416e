//! # Storefront engine public API
//!
//! Each API wraps one or more backend traits and is generic over the backend, so any storage that implements those
//! traits can drive it.
//!
//! * [`cart_api`] manages the session cart against the live catalog.
//! * [`checkout_api`] is the checkout pipeline: pricing, order creation, payment, and stock reconciliation.
//! * [`order_flow_api`] covers order queries and the status state machine.
//! * [`inventory_api`] handles manual stock adjustments and the stock audit trail.
//! * [`review_api`] gates and stores product reviews.
//!
//! # API usage
//!
//! ```rust,ignore
//! use storefront_engine::{CheckoutApi, SimulatedGateway, SqliteDatabase, events::EventProducers};
//! let db = SqliteDatabase::new_with_url("sqlite://data/storefront.db", 25).await?;
//! let api = CheckoutApi::new(db, SimulatedGateway::default(), EventProducers::default());
//! let paid = api.checkout(&cart, request).await?;
//! ```
pub mod cart_api;
pub mod checkout_api;
pub mod errors;
pub mod inventory_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod review_api;
