//! # Storefront engine
//!
//! The checkout-to-fulfilment core of an online store. It takes a customer's session cart, prices it, stores it as an
//! order, collects payment through a [`PaymentGateway`], and takes the sold items out of stock, all-or-nothing.
//!
//! Storage is abstracted behind the traits in [`traits`]. A SQLite implementation is provided in [`sqlite`] behind
//! the `sqlite` feature, which is on by default.
pub mod cart;
pub mod db_types;
pub mod events;
pub mod order_number;
pub mod payment;
pub mod pricing;
pub mod session;
pub mod sf_api;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use cart::{Cart, CartEntry, CartStore};
pub use payment::{PaymentGateway, SimulatedGateway, SimulatedOutcome};
pub use pricing::{compute_totals, CartTotals, ShippingPolicy};
pub use session::MemorySessionStore;
pub use sf_api::{
    cart_api::{CartApi, CartView},
    checkout_api::{CheckoutApi, CheckoutConfig, CheckoutRequest},
    errors::{CartError, CheckoutError, InventoryError, ReviewError},
    inventory_api::InventoryApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    review_api::ReviewApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
