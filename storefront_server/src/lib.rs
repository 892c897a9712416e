//! # Storefront server
//! This crate hosts the HTTP front end for the storefront checkout engine. It is responsible for:
//! * Keeping the session cart, keyed by the `sf-session-id` header.
//! * Running checkouts, payment retries and payment confirmations through the engine's `CheckoutApi`.
//! * Order history and product reviews for customers.
//! * The admin routes for order status changes, stock adjustments and review moderation.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! See [routes](routes/index.html) for the full list. `/health` returns a 200 OK response.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod identity;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
