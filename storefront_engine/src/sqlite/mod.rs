//! SQLite backend for the storefront engine.
mod holds;
mod sqlite_impl;

pub mod db;
pub use holds::{Hold, HoldKey, StockHolds};
pub use sqlite_impl::{SqliteDatabase, SqliteReservation};
