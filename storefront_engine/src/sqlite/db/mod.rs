//! # SQLite table access
//!
//! Every function here is a plain async function over a `&mut SqliteConnection`. Pass a pooled connection for a
//! one-off query, or `&mut *tx` to run several of them inside one transaction.
//!
//! Write transactions in this crate always open with a write statement. SQLite starts transactions in deferred mode,
//! and a transaction that reads first and then tries to upgrade to a write lock fails immediately on contention
//! instead of waiting out the busy timeout.
use std::{env, str::FromStr, time::Duration};

use log::*;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod orders;
pub mod products;
pub mod reviews;
pub mod settings;
pub mod stock;

const SQLITE_DB_URL: &str = "sqlite://data/storefront.db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub fn db_url() -> String {
    let result = env::var("SF_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ SF_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

pub(crate) fn is_unique_violation(e: &SqlxError) -> bool {
    matches!(e, SqlxError::Database(db) if db.is_unique_violation())
}
