//! Server configuration.
//!
//! Every setting comes from an `SF_*` environment variable. Invalid values are logged and replaced by their defaults,
//! so a bad variable never stops the server from starting.
use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use sf_common::{parse_boolean_flag, Secret};
use storefront_engine::{CheckoutConfig, SimulatedOutcome};

const DEFAULT_SF_HOST: &str = "127.0.0.1";
const DEFAULT_SF_PORT: u16 = 8480;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_PAYMENT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CHECKOUT_ATTEMPTS: u32 = 3;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// Upper bound on a single payment gateway call.
    pub payment_timeout: Duration,
    /// How many times a checkout is attempted when a concurrent write wins the race.
    pub checkout_attempts: u32,
    /// How the simulated gateway answers payment requests.
    pub simulated_payments: SimulatedOutcome,
    pub gateway_api_key: Secret<String>,
    /// If true, the embedded database migrations are applied on start.
    pub run_migrations: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SF_HOST.to_string(),
            port: DEFAULT_SF_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            payment_timeout: Duration::from_secs(DEFAULT_PAYMENT_TIMEOUT_SECS),
            checkout_attempts: DEFAULT_CHECKOUT_ATTEMPTS,
            simulated_payments: SimulatedOutcome::default(),
            gateway_api_key: Secret::default(),
            run_migrations: true,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SF_HOST").ok().unwrap_or_else(|| DEFAULT_SF_HOST.into());
        let port = parse_or_default("SF_PORT", env::var("SF_PORT").ok(), DEFAULT_SF_PORT);
        let database_url = env::var("SF_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ SF_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections =
            parse_or_default("SF_DB_MAX_CONNECTIONS", env::var("SF_DB_MAX_CONNECTIONS").ok(), DEFAULT_DB_MAX_CONNECTIONS);
        let timeout_secs = parse_or_default(
            "SF_PAYMENT_TIMEOUT_SECS",
            env::var("SF_PAYMENT_TIMEOUT_SECS").ok(),
            DEFAULT_PAYMENT_TIMEOUT_SECS,
        );
        let checkout_attempts =
            parse_or_default("SF_CHECKOUT_ATTEMPTS", env::var("SF_CHECKOUT_ATTEMPTS").ok(), DEFAULT_CHECKOUT_ATTEMPTS);
        let simulated_payments = parse_or_default(
            "SF_SIMULATED_PAYMENTS",
            env::var("SF_SIMULATED_PAYMENTS").ok(),
            SimulatedOutcome::default(),
        );
        if simulated_payments != SimulatedOutcome::Approve {
            warn!("🚨️ The simulated payment gateway will answer every payment with {simulated_payments:?}");
        }
        let gateway_api_key = Secret::new(env::var("SF_GATEWAY_API_KEY").ok().unwrap_or_default());
        let run_migrations = parse_boolean_flag(env::var("SF_RUN_MIGRATIONS").ok(), true);
        Self {
            host,
            port,
            database_url,
            max_connections: max_connections.max(1),
            payment_timeout: Duration::from_secs(timeout_secs.max(1)),
            checkout_attempts: checkout_attempts.max(1),
            simulated_payments,
            gateway_api_key,
            run_migrations,
        }
    }

    pub fn checkout_config(&self) -> CheckoutConfig {
        CheckoutConfig { payment_timeout: self.payment_timeout, max_attempts: self.checkout_attempts }
    }
}

/// Parses `value` if it is set, logging and falling back to `default` when it is missing or invalid.
pub fn parse_or_default<T>(name: &str, value: Option<String>, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    T::Err: Display,
{
    match value {
        None => {
            debug!("🪛️ {name} is not set. Using the default, {default:?}");
            default
        },
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default:?}, instead.");
            default
        }),
    }
}
