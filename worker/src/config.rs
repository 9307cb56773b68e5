//! Worker configuration from the process environment.

use std::net::SocketAddr;
use thiserror::Error;

const DATABASE_URL: &str = "DATABASE_URL";
const RABBITMQ_URL: &str = "RABBITMQ_URL";
const METRICS_ADDR: &str = "METRICS_ADDR";

/// Errors from reading worker configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is absent.
    #[error("{0} is not set")]
    Missing(&'static str),

    /// A variable is present but cannot be parsed.
    #[error("invalid {name}: {reason}")]
    Invalid {
        /// The offending environment variable.
        name: &'static str,
        /// Why it failed to parse.
        reason: String,
    },
}

/// Runtime configuration for the reconciliation worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// `PostgreSQL` connection string for the stock store.
    pub database_url: String,
    /// AMQP connection string for the order-events broker.
    pub amqp_url: String,
    /// Optional listen address for the Prometheus metrics exporter.
    pub metrics_addr: Option<SocketAddr>,
}

impl WorkerConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `DATABASE_URL` or
    /// `RABBITMQ_URL` is unset, and [`ConfigError::Invalid`] when
    /// `METRICS_ADDR` does not parse as a socket address. Either is fatal
    /// to startup.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup(DATABASE_URL).ok_or(ConfigError::Missing(DATABASE_URL))?;
        let amqp_url = lookup(RABBITMQ_URL).ok_or(ConfigError::Missing(RABBITMQ_URL))?;
        let metrics_addr = lookup(METRICS_ADDR)
            .map(|raw| {
                raw.parse().map_err(|e| ConfigError::Invalid {
                    name: METRICS_ADDR,
                    reason: format!("{e}: {raw}"),
                })
            })
            .transpose()?;

        Ok(Self {
            database_url,
            amqp_url,
            metrics_addr,
        })
    }
}
