//! Typed configuration from environment variables.
//!
//! Loads once at startup and fails fast on values that do not parse.
//! Everything has a default, so an empty environment yields a working
//! broker on port 5000.

use std::net::SocketAddr;
use std::time::Duration;

use crate::broker::SweepConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub sweep_interval: Duration,
    pub stale_after: Duration,
    pub cors_allow_origin: String,
    pub otel_endpoint: Option<String>,
    pub service_name: String,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = match lookup("BROKER_ADDR") {
            Some(raw) => raw.parse().map_err(|e| {
                Error::Config(format!("BROKER_ADDR={raw:?} is not an address: {e}"))
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 5000)),
        };

        let sweep_interval = seconds_var(&lookup, "SWEEP_INTERVAL_SECS", 300)?;
        if sweep_interval.is_zero() {
            return Err(Error::Config(
                "SWEEP_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            sweep_interval,
            stale_after: seconds_var(&lookup, "STALE_AFTER_SECS", 300)?,
            cors_allow_origin: lookup("CORS_ALLOW_ORIGIN").unwrap_or_else(|| "*".to_string()),
            otel_endpoint: lookup("OTEL_ENDPOINT").filter(|s| !s.is_empty()),
            service_name: lookup("OTEL_SERVICE_NAME")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "job-broker".to_string()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn sweep(&self) -> SweepConfig {
        SweepConfig {
            interval: self.sweep_interval,
            stale_after: self.stale_after,
        }
    }
}

fn seconds_var(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> Result<Duration> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| {
                Error::Config(format!(
                    "{name}={raw:?} is not a whole number of seconds: {e}"
                ))
            }),
        None => Ok(Duration::from_secs(default)),
    }
}
