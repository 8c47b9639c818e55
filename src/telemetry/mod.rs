//! Log subscriber setup
//!
//! Installs a registry with an [`EnvFilter`] and a console fmt layer. The
//! filter honours `RUST_LOG` when set and falls back to the requested level.
//!
//! # Example
//!
//! ```no_run
//! use cloud_disk_e2e::telemetry::{init_subscriber, LogFormat};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! init_subscriber("info", LogFormat::Pretty)?;
//! # Ok(())
//! # }
//! ```

use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Errors that can occur while installing the subscriber
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{0}'")]
    InvalidFilter(String),

    #[error("Failed to set global subscriber (may already be initialized): {0}")]
    AlreadyInitialized(String),
}

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}' (expected pretty or json)", other)),
        }
    }
}

/// Build the filter: `RUST_LOG` wins, otherwise `level`
pub fn build_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|_| TelemetryError::InvalidFilter(level.to_string())),
    }
}

/// Install the global subscriber
pub fn init_subscriber(level: &str, format: LogFormat) -> Result<(), TelemetryError> {
    let env_filter = build_filter(level)?;
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true);
            tracing::subscriber::set_global_default(registry.with(fmt_layer))
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true);
            tracing::subscriber::set_global_default(registry.with(fmt_layer))
        }
    };

    result.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_build_filter_accepts_directives() {
        assert!(build_filter("cloud_disk_e2e=debug,reqwest=warn").is_ok());
    }
}
