//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (poll interval, request timeout)
//! - Check that watch targets are absolute http(s) URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - The monitor threshold is accepted as-is; a tiny value only makes the
//!   monitor more sensitive

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::AppConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),

    #[error("invalid watch target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("watch interval must be greater than zero")]
    ZeroInterval,

    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    for target in &config.watch.targets {
        if let Err(reason) = check_target(target) {
            errors.push(ValidationError::InvalidTarget {
                target: target.clone(),
                reason,
            });
        }
    }

    if config.watch.interval_ms == 0 {
        errors.push(ValidationError::ZeroInterval);
    }

    if config.client.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_target(target: &str) -> Result<(), String> {
    let url = Url::parse(target).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{}'", other)),
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}
