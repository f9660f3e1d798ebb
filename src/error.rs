//! Error types shared across the crate.

use std::time::Duration;
use thiserror::Error;

use crate::config::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure while asking a view context whether the home screen is showing.
///
/// These never leave the monitor; they are folded into
/// [`Visibility::Unknown`](crate::monitor::Visibility::Unknown).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VisibilityError {
    #[error("view context is detached")]
    Detached,

    #[error("navigation state unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by [`MonitoredClient`](crate::http::MonitoredClient).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read response body: {0}")]
    Body(#[from] axum::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}
