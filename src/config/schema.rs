//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the monitor
//! and the `slowwatch` tool. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Slow request detection settings.
    pub monitor: MonitorConfig,

    /// HTTP client settings for the monitored client.
    pub client: ClientConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Targets polled by `slowwatch watch`.
    pub watch: WatchConfig,
}

/// Slow request detection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorConfig {
    /// A tracked request whose duration exceeds this is slow.
    /// Not validated: zero simply makes every request slow.
    pub threshold_ms: u64,

    /// Pause between detecting a slow request and publishing the warning.
    pub confirmation_delay_ms: u64,

    /// How long the slow signal stays up once published.
    pub settling_window_ms: u64,
}

impl MonitorConfig {
    /// Config with the given threshold and default delays.
    pub fn with_threshold_ms(threshold_ms: u64) -> Self {
        Self {
            threshold_ms,
            ..Self::default()
        }
    }

    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.threshold_ms)
    }

    pub fn confirmation_delay(&self) -> Duration {
        Duration::from_millis(self.confirmation_delay_ms)
    }

    pub fn settling_window(&self) -> Duration {
        Duration::from_millis(self.settling_window_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            threshold_ms: 3000,
            confirmation_delay_ms: 250,
            settling_window_ms: 5000,
        }
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Request timeout (total time until response headers) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Polling targets for the watch command.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct WatchConfig {
    /// Absolute http(s) URLs to request on every tick.
    pub targets: Vec<String>,

    /// Poll interval in milliseconds.
    pub interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            targets: vec!["http://127.0.0.1:8080/".to_string()],
            interval_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.monitor.threshold(), Duration::from_millis(3000));
        assert_eq!(config.monitor.confirmation_delay(), Duration::from_millis(250));
        assert_eq!(config.monitor.settling_window(), Duration::from_secs(5));
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str("[monitor]\nthreshold_ms = 100\n").unwrap();
        assert_eq!(config.monitor.threshold_ms, 100);
        assert_eq!(config.monitor.settling_window_ms, 5000);
        assert_eq!(config.client, ClientConfig::default());
    }
}
