//! Slow request monitoring for HTTP clients.
//!
//! A [`SlowRequestMonitor`] watches request timings reported by the
//! [`SlowRequestLayer`] and publishes a slow-network [`Signal`] a GUI can
//! render as a banner.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod monitor;
pub mod observability;

pub use config::AppConfig;
pub use http::{MonitoredClient, SlowRequestLayer};
pub use lifecycle::Shutdown;
pub use monitor::{HomeScreenContext, Signal, SlowRequestMonitor, Visibility};
