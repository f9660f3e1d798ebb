//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated)
//!     → MonitorConfig handed to SlowRequestMonitor::new
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → SlowRequestMonitor::reconfigure(new.monitor)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the owner of the monitor applies reloads

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config};
pub use schema::{AppConfig, ClientConfig, MonitorConfig, ObservabilityConfig, WatchConfig};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
