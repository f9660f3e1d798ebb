//! Slow request monitoring subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP pipeline hooks (http::layer):
//!     before-send  → on_request_start
//!     on-success   → on_response_received
//!     on-failure   → on_request_failed
//!         → slow_request.rs (elapsed vs threshold)
//!         → cycle.rs (confirm → warning → settle)
//!         → signal.rs (slow_network, home_visible)
//!
//! GUI layer:
//!     reads/subscribes signals
//!     assigns HomeScreenContext (visibility.rs)
//!     calls refresh() on taps and navigation changes
//! ```

mod cycle;
pub mod signal;
pub mod slow_request;
pub mod visibility;

pub use cycle::Phase;
pub use signal::Signal;
pub use slow_request::SlowRequestMonitor;
pub use visibility::{HomeScreenContext, NavigationState, Visibility};
