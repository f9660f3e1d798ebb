//! HTTP pipeline integration.
//!
//! # Data Flow
//! ```text
//! caller
//!     → client.rs (MonitoredClient: timeout, body draining)
//!     → layer.rs (SlowRequestLayer: lifecycle hooks → monitor)
//!     → hyper-util client → network
//! ```
//!
//! slow_backend.rs is the other end: an axum app that answers late on purpose.

pub mod client;
pub mod layer;
pub mod slow_backend;

pub use client::{FetchOutcome, MonitoredClient};
pub use layer::{SlowRequestLayer, SlowRequestService};
