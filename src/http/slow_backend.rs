//! Demo backend with artificially delayed responses.
//!
//! # Responsibilities
//! - Answer every path after a configurable delay
//! - Allow a per-request override via `?delay_ms=N`
//! - Serve until the shutdown signal fires
//!
//! Used by `slowwatch serve-slow` to exercise the monitor against a real
//! socket.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::any,
    Router,
};
use serde::Deserialize;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::lifecycle::shutdown::ShutdownListener;

/// Per-request delay override.
#[derive(Debug, Default, Deserialize)]
pub struct DelayParams {
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone)]
struct BackendState {
    default_delay: Duration,
}

/// Build the router for a backend delaying each response by `default_delay`.
pub fn router(default_delay: Duration) -> Router {
    Router::new()
        .route("/{*path}", any(delayed_handler))
        .route("/", any(delayed_handler))
        .with_state(BackendState { default_delay })
        .layer(TraceLayer::new_for_http())
}

/// Serve on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    default_delay: Duration,
    mut shutdown: ShutdownListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(
        address = %addr,
        delay_ms = default_delay.as_millis() as u64,
        "Slow backend listening"
    );

    axum::serve(listener, router(default_delay))
        .with_graceful_shutdown(async move { shutdown.recv().await })
        .await?;

    tracing::info!("Slow backend stopped");
    Ok(())
}

async fn delayed_handler(
    State(state): State<BackendState>,
    Query(params): Query<DelayParams>,
) -> impl IntoResponse {
    let delay = params
        .delay_ms
        .map(Duration::from_millis)
        .unwrap_or(state.default_delay);

    tracing::debug!(delay_ms = delay.as_millis() as u64, "Delaying response");
    tokio::time::sleep(delay).await;

    (StatusCode::OK, format!("slept {}ms\n", delay.as_millis()))
}
