//! Tower middleware that feeds request lifecycle events to the monitor.
//!
//! # Responsibilities
//! - Call `on_request_start` before the request is handed to the inner service
//! - Call `on_response_received` / `on_request_failed` when it completes
//! - Pass request, response and error through untouched
//!
//! # Design Decisions
//! - A request future dropped before completion (timeout, caller gave up)
//!   counts as a failure so the tracked slot is always released
//! - The wrapped future is boxed; the inner future must be `Send + 'static`

use axum::http::Request;
use futures_util::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::monitor::SlowRequestMonitor;

/// Layer that wraps a service with [`SlowRequestService`].
#[derive(Debug, Clone)]
pub struct SlowRequestLayer {
    monitor: SlowRequestMonitor,
}

impl SlowRequestLayer {
    pub fn new(monitor: SlowRequestMonitor) -> Self {
        Self { monitor }
    }
}

impl<S> Layer<S> for SlowRequestLayer {
    type Service = SlowRequestService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SlowRequestService {
            inner,
            monitor: self.monitor.clone(),
        }
    }
}

/// Service that reports request timing to a [`SlowRequestMonitor`].
#[derive(Debug, Clone)]
pub struct SlowRequestService<S> {
    inner: S,
    monitor: SlowRequestMonitor,
}

impl<S> SlowRequestService<S> {
    pub fn monitor(&self) -> &SlowRequestMonitor {
        &self.monitor
    }
}

impl<S, B> Service<Request<B>> for SlowRequestService<S>
where
    S: Service<Request<B>>,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let in_flight = InFlight::start(self.monitor.clone());
        let future = self.inner.call(request);

        Box::pin(async move {
            let result = future.await;
            match &result {
                Ok(_) => in_flight.finish(true),
                Err(_) => in_flight.finish(false),
            }
            result
        })
    }
}

/// Reports completion exactly once, including on drop.
struct InFlight {
    monitor: Option<SlowRequestMonitor>,
}

impl InFlight {
    fn start(monitor: SlowRequestMonitor) -> Self {
        monitor.on_request_start();
        Self {
            monitor: Some(monitor),
        }
    }

    fn finish(mut self, success: bool) {
        if let Some(monitor) = self.monitor.take() {
            if success {
                monitor.on_response_received();
            } else {
                monitor.on_request_failed();
            }
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            tracing::debug!("Request dropped before completion");
            monitor.on_request_failed();
        }
    }
}
