//! HTTP client with slow request monitoring built in.

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::{Duration, Instant};
use tower::{ServiceBuilder, ServiceExt};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::layer::{SlowRequestLayer, SlowRequestService};
use crate::monitor::SlowRequestMonitor;

/// Upper bound on buffered response bodies.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

const USER_AGENT: &str = concat!("slowwatch/", env!("CARGO_PKG_VERSION"));

type HttpClient = Client<HttpConnector, Body>;

/// Summary of a completed GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub status: StatusCode,
    pub body_bytes: usize,
    pub elapsed: Duration,
}

/// hyper-util client whose requests all pass through a [`SlowRequestLayer`].
#[derive(Clone)]
pub struct MonitoredClient {
    service: SlowRequestService<HttpClient>,
    request_timeout: Duration,
}

impl MonitoredClient {
    pub fn new(monitor: SlowRequestMonitor, config: &ClientConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));

        let client = Client::builder(TokioExecutor::new()).build(connector);
        let service = ServiceBuilder::new()
            .layer(SlowRequestLayer::new(monitor))
            .service(client);

        Self {
            service,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    pub fn monitor(&self) -> &SlowRequestMonitor {
        self.service.monitor()
    }

    /// Send a request and wait for the response head.
    ///
    /// A request that exceeds the timeout is abandoned; the monitor sees it
    /// as a failure.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Incoming>, ClientError> {
        let call = self.service.clone().oneshot(request);
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ClientError::Timeout(self.request_timeout)),
        }
    }

    /// GET `uri` and drain the body.
    pub async fn get(&self, uri: &str) -> Result<FetchOutcome, ClientError> {
        let started = Instant::now();
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::empty())?;

        let response = self.send(request).await?;
        let status = response.status();
        let body = axum::body::to_bytes(Body::new(response.into_body()), MAX_BODY_BYTES).await?;

        Ok(FetchOutcome {
            status,
            body_bytes: body.len(),
            elapsed: started.elapsed(),
        })
    }
}

impl std::fmt::Debug for MonitoredClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoredClient")
            .field("monitor", self.monitor())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
