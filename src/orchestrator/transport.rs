//! Outbound HTTP GET capability.
//!
//! # Responsibilities
//! - Abstract "GET a URL, return the body or an error" behind a trait
//! - Provide the hyper-based production implementation
//!
//! # Design Decisions
//! - Aborting the task that awaits [`Transport::get`] drops the in-flight
//!   request future, which tears down its connection
//! - Non-success statuses are failures, with the upstream body kept for context

use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{Method, Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use super::error::TransportError;

/// Shared handle to the transport used by every call of the service.
pub type SharedTransport = Arc<dyn Transport>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET to `target` and return the full response body.
    async fn get(&self, target: &Url) -> Result<Bytes, TransportError>;
}

/// [`Transport`] backed by hyper's pooled client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    max_body_bytes: usize,
}

impl HyperTransport {
    pub fn new(connect_timeout: Duration, max_body_bytes: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            max_body_bytes,
        }
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn get(&self, target: &Url) -> Result<Bytes, TransportError> {
        let uri: Uri = target
            .as_str()
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| TransportError::InvalidRequest(e.to_string()))?;

        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let response = self.client.request(request).await.map_err(|e| {
            // The legacy client's Display is terse; the cause carries the detail.
            match e.source() {
                Some(cause) => TransportError::Request(format!("{e}: {cause}")),
                None => TransportError::Request(e.to_string()),
            }
        })?;

        let status = response.status();
        let body = axum::body::to_bytes(Body::new(response.into_body()), self.max_body_bytes)
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body)
    }
}
