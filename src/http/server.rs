//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the Axum Router once, at start-up, and own it explicitly
//! - Wire up middleware (tracing, request ID, outer timeout)
//! - Turn configured delays into sub-request targets
//! - Serve until the shutdown signal, then drain

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use humantime_serde::Serde;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use url::Url;

use crate::config::ServiceConfig;
use crate::context::DeadlineContext;
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::orchestrator::{CallSpec, HyperTransport, SharedTransport};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Every request context derives from this; released on shutdown.
    pub root: DeadlineContext,
    pub transport: SharedTransport,
    pub serial_specs: Arc<[CallSpec]>,
    pub concurrent_specs: Arc<[CallSpec]>,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid sub-request target: {0}")]
    Target(#[from] url::ParseError),
}

/// HTTP server for the fan-out service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server that issues sub-requests with hyper.
    pub fn new(config: ServiceConfig, root: DeadlineContext) -> Result<Self, ServerError> {
        let transport: SharedTransport = Arc::new(HyperTransport::new(
            config.timeouts.connect,
            config.subrequests.max_body_bytes,
        ));
        Self::with_transport(config, root, transport)
    }

    /// Create a server with a caller-supplied transport.
    pub fn with_transport(
        config: ServiceConfig,
        root: DeadlineContext,
        transport: SharedTransport,
    ) -> Result<Self, ServerError> {
        let base = Url::parse(&config.subrequests.base_url)?;
        let state = AppState {
            root,
            transport,
            serial_specs: slow_get_specs(&base, &config.subrequests.serial_delays)?.into(),
            concurrent_specs: slow_get_specs(&base, &config.subrequests.concurrent_delays)?.into(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        Router::new()
            .route("/ping", get(handlers::ping))
            .route("/slow/get", get(handlers::slow_get))
            .route("/subrequests/serial", get(handlers::serial_subrequests))
            .route("/subrequests/concurrent", get(handlers::concurrent_subrequests))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for driving the service without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// One `slow/get?delay=<d>` target under `base` per configured delay.
pub fn slow_get_specs(
    base: &Url,
    delays: &[Serde<Duration>],
) -> Result<Vec<CallSpec>, url::ParseError> {
    delays
        .iter()
        .map(|delay| {
            let mut target = base.join("slow/get")?;
            target
                .query_pairs_mut()
                .append_pair("delay", &humantime::format_duration(**delay).to_string());
            Ok(CallSpec::new(target))
        })
        .collect()
}
