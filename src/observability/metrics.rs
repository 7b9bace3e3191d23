//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fanout_requests_total` (counter): inbound requests by route, status
//! - `fanout_request_duration_seconds` (histogram): inbound latency by route
//! - `fanout_subrequests_total` (counter): sub-request outcomes by mode, outcome
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Prometheus exporter is opt-in via configuration

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use axum::body::Bytes;

use crate::orchestrator::{CallOutcome, SerialError};

/// Install the Prometheus recorder and its scrape listener.
/// Must be called within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "fanout_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("fanout_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_subrequests(mode: &'static str, outcomes: &[CallOutcome]) {
    for outcome in outcomes {
        let label = outcome.error().map_or("success", |e| e.kind());
        metrics::counter!("fanout_subrequests_total", "mode" => mode, "outcome" => label)
            .increment(1);
    }
}

/// Serial runs stop at the first failure; later calls are not counted.
pub fn record_serial_subrequests(result: &Result<Vec<Bytes>, SerialError>) {
    let (succeeded, failure) = match result {
        Ok(payloads) => (payloads.len(), None),
        Err(e) => (e.index, Some(e.source.kind())),
    };
    metrics::counter!("fanout_subrequests_total", "mode" => "serial", "outcome" => "success")
        .increment(succeeded as u64);
    if let Some(label) = failure {
        metrics::counter!("fanout_subrequests_total", "mode" => "serial", "outcome" => label)
            .increment(1);
    }
}
