//! Route handlers.
//!
//! Each fan-out handler creates one [`DeadlineContext`] from the server's root
//! context and threads it through the orchestrator. The context's guard lives
//! on the handler's stack, so a client that hangs up (dropping the handler
//! future) cancels every sub-request of its request.

use std::time::{Duration, Instant};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::Instrument;

use super::params::{
    parse_duration_param, ReportFormat, SlowParams, SubrequestParams, INVALID_TIMEOUT,
};
use super::request::request_id;
use super::server::AppState;
use crate::context::DeadlineContext;
use crate::observability::metrics;
use crate::orchestrator::{run_concurrent, run_serial, CallOutcome, RequestState};

pub async fn ping() -> &'static str {
    "ping!"
}

/// Sleep for `delay`, then say so. The target of every sub-request.
pub async fn slow_get(Query(params): Query<SlowParams>) -> Response {
    let start = Instant::now();
    let Some(raw) = params.delay.filter(|d| !d.is_empty()) else {
        metrics::record_request("slow_get", 400, start);
        return (
            StatusCode::BAD_REQUEST,
            "missing delay (e.g., delay=300ms) query parameter",
        )
            .into_response();
    };

    let delay = match parse_duration_param("delay", Some(raw.as_str())) {
        Ok(delay) => delay,
        Err(e) => {
            metrics::record_request("slow_get", 400, start);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    tokio::time::sleep(delay).await;

    metrics::record_request("slow_get", 200, start);
    format!("delayed {raw}").into_response()
}

#[derive(Debug, Serialize)]
pub struct SerialReport {
    pub state: RequestState,
    pub duration_ms: u128,
    pub results: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OutcomeReport {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

impl From<&CallOutcome> for OutcomeReport {
    fn from(outcome: &CallOutcome) -> Self {
        match &outcome.result {
            Ok(payload) => Self {
                index: outcome.index,
                result: Some(String::from_utf8_lossy(payload).into_owned()),
                error: None,
                error_kind: None,
            },
            Err(e) => Self {
                index: outcome.index,
                result: None,
                error: Some(e.to_string()),
                error_kind: Some(e.kind()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConcurrentReport {
    pub state: RequestState,
    pub duration_ms: u128,
    pub outcomes: Vec<OutcomeReport>,
}

/// Parse the caller's total budget, or answer 400 before launching anything.
fn request_timeout(route: &'static str, params: &SubrequestParams, start: Instant) -> Result<Duration, Response> {
    tracing::trace!(route, state = %RequestState::Pending, timeout = ?params.timeout, "Sub-request fan-out received");
    parse_duration_param("timeout", params.timeout.as_deref()).map_err(|e| {
        tracing::debug!(route, error = %e, "Rejected sub-request fan-out");
        metrics::record_request(route, 400, start);
        (StatusCode::BAD_REQUEST, INVALID_TIMEOUT).into_response()
    })
}

/// Run the configured serial sub-requests under the caller's `timeout`.
pub async fn serial_subrequests(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SubrequestParams>,
) -> Response {
    let start = Instant::now();
    let timeout = match request_timeout("serial", &params, start) {
        Ok(timeout) => timeout,
        Err(rejection) => return rejection,
    };

    let (ctx, _guard) = DeadlineContext::with_timeout(&state.root, timeout);
    let span = tracing::debug_span!(
        "serial_subrequests",
        request_id = %request_id(&headers),
        timeout = ?timeout,
        remaining = ?ctx.remaining(),
    );

    let result = async {
        tracing::debug!(state = %RequestState::Running, calls = state.serial_specs.len(), "Orchestration started");
        let result = run_serial(&ctx, &state.transport, &state.serial_specs).await;
        tracing::debug!(state = %RequestState::of_serial(&result), "Orchestration finished");
        result
    }
    .instrument(span)
    .await;

    let elapsed = start.elapsed();
    let request_state = RequestState::of_serial(&result);
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    metrics::record_serial_subrequests(&result);
    metrics::record_request("serial", status.as_u16(), start);

    match params.format {
        ReportFormat::Json => {
            let report = match &result {
                Ok(payloads) => SerialReport {
                    state: request_state,
                    duration_ms: elapsed.as_millis(),
                    results: payloads
                        .iter()
                        .map(|p| String::from_utf8_lossy(p).into_owned())
                        .collect(),
                    failed_index: None,
                    error: None,
                },
                Err(e) => SerialReport {
                    state: request_state,
                    duration_ms: elapsed.as_millis(),
                    results: Vec::new(),
                    failed_index: Some(e.index),
                    error: Some(e.source.to_string()),
                },
            };
            (status, Json(report)).into_response()
        }
        ReportFormat::Text => match result {
            Ok(payloads) => {
                let results: Vec<String> = payloads
                    .iter()
                    .map(|p| String::from_utf8_lossy(p).into_owned())
                    .collect();
                format!("Duration: {:?}\nResults:{}", elapsed, results.join("\n")).into_response()
            }
            Err(e) => (
                status,
                format!("Sub-request {} failed. {}", e.index, e.source),
            )
                .into_response(),
        },
    }
}

/// Run the configured concurrent sub-requests under the caller's `timeout`.
/// Always answers 200 with one line (or JSON entry) per sub-request.
pub async fn concurrent_subrequests(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SubrequestParams>,
) -> Response {
    let start = Instant::now();
    let timeout = match request_timeout("concurrent", &params, start) {
        Ok(timeout) => timeout,
        Err(rejection) => return rejection,
    };

    let (ctx, _guard) = DeadlineContext::with_timeout(&state.root, timeout);
    let span = tracing::debug_span!(
        "concurrent_subrequests",
        request_id = %request_id(&headers),
        timeout = ?timeout,
        remaining = ?ctx.remaining(),
    );

    let outcomes = async {
        tracing::debug!(state = %RequestState::Running, calls = state.concurrent_specs.len(), "Orchestration started");
        let outcomes = run_concurrent(&ctx, &state.transport, &state.concurrent_specs).await;
        for outcome in &outcomes {
            if let Some(e) = outcome.error() {
                tracing::error!(index = outcome.index, error = %e, "Sub-request failed");
            }
        }
        tracing::debug!(state = %RequestState::of_concurrent(&outcomes), "Orchestration finished");
        outcomes
    }
    .instrument(span)
    .await;

    let elapsed = start.elapsed();
    metrics::record_subrequests("concurrent", &outcomes);
    metrics::record_request("concurrent", 200, start);

    match params.format {
        ReportFormat::Json => Json(ConcurrentReport {
            state: RequestState::of_concurrent(&outcomes),
            duration_ms: elapsed.as_millis(),
            outcomes: outcomes.iter().map(OutcomeReport::from).collect(),
        })
        .into_response(),
        ReportFormat::Text => {
            let mut body = format!("Duration: {:?}", elapsed);
            for outcome in &outcomes {
                let line = match &outcome.result {
                    Ok(payload) => format!(
                        "Request Number: {}, Result: {}",
                        outcome.index,
                        String::from_utf8_lossy(payload)
                    ),
                    Err(e) => format!("Request Number: {}, Error: {}", outcome.index, e),
                };
                body.push('\n');
                body.push_str(&line);
            }
            body.into_response()
        }
    }
}
