//! Query parameters of the fan-out endpoints.
//!
//! Unparsable or missing durations are client errors, answered before any
//! sub-request is launched and never retried.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Body of the 400 answer for a missing or malformed `timeout`.
pub const INVALID_TIMEOUT: &str =
    "Invalid timeout query parameter. Expected something like timeout=700ms";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationParamError {
    #[error("missing {0} query parameter")]
    Missing(&'static str),

    #[error("invalid {name} duration string. {reason}")]
    Malformed { name: &'static str, reason: String },
}

/// Parse a duration such as `700ms`, `1s`, or `1m 30s`.
pub fn parse_duration_param(
    name: &'static str,
    value: Option<&str>,
) -> Result<Duration, DurationParamError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(DurationParamError::Missing(name))?;

    humantime::parse_duration(raw).map_err(|e| DurationParamError::Malformed {
        name,
        reason: e.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubrequestParams {
    pub timeout: Option<String>,
    #[serde(default)]
    pub format: ReportFormat,
}

#[derive(Debug, Default, Deserialize)]
pub struct SlowParams {
    pub delay: Option<String>,
}
