//! In-process transports for orchestrator tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use url::Url;

use super::call::CallSpec;
use super::error::TransportError;
use super::transport::Transport;

/// Sleeps for the `delay` query parameter, then answers `delayed <delay>`.
/// Path `/fail` answers with a transport error instead.
#[derive(Debug, Default)]
pub struct SlowTransport {
    started: AtomicUsize,
    in_flight: AtomicUsize,
}

impl SlowTransport {
    /// Calls that reached the transport.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Calls whose future has not yet completed or been dropped.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for SlowTransport {
    async fn get(&self, target: &Url) -> Result<Bytes, TransportError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let _flight = InFlight::enter(&self.in_flight);

        let delay = target
            .query_pairs()
            .find(|(key, _)| key == "delay")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_else(|| "0ms".to_string());
        let duration = humantime::parse_duration(&delay).unwrap_or(Duration::ZERO);

        tokio::time::sleep(duration).await;

        if target.path() == "/fail" {
            return Err(TransportError::Request("connection refused".into()));
        }
        Ok(Bytes::from(format!("delayed {delay}")))
    }
}

#[derive(Debug)]
pub struct PanickingTransport;

#[async_trait]
impl Transport for PanickingTransport {
    async fn get(&self, _target: &Url) -> Result<Bytes, TransportError> {
        panic!("transport blew up");
    }
}

pub fn slow_spec(delay: &str) -> CallSpec {
    let target = Url::parse(&format!("http://backend.test/slow/get?delay={delay}"))
        .expect("valid test url");
    CallSpec::new(target)
}
