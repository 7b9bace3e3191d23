//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use deadline_fanout::config::ServiceConfig;
use deadline_fanout::http::HttpServer;
use deadline_fanout::lifecycle::Shutdown;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A running service bound to an ephemeral local port.
///
/// Sub-requests are sent back to the same server's `slow/get` route.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    task: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }

    /// Trigger shutdown and wait (bounded) for the server to drain.
    #[allow(dead_code)]
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.task).await;
    }
}

/// Start the service with defaults adjusted by `configure`.
pub async fn start_server(configure: impl FnOnce(&mut ServiceConfig)) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = ServiceConfig::default();
    config.listener.bind_address = addr.to_string();
    config.subrequests.base_url = format!("http://{}/", addr);
    configure(&mut config);

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, shutdown.context()).unwrap();
    let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestServer {
        addr,
        shutdown,
        task,
    }
}

pub fn delays(millis: &[u64]) -> Vec<humantime_serde::Serde<Duration>> {
    millis
        .iter()
        .map(|ms| Duration::from_millis(*ms).into())
        .collect()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
