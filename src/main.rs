//! Deadline-bounded sub-request fan-out service.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                 DEADLINE FANOUT                   │
//!                         │                                                   │
//!   GET /subrequests/*    │  ┌─────────┐   ┌──────────┐   ┌───────────────┐  │
//!   ?timeout=700ms ───────┼─▶│  http   │──▶│ handlers │──▶│ orchestrator  │  │
//!                         │  │ server  │   │ (ctx per │   │ serial /      │  │
//!                         │  └─────────┘   │ request) │   │ concurrent    │  │
//!                         │                └──────────┘   └──────┬────────┘  │
//!                         │                                      │ one task   │
//!                         │                                      ▼ per call   │
//!                         │                               ┌───────────────┐  │
//!   report ◀──────────────┼───────────────────────────────│ transport     │──┼──▶ GET /slow/get
//!                         │                               │ (hyper)       │  │
//!                         │                               └───────────────┘  │
//!                         │  ┌────────────────────────────────────────────┐  │
//!                         │  │ context (deadline + cancel)  │ config      │  │
//!                         │  │ observability                │ lifecycle   │  │
//!                         │  └────────────────────────────────────────────┘  │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use deadline_fanout::config::{load_config, ServiceConfig};
use deadline_fanout::http::HttpServer;
use deadline_fanout::lifecycle::{signals, Shutdown};
use deadline_fanout::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "deadline-fanout")]
#[command(about = "Sub-request fan-out bounded by caller deadlines", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.logging)?;

    tracing::info!("deadline-fanout v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_url = %config.subrequests.base_url,
        log_backend = ?config.logging.backend,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, shutdown.context())?;
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        () = signals::shutdown_signal() => {}
        joined = &mut server_task => {
            joined??;
            return Ok(());
        }
    }
    shutdown.trigger();

    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
