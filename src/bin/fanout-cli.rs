use clap::{Parser, Subcommand};
use reqwest::header::HeaderValue;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "fanout-cli")]
#[command(about = "Client for the deadline fan-out service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Ask for the JSON report instead of plain text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the service answers
    Ping,
    /// Call the slow endpoint directly
    Slow {
        #[arg(short, long, default_value = "300ms")]
        delay: String,
    },
    /// Run the serial sub-requests under a total timeout
    Serial {
        #[arg(short, long, default_value = "700ms")]
        timeout: String,
    },
    /// Run the concurrent sub-requests under a total timeout
    Concurrent {
        #[arg(short, long, default_value = "700ms")]
        timeout: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match &cli.command {
        Commands::Ping => client.get(format!("{}/ping", base)),
        Commands::Slow { delay } => client
            .get(format!("{}/slow/get", base))
            .query(&[("delay", delay)]),
        Commands::Serial { timeout } => client
            .get(format!("{}/subrequests/serial", base))
            .query(&[("timeout", timeout)]),
        Commands::Concurrent { timeout } => client
            .get(format!("{}/subrequests/concurrent", base))
            .query(&[("timeout", timeout)]),
    };
    let request = if cli.json {
        request.query(&[("format", "json")])
    } else {
        request
    };

    let res = request.send().await?;
    print_response(res).await?;
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let is_json = res
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v: &HeaderValue| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if let Some(id) = res.headers().get("x-request-id").and_then(|v| v.to_str().ok()) {
        eprintln!("Request ID: {}", id);
    }

    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
    }

    if is_json {
        let json: Value = res.json().await?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("{}", res.text().await?);
    }
    Ok(())
}
