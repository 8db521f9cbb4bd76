//! ImpactSoluce resilient fetch tool.
//!
//! Sends GET requests through the same retry and circuit breaker layer the
//! application uses, then prints a JSON report of every response and the
//! final state of each circuit.
//!
//! ```text
//! impact-resilience --config resilience.toml --service reports \
//!     https://api.example.com/reports https://api.example.com/health
//! ```

use std::path::PathBuf;

use clap::Parser;
use futures_util::future::join_all;
use serde_json::{json, Value};

use impact_resilience::config::{load_config, ResilienceConfig};
use impact_resilience::observability::{logging, metrics};
use impact_resilience::{ResilienceOptions, ResilienceRegistry};

#[derive(Parser)]
#[command(name = "impact-resilience")]
#[command(about = "Fetch URLs through the ImpactSoluce retry and circuit breaker layer", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service name whose circuit breaker guards the requests
    #[arg(short, long, default_value = "default")]
    service: String,

    /// Expose Prometheus metrics on the configured address and keep serving
    /// them after the report until Ctrl+C
    #[arg(long)]
    metrics: bool,

    /// URLs to fetch
    #[arg(required = true)]
    urls: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ResilienceConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(service = %cli.service, urls = cli.urls.len(), "impact-resilience starting");

    let mut serving_metrics = false;
    if cli.metrics || config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            serving_metrics = metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let registry = ResilienceRegistry::from_config(&config);
    let client = reqwest::Client::new();
    let options = ResilienceOptions::default();

    let results = join_all(
        cli.urls
            .iter()
            .map(|url| fetch_one(&registry, &client, &cli.service, url, &options)),
    )
    .await;

    let circuits: Vec<Value> = registry
        .snapshot_all()
        .into_iter()
        .map(|(service, snapshot)| json!({ "service": service, "circuit": snapshot }))
        .collect();

    let report = json!({ "results": results, "circuits": circuits });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if serving_metrics {
        tracing::info!(
            metrics_address = %config.observability.metrics_address,
            "Serving metrics until Ctrl+C"
        );
        shutdown_signal().await?;
    }
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    Ok(())
}

async fn fetch_one(
    registry: &ResilienceRegistry,
    client: &reqwest::Client,
    service: &str,
    url: &str,
    options: &ResilienceOptions,
) -> Value {
    let request = match client.get(url).build() {
        Ok(request) => request,
        Err(e) => return json!({ "url": url, "error": e.to_string(), "kind": "invalid_request" }),
    };

    match registry.fetch_with_resilience(service, client, request, options).await {
        Ok(response) => {
            let status = response.status();
            json!({ "url": url, "status": status.as_u16(), "ok": status.is_success() })
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Fetch failed");
            json!({ "url": url, "error": e.to_string(), "kind": e.kind() })
        }
    }
}
