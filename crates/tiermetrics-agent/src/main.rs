//! tiermetrics agent
//!
//! Loads `tiermetrics.yaml` (or the path given as the first argument), starts
//! the configured reporters, registers process gauges and runs until Ctrl-C.

use std::time::{Duration, Instant};

use tracing_subscriber::{fmt, EnvFilter};

use tiermetrics_agent::{config, metrics::Metrics};
use tiermetrics_core::{Level, MetricsError, Result};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "tiermetrics.yaml".into());
    if let Err(e) = run(&path).await {
        tracing::error!(error = %e, code = e.code().as_str(), "tiermetrics-agent failed");
        std::process::exit(1);
    }
}

async fn run(path: &str) -> Result<()> {
    let cfg = config::load_from_file(path)?;
    let metrics = Metrics::new(cfg).await?;

    let started = Instant::now();
    let registry = metrics.registry();
    registry.gauge("process.uptime.seconds", Level::Info, move || {
        started.elapsed().as_secs_f64()
    })?;
    registry.cached_gauge("process.cpus", Level::Debug, Duration::from_secs(10), || {
        std::thread::available_parallelism().map_or(0.0, |n| n.get() as f64)
    })?;

    metrics.activate().await;
    tracing::info!(config = %path, "tiermetrics-agent running");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| MetricsError::Internal(format!("signal handler failed: {e}")))?;

    metrics.deactivate().await;
    Ok(())
}
