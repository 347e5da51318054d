//! shellgauge — exposes the output of shell commands as Prometheus gauges.
//!
//! Every configured probe is a shell command whose stdout is parsed as a
//! float and served on `/metrics`. Probes that fail or print non-numeric
//! output are withdrawn from the exposition until they recover; only the
//! latest sample per probe is ever retained.

mod config;
mod registry;
mod sampler;
mod server;

use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use config::Config;
use registry::GaugeRegistry;
use sampler::ProbeEntry;

/// Exposes the output of shell commands as Prometheus gauges
#[derive(Parser, Debug)]
#[command(name = "shellgauge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: PathBuf,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::ERROR
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // ── 1. Load and validate configuration ───────────────────────
    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;

    let port = config.port;
    let period = Duration::from_secs(config.update_period_sec);

    // ── 2. Build shared registry and one entry per probe ─────────
    let registry = Arc::new(GaugeRegistry::new());
    let entries: Vec<ProbeEntry> = config.metrics.into_iter().map(ProbeEntry::new).collect();

    // ── 3. Bind the exposition endpoint ──────────────────────────
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;

    debug!(
        "running on port {} with update period {}s",
        port,
        period.as_secs()
    );

    // ── 4. Serve scrapes while the update loop samples forever ───
    let app = server::create_router(registry.clone());

    tokio::select! {
        res = axum::serve(listener, app).into_future() => res.context("metrics server exited")?,
        res = sampler::run(entries, period, registry) => res.context("update loop aborted")?,
    }

    Ok(())
}
