//! `SentryFlow` Operator
//!
//! Accepts records from cluster agents and fans them out to exporters.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use sentryflow_core::{OperatorConfig, load_config};
use sentryflow_operator::Operator;

#[derive(Parser, Debug)]
#[command(name = "sentryflow-operator")]
#[command(version, about = "SentryFlow operator - telemetry and cluster-event relay")]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "SENTRYFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Collector (agent-facing) listen address
    #[arg(long)]
    collector_addr: Option<SocketAddr>,

    /// Exporter (subscriber-facing) listen address
    #[arg(long)]
    exporter_addr: Option<SocketAddr>,

    /// Send attempts per subscriber before it is pruned (3 restores the legacy behaviour)
    #[arg(long)]
    send_attempts: Option<u32>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Output logs as JSON (for structured log aggregation)
    #[arg(long, env = "SENTRYFLOW_LOG_JSON")]
    log_json: bool,

    /// OTLP endpoint for traces and relay counters
    #[cfg(feature = "metrics")]
    #[arg(long, env = "SENTRYFLOW_OTLP_ENDPOINT", default_value = "http://localhost:4317")]
    otlp_endpoint: String,
}

impl Args {
    /// CLI flags take priority over file and environment values.
    fn apply(&self, config: &mut OperatorConfig) {
        if let Some(addr) = self.collector_addr {
            config.collector_addr = addr;
        }
        if let Some(addr) = self.exporter_addr {
            config.exporter_addr = addr;
        }
        if let Some(attempts) = self.send_attempts {
            config.send_attempts = attempts;
        }
        config.debug |= self.debug;
        config.log_json |= self.log_json;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).with_context(|| match &args.config {
        Some(path) => format!("failed to load config from {}", path.display()),
        None => "failed to load config from environment".to_string(),
    })?;
    args.apply(&mut config);

    #[cfg(feature = "metrics")]
    let metrics = {
        let guard = sentryflow_core::metrics::init_metrics(&args.otlp_endpoint)?;
        sentryflow_core::tracing_init::init_tracing_with_otel(
            &config.log_filter(),
            config.log_json,
            &guard,
        );
        guard
    };
    #[cfg(not(feature = "metrics"))]
    sentryflow_core::tracing_init::init_tracing(&config.log_filter(), config.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        collector_addr = %config.collector_addr,
        exporter_addr = %config.exporter_addr,
        send_attempts = config.send_attempts,
        aggregation_period_secs = config.aggregation_period_secs,
        cleanup_period_secs = config.cleanup_period_secs,
        "Starting sentryflow-operator"
    );

    let operator = Operator::start(config).await?;

    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    #[cfg(unix)]
    sd_notify::notify(false, &[sd_notify::NotifyState::Ready])?;

    #[cfg(unix)]
    let sigterm_future = sigterm.recv();
    #[cfg(not(unix))]
    let sigterm_future = std::future::pending::<Option<()>>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C shutdown signal");
        }
        _ = sigterm_future => {
            info!("Received SIGTERM shutdown signal");
        }
    }

    #[cfg(unix)]
    sd_notify::notify(false, &[sd_notify::NotifyState::Stopping])?;

    operator.stop().await;

    #[cfg(feature = "metrics")]
    metrics.shutdown()?;

    Ok(())
}
