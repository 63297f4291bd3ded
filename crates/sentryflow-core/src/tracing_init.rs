//! Shared tracing/logging initialization.
//!
//! Used by the operator binary: an env-filter plus human-readable or JSON
//! output on stdout.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env_filter(default_filter: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    )
}

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- default `RUST_LOG` value when the env-var is not set
///   (e.g. `"sentryflow_operator=info"`).
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let env_filter = env_filter(default_filter);
    if log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Same as [`init_tracing`], with spans also exported through the OTLP
/// pipeline held by `guard`.
#[cfg(feature = "metrics")]
pub fn init_tracing_with_otel(
    default_filter: &str,
    log_json: bool,
    guard: &crate::metrics::MetricsGuard,
) {
    let env_filter = env_filter(default_filter);
    if log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .with(guard.otel_layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .with(guard.otel_layer())
            .init();
    }
}
