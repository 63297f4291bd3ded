//! Configuration resolution for the SentryFlow operator.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Config file (TOML, passed with `--config`)
//! 3. Environment variables (`SENTRYFLOW_*`)
//! 4. CLI arguments (highest priority, applied by the binary)
//!
//! Configuration is read once at startup; there is no hot reload.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete operator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Listen address for the collector (agent-facing) gRPC service.
    pub collector_addr: SocketAddr,
    /// Listen address for the exporter (subscriber-facing) gRPC service.
    pub exporter_addr: SocketAddr,
    /// Capacity of each per-kind record channel. Producers wait once it is full.
    pub channel_capacity: usize,
    /// Per-subscriber buffer between the broadcast sender and the response stream.
    pub subscriber_buffer: usize,
    /// Write deadline for a single send to one subscriber.
    pub send_timeout_ms: u64,
    /// Send attempts per subscriber per broadcast before it is pruned.
    pub send_attempts: u32,
    /// Upper bound on draining in-flight gRPC calls at shutdown.
    pub shutdown_grace_secs: u64,
    /// Period for aggregating metrics (consumed by downstream exporters).
    pub aggregation_period_secs: u64,
    /// Period for cleaning up outdated metrics (consumed by downstream exporters).
    pub cleanup_period_secs: u64,
    /// Enable debug logging.
    pub debug: bool,
    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            collector_addr: SocketAddr::from(([0, 0, 0, 0], 5317)),
            exporter_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            channel_capacity: 1,
            subscriber_buffer: 64,
            send_timeout_ms: 5_000,
            send_attempts: 1,
            shutdown_grace_secs: 10,
            aggregation_period_secs: 1,
            cleanup_period_secs: 5,
            debug: false,
            log_json: false,
        }
    }
}

impl OperatorConfig {
    /// Write deadline for one subscriber send.
    pub const fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Grace period for draining gRPC calls at shutdown.
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Default `RUST_LOG` filter derived from the debug flag.
    pub fn log_filter(&self) -> String {
        let level = if self.debug { "debug" } else { "info" };
        format!("sentryflow_operator={level},sentryflow_core={level}")
    }

    /// Reject settings the relay cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(Error::Config("channel_capacity must be at least 1".into()));
        }
        if self.subscriber_buffer == 0 {
            return Err(Error::Config("subscriber_buffer must be at least 1".into()));
        }
        if self.send_timeout_ms == 0 {
            return Err(Error::Config("send_timeout_ms must be positive".into()));
        }
        if self.send_attempts == 0 {
            return Err(Error::Config("send_attempts must be at least 1".into()));
        }
        if self.collector_addr == self.exporter_addr && self.collector_addr.port() != 0 {
            return Err(Error::Config(format!(
                "collector and exporter cannot share {}",
                self.collector_addr
            )));
        }
        Ok(())
    }
}

/// Load configuration with hierarchical resolution (defaults, file, env).
pub fn load_config(config_file: Option<&Path>) -> Result<OperatorConfig> {
    let mut config = match config_file {
        Some(path) => load_config_file(path)?,
        None => OperatorConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    Ok(config)
}

fn load_config_file(path: &Path) -> Result<OperatorConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn parse_env<T: std::str::FromStr>(key: &str, val: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    val.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {key}: {e}")))
}

/// Apply `SENTRYFLOW_*` overrides. `lookup` abstracts the environment so tests
/// don't have to mutate process state.
fn apply_env_overrides<F>(config: &mut OperatorConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("SENTRYFLOW_COLLECTOR_ADDR") {
        config.collector_addr = parse_env("SENTRYFLOW_COLLECTOR_ADDR", &val)?;
    }
    if let Some(val) = lookup("SENTRYFLOW_EXPORTER_ADDR") {
        config.exporter_addr = parse_env("SENTRYFLOW_EXPORTER_ADDR", &val)?;
    }
    if let Some(val) = lookup("SENTRYFLOW_CHANNEL_CAPACITY") {
        config.channel_capacity = parse_env("SENTRYFLOW_CHANNEL_CAPACITY", &val)?;
    }
    if let Some(val) = lookup("SENTRYFLOW_SEND_TIMEOUT_MS") {
        config.send_timeout_ms = parse_env("SENTRYFLOW_SEND_TIMEOUT_MS", &val)?;
    }
    if let Some(val) = lookup("SENTRYFLOW_SEND_ATTEMPTS") {
        config.send_attempts = parse_env("SENTRYFLOW_SEND_ATTEMPTS", &val)?;
    }
    if let Some(val) = lookup("SENTRYFLOW_AGGREGATION_PERIOD") {
        config.aggregation_period_secs = parse_env("SENTRYFLOW_AGGREGATION_PERIOD", &val)?;
    }
    if let Some(val) = lookup("SENTRYFLOW_CLEANUP_PERIOD") {
        config.cleanup_period_secs = parse_env("SENTRYFLOW_CLEANUP_PERIOD", &val)?;
    }
    if let Some(val) = lookup("SENTRYFLOW_DEBUG") {
        config.debug = parse_env("SENTRYFLOW_DEBUG", &val)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn default_config_matches_legacy_ports() {
        let config = OperatorConfig::default();
        assert_eq!(config.collector_addr.port(), 5317);
        assert_eq!(config.exporter_addr.port(), 8080);
        assert_eq!(config.send_attempts, 1);
        assert_eq!(config.channel_capacity, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "exporter_addr = \"127.0.0.1:9090\"\nsend_attempts = 3").unwrap();

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.exporter_addr, "127.0.0.1:9090".parse().unwrap());
        assert_eq!(config.send_attempts, 3);
        assert_eq!(config.collector_addr.port(), 5317);
    }

    #[test]
    fn malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "send_attempts = \"many\"").unwrap();

        let err = load_config_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let env: HashMap<&str, &str> = [
            ("SENTRYFLOW_COLLECTOR_ADDR", "127.0.0.1:6000"),
            ("SENTRYFLOW_DEBUG", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = OperatorConfig::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(ToString::to_string)).unwrap();

        assert_eq!(config.collector_addr, "127.0.0.1:6000".parse().unwrap());
        assert!(config.debug);
        assert!(config.log_filter().contains("=debug"));
    }

    #[test]
    fn bad_env_value_is_rejected() {
        let mut config = OperatorConfig::default();
        let err = apply_env_overrides(&mut config, |k| {
            (k == "SENTRYFLOW_SEND_ATTEMPTS").then(|| "zero".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("SENTRYFLOW_SEND_ATTEMPTS"));
    }

    #[test]
    fn validate_rejects_zero_attempts_and_shared_addr() {
        let config = OperatorConfig {
            send_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let addr: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        let config = OperatorConfig {
            collector_addr: addr,
            exporter_addr: addr,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn ephemeral_ports_may_repeat() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let config = OperatorConfig {
            collector_addr: addr,
            exporter_addr: addr,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
