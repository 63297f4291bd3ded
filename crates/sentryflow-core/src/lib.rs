//! `SentryFlow` Core Library
//!
//! Shared functionality for `SentryFlow` components:
//! - Operator configuration resolution (defaults, file, environment)
//! - Tracing initialisation
//! - Optional `OpenTelemetry` export behind the `metrics` feature

pub mod config;
pub mod error;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod tracing_init;

pub use config::{OperatorConfig, load_config};
pub use error::{Error, Result};
