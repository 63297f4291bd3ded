//! SentryFlow Protocol Buffers
//!
//! Generated protobuf code for the SentryFlow operator gRPC API.
//!
//! This crate contains:
//! - `Collector` for agent → operator ingestion
//! - `Exporter` for operator → downstream fan-out
//! - the record messages shared by both (`ApiLog`, `EnvoyMetrics`, `Deploy`,
//!   `Pod`, `Service`)

#![allow(clippy::derive_partial_eq_without_eq)]

pub mod methods;

/// SentryFlow v1 API definitions.
///
/// All generated types and services are included here.
pub mod v1 {
    tonic::include_proto!("sentryflow.v1");
}

// Re-export v1 as the default API version for convenience
pub use v1::*;
