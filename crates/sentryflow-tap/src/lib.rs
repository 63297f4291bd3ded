//! `SentryFlow` tap
//!
//! Minimal downstream subscriber for the operator's exporter service:
//! - Exporter connection handling
//! - Per-kind subscription streams
//! - NDJSON output

pub mod connection;
pub mod kind;
pub mod output;
pub mod subscribe;
