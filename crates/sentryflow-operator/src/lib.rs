//! `SentryFlow` Operator Library
//!
//! Central relay between cluster agents and downstream exporters:
//! - Generic per-kind relay (channel, dispatch loop, subscriber registry)
//! - IP → Service index and API log processing
//! - gRPC collector and exporter services
//! - Lifecycle controller that starts and stops all of the above

pub mod index;
pub mod lifecycle;
pub mod processor;
pub mod relay;
pub mod server;
mod telemetry;

pub use lifecycle::{Operator, OperatorError};
pub use relay::{RecordKind, RelayError};
