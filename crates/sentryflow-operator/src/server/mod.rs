//! gRPC server implementations for the operator.

pub mod collector_svc;
pub mod exporter_svc;
pub mod grpc_util;

#[cfg(test)]
mod collector_svc_tests;
#[cfg(test)]
pub(crate) mod test_helpers;

pub use collector_svc::CollectorServiceImpl;
pub use exporter_svc::ExporterServiceImpl;
