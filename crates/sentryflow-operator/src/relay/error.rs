//! Relay error types and their gRPC mapping.

use std::time::Duration;

use thiserror::Error;
use tonic::Status;

use super::RecordKind;

/// Errors surfaced by a relay to its callers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    /// The dispatch loop (or registry) for this kind has shut down.
    #[error("{0} relay is closed")]
    Closed(RecordKind),
}

impl From<RelayError> for Status {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Closed(_) => Self::unavailable(err.to_string()),
        }
    }
}

/// Failure to deliver one record to one subscriber.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SendError {
    /// The subscriber's response stream is gone.
    #[error("subscriber stream closed")]
    Closed,

    /// The subscriber did not accept the record within the write deadline.
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use tonic::Code;

    use super::*;

    #[test]
    fn closed_relay_is_unavailable() {
        let status: Status = RelayError::Closed(RecordKind::PodAdd).into();
        assert_eq!(status.code(), Code::Unavailable);
        assert!(status.message().contains("pod_add"));
    }
}
