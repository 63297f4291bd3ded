//! Per-subscriber send capability.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Status;

use super::SendError;

/// Sends one record to one subscriber.
#[tonic::async_trait]
pub trait RecordSink<T>: Send + Sync {
    async fn send(&self, record: T) -> Result<(), SendError>;
}

/// Sink feeding a server-streaming gRPC response.
///
/// The paired [`ReceiverStream`] is handed to tonic as the response body.
/// When the client goes away tonic drops that stream, and the next send
/// reports [`SendError::Closed`].
pub struct StreamSink<T> {
    tx: mpsc::Sender<Result<T, Status>>,
    timeout: Duration,
}

impl<T> StreamSink<T> {
    /// Create a sink and the response stream it feeds.
    pub fn channel(buffer: usize, timeout: Duration) -> (Self, ReceiverStream<Result<T, Status>>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx, timeout }, ReceiverStream::new(rx))
    }
}

#[tonic::async_trait]
impl<T: Send + 'static> RecordSink<T> for StreamSink<T> {
    async fn send(&self, record: T) -> Result<(), SendError> {
        self.tx
            .send_timeout(Ok(record), self.timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => SendError::Timeout(self.timeout),
                SendTimeoutError::Closed(_) => SendError::Closed,
            })
    }
}
