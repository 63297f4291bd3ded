//! Per-kind dispatch loop.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::{RecordKind, SubscriberRegistry};
use crate::telemetry;

/// Hook applied to each record after it is dequeued and before broadcast.
#[tonic::async_trait]
pub trait RecordProcessor<T>: Send + Sync {
    async fn process(&self, record: T) -> T;
}

/// Processor that forwards records unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

#[tonic::async_trait]
impl<T: Send + 'static> RecordProcessor<T> for Passthrough {
    async fn process(&self, record: T) -> T {
        record
    }
}

/// Handle to a running dispatch loop.
pub struct DispatchHandle {
    kind: RecordKind,
    stop: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl DispatchHandle {
    pub const fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Deliver the stop notification and return the loop's join handle.
    pub fn stop(self) -> JoinHandle<()> {
        // The loop may already be gone; the join handle reports that.
        let _ = self.stop.send(());
        self.join
    }
}

/// Spawn the loop that drains `rx` into `registry`.
///
/// The loop waits on either the stop signal or the next record. It holds at
/// most one record in flight and exits as soon as it is told to stop,
/// dropping `rx` so blocked producers see the relay as closed.
pub fn spawn_dispatch<T>(
    kind: RecordKind,
    mut rx: mpsc::Receiver<T>,
    registry: Arc<SubscriberRegistry<T>>,
    processor: Arc<dyn RecordProcessor<T>>,
) -> DispatchHandle
where
    T: Clone + Send + Sync + 'static,
{
    let (stop, mut stop_rx) = oneshot::channel::<()>();

    let join = tokio::spawn(async move {
        debug!(kind = %kind, "Dispatch loop started");
        loop {
            tokio::select! {
                biased;
                _ = &mut stop_rx => {
                    break;
                }
                next = rx.recv() => {
                    let Some(record) = next else {
                        error!(kind = %kind, "Record channel closed while dispatch loop was running");
                        break;
                    };
                    let record = processor.process(record).await;
                    let outcome = registry.broadcast(&record).await;
                    telemetry::record_broadcast(kind, outcome);
                }
            }
        }
        info!(kind = %kind, "Dispatch loop stopped");
    });

    DispatchHandle { kind, stop, join }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use sentryflow_proto::v1::ClientInfo;

    use super::*;
    use crate::relay::{RecordChannel, StreamSink, Subscriber};
    use tokio_stream::StreamExt;

    struct Doubler;

    #[tonic::async_trait]
    impl RecordProcessor<u32> for Doubler {
        async fn process(&self, record: u32) -> u32 {
            record * 2
        }
    }

    #[tokio::test]
    async fn processes_then_broadcasts() {
        let registry = Arc::new(SubscriberRegistry::new(RecordKind::ApiLog, 1));
        let (sink, mut stream) = StreamSink::channel(8, Duration::from_secs(1));
        registry
            .register(Subscriber::new(ClientInfo::default(), sink))
            .await
            .unwrap();

        let (channel, rx) = RecordChannel::new(RecordKind::ApiLog, 1);
        let handle = spawn_dispatch(RecordKind::ApiLog, rx, Arc::clone(&registry), Arc::new(Doubler));

        channel.insert(21).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), 42);

        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_ends_loop_and_closes_channel() {
        let registry = Arc::new(SubscriberRegistry::<u32>::new(RecordKind::PodAdd, 1));
        let (channel, rx) = RecordChannel::new(RecordKind::PodAdd, 1);
        let handle = spawn_dispatch(RecordKind::PodAdd, rx, registry, Arc::new(Passthrough));
        assert_eq!(handle.kind(), RecordKind::PodAdd);

        let join = handle.stop();
        tokio::time::timeout(Duration::from_secs(1), join)
            .await
            .expect("loop should exit promptly")
            .unwrap();

        assert!(channel.insert(1).await.is_err());
    }
}
