//! Producer-side handle onto a relay's dispatch queue.

use tokio::sync::mpsc;

use super::{RecordKind, RelayError};

/// Bounded queue between collector handlers and the dispatch loop.
///
/// `insert` waits for capacity, so a slow fan-out throttles ingestion
/// instead of buffering without limit. FIFO holds per producer only.
pub struct RecordChannel<T> {
    kind: RecordKind,
    tx: mpsc::Sender<T>,
}

impl<T> Clone for RecordChannel<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            tx: self.tx.clone(),
        }
    }
}

impl<T: Send> RecordChannel<T> {
    /// Create the channel and the receiver the dispatch loop drains.
    pub fn new(kind: RecordKind, capacity: usize) -> (Self, mpsc::Receiver<T>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { kind, tx }, rx)
    }

    /// Hand a record to the dispatch loop, waiting while the queue is full.
    pub async fn insert(&self, record: T) -> Result<(), RelayError> {
        self.tx
            .send(record)
            .await
            .map_err(|_| RelayError::Closed(self.kind))
    }

    pub const fn kind(&self) -> RecordKind {
        self.kind
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn insert_blocks_while_consumer_is_paused() {
        let (channel, mut rx) = RecordChannel::new(RecordKind::ApiLog, 1);
        channel.insert(1u32).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), channel.insert(2)).await;
        assert!(blocked.is_err(), "second insert should wait for the consumer");

        assert_eq!(rx.recv().await, Some(1));
        tokio::time::timeout(Duration::from_millis(50), channel.insert(3))
            .await
            .expect("insert should proceed once the consumer drains")
            .unwrap();
        assert_eq!(rx.recv().await, Some(3));
    }

    #[tokio::test]
    async fn insert_after_consumer_drop_is_closed() {
        let (channel, rx) = RecordChannel::<u32>::new(RecordKind::PodDelete, 1);
        drop(rx);
        assert_eq!(
            channel.insert(1).await,
            Err(RelayError::Closed(RecordKind::PodDelete))
        );
    }

    #[tokio::test]
    async fn waiting_producer_is_released_when_consumer_stops() {
        let (channel, rx) = RecordChannel::new(RecordKind::ApiLog, 1);
        channel.insert(1u32).await.unwrap();

        let producer = {
            let channel = channel.clone();
            tokio::spawn(async move { channel.insert(2).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(rx);

        let result = producer.await.unwrap();
        assert_eq!(result, Err(RelayError::Closed(RecordKind::ApiLog)));
    }
}
