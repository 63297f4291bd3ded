//! Live subscriber list for one record kind.
//!
//! There is no unsubscribe call. A subscriber is removed the first time a
//! broadcast fails to reach it, or when the registry is closed at shutdown.

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use sentryflow_proto::v1::ClientInfo;

use super::{RecordKind, RecordSink, RelayError, SendError};

/// One downstream connection.
pub struct Subscriber<T> {
    id: Uuid,
    client: ClientInfo,
    sink: Box<dyn RecordSink<T>>,
}

impl<T> Subscriber<T> {
    pub fn new(client: ClientInfo, sink: impl RecordSink<T> + 'static) -> Self {
        Self {
            id: Uuid::new_v4(),
            client,
            sink: Box::new(sink),
        }
    }
}

/// Result of one fan-out pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastOutcome {
    /// Subscribers present when the broadcast started.
    pub attempted: usize,
    /// Subscribers pruned because every send attempt failed.
    pub failed: usize,
}

struct State<T> {
    subscribers: Vec<Subscriber<T>>,
    closed: bool,
}

/// Subscribers of one kind behind a single lock.
///
/// The lock is held for a whole broadcast pass, so a registration never
/// interleaves with a fan-out and readers never see a half-pruned list.
pub struct SubscriberRegistry<T> {
    kind: RecordKind,
    send_attempts: u32,
    state: Mutex<State<T>>,
}

impl<T: Clone + Send + 'static> SubscriberRegistry<T> {
    pub fn new(kind: RecordKind, send_attempts: u32) -> Self {
        Self {
            kind,
            send_attempts: send_attempts.max(1),
            state: Mutex::new(State {
                subscribers: Vec::new(),
                closed: false,
            }),
        }
    }

    /// Add a subscriber. It receives records broadcast after this returns.
    pub async fn register(&self, subscriber: Subscriber<T>) -> Result<Uuid, RelayError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(RelayError::Closed(self.kind));
        }
        let id = subscriber.id;
        info!(
            kind = %self.kind,
            subscriber_id = %id,
            hostname = %subscriber.client.hostname,
            ip_address = %subscriber.client.ip_address,
            "Subscriber registered"
        );
        state.subscribers.push(subscriber);
        Ok(id)
    }

    /// Send `record` to every subscriber, pruning those that fail.
    pub async fn broadcast(&self, record: &T) -> BroadcastOutcome {
        let mut state = self.state.lock().await;
        let current = std::mem::take(&mut state.subscribers);
        let attempted = current.len();
        let mut live = Vec::with_capacity(attempted);

        for subscriber in current {
            match self.deliver(&subscriber, record).await {
                Ok(()) => live.push(subscriber),
                Err(e) => warn!(
                    kind = %self.kind,
                    subscriber_id = %subscriber.id,
                    hostname = %subscriber.client.hostname,
                    ip_address = %subscriber.client.ip_address,
                    error = %e,
                    "Pruning subscriber after failed send"
                ),
            }
        }

        let failed = attempted - live.len();
        state.subscribers = live;
        if failed > 0 {
            debug!(kind = %self.kind, attempted, failed, "Broadcast finished with failures");
        }
        BroadcastOutcome { attempted, failed }
    }

    async fn deliver(&self, subscriber: &Subscriber<T>, record: &T) -> Result<(), SendError> {
        let mut attempt = 1;
        loop {
            match subscriber.sink.send(record.clone()).await {
                Ok(()) => return Ok(()),
                // A closed stream never reopens.
                Err(SendError::Closed) => return Err(SendError::Closed),
                Err(e) if attempt >= self.send_attempts => return Err(e),
                Err(e) => {
                    debug!(
                        kind = %self.kind,
                        subscriber_id = %subscriber.id,
                        attempt,
                        error = %e,
                        "Retrying send"
                    );
                    attempt += 1;
                }
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.subscribers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every subscriber, ending their response streams, and refuse
    /// further registrations.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;
        let dropped = state.subscribers.len();
        state.subscribers.clear();
        if dropped > 0 {
            info!(kind = %self.kind, dropped, "Subscriber registry closed");
        }
    }
}
