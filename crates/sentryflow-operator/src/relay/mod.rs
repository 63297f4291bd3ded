//! Generic fan-in/fan-out relay.
//!
//! One [`Relay`] per [`RecordKind`]: collector handlers push into its
//! [`RecordChannel`], a dispatch loop drains the channel, and every record is
//! broadcast to the kind's [`SubscriberRegistry`]. [`Relays`] holds all
//! eleven instances.

mod channel;
mod dispatch;
mod error;
mod kind;
mod registry;
mod sink;

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tonic::Status;
use uuid::Uuid;

use sentryflow_core::OperatorConfig;
use sentryflow_proto::v1::{ApiLog, ClientInfo, Deploy, EnvoyMetrics, Pod, Service};

pub use channel::RecordChannel;
pub use dispatch::{DispatchHandle, Passthrough, RecordProcessor, spawn_dispatch};
pub use error::{RelayError, SendError};
pub use kind::RecordKind;
pub use registry::{BroadcastOutcome, Subscriber, SubscriberRegistry};
pub use sink::{RecordSink, StreamSink};

/// Response stream handed to tonic for one subscription.
pub type RecordStream<T> =
    Pin<Box<dyn tokio_stream::Stream<Item = Result<T, Status>> + Send + 'static>>;

/// Tunables shared by every relay instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySettings {
    pub channel_capacity: usize,
    pub subscriber_buffer: usize,
    pub send_timeout: Duration,
    pub send_attempts: u32,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from(&OperatorConfig::default())
    }
}

impl From<&OperatorConfig> for RelaySettings {
    fn from(config: &OperatorConfig) -> Self {
        Self {
            channel_capacity: config.channel_capacity,
            subscriber_buffer: config.subscriber_buffer,
            send_timeout: config.send_timeout(),
            send_attempts: config.send_attempts,
        }
    }
}

/// Channel plus subscriber registry for one record kind.
pub struct Relay<T> {
    channel: RecordChannel<T>,
    registry: Arc<SubscriberRegistry<T>>,
    settings: RelaySettings,
}

impl<T> Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Build the relay and the receiver its dispatch loop will drain.
    pub fn new(kind: RecordKind, settings: RelaySettings) -> (Self, mpsc::Receiver<T>) {
        let (channel, rx) = RecordChannel::new(kind, settings.channel_capacity);
        let registry = Arc::new(SubscriberRegistry::new(kind, settings.send_attempts));
        let relay = Self {
            channel,
            registry,
            settings,
        };
        (relay, rx)
    }

    pub const fn kind(&self) -> RecordKind {
        self.channel.kind()
    }

    /// Queue a record for broadcast.
    pub async fn insert(&self, record: T) -> Result<(), RelayError> {
        self.channel.insert(record).await?;
        crate::telemetry::record_ingested(self.kind());
        Ok(())
    }

    /// Register a subscriber and return the stream it will be fed through.
    ///
    /// The stream stays open until the subscriber is pruned or the relay
    /// shuts down.
    pub async fn subscribe(&self, client: ClientInfo) -> Result<(Uuid, RecordStream<T>), RelayError> {
        let (sink, stream) =
            StreamSink::channel(self.settings.subscriber_buffer, self.settings.send_timeout);
        let id = self.registry.register(Subscriber::new(client, sink)).await?;
        Ok((id, Box::pin(stream)))
    }

    pub const fn registry(&self) -> &Arc<SubscriberRegistry<T>> {
        &self.registry
    }

    /// Start the dispatch loop for this relay.
    pub fn spawn(
        &self,
        rx: mpsc::Receiver<T>,
        processor: Arc<dyn RecordProcessor<T>>,
    ) -> DispatchHandle {
        spawn_dispatch(self.kind(), rx, Arc::clone(&self.registry), processor)
    }
}

/// Kind-erased view used for bookkeeping across all relays.
#[tonic::async_trait]
pub trait RelayControl: Send + Sync {
    fn kind(&self) -> RecordKind;
    async fn subscriber_count(&self) -> usize;
    async fn close(&self);
}

#[tonic::async_trait]
impl<T> RelayControl for Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn kind(&self) -> RecordKind {
        self.channel.kind()
    }

    async fn subscriber_count(&self) -> usize {
        self.registry.len().await
    }

    async fn close(&self) {
        self.registry.close().await;
    }
}

/// Every relay the operator runs, one per [`RecordKind`].
pub struct Relays {
    pub api_log: Relay<ApiLog>,
    pub envoy_metrics: Relay<EnvoyMetrics>,
    pub deploy_add: Relay<Deploy>,
    pub deploy_update: Relay<Deploy>,
    pub deploy_delete: Relay<Deploy>,
    pub pod_add: Relay<Pod>,
    pub pod_update: Relay<Pod>,
    pub pod_delete: Relay<Pod>,
    pub service_add: Relay<Service>,
    pub service_update: Relay<Service>,
    pub service_delete: Relay<Service>,
}

/// Receivers matching [`Relays`], consumed when the dispatch loops start.
pub struct RelayReceivers {
    api_log: mpsc::Receiver<ApiLog>,
    envoy_metrics: mpsc::Receiver<EnvoyMetrics>,
    deploy_add: mpsc::Receiver<Deploy>,
    deploy_update: mpsc::Receiver<Deploy>,
    deploy_delete: mpsc::Receiver<Deploy>,
    pod_add: mpsc::Receiver<Pod>,
    pod_update: mpsc::Receiver<Pod>,
    pod_delete: mpsc::Receiver<Pod>,
    service_add: mpsc::Receiver<Service>,
    service_update: mpsc::Receiver<Service>,
    service_delete: mpsc::Receiver<Service>,
}

impl Relays {
    pub fn new(settings: RelaySettings) -> (Self, RelayReceivers) {
        let (api_log, api_log_rx) = Relay::new(RecordKind::ApiLog, settings);
        let (envoy_metrics, envoy_metrics_rx) = Relay::new(RecordKind::EnvoyMetrics, settings);
        let (deploy_add, deploy_add_rx) = Relay::new(RecordKind::DeployAdd, settings);
        let (deploy_update, deploy_update_rx) = Relay::new(RecordKind::DeployUpdate, settings);
        let (deploy_delete, deploy_delete_rx) = Relay::new(RecordKind::DeployDelete, settings);
        let (pod_add, pod_add_rx) = Relay::new(RecordKind::PodAdd, settings);
        let (pod_update, pod_update_rx) = Relay::new(RecordKind::PodUpdate, settings);
        let (pod_delete, pod_delete_rx) = Relay::new(RecordKind::PodDelete, settings);
        let (service_add, service_add_rx) = Relay::new(RecordKind::ServiceAdd, settings);
        let (service_update, service_update_rx) = Relay::new(RecordKind::ServiceUpdate, settings);
        let (service_delete, service_delete_rx) = Relay::new(RecordKind::ServiceDelete, settings);

        let relays = Self {
            api_log,
            envoy_metrics,
            deploy_add,
            deploy_update,
            deploy_delete,
            pod_add,
            pod_update,
            pod_delete,
            service_add,
            service_update,
            service_delete,
        };
        let receivers = RelayReceivers {
            api_log: api_log_rx,
            envoy_metrics: envoy_metrics_rx,
            deploy_add: deploy_add_rx,
            deploy_update: deploy_update_rx,
            deploy_delete: deploy_delete_rx,
            pod_add: pod_add_rx,
            pod_update: pod_update_rx,
            pod_delete: pod_delete_rx,
            service_add: service_add_rx,
            service_update: service_update_rx,
            service_delete: service_delete_rx,
        };
        (relays, receivers)
    }

    /// Start one dispatch loop per kind. Only API logs get a processor.
    pub fn spawn_dispatchers(
        &self,
        receivers: RelayReceivers,
        api_log_processor: Arc<dyn RecordProcessor<ApiLog>>,
    ) -> Vec<DispatchHandle> {
        vec![
            self.api_log.spawn(receivers.api_log, api_log_processor),
            self.envoy_metrics.spawn(receivers.envoy_metrics, Arc::new(Passthrough)),
            self.deploy_add.spawn(receivers.deploy_add, Arc::new(Passthrough)),
            self.deploy_update.spawn(receivers.deploy_update, Arc::new(Passthrough)),
            self.deploy_delete.spawn(receivers.deploy_delete, Arc::new(Passthrough)),
            self.pod_add.spawn(receivers.pod_add, Arc::new(Passthrough)),
            self.pod_update.spawn(receivers.pod_update, Arc::new(Passthrough)),
            self.pod_delete.spawn(receivers.pod_delete, Arc::new(Passthrough)),
            self.service_add.spawn(receivers.service_add, Arc::new(Passthrough)),
            self.service_update.spawn(receivers.service_update, Arc::new(Passthrough)),
            self.service_delete.spawn(receivers.service_delete, Arc::new(Passthrough)),
        ]
    }

    /// All relays, in [`RecordKind::ALL`] order.
    pub fn all(&self) -> [&dyn RelayControl; 11] {
        [
            &self.api_log,
            &self.envoy_metrics,
            &self.deploy_add,
            &self.deploy_update,
            &self.deploy_delete,
            &self.pod_add,
            &self.pod_update,
            &self.pod_delete,
            &self.service_add,
            &self.service_update,
            &self.service_delete,
        ]
    }

    pub fn get(&self, kind: RecordKind) -> &dyn RelayControl {
        match kind {
            RecordKind::ApiLog => &self.api_log,
            RecordKind::EnvoyMetrics => &self.envoy_metrics,
            RecordKind::DeployAdd => &self.deploy_add,
            RecordKind::DeployUpdate => &self.deploy_update,
            RecordKind::DeployDelete => &self.deploy_delete,
            RecordKind::PodAdd => &self.pod_add,
            RecordKind::PodUpdate => &self.pod_update,
            RecordKind::PodDelete => &self.pod_delete,
            RecordKind::ServiceAdd => &self.service_add,
            RecordKind::ServiceUpdate => &self.service_update,
            RecordKind::ServiceDelete => &self.service_delete,
        }
    }

    pub async fn subscriber_count(&self, kind: RecordKind) -> usize {
        self.get(kind).subscriber_count().await
    }

    /// Close every registry, ending all exporter streams.
    pub async fn close_all(&self) {
        for relay in self.all() {
            relay.close().await;
        }
    }
}
