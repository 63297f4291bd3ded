//! Operator lifecycle: bind listeners, run dispatch loops and gRPC servers,
//! and tear everything down in order.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::transport::server::Router;
use tonic_health::server::HealthReporter;
use tracing::{debug, error, info, warn};

use sentryflow_core::OperatorConfig;
use sentryflow_proto::v1::collector_server::CollectorServer;
use sentryflow_proto::v1::exporter_server::ExporterServer;

use crate::index::IpIndex;
use crate::processor::ApiLogProcessor;
use crate::relay::{DispatchHandle, RecordKind, RelaySettings, Relays};
use crate::server::grpc_util::shutdown_signalled;
use crate::server::{CollectorServiceImpl, ExporterServiceImpl};

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] sentryflow_core::Error),
}

struct ServerTask {
    name: &'static str,
    handle: JoinHandle<Result<(), tonic::transport::Error>>,
}

/// A running operator. Dropping it without [`Operator::stop`] leaves the
/// servers running until the runtime shuts down.
pub struct Operator {
    relays: Arc<Relays>,
    index: Arc<IpIndex>,
    dispatchers: Vec<DispatchHandle>,
    servers: Vec<ServerTask>,
    health: HealthReporter,
    shutdown_tx: watch::Sender<bool>,
    serve_stop_tx: watch::Sender<bool>,
    collector_addr: SocketAddr,
    exporter_addr: SocketAddr,
    shutdown_grace: Duration,
}

async fn bind(addr: SocketAddr) -> Result<(TcpListener, SocketAddr), OperatorError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| OperatorError::Bind { addr, source })?;
    let local = listener
        .local_addr()
        .map_err(|source| OperatorError::Bind { addr, source })?;
    Ok((listener, local))
}

fn spawn_server(
    name: &'static str,
    router: Router,
    listener: TcpListener,
    mut stop: watch::Receiver<bool>,
) -> ServerTask {
    let handle = tokio::spawn(async move {
        router
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                shutdown_signalled(&mut stop).await;
            })
            .await
    });
    ServerTask { name, handle }
}

impl Operator {
    /// Bind both listeners, start every dispatch loop and both servers.
    ///
    /// Returns once the listeners are live and health reports `SERVING`.
    pub async fn start(config: OperatorConfig) -> Result<Self, OperatorError> {
        config.validate()?;

        let (collector_listener, collector_addr) = bind(config.collector_addr).await?;
        let (exporter_listener, exporter_addr) = bind(config.exporter_addr).await?;

        let (relays, receivers) = Relays::new(RelaySettings::from(&config));
        let relays = Arc::new(relays);
        let index = Arc::new(IpIndex::new());
        let processor = Arc::new(ApiLogProcessor::new(Arc::clone(&index)));
        let dispatchers = relays.spawn_dispatchers(receivers, processor);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (serve_stop_tx, _) = watch::channel(false);

        let (health, health_service) = tonic_health::server::health_reporter();
        health
            .set_serving::<CollectorServer<CollectorServiceImpl>>()
            .await;
        health
            .set_serving::<ExporterServer<ExporterServiceImpl>>()
            .await;

        let collector = CollectorServiceImpl::new(Arc::clone(&relays), Arc::clone(&index), shutdown_rx);
        let exporter = ExporterServiceImpl::new(Arc::clone(&relays));

        let collector_router = Server::builder()
            .http2_keepalive_interval(Some(KEEPALIVE_INTERVAL))
            .http2_keepalive_timeout(Some(KEEPALIVE_TIMEOUT))
            .add_service(health_service.clone())
            .add_service(CollectorServer::new(collector));
        let exporter_router = Server::builder()
            .http2_keepalive_interval(Some(KEEPALIVE_INTERVAL))
            .http2_keepalive_timeout(Some(KEEPALIVE_TIMEOUT))
            .add_service(health_service)
            .add_service(ExporterServer::new(exporter));

        let servers = vec![
            spawn_server(
                "collector",
                collector_router,
                collector_listener,
                serve_stop_tx.subscribe(),
            ),
            spawn_server(
                "exporter",
                exporter_router,
                exporter_listener,
                serve_stop_tx.subscribe(),
            ),
        ];

        info!(
            collector_addr = %collector_addr,
            exporter_addr = %exporter_addr,
            relays = dispatchers.len(),
            "Operator started"
        );

        Ok(Self {
            relays,
            index,
            dispatchers,
            servers,
            health,
            shutdown_tx,
            serve_stop_tx,
            collector_addr,
            exporter_addr,
            shutdown_grace: config.shutdown_grace(),
        })
    }

    pub const fn collector_addr(&self) -> SocketAddr {
        self.collector_addr
    }

    pub const fn exporter_addr(&self) -> SocketAddr {
        self.exporter_addr
    }

    pub fn relays(&self) -> &Arc<Relays> {
        &self.relays
    }

    pub fn index(&self) -> &Arc<IpIndex> {
        &self.index
    }

    pub async fn subscriber_count(&self, kind: RecordKind) -> usize {
        self.relays.subscriber_count(kind).await
    }

    /// Shut down in order: health and producer handlers, dispatch loops,
    /// subscriber streams, gRPC servers (bounded by the grace period), then
    /// wait for every dispatch loop to finish.
    pub async fn stop(self) {
        let Self {
            relays,
            dispatchers,
            servers,
            health,
            shutdown_tx,
            serve_stop_tx,
            shutdown_grace,
            ..
        } = self;

        info!("Stopping operator");
        health
            .set_not_serving::<CollectorServer<CollectorServiceImpl>>()
            .await;
        health
            .set_not_serving::<ExporterServer<ExporterServiceImpl>>()
            .await;
        let _ = shutdown_tx.send(true);

        // Exactly one stop notification per loop.
        let joins: Vec<_> = dispatchers
            .into_iter()
            .map(|handle| (handle.kind(), handle.stop()))
            .collect();

        relays.close_all().await;

        let _ = serve_stop_tx.send(true);
        let deadline = Instant::now() + shutdown_grace;
        for ServerTask { name, mut handle } in servers {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(Ok(()))) => debug!(server = name, "gRPC server drained"),
                Ok(Ok(Err(e))) => warn!(server = name, error = %e, "gRPC server exited with error"),
                Ok(Err(e)) => error!(server = name, error = %e, "gRPC server task failed"),
                Err(_) => {
                    warn!(
                        server = name,
                        grace_secs = shutdown_grace.as_secs(),
                        "gRPC server still busy after grace period, aborting"
                    );
                    handle.abort();
                }
            }
        }

        for (kind, join) in joins {
            if let Err(e) = join.await {
                error!(kind = %kind, error = %e, "Dispatch loop failed");
            }
        }

        info!("Operator stopped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn local_config() -> OperatorConfig {
        OperatorConfig {
            collector_addr: "127.0.0.1:0".parse().unwrap(),
            exporter_addr: "127.0.0.1:0".parse().unwrap(),
            shutdown_grace_secs: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn start_binds_ephemeral_ports_and_stops() {
        let operator = Operator::start(local_config()).await.unwrap();
        assert_ne!(operator.collector_addr().port(), 0);
        assert_ne!(operator.exporter_addr().port(), 0);
        assert_ne!(operator.collector_addr(), operator.exporter_addr());

        let relays = Arc::clone(operator.relays());
        tokio::time::timeout(Duration::from_secs(5), operator.stop())
            .await
            .expect("stop should finish within the grace period");

        assert!(relays.api_log.insert(Default::default()).await.is_err());
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();
        let config = OperatorConfig {
            collector_addr: addr,
            ..local_config()
        };

        let Err(err) = Operator::start(config).await else {
            panic!("binding an occupied port should fail");
        };
        assert!(matches!(err, OperatorError::Bind { addr: a, .. } if a == addr));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_binding() {
        let config = OperatorConfig {
            send_attempts: 0,
            ..local_config()
        };
        let Err(err) = Operator::start(config).await else {
            panic!("zero send attempts should be rejected");
        };
        assert!(matches!(err, OperatorError::Config(_)));
    }
}
