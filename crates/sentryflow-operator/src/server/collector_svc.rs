//! Collector gRPC service: agents push records into the relays.

use std::sync::Arc;

use tokio::sync::watch;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, instrument, warn};

use sentryflow_proto::methods::{
    METHOD_ADD_DEPLOY_EVENT, METHOD_ADD_POD_EVENT, METHOD_ADD_SVC_EVENT,
    METHOD_DELETE_DEPLOY_EVENT, METHOD_DELETE_POD_EVENT, METHOD_DELETE_SVC_EVENT,
    METHOD_GIVE_API_LOG, METHOD_GIVE_ENVOY_METRICS, METHOD_UPDATE_DEPLOY_EVENT,
    METHOD_UPDATE_POD_EVENT, METHOD_UPDATE_SVC_EVENT,
};
use sentryflow_proto::v1::collector_server::Collector;
use sentryflow_proto::v1::{Ack, ApiLog, Deploy, EnvoyMetrics, Pod, Service};

use crate::index::IpIndex;
use crate::relay::{Relay, Relays};
use crate::server::grpc_util::{is_peer_disconnect, shutdown_signalled};

/// `Ack.code` for an accepted request.
pub const ACK_OK: i32 = 0;

pub struct CollectorServiceImpl {
    relays: Arc<Relays>,
    index: Arc<IpIndex>,
    shutdown: watch::Receiver<bool>,
}

impl CollectorServiceImpl {
    pub const fn new(
        relays: Arc<Relays>,
        index: Arc<IpIndex>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            relays,
            index,
            shutdown,
        }
    }
}

fn ack() -> Response<Ack> {
    Response::new(Ack { code: ACK_OK })
}

/// Push one unary event into its relay.
async fn ingest<T>(relay: &Relay<T>, record: T) -> Result<Response<Ack>, Status>
where
    T: Clone + Send + Sync + 'static,
{
    relay.insert(record).await?;
    Ok(ack())
}

/// Drain a producer stream into `relay` until the agent closes it, the
/// transport fails, or the operator shuts down.
async fn drain_stream<T>(
    relay: &Relay<T>,
    mut stream: Streaming<T>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<Response<Ack>, Status>
where
    T: Clone + Send + Sync + 'static,
{
    let kind = relay.kind();
    let mut received = 0u64;

    loop {
        let next = tokio::select! {
            () = shutdown_signalled(&mut shutdown) => {
                info!(kind = %kind, received, "Closing producer stream for shutdown");
                return Ok(ack());
            }
            next = stream.message() => next,
        };

        match next {
            Ok(Some(record)) => {
                relay.insert(record).await?;
                received += 1;
            }
            Ok(None) => {
                debug!(kind = %kind, received, "Producer closed stream");
                return Ok(ack());
            }
            Err(status) => {
                if is_peer_disconnect(&status) {
                    info!(kind = %kind, received, "Producer disconnected");
                } else {
                    warn!(kind = %kind, received, error = %status, "Producer stream failed");
                }
                return Err(status);
            }
        }
    }
}

fn log_deploy(event: &str, deploy: &Deploy) {
    info!(
        action = event,
        cluster = %deploy.cluster,
        namespace = %deploy.namespace,
        name = %deploy.name,
        "Deploy event"
    );
}

fn log_pod(event: &str, pod: &Pod) {
    info!(
        action = event,
        cluster = %pod.cluster,
        namespace = %pod.namespace,
        name = %pod.name,
        pod_ip = %pod.pod_ip,
        "Pod event"
    );
}

fn log_service(event: &str, svc: &Service) {
    info!(
        action = event,
        cluster = %svc.cluster,
        namespace = %svc.namespace,
        name = %svc.name,
        cluster_ip = %svc.cluster_ip,
        "Service event"
    );
}

#[tonic::async_trait]
impl Collector for CollectorServiceImpl {
    #[instrument(skip_all, fields(rpc = METHOD_GIVE_API_LOG))]
    async fn give_api_log(
        &self,
        request: Request<Streaming<ApiLog>>,
    ) -> Result<Response<Ack>, Status> {
        drain_stream(&self.relays.api_log, request.into_inner(), self.shutdown.clone()).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_GIVE_ENVOY_METRICS))]
    async fn give_envoy_metrics(
        &self,
        request: Request<Streaming<EnvoyMetrics>>,
    ) -> Result<Response<Ack>, Status> {
        drain_stream(
            &self.relays.envoy_metrics,
            request.into_inner(),
            self.shutdown.clone(),
        )
        .await
    }

    #[instrument(skip_all, fields(rpc = METHOD_ADD_DEPLOY_EVENT))]
    async fn add_deploy_event(&self, request: Request<Deploy>) -> Result<Response<Ack>, Status> {
        let deploy = request.into_inner();
        log_deploy("add", &deploy);
        ingest(&self.relays.deploy_add, deploy).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_UPDATE_DEPLOY_EVENT))]
    async fn update_deploy_event(
        &self,
        request: Request<Deploy>,
    ) -> Result<Response<Ack>, Status> {
        let deploy = request.into_inner();
        log_deploy("update", &deploy);
        ingest(&self.relays.deploy_update, deploy).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_DELETE_DEPLOY_EVENT))]
    async fn delete_deploy_event(
        &self,
        request: Request<Deploy>,
    ) -> Result<Response<Ack>, Status> {
        let deploy = request.into_inner();
        log_deploy("delete", &deploy);
        ingest(&self.relays.deploy_delete, deploy).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_ADD_POD_EVENT))]
    async fn add_pod_event(&self, request: Request<Pod>) -> Result<Response<Ack>, Status> {
        let pod = request.into_inner();
        log_pod("add", &pod);
        ingest(&self.relays.pod_add, pod).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_UPDATE_POD_EVENT))]
    async fn update_pod_event(&self, request: Request<Pod>) -> Result<Response<Ack>, Status> {
        let pod = request.into_inner();
        log_pod("update", &pod);
        ingest(&self.relays.pod_update, pod).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_DELETE_POD_EVENT))]
    async fn delete_pod_event(&self, request: Request<Pod>) -> Result<Response<Ack>, Status> {
        let pod = request.into_inner();
        log_pod("delete", &pod);
        ingest(&self.relays.pod_delete, pod).await
    }

    // Service events update the IP index before the record is relayed, so
    // API logs dispatched afterwards resolve against the new state.

    #[instrument(skip_all, fields(rpc = METHOD_ADD_SVC_EVENT))]
    async fn add_svc_event(&self, request: Request<Service>) -> Result<Response<Ack>, Status> {
        let svc = request.into_inner();
        log_service("add", &svc);
        // The index is updated even if the relay rejects the event at shutdown.
        self.index.upsert_service(&svc).await;
        ingest(&self.relays.service_add, svc).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_UPDATE_SVC_EVENT))]
    async fn update_svc_event(&self, request: Request<Service>) -> Result<Response<Ack>, Status> {
        let svc = request.into_inner();
        log_service("update", &svc);
        self.index.upsert_service(&svc).await;
        ingest(&self.relays.service_update, svc).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_DELETE_SVC_EVENT))]
    async fn delete_svc_event(&self, request: Request<Service>) -> Result<Response<Ack>, Status> {
        let svc = request.into_inner();
        log_service("delete", &svc);
        self.index.remove_service(&svc).await;
        ingest(&self.relays.service_delete, svc).await
    }
}
