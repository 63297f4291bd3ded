//! Exporter gRPC service: downstream consumers subscribe to a record kind.
//!
//! Each call returns a response stream that lives exactly as long as the
//! subscription. It ends when the subscriber is pruned after a failed send
//! or when the operator closes the registries at shutdown.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{info, instrument};

use sentryflow_proto::methods::{
    METHOD_ADD_DEPLOY_EVENT_DB, METHOD_ADD_POD_EVENT_DB, METHOD_ADD_SVC_EVENT_DB,
    METHOD_DELETE_DEPLOY_EVENT_DB, METHOD_DELETE_POD_EVENT_DB, METHOD_DELETE_SVC_EVENT_DB,
    METHOD_GET_API_LOG, METHOD_GET_ENVOY_METRICS, METHOD_UPDATE_DEPLOY_EVENT_DB,
    METHOD_UPDATE_POD_EVENT_DB, METHOD_UPDATE_SVC_EVENT_DB,
};
use sentryflow_proto::v1::exporter_server::Exporter;
use sentryflow_proto::v1::{ApiLog, ClientInfo, Deploy, EnvoyMetrics, Pod, Service};

use crate::relay::{RecordStream, Relay, Relays};
use crate::server::grpc_util::client_identity;

pub struct ExporterServiceImpl {
    relays: Arc<Relays>,
}

impl ExporterServiceImpl {
    pub const fn new(relays: Arc<Relays>) -> Self {
        Self { relays }
    }
}

async fn subscribe<T>(
    relay: &Relay<T>,
    request: Request<ClientInfo>,
) -> Result<Response<RecordStream<T>>, Status>
where
    T: Clone + Send + Sync + 'static,
{
    let remote = request.remote_addr();
    let client = client_identity(request.into_inner(), remote);
    let (subscriber_id, stream) = relay.subscribe(client.clone()).await?;
    info!(
        kind = %relay.kind(),
        subscriber_id = %subscriber_id,
        hostname = %client.hostname,
        ip_address = %client.ip_address,
        "Exporter client connected"
    );
    Ok(Response::new(stream))
}

#[tonic::async_trait]
impl Exporter for ExporterServiceImpl {
    type GetAPILogStream = RecordStream<ApiLog>;
    type GetEnvoyMetricsStream = RecordStream<EnvoyMetrics>;
    type AddDeployEventDBStream = RecordStream<Deploy>;
    type UpdateDeployEventDBStream = RecordStream<Deploy>;
    type DeleteDeployEventDBStream = RecordStream<Deploy>;
    type AddPodEventDBStream = RecordStream<Pod>;
    type UpdatePodEventDBStream = RecordStream<Pod>;
    type DeletePodEventDBStream = RecordStream<Pod>;
    type AddSvcEventDBStream = RecordStream<Service>;
    type UpdateSvcEventDBStream = RecordStream<Service>;
    type DeleteSvcEventDBStream = RecordStream<Service>;

    #[instrument(skip_all, fields(rpc = METHOD_GET_API_LOG))]
    async fn get_api_log(
        &self,
        request: Request<ClientInfo>,
    ) -> Result<Response<Self::GetAPILogStream>, Status> {
        subscribe(&self.relays.api_log, request).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_GET_ENVOY_METRICS))]
    async fn get_envoy_metrics(
        &self,
        request: Request<ClientInfo>,
    ) -> Result<Response<Self::GetEnvoyMetricsStream>, Status> {
        subscribe(&self.relays.envoy_metrics, request).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_ADD_DEPLOY_EVENT_DB))]
    async fn add_deploy_event_db(
        &self,
        request: Request<ClientInfo>,
    ) -> Result<Response<Self::AddDeployEventDBStream>, Status> {
        subscribe(&self.relays.deploy_add, request).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_UPDATE_DEPLOY_EVENT_DB))]
    async fn update_deploy_event_db(
        &self,
        request: Request<ClientInfo>,
    ) -> Result<Response<Self::UpdateDeployEventDBStream>, Status> {
        subscribe(&self.relays.deploy_update, request).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_DELETE_DEPLOY_EVENT_DB))]
    async fn delete_deploy_event_db(
        &self,
        request: Request<ClientInfo>,
    ) -> Result<Response<Self::DeleteDeployEventDBStream>, Status> {
        subscribe(&self.relays.deploy_delete, request).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_ADD_POD_EVENT_DB))]
    async fn add_pod_event_db(
        &self,
        request: Request<ClientInfo>,
    ) -> Result<Response<Self::AddPodEventDBStream>, Status> {
        subscribe(&self.relays.pod_add, request).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_UPDATE_POD_EVENT_DB))]
    async fn update_pod_event_db(
        &self,
        request: Request<ClientInfo>,
    ) -> Result<Response<Self::UpdatePodEventDBStream>, Status> {
        subscribe(&self.relays.pod_update, request).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_DELETE_POD_EVENT_DB))]
    async fn delete_pod_event_db(
        &self,
        request: Request<ClientInfo>,
    ) -> Result<Response<Self::DeletePodEventDBStream>, Status> {
        subscribe(&self.relays.pod_delete, request).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_ADD_SVC_EVENT_DB))]
    async fn add_svc_event_db(
        &self,
        request: Request<ClientInfo>,
    ) -> Result<Response<Self::AddSvcEventDBStream>, Status> {
        subscribe(&self.relays.service_add, request).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_UPDATE_SVC_EVENT_DB))]
    async fn update_svc_event_db(
        &self,
        request: Request<ClientInfo>,
    ) -> Result<Response<Self::UpdateSvcEventDBStream>, Status> {
        subscribe(&self.relays.service_update, request).await
    }

    #[instrument(skip_all, fields(rpc = METHOD_DELETE_SVC_EVENT_DB))]
    async fn delete_svc_event_db(
        &self,
        request: Request<ClientInfo>,
    ) -> Result<Response<Self::DeleteSvcEventDBStream>, Status> {
        subscribe(&self.relays.service_delete, request).await
    }
}
