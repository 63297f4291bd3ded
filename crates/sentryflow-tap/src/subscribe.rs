//! Exporter subscriptions, one server stream per record kind.

use std::pin::Pin;

use serde::Serialize;
use tokio_stream::{Stream, StreamExt};
use tonic::transport::Channel;
use tonic::{Status, Streaming};

use sentryflow_proto::v1::ClientInfo;
use sentryflow_proto::v1::exporter_client::ExporterClient;

use crate::kind::TapKind;

/// Records of any kind, already converted to JSON.
pub type JsonStream = Pin<Box<dyn Stream<Item = Result<serde_json::Value, Status>> + Send>>;

fn to_json<T>(stream: Streaming<T>) -> JsonStream
where
    T: Serialize + Send + 'static,
{
    Box::pin(stream.map(|item| {
        item.and_then(|record| {
            serde_json::to_value(&record)
                .map_err(|e| Status::internal(format!("Failed to encode record: {e}")))
        })
    }))
}

/// Open the exporter stream for `kind`.
pub async fn open(
    client: &mut ExporterClient<Channel>,
    kind: TapKind,
    info: ClientInfo,
) -> Result<JsonStream, Status> {
    let stream = match kind {
        TapKind::ApiLog => to_json(client.get_api_log(info).await?.into_inner()),
        TapKind::EnvoyMetrics => to_json(client.get_envoy_metrics(info).await?.into_inner()),
        TapKind::DeployAdd => to_json(client.add_deploy_event_db(info).await?.into_inner()),
        TapKind::DeployUpdate => to_json(client.update_deploy_event_db(info).await?.into_inner()),
        TapKind::DeployDelete => to_json(client.delete_deploy_event_db(info).await?.into_inner()),
        TapKind::PodAdd => to_json(client.add_pod_event_db(info).await?.into_inner()),
        TapKind::PodUpdate => to_json(client.update_pod_event_db(info).await?.into_inner()),
        TapKind::PodDelete => to_json(client.delete_pod_event_db(info).await?.into_inner()),
        TapKind::ServiceAdd => to_json(client.add_svc_event_db(info).await?.into_inner()),
        TapKind::ServiceUpdate => to_json(client.update_svc_event_db(info).await?.into_inner()),
        TapKind::ServiceDelete => to_json(client.delete_svc_event_db(info).await?.into_inner()),
    };
    Ok(stream)
}
