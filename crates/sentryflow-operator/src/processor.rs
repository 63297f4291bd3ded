//! API log processing ahead of broadcast: id assignment and endpoint
//! resolution against the Service index.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use sentryflow_proto::v1::ApiLog;

use crate::index::{IpIndex, ResourceRef};
use crate::relay::RecordProcessor;

pub const UNKNOWN: &str = "Unknown";
const SERVICE_TYPE: &str = "Service";

/// Assigns ids to unnumbered logs and fills unresolved endpoints.
pub struct ApiLogProcessor {
    index: Arc<IpIndex>,
    base_execution_id: u64,
    counter: AtomicU64,
}

impl ApiLogProcessor {
    /// Ids start at the current time in microseconds.
    pub fn new(index: Arc<IpIndex>) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX));
        Self::with_base(index, now)
    }

    pub const fn with_base(index: Arc<IpIndex>, base_execution_id: u64) -> Self {
        Self {
            index,
            base_execution_id,
            counter: AtomicU64::new(0),
        }
    }

    fn next_id(&self) -> u64 {
        self.base_execution_id
            .wrapping_add(self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

/// Mutable view over one side (src or dst) of an API log.
struct Endpoint<'a> {
    cluster: &'a mut String,
    namespace: &'a mut String,
    name: &'a mut String,
    labels: &'a mut HashMap<String, String>,
    kind: &'a mut String,
    ip: &'a str,
}

impl Endpoint<'_> {
    fn is_unresolved(&self) -> bool {
        self.name.is_empty() || self.name.as_str() == UNKNOWN
    }

    fn fill(self, found: Option<ResourceRef>) {
        match found {
            Some(resource) => {
                *self.cluster = resource.key.cluster;
                *self.namespace = resource.key.namespace;
                *self.name = resource.key.name;
                *self.labels = resource.labels;
                *self.kind = SERVICE_TYPE.to_string();
            }
            None => {
                for field in [self.namespace, self.name, self.kind] {
                    if field.is_empty() {
                        *field = UNKNOWN.to_string();
                    }
                }
            }
        }
    }
}

impl ApiLogProcessor {
    async fn resolve(&self, endpoint: Endpoint<'_>) {
        if !endpoint.is_unresolved() {
            return;
        }
        let found = if endpoint.ip.is_empty() {
            None
        } else {
            self.index.lookup(endpoint.ip).await
        };
        endpoint.fill(found);
    }
}

#[tonic::async_trait]
impl RecordProcessor<ApiLog> for ApiLogProcessor {
    async fn process(&self, mut log: ApiLog) -> ApiLog {
        if log.id == 0 {
            log.id = self.next_id();
        }

        self.resolve(Endpoint {
            cluster: &mut log.src_cluster,
            namespace: &mut log.src_namespace,
            name: &mut log.src_name,
            labels: &mut log.src_label,
            kind: &mut log.src_type,
            ip: &log.src_ip,
        })
        .await;
        self.resolve(Endpoint {
            cluster: &mut log.dst_cluster,
            namespace: &mut log.dst_namespace,
            name: &mut log.dst_name,
            labels: &mut log.dst_label,
            kind: &mut log.dst_type,
            ip: &log.dst_ip,
        })
        .await;

        log
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use sentryflow_proto::v1::Service;

    use super::*;

    async fn index_with_backend() -> Arc<IpIndex> {
        let index = Arc::new(IpIndex::new());
        index
            .upsert_service(&Service {
                cluster: "c1".into(),
                namespace: "shop".into(),
                name: "backend".into(),
                r#type: "ClusterIP".into(),
                cluster_ip: "10.96.0.10".into(),
                labels: [("app".to_string(), "backend".to_string())].into(),
                ..Default::default()
            })
            .await;
        index
    }

    #[tokio::test]
    async fn unnumbered_logs_get_consecutive_ids() {
        let processor = ApiLogProcessor::with_base(Arc::new(IpIndex::new()), 1_000);
        let a = processor.process(ApiLog::default()).await;
        let b = processor.process(ApiLog::default()).await;
        let kept = processor
            .process(ApiLog {
                id: 7,
                ..Default::default()
            })
            .await;
        assert_eq!((a.id, b.id, kept.id), (1_000, 1_001, 7));
    }

    #[tokio::test]
    async fn unknown_destination_is_resolved_from_index() {
        let processor = ApiLogProcessor::with_base(index_with_backend().await, 1);
        let log = processor
            .process(ApiLog {
                src_name: "frontend-abc".into(),
                src_namespace: "shop".into(),
                src_ip: "10.96.0.10".into(),
                dst_name: UNKNOWN.into(),
                dst_ip: "10.96.0.10".into(),
                ..Default::default()
            })
            .await;

        assert_eq!(log.dst_name, "backend");
        assert_eq!(log.dst_namespace, "shop");
        assert_eq!(log.dst_cluster, "c1");
        assert_eq!(log.dst_type, "Service");
        assert_eq!(log.dst_label.get("app").map(String::as_str), Some("backend"));
        // Already-resolved side is left alone even though its IP is indexed.
        assert_eq!(log.src_name, "frontend-abc");
        assert!(log.src_type.is_empty());
    }

    #[tokio::test]
    async fn index_miss_marks_empty_fields_unknown() {
        let processor = ApiLogProcessor::with_base(index_with_backend().await, 1);
        let log = processor
            .process(ApiLog {
                dst_ip: "192.0.2.1".into(),
                ..Default::default()
            })
            .await;
        assert_eq!(log.dst_name, UNKNOWN);
        assert_eq!(log.dst_namespace, UNKNOWN);
        assert_eq!(log.dst_type, UNKNOWN);
        assert!(log.dst_cluster.is_empty());
    }
}
