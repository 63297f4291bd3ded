//! IP address → Service index used to resolve API log endpoints.

use std::collections::HashMap;
use std::net::IpAddr;

use tokio::sync::RwLock;
use tracing::debug;

use sentryflow_proto::v1::Service;

const LOAD_BALANCER: &str = "LoadBalancer";
const HEADLESS_CLUSTER_IP: &str = "None";

/// Natural key of a cluster resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub cluster: String,
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn of_service(svc: &Service) -> Self {
        Self {
            cluster: svc.cluster.clone(),
            namespace: svc.namespace.clone(),
            name: svc.name.clone(),
        }
    }
}

/// What an IP resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub key: ResourceKey,
    pub labels: HashMap<String, String>,
}

#[derive(Default)]
struct Inner {
    by_ip: HashMap<String, ResourceRef>,
    owned: HashMap<ResourceKey, Vec<String>>,
}

impl Inner {
    fn release(&mut self, key: &ResourceKey) -> usize {
        let Some(ips) = self.owned.remove(key) else {
            return 0;
        };
        let mut released = 0;
        for ip in ips {
            // Only drop mappings this key still holds; another Service may
            // have claimed the IP since.
            if self.by_ip.get(&ip).is_some_and(|r| &r.key == key) {
                self.by_ip.remove(&ip);
                released += 1;
            }
        }
        released
    }
}

/// Canonical text form of an address, or `None` if it is not an IP.
fn canonical_ip(raw: &str) -> Option<String> {
    raw.trim().parse::<IpAddr>().ok().map(|ip| ip.to_string())
}

/// IPs a Service answers on, in canonical form.
///
/// LoadBalancer services are reached through their balancer addresses; all
/// other types through the cluster IP plus any external IPs. Entries that do
/// not parse as addresses (empty, `"None"`, hostnames) are skipped.
pub fn service_ips(svc: &Service) -> Vec<String> {
    let candidates: Vec<&str> = if svc.r#type == LOAD_BALANCER {
        svc.load_balancer_ips.iter().map(String::as_str).collect()
    } else {
        std::iter::once(svc.cluster_ip.as_str())
            .filter(|ip| *ip != HEADLESS_CLUSTER_IP)
            .chain(svc.external_ips.iter().map(String::as_str))
            .collect()
    };

    let mut ips: Vec<String> = Vec::with_capacity(candidates.len());
    for ip in candidates.into_iter().filter_map(canonical_ip) {
        if !ips.contains(&ip) {
            ips.push(ip);
        }
    }
    ips
}

/// Each IP maps to at most one resource. A later claim on an IP wins.
#[derive(Default)]
pub struct IpIndex {
    inner: RwLock<Inner>,
}

impl IpIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a Service. Every IP the previous version owned is
    /// released before the new ones are claimed.
    pub async fn upsert_service(&self, svc: &Service) {
        let key = ResourceKey::of_service(svc);
        let ips = service_ips(svc);
        let resource = ResourceRef {
            key: key.clone(),
            labels: svc.labels.clone(),
        };

        let mut inner = self.inner.write().await;
        let released = inner.release(&key);

        for ip in &ips {
            if let Some(previous) = inner.by_ip.insert(ip.clone(), resource.clone())
                && previous.key != key
                && let Some(owned) = inner.owned.get_mut(&previous.key)
            {
                owned.retain(|owned_ip| owned_ip != ip);
            }
        }
        if !ips.is_empty() {
            inner.owned.insert(key.clone(), ips.clone());
        }

        debug!(
            cluster = %key.cluster,
            namespace = %key.namespace,
            name = %key.name,
            released,
            claimed = ips.len(),
            "Service indexed"
        );
    }

    /// Forget a Service and all IPs it owns.
    pub async fn remove_service(&self, svc: &Service) {
        let key = ResourceKey::of_service(svc);
        let released = self.inner.write().await.release(&key);
        debug!(
            cluster = %key.cluster,
            namespace = %key.namespace,
            name = %key.name,
            released,
            "Service removed from index"
        );
    }

    pub async fn lookup(&self, ip: &str) -> Option<ResourceRef> {
        let ip = canonical_ip(ip)?;
        self.inner.read().await.by_ip.get(&ip).cloned()
    }

    /// Number of indexed IPs.
    pub async fn len(&self) -> usize {
        self.inner.read().await.by_ip.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn svc(name: &str, cluster_ip: &str, external: &[&str]) -> Service {
        Service {
            cluster: "c1".into(),
            namespace: "default".into(),
            name: name.into(),
            r#type: "ClusterIP".into(),
            cluster_ip: cluster_ip.into(),
            external_ips: external.iter().map(ToString::to_string).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn update_releases_stale_ips() {
        let index = IpIndex::new();
        index.upsert_service(&svc("web", "10.0.0.1", &["10.0.0.2"])).await;
        index.upsert_service(&svc("web", "10.0.0.2", &["10.0.0.3"])).await;

        assert!(index.lookup("10.0.0.1").await.is_none());
        assert_eq!(index.lookup("10.0.0.2").await.unwrap().key.name, "web");
        assert_eq!(index.lookup("10.0.0.3").await.unwrap().key.name, "web");
        assert_eq!(index.len().await, 2);
    }

    #[tokio::test]
    async fn remove_forgets_every_ip() {
        let index = IpIndex::new();
        let web = svc("web", "10.0.0.1", &["203.0.113.9"]);
        index.upsert_service(&web).await;
        index.remove_service(&web).await;
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn later_claim_wins_and_survives_earlier_owner_removal() {
        let index = IpIndex::new();
        let old = svc("old", "10.0.0.7", &[]);
        let new = svc("new", "10.0.0.7", &[]);
        index.upsert_service(&old).await;
        index.upsert_service(&new).await;
        assert_eq!(index.lookup("10.0.0.7").await.unwrap().key.name, "new");

        index.remove_service(&old).await;
        assert_eq!(index.lookup("10.0.0.7").await.unwrap().key.name, "new");
    }

    #[tokio::test]
    async fn same_name_in_other_cluster_is_distinct() {
        let index = IpIndex::new();
        let a = svc("web", "10.0.0.1", &[]);
        let mut b = svc("web", "10.0.0.9", &[]);
        b.cluster = "c2".into();
        index.upsert_service(&a).await;
        index.upsert_service(&b).await;

        index.remove_service(&a).await;
        assert!(index.lookup("10.0.0.1").await.is_none());
        assert_eq!(index.lookup("10.0.0.9").await.unwrap().key.cluster, "c2");
    }

    #[test]
    fn headless_services_own_no_cluster_ip() {
        assert!(service_ips(&svc("db", "None", &[])).is_empty());
        assert!(service_ips(&svc("db", "", &[])).is_empty());
    }

    #[test]
    fn load_balancer_uses_parsable_balancer_ips_only() {
        let lb = Service {
            r#type: "LoadBalancer".into(),
            cluster_ip: "10.0.0.1".into(),
            load_balancer_ips: vec!["198.51.100.4".into(), "lb.example.com".into()],
            ..Default::default()
        };
        assert_eq!(service_ips(&lb), vec!["198.51.100.4".to_string()]);
    }

    #[tokio::test]
    async fn addresses_are_matched_in_canonical_form() {
        let index = IpIndex::new();
        index
            .upsert_service(&svc("v6", "fd00:0:0:0:0:0:0:10", &[" 203.0.113.9", "fd00::10"]))
            .await;

        assert_eq!(index.len().await, 2);
        assert_eq!(index.lookup("fd00::10").await.unwrap().key.name, "v6");
        assert_eq!(index.lookup("fd00:0::10").await.unwrap().key.name, "v6");
        assert_eq!(index.lookup("203.0.113.9").await.unwrap().key.name, "v6");
        assert!(index.lookup("not-an-ip").await.is_none());
    }
}
