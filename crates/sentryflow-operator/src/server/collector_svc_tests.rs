//! Tests for the unary collector handlers.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use tokio::sync::watch;
use tonic::{Code, Request};

use sentryflow_proto::v1::collector_server::Collector;
use sentryflow_proto::v1::{Deploy, Pod, Service};

use crate::server::collector_svc::{ACK_OK, CollectorServiceImpl};
use crate::server::test_helpers::{TestRelays, assert_quiet, client, next_record};

fn setup() -> (CollectorServiceImpl, TestRelays, watch::Sender<bool>) {
    let relays = TestRelays::start();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let svc = CollectorServiceImpl::new(
        std::sync::Arc::clone(&relays.relays),
        std::sync::Arc::clone(&relays.index),
        shutdown_rx,
    );
    (svc, relays, shutdown_tx)
}

fn web_service(cluster_ip: &str) -> Service {
    Service {
        cluster: "c1".into(),
        namespace: "shop".into(),
        name: "web".into(),
        r#type: "ClusterIP".into(),
        cluster_ip: cluster_ip.into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn deploy_events_reach_only_their_own_kind() {
    let (svc, relays, _shutdown) = setup();
    let (_, mut adds) = relays.relays.deploy_add.subscribe(client("a")).await.unwrap();
    let (_, mut deletes) = relays
        .relays
        .deploy_delete
        .subscribe(client("d"))
        .await
        .unwrap();

    let deploy = Deploy {
        cluster: "c1".into(),
        namespace: "shop".into(),
        name: "web".into(),
        desired_replicas: 3,
        ..Default::default()
    };
    let ack = svc
        .add_deploy_event(Request::new(deploy.clone()))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(ack.code, ACK_OK);
    assert_eq!(next_record(&mut adds).await, deploy);
    assert_quiet(&mut deletes).await;
}

#[tokio::test]
async fn pod_update_is_relayed() {
    let (svc, relays, _shutdown) = setup();
    let (_, mut updates) = relays.relays.pod_update.subscribe(client("p")).await.unwrap();

    let pod = Pod {
        name: "web-0".into(),
        status: "Running".into(),
        ..Default::default()
    };
    svc.update_pod_event(Request::new(pod.clone())).await.unwrap();
    assert_eq!(next_record(&mut updates).await, pod);
}

#[tokio::test]
async fn service_events_maintain_ip_index() {
    let (svc, relays, _shutdown) = setup();

    svc.add_svc_event(Request::new(web_service("10.96.0.1")))
        .await
        .unwrap();
    assert!(relays.index.lookup("10.96.0.1").await.is_some());

    svc.update_svc_event(Request::new(web_service("10.96.0.2")))
        .await
        .unwrap();
    assert!(relays.index.lookup("10.96.0.1").await.is_none());
    assert!(relays.index.lookup("10.96.0.2").await.is_some());

    svc.delete_svc_event(Request::new(web_service("10.96.0.2")))
        .await
        .unwrap();
    assert!(relays.index.is_empty().await);
}

#[tokio::test]
async fn service_add_is_broadcast_after_indexing() {
    let (svc, relays, _shutdown) = setup();
    let (_, mut adds) = relays
        .relays
        .service_add
        .subscribe(client("s"))
        .await
        .unwrap();

    svc.add_svc_event(Request::new(web_service("10.96.0.1")))
        .await
        .unwrap();
    assert_eq!(next_record(&mut adds).await.name, "web");
}

#[tokio::test]
async fn events_after_dispatch_stop_are_unavailable() {
    let (svc, mut relays, _shutdown) = setup();
    relays.stop_dispatch().await;

    let err = svc
        .delete_pod_event(Request::new(Pod::default()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unavailable);
}

#[tokio::test]
async fn service_event_rejected_at_shutdown_still_updates_index() {
    let (svc, mut relays, _shutdown) = setup();
    relays.stop_dispatch().await;

    let err = svc
        .add_svc_event(Request::new(web_service("10.96.0.20")))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unavailable);
    assert_eq!(
        relays.index.lookup("10.96.0.20").await.unwrap().key.name,
        "web"
    );
}
