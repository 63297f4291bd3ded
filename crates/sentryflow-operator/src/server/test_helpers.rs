//! Shared setup for the collector and exporter service tests.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use tokio_stream::StreamExt;

use sentryflow_proto::v1::ClientInfo;

use crate::index::IpIndex;
use crate::processor::ApiLogProcessor;
use crate::relay::{DispatchHandle, RecordStream, RelaySettings, Relays};

/// First id handed out to unnumbered API logs in tests.
pub const TEST_BASE_ID: u64 = 1_000;

/// Relays with running dispatch loops and a shared IP index.
pub struct TestRelays {
    pub relays: Arc<Relays>,
    pub index: Arc<IpIndex>,
    handles: Vec<DispatchHandle>,
}

impl TestRelays {
    pub fn start() -> Self {
        let settings = RelaySettings {
            send_timeout: Duration::from_millis(200),
            ..RelaySettings::default()
        };
        let (relays, receivers) = Relays::new(settings);
        let index = Arc::new(IpIndex::new());
        let processor = Arc::new(ApiLogProcessor::with_base(Arc::clone(&index), TEST_BASE_ID));
        let handles = relays.spawn_dispatchers(receivers, processor);
        Self {
            relays: Arc::new(relays),
            index,
            handles,
        }
    }

    /// Stop every dispatch loop and wait for it to exit.
    pub async fn stop_dispatch(&mut self) {
        for handle in self.handles.drain(..) {
            handle.stop().await.unwrap();
        }
    }
}

pub fn client(hostname: &str) -> ClientInfo {
    ClientInfo {
        hostname: hostname.into(),
        ip_address: "10.0.0.100".into(),
    }
}

/// Next record on a subscription, failing the test after one second.
pub async fn next_record<T>(stream: &mut RecordStream<T>) -> T {
    tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("timed out waiting for record")
        .expect("stream ended")
        .expect("stream yielded an error")
}

/// Assert nothing arrives on the subscription within a short window.
pub async fn assert_quiet<T: std::fmt::Debug>(stream: &mut RecordStream<T>) {
    let res = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
    assert!(res.is_err(), "unexpected record: {res:?}");
}
