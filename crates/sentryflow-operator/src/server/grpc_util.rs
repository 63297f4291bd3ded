//! Shared gRPC utility helpers.

use std::net::SocketAddr;

use tokio::sync::watch;
use tonic::Code;

use sentryflow_proto::v1::ClientInfo;

/// Check if a gRPC Status represents a normal peer disconnect
/// (agent exit, dropped connection, reset stream).
///
/// The status code is the primary signal. Message matching is a fallback for
/// transport errors surfaced as `Internal`/`Unknown`; the wording comes from
/// hyper/h2 and may change between versions.
pub fn is_peer_disconnect(status: &tonic::Status) -> bool {
    match status.code() {
        Code::Unavailable | Code::Cancelled => return true,
        _ => {}
    }

    let msg = status.message();
    msg.contains("h2 protocol error")
        || msg.contains("broken pipe")
        || msg.contains("connection reset")
        || msg.contains("stream no longer needed")
}

/// Fill a missing subscriber address from the transport peer.
pub fn client_identity(mut info: ClientInfo, remote: Option<SocketAddr>) -> ClientInfo {
    if info.ip_address.is_empty()
        && let Some(addr) = remote
    {
        info.ip_address = addr.ip().to_string();
    }
    info
}

/// Resolves once shutdown has been published or the publisher is gone.
pub async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    // An error means the sender was dropped, which also ends the operator.
    let _ = shutdown.wait_for(|stopping| *stopping).await;
}
