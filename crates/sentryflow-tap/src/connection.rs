//! Exporter connection client.

use std::time::Duration;

use thiserror::Error;
use tonic::transport::{Channel, Endpoint};
use tracing::info;

use sentryflow_proto::v1::exporter_client::ExporterClient;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid exporter address {addr}: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: tonic::transport::Error,
    },
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Exporter endpoint, e.g. `http://sentryflow:8080`.
    pub addr: String,
    pub connect_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            addr: "http://127.0.0.1:8080".to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl ConnectionConfig {
    fn endpoint(&self) -> Result<Endpoint, ConnectionError> {
        let endpoint =
            Endpoint::from_shared(self.addr.clone()).map_err(|source| ConnectionError::InvalidAddress {
                addr: self.addr.clone(),
                source,
            })?;
        Ok(endpoint.connect_timeout(self.connect_timeout))
    }

    /// Open a channel to the exporter service.
    pub async fn connect(&self) -> Result<ExporterClient<Channel>, ConnectionError> {
        let channel = self
            .endpoint()?
            .connect()
            .await
            .map_err(|source| ConnectionError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
        info!(addr = %self.addr, "Connected to exporter");
        Ok(ExporterClient::new(channel))
    }
}
