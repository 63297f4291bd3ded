//! `SentryFlow` tap
//!
//! Subscribes to one or more exporter streams and prints every record as a
//! JSON line on stdout. Logs go to stderr.

use std::io;

use clap::Parser;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sentryflow_proto::v1::ClientInfo;
use sentryflow_tap::connection::ConnectionConfig;
use sentryflow_tap::kind::TapKind;
use sentryflow_tap::{output, subscribe};

#[derive(Parser, Debug)]
#[command(name = "sentryflow-tap")]
#[command(version, about = "Print SentryFlow exporter streams as JSON lines", long_about = None)]
struct Cli {
    /// Exporter address
    #[arg(long, env = "SENTRYFLOW_EXPORTER", default_value = "http://127.0.0.1:8080")]
    exporter: String,

    /// Record kind to subscribe to (repeatable)
    #[arg(long = "kind", value_enum, required_unless_present = "all")]
    kinds: Vec<TapKind>,

    /// Subscribe to every record kind
    #[arg(long, conflicts_with = "kinds")]
    all: bool,

    /// Hostname reported to the operator
    #[arg(long, env = "HOSTNAME", default_value = "sentryflow-tap")]
    hostname: String,

    /// IP address reported to the operator (defaults to the connection's peer address)
    #[arg(long, default_value = "")]
    ip: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "sentryflow_tap=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = ConnectionConfig {
        addr: cli.exporter.clone(),
        ..Default::default()
    };
    let mut client = config.connect().await?;
    let client_info = ClientInfo {
        hostname: cli.hostname.clone(),
        ip_address: cli.ip.clone(),
    };

    let (tx, mut rx) = mpsc::channel::<(TapKind, serde_json::Value)>(256);
    for kind in TapKind::resolve(&cli.kinds, cli.all) {
        let mut stream = subscribe::open(&mut client, kind, client_info.clone()).await?;
        info!(kind = kind.as_str(), "Subscribed");
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(record) => {
                        if tx.send((kind, record)).await.is_err() {
                            break;
                        }
                    }
                    Err(status) => {
                        warn!(kind = kind.as_str(), error = %status, "Stream failed");
                        break;
                    }
                }
            }
            info!(kind = kind.as_str(), "Stream ended");
        });
    }
    drop(tx);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let stdout = io::stdout();

    loop {
        tokio::select! {
            item = rx.recv() => {
                let Some((kind, record)) = item else {
                    break;
                };
                output::write_record(&mut stdout.lock(), kind, &record)?;
            }
            _ = &mut ctrl_c => {
                info!("Received Ctrl+C, exiting");
                break;
            }
        }
    }

    Ok(())
}
