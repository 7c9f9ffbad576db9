//! sharecast-relay: signaling relay for browser screen sharing.
//!
//! Accepts WebSocket connections, groups them into sessions, tracks who
//! is sharing, and forwards WebRTC negotiation payloads between peers
//! without inspecting them.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use sharecast_common::{ConfigError, SharecastError};
use sharecast_config::RelayConfig;
use sharecast_relay::{serve, Relay};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "sharecast-relay", about = "WebSocket signaling relay for screen sharing")]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind, overriding the config file.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overriding the config file.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config = sharecast_config::load_or_default(args.config.as_deref());

    // Logging comes up before config errors are reported.
    let filter = config
        .as_ref()
        .map(|c| c.logging.filter.clone())
        .unwrap_or_else(|_| "sharecast_relay=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "sharecast-relay failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, config: Result<RelayConfig, ConfigError>) -> Result<(), SharecastError> {
    let mut config = config?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let addr = config.server.address();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("sharecast-relay listening on {}", addr);

    let relay = Relay::new(config.limits.clone());
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    serve(listener, relay, config.server, shutdown).await;
    Ok(())
}
