//! `hub-server`: run the chat hub from the command line
//!
//! ```text
//! hub-server [config.yaml]
//! ```
//!
//! The optional YAML file is loaded first, then `HOST`, `PORT`, `WS_PATH`,
//! `ALLOWED_ORIGINS` and `HEARTBEAT_INTERVAL_SECS` are layered on top.
//! Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::Result;
use hub::config::HubConfig;
use hub::server::ServerBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => HubConfig::from_yaml_file(&path)?.apply_env()?,
        None => HubConfig::from_env()?,
    };

    tracing::info!(
        port = config.port,
        allowed_origins = ?config.allowed_origins,
        heartbeat_interval_secs = config.heartbeat_interval_secs,
        "Starting chat hub"
    );

    ServerBuilder::new().with_config(config).serve().await
}
