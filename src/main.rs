//! vaultmesh-panel: VaultMesh control plane
//!
//! Authenticates web clients, keeps file metadata, and brokers file
//! payloads to a storage node over the VaultMesh binary TCP protocol.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vaultmesh_panel::{server, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("vaultmesh_panel={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  VaultMesh Control Panel");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Storage node: {}", args.storage_node_addr);
    info!("Metadata db: {}", args.db_path.display());
    info!("Max node sessions: {}", args.max_node_sessions);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("======================================");

    server::run(args).await
}
