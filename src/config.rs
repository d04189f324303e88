//! Configuration
//!
//! CLI arguments and environment variable handling using clap.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::bridge::BridgeConfig;

/// VaultMesh control panel
///
/// Brokers file upload and download between web clients and a storage
/// node speaking the VaultMesh binary TCP protocol.
#[derive(Parser, Debug, Clone)]
#[command(name = "vaultmesh-panel")]
#[command(about = "VaultMesh control plane")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// Storage node address (host:port)
    #[arg(long, env = "STORAGE_NODE_ADDR", default_value = "127.0.0.1:9000")]
    pub storage_node_addr: String,

    /// Path to the metadata database
    #[arg(long, env = "DB_PATH", default_value = "vaultmesh.db")]
    pub db_path: PathBuf,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Enable development mode (insecure default secret allowed)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Storage node connect timeout in milliseconds
    #[arg(long, env = "CONNECT_TIMEOUT_MS", default_value = "5000")]
    pub connect_timeout_ms: u64,

    /// Per-read/write storage node I/O timeout in milliseconds
    #[arg(long, env = "IO_TIMEOUT_MS", default_value = "30000")]
    pub io_timeout_ms: u64,

    /// Maximum concurrent storage node sessions
    #[arg(long, env = "MAX_NODE_SESSIONS", default_value = "64")]
    pub max_node_sessions: usize,
}

impl Args {
    /// Effective JWT secret (insecure fixed value allowed in dev mode only).
    pub fn jwt_secret(&self) -> Result<String, String> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => Ok(secret.clone()),
            (None, true) => Ok("dev-only-insecure-secret".to_string()),
            (None, false) => Err("JWT_SECRET is required in production mode".to_string()),
        }
    }

    /// Bridge configuration derived from these arguments.
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            node_addr: self.storage_node_addr.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            io_timeout: Duration::from_millis(self.io_timeout_ms),
            max_sessions: self.max_node_sessions,
        }
    }

    /// Validate configuration before startup.
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }
        if self.max_node_sessions == 0 {
            return Err("MAX_NODE_SESSIONS must be at least 1".to_string());
        }
        if self.storage_node_addr.is_empty() {
            return Err("STORAGE_NODE_ADDR must not be empty".to_string());
        }
        Ok(())
    }
}
