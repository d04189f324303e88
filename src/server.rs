//! Server assembly
//!
//! Builds the shared state from configuration and serves the router.

use std::sync::Arc;

use tracing::info;

use crate::auth::JwtKeys;
use crate::bridge::Bridge;
use crate::config::Args;
use crate::db::MetaStore;
use crate::routes;
use crate::types::VaultError;

/// Shared application state, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<MetaStore>,
    pub bridge: Arc<Bridge>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(args: &Args) -> crate::types::Result<Self> {
        let secret = args.jwt_secret().map_err(VaultError::Config)?;

        Ok(Self {
            db: Arc::new(MetaStore::open(&args.db_path)?),
            bridge: Arc::new(Bridge::new(args.bridge_config())),
            jwt: Arc::new(JwtKeys::new(&secret, args.jwt_expiry_seconds)),
        })
    }
}

/// Run the control panel until the listener fails.
pub async fn run(args: Args) -> anyhow::Result<()> {
    let state = AppState::new(&args)?;
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!("listening on http://{}", args.listen);

    axum::serve(listener, app).await?;
    Ok(())
}
