use std::sync::Arc;

use anyhow::Context;
use api_auth::{JwtAuth, SigningMaterial};
use api_service::config::load_service_config;
use api_service::users::InMemoryUserDirectory;
use api_service::{build_router, AppState};
use common_observability::AuthMetrics;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_service_config()?;

    // Signing material must exist before any request is served.
    let material = SigningMaterial::load(&config.key_source)
        .context("Unable to initialise token signing material")?;
    let metrics = AuthMetrics::new().context("Failed to register auth metrics")?;
    let auth = JwtAuth::new(config.token.clone(), material)
        .context("Invalid token configuration")?
        .with_metrics(metrics.clone());

    let users = InMemoryUserDirectory::from_seed(&config.users)?;
    if users.is_empty() {
        warn!("API_USERS is empty; every login will be rejected");
    }

    let state = AppState {
        auth,
        users: Arc::new(users),
        metrics,
    };
    let app = build_router(state);

    info!(addr = %config.addr, "starting api-service");
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
