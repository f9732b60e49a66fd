use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use crate::app::app;
use crate::config::{self, AppConfig};
use crate::database::{MemoryStore, PgStore};
use crate::session::JwtSessionProvider;
use crate::state::AppState;
use crate::storage::LocalFileStorage;

/// Wire the state from configuration: Postgres when `DATABASE_URL` is set,
/// the in-memory store otherwise (development only).
pub async fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
    let sessions = Arc::new(JwtSessionProvider::new(&config.session));
    let files = Arc::new(LocalFileStorage::new(&config.uploads.dir));

    let state = if config.database.url.is_some() {
        let store = PgStore::connect(&config.database)
            .await
            .context("failed to connect to the database")?;
        AppState::with_store(config, sessions, Arc::new(store), files)
    } else {
        tracing::warn!("DATABASE_URL not set; using the in-memory store");
        AppState::with_store(config, sessions, Arc::new(MemoryStore::new()), files)
    };

    Ok(state)
}

pub async fn handle(port: Option<u16>) -> anyhow::Result<()> {
    let mut config = config::config().clone();
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate().context("invalid configuration")?;

    info!("Starting CEMSE-IA API in {:?} mode", config.environment);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = build_state(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
