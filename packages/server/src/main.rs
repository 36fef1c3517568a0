use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use arena_server::config::AppConfig;
use arena_server::ledger::{RegistrationLedger, SeaOrmLedgerStore};
use arena_server::state::AppState;
use arena_server::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = database::init_db(&config.database)
        .await
        .context("Failed to initialize database")?;
    seed::ensure_indexes(&db)
        .await
        .context("Failed to create indexes")?;
    info!(
        max_connections = config.database.max_connections,
        "Database ready"
    );

    let ledger = RegistrationLedger::new(
        Arc::new(SeaOrmLedgerStore::new(db.clone())),
        config.ledger.clone(),
    );
    info!(
        store_timeout_ms = config.ledger.store_timeout_ms,
        max_write_attempts = config.ledger.max_write_attempts,
        "Registration ledger ready"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        db,
        ledger,
        config,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
