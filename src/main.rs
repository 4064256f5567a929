use std::sync::Arc;

use anyhow::Context;

mod app;
mod calculator;
mod catalog;
mod config;
mod db;
mod dto;
mod errors;
mod intake;
mod profiles;
mod recommendation;
mod state;
mod store;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::store::memory::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "nutriguide=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!(
        storage = ?config.storage,
        strategy = ?config.recommendation_strategy,
        "configuration loaded"
    );

    let state = match &config.database {
        Some(database) => {
            let pool = db::connect(database).await?;
            db::run_migrations(&pool).await;
            AppState::from_pool(pool, config.clone())
        }
        None => {
            tracing::warn!("running on the in-memory store; data is lost on exit");
            let store = Arc::new(MemoryStore::new());
            if let Some(path) = &config.catalog_seed {
                let json = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("read catalog seed {}", path.display()))?;
                let count = store.seed_catalog(&json).await?;
                tracing::info!(count, path = %path.display(), "catalog seeded");
            }
            AppState::in_memory(store, config.clone())
        }
    };

    app::serve(app::build_app(state)).await
}
