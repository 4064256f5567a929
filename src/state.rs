use std::sync::Arc;

use sqlx::PgPool;

use crate::catalog::repo::{CatalogStore, PgCatalogStore};
use crate::config::AppConfig;
use crate::intake::repo::{ConsumptionLog, PgConsumptionLog};
use crate::profiles::repo::{PgProfileStore, ProfileStore};
use crate::store::memory::MemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub profiles: Arc<dyn ProfileStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub consumption: Arc<dyn ConsumptionLog>,
}

impl AppState {
    pub fn from_pool(db: PgPool, config: Arc<AppConfig>) -> Self {
        Self {
            config,
            profiles: Arc::new(PgProfileStore::new(db.clone())),
            catalog: Arc::new(PgCatalogStore::new(db.clone())),
            consumption: Arc::new(PgConsumptionLog::new(db)),
        }
    }

    /// State backed by one in-process store for every collaborator.
    pub fn in_memory(store: Arc<MemoryStore>, config: Arc<AppConfig>) -> Self {
        Self {
            config,
            profiles: store.clone(),
            catalog: store.clone(),
            consumption: store,
        }
    }

    #[cfg(test)]
    pub fn fake(store: Arc<MemoryStore>) -> Self {
        use crate::config::StorageBackend;
        use crate::recommendation::search::SearchStrategy;

        let config = Arc::new(AppConfig {
            storage: StorageBackend::Memory,
            database: None,
            catalog_seed: None,
            recommendation_strategy: SearchStrategy::Ranked,
        });
        Self::in_memory(store, config)
    }
}
