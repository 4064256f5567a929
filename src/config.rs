use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::recommendation::search::SearchStrategy;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Where profiles, the catalog and the consumption log live.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local; the catalog can be seeded from a JSON file.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow!("unknown storage backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub storage: StorageBackend,
    /// Required for the postgres backend.
    pub database: Option<DatabaseConfig>,
    /// JSON product list loaded into the memory backend on start.
    pub catalog_seed: Option<PathBuf>,
    /// Catalog search used by include recommendations unless a request overrides it.
    pub recommendation_strategy: SearchStrategy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let storage = match std::env::var("STORAGE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => StorageBackend::default(),
        };
        let database = match storage {
            StorageBackend::Postgres => Some(DatabaseConfig {
                url: std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?,
                max_connections: std::env::var("DB_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(10),
            }),
            StorageBackend::Memory => None,
        };
        let catalog_seed = std::env::var_os("CATALOG_SEED").map(PathBuf::from);
        let recommendation_strategy = match std::env::var("RECOMMENDATION_STRATEGY") {
            Ok(v) => v.parse()?,
            Err(_) => SearchStrategy::default(),
        };
        Ok(Self {
            storage,
            database,
            catalog_seed,
            recommendation_strategy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_parse() {
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!(" Postgres ".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }
}
