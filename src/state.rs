//! Application state: the store plus startup wiring (config load, snapshot open, seeding).

use tracing::{info, instrument};

use crate::config::{resolve_config, AppConfig};
use crate::error::AppError;
use crate::seeds::seed_tables;
use crate::store::Store;

pub struct AppState {
    pub store: Store,
}

impl AppState {
    /// Build state from env: resolve config, open or create the store, seed if empty.
    #[instrument(level = "info", skip_all)]
    pub async fn from_env() -> Result<Self, AppError> {
        Self::from_config(resolve_config()).await
    }

    pub async fn from_config(cfg: AppConfig) -> Result<Self, AppError> {
        let store = match &cfg.snapshot_path {
            Some(path) => Store::open(path.clone()).await?,
            None => {
                info!(target: "recall_backend", "No snapshot path configured; data lives in memory only");
                Store::in_memory()
            }
        };

        let bank = cfg.exercises.into_iter().map(Into::into).collect();
        let seeded = store
            .transact(|t| seed_tables(t, cfg.seed_defaults, bank))
            .await?;

        let (exercises, tests, documents) = store
            .read(|t| (t.exercise_count(), t.tests().len(), t.documents().len()))
            .await;
        info!(target: "recall_backend", seeded, exercises, tests, documents, "Startup inventory");

        Ok(Self { store })
    }

    /// Empty in-memory state, for tests.
    #[cfg(test)]
    pub fn empty() -> Self {
        Self { store: Store::in_memory() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_install_seeds_into_new_data_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("db.json");
        let cfg = AppConfig { snapshot_path: Some(path.clone()), ..AppConfig::default() };

        let state = AppState::from_config(cfg).await.unwrap();

        assert_eq!(state.store.read(|t| t.exercise_count()).await, 10);
        assert!(path.is_file());
    }
}
