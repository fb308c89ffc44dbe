use std::sync::Arc;

use crate::attributes::repo::AttributeStore;
use crate::auth::repo::UserStore;
use crate::config::AppConfig;
use crate::db::PgStore;
use crate::recipes::repo::RecipeStore;
use crate::storage::{self, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub attributes: Arc<dyn AttributeStore>,
    pub recipes: Arc<dyn RecipeStore>,
    pub storage: Arc<dyn StorageClient>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = Arc::new(PgStore::connect(&config.database_url).await?);
        store.migrate().await;

        let storage = storage::from_config(&config.storage).await?;

        Ok(Self::from_parts(
            store.clone(),
            store.clone(),
            store,
            storage,
            config,
        ))
    }

    pub fn from_parts(
        users: Arc<dyn UserStore>,
        attributes: Arc<dyn AttributeStore>,
        recipes: Arc<dyn RecipeStore>,
        storage: Arc<dyn StorageClient>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            users,
            attributes,
            recipes,
            storage,
            config,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        crate::testing::state().0
    }
}
