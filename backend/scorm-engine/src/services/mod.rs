use std::sync::Arc;

use crate::config::Config;
use store::{MongoScormStore, ScormStore};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ScormStore>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ScormStore>) -> Self {
        Self { config, store }
    }

    /// Connects to MongoDB and prepares the indexes the upserts rely on.
    pub async fn connect(config: Config) -> anyhow::Result<Self> {
        let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri).await?;
        let mongo = mongo_client.database(&config.mongo_database);

        tracing::info!("MongoDB client created for database {}", config.mongo_database);

        let store = MongoScormStore::new(mongo, config.upsert_attempts);
        store.ensure_indexes().await?;

        Ok(Self::new(config, Arc::new(store)))
    }

    pub fn scorm_service(&self) -> scorm_service::ScormService {
        scorm_service::ScormService::new(self.store.clone())
    }
}

pub mod activity_reducer;
pub mod interaction_reducer;
pub mod partition;
pub mod response_patterns;
pub mod scorm_service;
pub mod store;
