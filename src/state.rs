use crate::cache::{Dataset, DatasetCache};
use crate::config::{Config, DataSource};
use crate::errors::AppError;
use crate::source::fetch_cities;
use chrono::Local;
use reqwest::Client;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub client: Client,
    pub source: DataSource,
    pub cache: Arc<Mutex<DatasetCache>>,
}

impl AppState {
    pub fn new(source: DataSource, cache_ttl: Duration) -> Self {
        Self {
            client: Client::new(),
            source,
            cache: Arc::new(Mutex::new(DatasetCache::new(cache_ttl))),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.source.clone(), config.cache_ttl)
    }

    /// Current dataset, reloaded once the cached copy is older than the TTL.
    /// The lock is held across the load so concurrent requests share one fetch.
    pub async fn dataset(&self) -> Result<Dataset, AppError> {
        let mut cache = self.cache.lock().await;
        if let Some(dataset) = cache.fresh_at(Instant::now()) {
            return Ok(dataset);
        }

        info!("refreshing city dataset");
        let records = fetch_cities(&self.client, &self.source).await?;
        let dataset = Dataset {
            records: Arc::new(records),
            loaded_at: Local::now().format("%d/%m/%Y %H:%M").to_string(),
        };
        Ok(cache.store_at(Instant::now(), dataset))
    }
}
