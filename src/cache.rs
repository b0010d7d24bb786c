use crate::models::CityRecord;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// A loaded dataset. Immutable once built; handlers share it through the `Arc`.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Arc<Vec<CityRecord>>,
    pub loaded_at: String,
}

#[derive(Debug)]
pub struct DatasetCache {
    ttl: Duration,
    entry: Option<(Instant, Dataset)>,
}

impl DatasetCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn fresh_at(&self, now: Instant) -> Option<Dataset> {
        self.entry
            .as_ref()
            .filter(|(fetched, _)| now.saturating_duration_since(*fetched) < self.ttl)
            .map(|(_, dataset)| dataset.clone())
    }

    pub fn store_at(&mut self, now: Instant, dataset: Dataset) -> Dataset {
        self.entry = Some((now, dataset.clone()));
        dataset
    }
}
