use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::ScormStore;
use crate::error::StoreError;
use crate::models::{
    ActivityKey, ActivityState, ActivityStateUpdate, InteractionRecord, InteractionUpdate,
};

#[derive(Default)]
struct Tables {
    states: HashMap<ActivityKey, ActivityState>,
    interactions: HashMap<(String, u32), InteractionRecord>,
}

/// In-memory store with the same upsert semantics as the MongoDB one.
/// A single lock covers both tables, so every upsert is atomic.
#[derive(Default)]
pub struct MemoryScormStore {
    tables: Mutex<Tables>,
}

impl MemoryScormStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn activity_state_count(&self) -> usize {
        self.tables.lock().await.states.len()
    }

    pub async fn interaction_count(&self) -> usize {
        self.tables.lock().await.interactions.len()
    }
}

#[async_trait]
impl ScormStore for MemoryScormStore {
    async fn upsert_activity_state(
        &self,
        key: &ActivityKey,
        updates: &ActivityStateUpdate,
        session_time_appends: &[f64],
    ) -> Result<ActivityState, StoreError> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;

        let state = tables.states.entry(key.clone()).or_insert_with(|| {
            tracing::info!("Created ActivityState for {}", key);
            ActivityState::new(key, now)
        });
        state.apply(updates, session_time_appends, now);

        Ok(state.clone())
    }

    async fn upsert_interaction(
        &self,
        activity_state_id: &str,
        index: u32,
        updates: &InteractionUpdate,
    ) -> Result<InteractionRecord, StoreError> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;

        let record = tables
            .interactions
            .entry((activity_state_id.to_string(), index))
            .or_insert_with(|| InteractionRecord::new(activity_state_id, index, now));
        record.apply(updates, now);

        Ok(record.clone())
    }

    async fn get_activity_state(
        &self,
        key: &ActivityKey,
    ) -> Result<Option<ActivityState>, StoreError> {
        Ok(self.tables.lock().await.states.get(key).cloned())
    }

    async fn list_interactions(
        &self,
        activity_state_id: &str,
    ) -> Result<Vec<InteractionRecord>, StoreError> {
        let tables = self.tables.lock().await;
        let mut records: Vec<InteractionRecord> = tables
            .interactions
            .values()
            .filter(|record| record.activity_state_id == activity_state_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.index);
        Ok(records)
    }

    async fn delete_activity_state(&self, key: &ActivityKey) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(state) = tables.states.remove(key) else {
            return Ok(false);
        };
        tables
            .interactions
            .retain(|(state_id, _), _| *state_id != state.id);
        Ok(true)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
