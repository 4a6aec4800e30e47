//! Storage collaborator for reduction results.
//!
//! Implemented by [`MongoScormStore`] (production) and [`MemoryScormStore`]
//! (tests, local runs). Both upserts are atomic per identity and apply partial
//! updates: fields absent from an update are never clobbered.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{
    ActivityKey, ActivityState, ActivityStateUpdate, InteractionRecord, InteractionUpdate,
};

pub mod memory;
pub mod mongo;

pub use memory::MemoryScormStore;
pub use mongo::MongoScormStore;

#[async_trait]
pub trait ScormStore: Send + Sync {
    /// Locate-or-create by `key`, apply `updates`, append `session_time_appends`,
    /// and return the record as it is after the write.
    async fn upsert_activity_state(
        &self,
        key: &ActivityKey,
        updates: &ActivityStateUpdate,
        session_time_appends: &[f64],
    ) -> Result<ActivityState, StoreError>;

    /// Locate-or-create by `(activity_state_id, index)` and apply `updates`.
    async fn upsert_interaction(
        &self,
        activity_state_id: &str,
        index: u32,
        updates: &InteractionUpdate,
    ) -> Result<InteractionRecord, StoreError>;

    async fn get_activity_state(
        &self,
        key: &ActivityKey,
    ) -> Result<Option<ActivityState>, StoreError>;

    /// Interactions of one activity state, ordered by index.
    async fn list_interactions(
        &self,
        activity_state_id: &str,
    ) -> Result<Vec<InteractionRecord>, StoreError>;

    /// Removes the state and every interaction belonging to it.
    async fn delete_activity_state(&self, key: &ActivityKey) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
