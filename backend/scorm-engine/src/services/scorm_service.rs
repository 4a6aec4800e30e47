use std::sync::Arc;

use serde::Serialize;

use crate::error::ScormError;
use crate::metrics::{SCORM_EVENTS_TOTAL, SCORM_REDUCTIONS_TOTAL};
use crate::models::{ActivityKey, ActivityProgress, ActivityState, ScormEvent};

use super::activity_reducer::reduce_activity_events;
use super::interaction_reducer::reduce_interaction_events;
use super::partition::split_out_interactions;
use super::store::ScormStore;

#[derive(Debug, Clone, Serialize)]
pub struct ReductionReport {
    /// False when recording was disabled and nothing was written.
    pub recorded: bool,
    pub activity_state: Option<ActivityState>,
    pub interactions_written: usize,
    pub events_dropped: usize,
}

impl ReductionReport {
    fn skipped() -> Self {
        Self {
            recorded: false,
            activity_state: None,
            interactions_written: 0,
            events_dropped: 0,
        }
    }
}

pub struct ScormService {
    store: Arc<dyn ScormStore>,
}

impl ScormService {
    pub fn new(store: Arc<dyn ScormStore>) -> Self {
        Self { store }
    }

    /// Reduces one batch of runtime events into the learner's activity state
    /// and interaction records.
    ///
    /// Malformed values are absorbed field by field; only storage failures are
    /// returned. The activity state is written first because interactions
    /// reference its id. The two writes are not one transaction.
    pub async fn reduce(
        &self,
        key: &ActivityKey,
        events: &[ScormEvent],
        recording_enabled: bool,
    ) -> Result<ReductionReport, ScormError> {
        if !recording_enabled {
            tracing::debug!("Recording disabled, skipping {} events for {}", events.len(), key);
            SCORM_REDUCTIONS_TOTAL.with_label_values(&["skipped"]).inc();
            return Ok(ReductionReport::skipped());
        }

        let result = self.reduce_and_persist(key, events).await;
        let status = if result.is_ok() { "success" } else { "error" };
        SCORM_REDUCTIONS_TOTAL.with_label_values(&[status]).inc();

        if let Err(e) = &result {
            tracing::error!("Failed to reduce SCORM events for {}: {}", key, e);
        }
        result
    }

    async fn reduce_and_persist(
        &self,
        key: &ActivityKey,
        events: &[ScormEvent],
    ) -> Result<ReductionReport, ScormError> {
        let partitioned = split_out_interactions(events);
        let interaction_events: usize = partitioned.interactions.values().map(Vec::len).sum();

        SCORM_EVENTS_TOTAL
            .with_label_values(&["activity"])
            .inc_by(partitioned.activity.len() as u64);
        SCORM_EVENTS_TOTAL
            .with_label_values(&["interaction"])
            .inc_by(interaction_events as u64);
        SCORM_EVENTS_TOTAL
            .with_label_values(&["dropped"])
            .inc_by(partitioned.dropped as u64);

        let reduction = reduce_activity_events(&partitioned.activity);
        tracing::debug!(
            "ActivityState reduction for {}: {:?}, {} new session times",
            key,
            reduction.updates,
            reduction.session_times.len()
        );

        let state = self
            .store
            .upsert_activity_state(key, &reduction.updates, &reduction.session_times)
            .await?;

        for (index, group) in &partitioned.interactions {
            let update = reduce_interaction_events(*index, group);
            tracing::debug!("ScormInteraction reduction index={}: {:?}", index, update);
            self.store
                .upsert_interaction(&state.id, *index, &update)
                .await?;
        }

        tracing::info!(
            "Reduced {} events for {}: {} interactions, {} dropped",
            events.len(),
            key,
            partitioned.interactions.len(),
            partitioned.dropped
        );

        Ok(ReductionReport {
            recorded: true,
            activity_state: Some(state),
            interactions_written: partitioned.interactions.len(),
            events_dropped: partitioned.dropped,
        })
    }

    pub async fn get_progress(
        &self,
        key: &ActivityKey,
    ) -> Result<Option<ActivityProgress>, ScormError> {
        let Some(state) = self.store.get_activity_state(key).await? else {
            return Ok(None);
        };
        let interactions = self.store.list_interactions(&state.id).await?;

        Ok(Some(ActivityProgress {
            total_session_seconds: state.total_session_seconds(),
            state,
            interactions,
        }))
    }

    pub async fn delete_progress(&self, key: &ActivityKey) -> Result<bool, ScormError> {
        Ok(self.store.delete_activity_state(key).await?)
    }
}
