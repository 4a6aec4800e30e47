use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ScormStore;
use crate::error::StoreError;
use crate::metrics::track_db_operation;
use crate::models::{
    ActivityKey, ActivityState, ActivityStateUpdate, CompletionStatus, InteractionRecord,
    InteractionType, InteractionUpdate, SuccessStatus,
};
use crate::utils::retry::{retry_async_when, RetryConfig};
use crate::utils::time::{bson_datetime_as_chrono, chrono_to_bson};

const STATES_COLLECTION: &str = "scorm_activity_states";
const INTERACTIONS_COLLECTION: &str = "scorm_interactions";

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ActivityStateDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    course_id: String,
    activity_id: String,
    #[serde(default)]
    success_status: SuccessStatus,
    #[serde(default)]
    completion_status: CompletionStatus,
    #[serde(default)]
    lesson_score: Option<f64>,
    #[serde(default)]
    session_times: Vec<f64>,
    #[serde(with = "bson_datetime_as_chrono")]
    updated_at: DateTime<Utc>,
}

impl From<ActivityStateDocument> for ActivityState {
    fn from(document: ActivityStateDocument) -> Self {
        Self {
            id: document.id,
            user_id: document.user_id,
            course_id: document.course_id,
            activity_id: document.activity_id,
            success_status: document.success_status,
            completion_status: document.completion_status,
            lesson_score: document.lesson_score,
            session_times: document.session_times,
            updated_at: document.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InteractionDocument {
    #[serde(rename = "_id")]
    id: String,
    activity_state_id: String,
    index: u32,
    #[serde(default)]
    interaction_id: Option<String>,
    #[serde(rename = "type", default)]
    interaction_type: Option<InteractionType>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    student_response: Option<String>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    weighting: Option<f64>,
    #[serde(default)]
    latency: Option<f64>,
    #[serde(default)]
    correct_responses: Vec<String>,
    #[serde(with = "bson_datetime_as_chrono")]
    updated_at: DateTime<Utc>,
}

impl From<InteractionDocument> for InteractionRecord {
    fn from(document: InteractionDocument) -> Self {
        Self {
            id: document.id,
            activity_state_id: document.activity_state_id,
            index: document.index,
            interaction_id: document.interaction_id,
            interaction_type: document.interaction_type,
            description: document.description,
            student_response: document.student_response,
            result: document.result,
            weighting: document.weighting,
            latency: document.latency,
            correct_responses: document.correct_responses,
            updated_at: document.updated_at,
        }
    }
}

/// MongoDB-backed store. Each upsert is a single `findAndModify` against a
/// unique compound index, so concurrent batches for one identity cannot
/// create duplicate rows or lose session-time appends.
pub struct MongoScormStore {
    mongo: Database,
    states: Collection<ActivityStateDocument>,
    interactions: Collection<InteractionDocument>,
    retry: RetryConfig,
}

impl MongoScormStore {
    pub fn new(mongo: Database, upsert_attempts: usize) -> Self {
        Self {
            states: mongo.collection(STATES_COLLECTION),
            interactions: mongo.collection(INTERACTIONS_COLLECTION),
            mongo,
            retry: RetryConfig::with_attempts(upsert_attempts),
        }
    }

    /// Creates the unique indexes the upserts rely on. Safe to call repeatedly.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.states
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "course_id": 1, "activity_id": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;

        self.interactions
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "activity_state_id": 1, "index": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;

        tracing::info!(
            "Ensured unique indexes on {} and {}",
            STATES_COLLECTION,
            INTERACTIONS_COLLECTION
        );
        Ok(())
    }

    /// Two racing first inserts for the same identity: the loser hits the
    /// unique index and can simply retry as an update.
    fn is_duplicate_key(error: &StoreError) -> bool {
        let StoreError::Database(error) = error else {
            return false;
        };
        match error.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
                write_error.code == DUPLICATE_KEY_CODE
            }
            ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
            _ => false,
        }
    }

    async fn find_one_and_upsert<T>(
        &self,
        collection: &Collection<T>,
        collection_name: &str,
        filter: Document,
        update: Document,
    ) -> Result<T, StoreError>
    where
        T: serde::de::DeserializeOwned + Send + Sync,
    {
        tracing::debug!(
            "{}.find_one_and_update: filter={} update={}",
            collection_name,
            filter,
            update
        );

        retry_async_when(self.retry.clone(), Self::is_duplicate_key, || {
            let filter = filter.clone();
            let update = update.clone();
            track_db_operation("upsert", collection_name, async move {
                collection
                    .find_one_and_update(filter, update)
                    .upsert(true)
                    .return_document(ReturnDocument::After)
                    .await
                    .map_err(StoreError::from)
            })
        })
        .await?
        .ok_or_else(|| StoreError::Missing(collection_name.to_string()))
    }
}

fn key_filter(key: &ActivityKey) -> Document {
    doc! {
        "user_id": &key.user_id,
        "course_id": &key.course_id,
        "activity_id": &key.activity_id,
    }
}

/// Present values go to `$set`; absent ones only get a default on insert so an
/// existing stored value is left alone.
fn set_or_default(
    set: &mut Document,
    set_on_insert: &mut Document,
    field: &str,
    value: Option<Bson>,
    default: Bson,
) {
    match value {
        Some(value) => {
            set.insert(field, value);
        }
        None => {
            set_on_insert.insert(field, default);
        }
    }
}

/// Builds the upsert for one activity state. Status and score fields are only
/// `$set` when the batch reported them. Session times are pushed when present,
/// otherwise initialised on insert; never both, since Mongo rejects an update
/// touching the same path twice.
fn activity_state_update_doc(
    updates: &ActivityStateUpdate,
    session_time_appends: &[f64],
    new_id: &str,
    now: DateTime<Utc>,
) -> Document {
    let mut set = doc! { "updated_at": chrono_to_bson(now) };
    let mut set_on_insert = doc! { "_id": new_id };

    set_or_default(
        &mut set,
        &mut set_on_insert,
        "success_status",
        updates.success_status.map(|s| Bson::from(s.as_str())),
        Bson::from(SuccessStatus::default().as_str()),
    );
    set_or_default(
        &mut set,
        &mut set_on_insert,
        "completion_status",
        updates.completion_status.map(|s| Bson::from(s.as_str())),
        Bson::from(CompletionStatus::default().as_str()),
    );
    set_or_default(
        &mut set,
        &mut set_on_insert,
        "lesson_score",
        updates.lesson_score.map(Bson::Double),
        Bson::Null,
    );

    let appends: Vec<Bson> = session_time_appends
        .iter()
        .copied()
        .map(Bson::Double)
        .collect();
    let push = if appends.is_empty() {
        set_on_insert.insert("session_times", Bson::Array(Vec::new()));
        None
    } else {
        Some(doc! { "session_times": { "$each": appends } })
    };

    let mut update = doc! { "$set": set, "$setOnInsert": set_on_insert };
    if let Some(push) = push {
        update.insert("$push", push);
    }
    update
}

fn interaction_update_doc(
    updates: &InteractionUpdate,
    new_id: &str,
    now: DateTime<Utc>,
) -> Document {
    let mut set = doc! { "updated_at": chrono_to_bson(now) };
    let mut set_on_insert = doc! { "_id": new_id };

    let text_fields = [
        ("interaction_id", &updates.interaction_id),
        ("description", &updates.description),
        ("student_response", &updates.student_response),
        ("result", &updates.result),
    ];
    for (field, value) in text_fields {
        set_or_default(
            &mut set,
            &mut set_on_insert,
            field,
            value.as_deref().map(Bson::from),
            Bson::Null,
        );
    }
    set_or_default(
        &mut set,
        &mut set_on_insert,
        "type",
        updates.interaction_type.map(|t| Bson::from(t.as_str())),
        Bson::Null,
    );
    set_or_default(
        &mut set,
        &mut set_on_insert,
        "weighting",
        updates.weighting.map(Bson::Double),
        Bson::Null,
    );
    set_or_default(
        &mut set,
        &mut set_on_insert,
        "latency",
        updates.latency.map(Bson::Double),
        Bson::Null,
    );
    set_or_default(
        &mut set,
        &mut set_on_insert,
        "correct_responses",
        updates.correct_responses.as_ref().map(|patterns| {
            Bson::Array(patterns.iter().map(|p| Bson::from(p.as_str())).collect())
        }),
        Bson::Array(Vec::new()),
    );

    doc! { "$set": set, "$setOnInsert": set_on_insert }
}

#[async_trait]
impl ScormStore for MongoScormStore {
    async fn upsert_activity_state(
        &self,
        key: &ActivityKey,
        updates: &ActivityStateUpdate,
        session_time_appends: &[f64],
    ) -> Result<ActivityState, StoreError> {
        let new_id = Uuid::new_v4().to_string();
        let update =
            activity_state_update_doc(updates, session_time_appends, &new_id, Utc::now());

        let document = self
            .find_one_and_upsert(&self.states, STATES_COLLECTION, key_filter(key), update)
            .await?;
        if document.id == new_id {
            tracing::info!("Created ActivityState for {}", key);
        }

        Ok(document.into())
    }

    async fn upsert_interaction(
        &self,
        activity_state_id: &str,
        index: u32,
        updates: &InteractionUpdate,
    ) -> Result<InteractionRecord, StoreError> {
        let new_id = Uuid::new_v4().to_string();
        let filter = doc! {
            "activity_state_id": activity_state_id,
            "index": i64::from(index),
        };
        let update = interaction_update_doc(updates, &new_id, Utc::now());

        let document = self
            .find_one_and_upsert(&self.interactions, INTERACTIONS_COLLECTION, filter, update)
            .await?;
        if document.id == new_id {
            tracing::info!(
                "Created ScormInteraction index={} for ActivityState: {}",
                index,
                activity_state_id
            );
        }

        Ok(document.into())
    }

    async fn get_activity_state(
        &self,
        key: &ActivityKey,
    ) -> Result<Option<ActivityState>, StoreError> {
        let document = track_db_operation("find_one", STATES_COLLECTION, async {
            self.states
                .find_one(key_filter(key))
                .await
                .map_err(StoreError::from)
        })
        .await?;

        Ok(document.map(ActivityState::from))
    }

    async fn list_interactions(
        &self,
        activity_state_id: &str,
    ) -> Result<Vec<InteractionRecord>, StoreError> {
        let documents = track_db_operation("find", INTERACTIONS_COLLECTION, async {
            let cursor = self
                .interactions
                .find(doc! { "activity_state_id": activity_state_id })
                .sort(doc! { "index": 1 })
                .await?;
            cursor
                .try_collect::<Vec<InteractionDocument>>()
                .await
                .map_err(StoreError::from)
        })
        .await?;

        Ok(documents.into_iter().map(InteractionRecord::from).collect())
    }

    async fn delete_activity_state(&self, key: &ActivityKey) -> Result<bool, StoreError> {
        let Some(state) = self.get_activity_state(key).await? else {
            return Ok(false);
        };

        // Interactions go first so a failed delete cannot orphan them.
        let removed = track_db_operation("delete_many", INTERACTIONS_COLLECTION, async {
            self.interactions
                .delete_many(doc! { "activity_state_id": &state.id })
                .await
                .map_err(StoreError::from)
        })
        .await?;

        let deleted = track_db_operation("delete_one", STATES_COLLECTION, async {
            self.states
                .delete_one(doc! { "_id": &state.id })
                .await
                .map_err(StoreError::from)
        })
        .await?;

        tracing::info!(
            "Deleted ActivityState for {} with {} interactions",
            key,
            removed.deleted_count
        );
        Ok(deleted.deleted_count > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.mongo.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections(update: &Document) -> (&Document, &Document) {
        (
            update.get_document("$set").unwrap(),
            update.get_document("$setOnInsert").unwrap(),
        )
    }

    #[test]
    fn reported_state_fields_are_set_and_others_defaulted_on_insert() {
        let updates = ActivityStateUpdate {
            success_status: Some(SuccessStatus::Passed),
            completion_status: None,
            lesson_score: Some(0.75),
        };

        let update = activity_state_update_doc(&updates, &[], "state-1", Utc::now());
        let (set, set_on_insert) = sections(&update);

        assert_eq!(set.get_str("success_status").unwrap(), "passed");
        assert_eq!(set.get_f64("lesson_score").unwrap(), 0.75);
        assert!(set.contains_key("updated_at"));
        assert!(!set.contains_key("completion_status"));

        assert_eq!(set_on_insert.get_str("_id").unwrap(), "state-1");
        assert_eq!(set_on_insert.get_str("completion_status").unwrap(), "unknown");
        assert!(!set_on_insert.contains_key("success_status"));
        assert!(!set_on_insert.contains_key("lesson_score"));
    }

    #[test]
    fn empty_state_update_only_touches_updated_at() {
        let update =
            activity_state_update_doc(&ActivityStateUpdate::default(), &[], "state-1", Utc::now());
        let (set, set_on_insert) = sections(&update);

        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["updated_at"]);
        assert_eq!(set_on_insert.get_str("success_status").unwrap(), "unknown");
        assert_eq!(set_on_insert.get_str("completion_status").unwrap(), "unknown");
        assert_eq!(set_on_insert.get("lesson_score"), Some(&Bson::Null));
        assert!(set_on_insert.get_array("session_times").unwrap().is_empty());
        assert!(!update.contains_key("$push"));
    }

    #[test]
    fn session_times_are_pushed_not_initialised() {
        let update = activity_state_update_doc(
            &ActivityStateUpdate::default(),
            &[600.0, 30.5],
            "state-1",
            Utc::now(),
        );
        let (set, set_on_insert) = sections(&update);

        let push = update.get_document("$push").unwrap();
        let each = push
            .get_document("session_times")
            .unwrap()
            .get_array("$each")
            .unwrap();
        assert_eq!(each, &vec![Bson::Double(600.0), Bson::Double(30.5)]);
        assert!(!set_on_insert.contains_key("session_times"));
        assert!(!set.contains_key("session_times"));
    }

    #[test]
    fn reported_interaction_fields_are_set() {
        let updates = InteractionUpdate {
            interaction_id: Some("q1".to_string()),
            interaction_type: Some(InteractionType::Choice),
            student_response: Some("b".to_string()),
            weighting: Some(2.0),
            correct_responses: Some(vec!["a".to_string(), "b".to_string()]),
            ..Default::default()
        };

        let update = interaction_update_doc(&updates, "interaction-1", Utc::now());
        let (set, set_on_insert) = sections(&update);

        assert_eq!(set.get_str("interaction_id").unwrap(), "q1");
        assert_eq!(set.get_str("type").unwrap(), "choice");
        assert_eq!(set.get_str("student_response").unwrap(), "b");
        assert_eq!(set.get_f64("weighting").unwrap(), 2.0);
        assert_eq!(
            set.get_array("correct_responses").unwrap(),
            &vec![Bson::from("a"), Bson::from("b")]
        );

        assert_eq!(set_on_insert.get_str("_id").unwrap(), "interaction-1");
        for field in ["description", "result", "latency"] {
            assert!(!set.contains_key(field), "{field} should not be set");
            assert_eq!(set_on_insert.get(field), Some(&Bson::Null));
        }
        assert!(!update.contains_key("$push"));
    }

    #[test]
    fn correct_responses_left_alone_without_patterns() {
        let updates = InteractionUpdate {
            result: Some("correct".to_string()),
            ..Default::default()
        };

        let update = interaction_update_doc(&updates, "interaction-1", Utc::now());
        let (set, set_on_insert) = sections(&update);

        assert!(!set.contains_key("correct_responses"));
        assert!(set_on_insert
            .get_array("correct_responses")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn no_field_appears_in_both_sections() {
        let updates = InteractionUpdate {
            description: Some("Capital of France".to_string()),
            latency: Some(4.0),
            ..Default::default()
        };

        let update = interaction_update_doc(&updates, "interaction-1", Utc::now());
        let (set, set_on_insert) = sections(&update);

        for field in set.keys() {
            assert!(!set_on_insert.contains_key(field), "{field} in both sections");
        }
    }
}
