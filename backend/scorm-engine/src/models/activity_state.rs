use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::interaction::InteractionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessStatus {
    Passed,
    Failed,
    #[default]
    Unknown,
}

impl SuccessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuccessStatus::Passed => "passed",
            SuccessStatus::Failed => "failed",
            SuccessStatus::Unknown => "unknown",
        }
    }
}

impl FromStr for SuccessStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "passed" => Ok(SuccessStatus::Passed),
            "failed" => Ok(SuccessStatus::Failed),
            "unknown" => Ok(SuccessStatus::Unknown),
            other => Err(format!("Unknown success status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Completed,
    Incomplete,
    #[default]
    Unknown,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Completed => "completed",
            CompletionStatus::Incomplete => "incomplete",
            CompletionStatus::Unknown => "unknown",
        }
    }
}

impl FromStr for CompletionStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "completed" => Ok(CompletionStatus::Completed),
            "incomplete" => Ok(CompletionStatus::Incomplete),
            "unknown" => Ok(CompletionStatus::Unknown),
            other => Err(format!("Unknown completion status: {}", other)),
        }
    }
}

/// Identity of one learner's progress on one activity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Validate)]
pub struct ActivityKey {
    #[validate(length(min = 1, max = 255))]
    pub user_id: String,
    #[validate(length(min = 1, max = 255))]
    pub course_id: String,
    #[validate(length(min = 1, max = 255))]
    pub activity_id: String,
}

impl ActivityKey {
    pub fn new(
        user_id: impl Into<String>,
        course_id: impl Into<String>,
        activity_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            course_id: course_id.into(),
            activity_id: activity_id.into(),
        }
    }
}

impl std::fmt::Display for ActivityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.user_id, self.course_id, self.activity_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityState {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub activity_id: String,
    pub success_status: SuccessStatus,
    pub completion_status: CompletionStatus,
    pub lesson_score: Option<f64>,
    /// Seconds per reported session, in arrival order. Only ever appended to.
    pub session_times: Vec<f64>,
    pub updated_at: DateTime<Utc>,
}

impl ActivityState {
    pub fn new(key: &ActivityKey, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: key.user_id.clone(),
            course_id: key.course_id.clone(),
            activity_id: key.activity_id.clone(),
            success_status: SuccessStatus::default(),
            completion_status: CompletionStatus::default(),
            lesson_score: None,
            session_times: Vec::new(),
            updated_at: now,
        }
    }

    pub fn key(&self) -> ActivityKey {
        ActivityKey::new(&self.user_id, &self.course_id, &self.activity_id)
    }

    pub fn apply(
        &mut self,
        updates: &ActivityStateUpdate,
        session_time_appends: &[f64],
        now: DateTime<Utc>,
    ) {
        if let Some(status) = updates.success_status {
            self.success_status = status;
        }
        if let Some(status) = updates.completion_status {
            self.completion_status = status;
        }
        if let Some(score) = updates.lesson_score {
            self.lesson_score = Some(score);
        }
        self.session_times.extend_from_slice(session_time_appends);
        self.updated_at = now;
    }

    pub fn total_session_seconds(&self) -> f64 {
        self.session_times.iter().sum()
    }
}

/// Field deltas produced by one reduction run. `None` means "no event in this
/// batch", so the stored value is left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityStateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_status: Option<SuccessStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_status: Option<CompletionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_score: Option<f64>,
}

impl ActivityStateUpdate {
    pub fn is_empty(&self) -> bool {
        self.success_status.is_none()
            && self.completion_status.is_none()
            && self.lesson_score.is_none()
    }
}

/// Activity state together with its interactions, as returned to readers.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityProgress {
    #[serde(flatten)]
    pub state: ActivityState,
    pub total_session_seconds: f64,
    pub interactions: Vec<InteractionRecord>,
}
