use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionType {
    TrueFalse,
    Choice,
    FillIn,
    Matching,
    Performance,
    Sequencing,
    Likert,
    Numeric,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::TrueFalse => "true-false",
            InteractionType::Choice => "choice",
            InteractionType::FillIn => "fill-in",
            InteractionType::Matching => "matching",
            InteractionType::Performance => "performance",
            InteractionType::Sequencing => "sequencing",
            InteractionType::Likert => "likert",
            InteractionType::Numeric => "numeric",
        }
    }
}

impl FromStr for InteractionType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "true-false" => Ok(InteractionType::TrueFalse),
            "choice" => Ok(InteractionType::Choice),
            "fill-in" => Ok(InteractionType::FillIn),
            "matching" => Ok(InteractionType::Matching),
            "performance" => Ok(InteractionType::Performance),
            "sequencing" => Ok(InteractionType::Sequencing),
            "likert" => Ok(InteractionType::Likert),
            "numeric" => Ok(InteractionType::Numeric),
            other => Err(format!("Unknown interaction type: {}", other)),
        }
    }
}

/// One question-level record reported by the SCO, keyed by the SCO's own index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: String,
    pub activity_state_id: String,
    pub index: u32,
    pub interaction_id: Option<String>,
    #[serde(rename = "type")]
    pub interaction_type: Option<InteractionType>,
    pub description: Option<String>,
    pub student_response: Option<String>,
    pub result: Option<String>,
    pub weighting: Option<f64>,
    /// Seconds between presentation and response.
    pub latency: Option<f64>,
    pub correct_responses: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl InteractionRecord {
    pub fn new(activity_state_id: &str, index: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            activity_state_id: activity_state_id.to_string(),
            index,
            interaction_id: None,
            interaction_type: None,
            description: None,
            student_response: None,
            result: None,
            weighting: None,
            latency: None,
            correct_responses: Vec::new(),
            updated_at: now,
        }
    }

    pub fn apply(&mut self, updates: &InteractionUpdate, now: DateTime<Utc>) {
        if let Some(interaction_id) = &updates.interaction_id {
            self.interaction_id = Some(interaction_id.clone());
        }
        if let Some(interaction_type) = updates.interaction_type {
            self.interaction_type = Some(interaction_type);
        }
        if let Some(description) = &updates.description {
            self.description = Some(description.clone());
        }
        if let Some(response) = &updates.student_response {
            self.student_response = Some(response.clone());
        }
        if let Some(result) = &updates.result {
            self.result = Some(result.clone());
        }
        if let Some(weighting) = updates.weighting {
            self.weighting = Some(weighting);
        }
        if let Some(latency) = updates.latency {
            self.latency = Some(latency);
        }
        if let Some(patterns) = &updates.correct_responses {
            self.correct_responses = patterns.clone();
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InteractionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub interaction_type: Option<InteractionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighting: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_responses: Option<Vec<String>>,
}
