use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::Validate;

/// Raw scalar carried by a runtime event.
///
/// SCOs report almost everything as strings, but some players post scores and
/// weightings as JSON numbers, so both shapes are accepted as-is and only
/// interpreted by the value parsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScormValue {
    Number(f64),
    Text(String),
}

impl ScormValue {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            ScormValue::Text(text) => Cow::Borrowed(text.as_str()),
            ScormValue::Number(number) => Cow::Owned(number.to_string()),
        }
    }
}

impl From<&str> for ScormValue {
    fn from(value: &str) -> Self {
        ScormValue::Text(value.to_string())
    }
}

impl From<String> for ScormValue {
    fn from(value: String) -> Self {
        ScormValue::Text(value)
    }
}

impl From<f64> for ScormValue {
    fn from(value: f64) -> Self {
        ScormValue::Number(value)
    }
}

/// One `cmi.*` key/value pair as collected from the learner's browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScormEvent {
    pub name: String,
    #[serde(default)]
    pub value: Option<ScormValue>,
}

impl ScormEvent {
    pub fn new(name: impl Into<String>, value: impl Into<ScormValue>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn null(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn text(&self) -> Option<Cow<'_, str>> {
        self.value.as_ref().map(ScormValue::as_text)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IngestEventsRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "user_id must be between 1 and 255 characters"
    ))]
    pub user_id: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "course_id must be between 1 and 255 characters"
    ))]
    pub course_id: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "activity_id must be between 1 and 255 characters"
    ))]
    pub activity_id: String,

    /// Callers in preview/authoring contexts send `false` so nothing is stored.
    #[serde(default)]
    pub recording_enabled: Option<bool>,

    #[serde(default)]
    pub events: Vec<ScormEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_string_number_and_null_values() {
        let events: Vec<ScormEvent> = serde_json::from_str(
            r#"[
                {"name": "cmi.core.score.raw", "value": "85"},
                {"name": "cmi.core.score.max", "value": 100},
                {"name": "cmi.interactions.0.latency", "value": null},
                {"name": "cmi.interactions.0.result"}
            ]"#,
        )
        .unwrap();

        assert_eq!(events[0].value, Some(ScormValue::Text("85".to_string())));
        assert_eq!(events[1].value, Some(ScormValue::Number(100.0)));
        assert_eq!(events[2].value, None);
        assert_eq!(events[3].value, None);
    }

    #[test]
    fn numbers_render_as_text() {
        assert_eq!(ScormValue::Number(100.0).as_text(), "100");
        assert_eq!(ScormValue::Number(0.5).as_text(), "0.5");
        assert_eq!(ScormValue::from("passed").as_text(), "passed");
    }
}
