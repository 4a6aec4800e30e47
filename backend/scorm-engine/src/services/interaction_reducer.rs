use crate::metrics::record_value_rejection;
use crate::models::{InteractionType, InteractionUpdate, ScormEvent};
use crate::utils::parsing::{ensure_positive, parse_duration_seconds, parse_positive};

use super::partition::INTERACTIONS_PREFIX;
use super::response_patterns::correct_response_patterns;

pub fn interaction_prefix(index: u32) -> String {
    format!("{}.{}", INTERACTIONS_PREFIX, index)
}

/// Folds one interaction's events into field deltas, last write wins.
/// Bad latency or weighting values are logged and left unset; they never
/// affect the other fields or sibling interactions.
pub fn reduce_interaction_events(index: u32, events: &[&ScormEvent]) -> InteractionUpdate {
    let prefix = interaction_prefix(index);
    let patterns = correct_response_patterns(&prefix, events);

    let mut update = InteractionUpdate {
        correct_responses: (!patterns.is_empty()).then_some(patterns),
        ..Default::default()
    };

    for event in events {
        let Some(suffix) = event.name.strip_prefix(prefix.as_str()) else {
            continue;
        };
        let Some(text) = event.text() else {
            continue;
        };

        match suffix {
            ".id" => update.interaction_id = Some(text.into_owned()),
            // learner_response is the SCORM 2004 spelling
            ".student_response" | ".learner_response" => {
                update.student_response = Some(text.into_owned())
            }
            ".description" => update.description = Some(text.into_owned()),
            ".result" => update.result = Some(text.into_owned()),
            ".type" => match text.parse::<InteractionType>() {
                Ok(interaction_type) => update.interaction_type = Some(interaction_type),
                Err(e) => tracing::debug!("Ignoring interaction {} type: {}", index, e),
            },
            ".weighting" => match parse_positive(event.value.as_ref(), None, "weighting") {
                Ok(Some(weighting)) => update.weighting = Some(weighting),
                Ok(None) => {
                    tracing::warn!("Invalid weighting for interaction {}: {}", index, text);
                    record_value_rejection("weighting");
                }
                Err(e) => {
                    tracing::warn!("Rejected weighting for interaction {}: {}", index, e);
                    record_value_rejection("weighting");
                }
            },
            ".latency" => {
                match ensure_positive("latency", parse_duration_seconds(event.value.as_ref())) {
                    Ok(Some(latency)) => update.latency = Some(latency),
                    Ok(None) => {
                        tracing::warn!("Invalid latency: {}", text);
                        record_value_rejection("latency");
                    }
                    Err(e) => {
                        tracing::warn!("Rejected latency for interaction {}: {}", index, e);
                        record_value_rejection("latency");
                    }
                }
            }
            _ => {}
        }
    }

    update
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScormValue;

    fn reduce(index: u32, events: &[ScormEvent]) -> InteractionUpdate {
        let refs: Vec<&ScormEvent> = events.iter().collect();
        reduce_interaction_events(index, &refs)
    }

    #[test]
    fn folds_all_supported_fields() {
        let update = reduce(
            2,
            &[
                ScormEvent::new("cmi.interactions.2.id", "question-7"),
                ScormEvent::new("cmi.interactions.2.type", "choice"),
                ScormEvent::new("cmi.interactions.2.student_response", "b"),
                ScormEvent::new("cmi.interactions.2.result", "correct"),
                ScormEvent::new("cmi.interactions.2.weighting", ScormValue::Number(2.0)),
                ScormEvent::new("cmi.interactions.2.latency", "PT12S"),
                ScormEvent::new("cmi.interactions.2.description", "Pick one"),
                ScormEvent::new("cmi.interactions.2.correct_responses.0.pattern", "b"),
            ],
        );

        assert_eq!(update.interaction_id.as_deref(), Some("question-7"));
        assert_eq!(update.interaction_type, Some(InteractionType::Choice));
        assert_eq!(update.student_response.as_deref(), Some("b"));
        assert_eq!(update.result.as_deref(), Some("correct"));
        assert_eq!(update.weighting, Some(2.0));
        assert_eq!(update.latency, Some(12.0));
        assert_eq!(update.description.as_deref(), Some("Pick one"));
        assert_eq!(update.correct_responses, Some(vec!["b".to_string()]));
    }

    #[test]
    fn learner_response_is_the_2004_student_response() {
        let update = reduce(
            0,
            &[ScormEvent::new("cmi.interactions.0.learner_response", "true")],
        );
        assert_eq!(update.student_response.as_deref(), Some("true"));
    }

    #[test]
    fn last_write_wins_per_field() {
        let update = reduce(
            1,
            &[
                ScormEvent::new("cmi.interactions.1.student_response", "a"),
                ScormEvent::new("cmi.interactions.1.student_response", "c"),
            ],
        );
        assert_eq!(update.student_response.as_deref(), Some("c"));
    }

    #[test]
    fn invalid_latency_leaves_field_unset() {
        let update = reduce(
            0,
            &[
                ScormEvent::new("cmi.interactions.0.latency", "not-a-duration"),
                ScormEvent::new("cmi.interactions.0.result", "wrong"),
            ],
        );
        assert_eq!(update.latency, None);
        assert_eq!(update.result.as_deref(), Some("wrong"));
    }

    #[test]
    fn invalid_latency_does_not_clear_earlier_valid_one() {
        let update = reduce(
            0,
            &[
                ScormEvent::new("cmi.interactions.0.latency", "00:00:05"),
                ScormEvent::new("cmi.interactions.0.latency", "garbage"),
                ScormEvent::null("cmi.interactions.0.latency"),
            ],
        );
        assert_eq!(update.latency, Some(5.0));
    }

    #[test]
    fn negative_weighting_and_latency_are_rejected() {
        let update = reduce(
            0,
            &[
                ScormEvent::new("cmi.interactions.0.weighting", "-1"),
                ScormEvent::new("cmi.interactions.0.latency", "-PT3S"),
            ],
        );
        assert_eq!(update.weighting, None);
        assert_eq!(update.latency, None);
    }

    #[test]
    fn unknown_type_is_ignored() {
        let update = reduce(0, &[ScormEvent::new("cmi.interactions.0.type", "essay")]);
        assert_eq!(update.interaction_type, None);
    }

    #[test]
    fn no_pattern_keys_leaves_correct_responses_untouched() {
        let update = reduce(0, &[ScormEvent::new("cmi.interactions.0.id", "q")]);
        assert_eq!(update.correct_responses, None);
    }
}
