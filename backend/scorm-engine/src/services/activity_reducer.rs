use crate::metrics::record_value_rejection;
use crate::models::{ActivityStateUpdate, CompletionStatus, ScormEvent, SuccessStatus};
use crate::utils::parsing::{ensure_positive, parse_duration_seconds, parse_float};

/// Score components as last reported in a batch, in either dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreComponents {
    pub scaled: Option<f64>,
    pub raw: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ScoreComponents {
    /// `scaled` wins; otherwise `raw / (max - min)` when all three are known.
    /// `max == min` yields whatever IEEE division gives (inf or NaN), unguarded.
    pub fn lesson_score(&self) -> Option<f64> {
        if let Some(scaled) = self.scaled {
            return Some(scaled);
        }
        match (self.raw, self.min, self.max) {
            (Some(raw), Some(min), Some(max)) => Some(raw / (max - min)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityReduction {
    pub updates: ActivityStateUpdate,
    pub score: ScoreComponents,
    /// Newly reported session lengths in seconds, in arrival order.
    pub session_times: Vec<f64>,
}

pub fn reduce_activity_events(events: &[&ScormEvent]) -> ActivityReduction {
    let mut reduction = ActivityReduction::default();

    for event in events {
        let value = event.value.as_ref();

        match event.name.as_str() {
            // SCORM 1.1/1.2 only have lesson_status
            "cmi.core.lesson_status" => match event.text().as_deref() {
                Some("passed") => reduction.updates.success_status = Some(SuccessStatus::Passed),
                Some("failed") => reduction.updates.success_status = Some(SuccessStatus::Failed),
                Some("completed") => {
                    reduction.updates.completion_status = Some(CompletionStatus::Completed)
                }
                Some("incomplete") => {
                    reduction.updates.completion_status = Some(CompletionStatus::Incomplete)
                }
                other => tracing::debug!("Ignoring lesson_status value: {:?}", other),
            },
            // SCORM 2004 uses success_status and completion_status
            "cmi.success_status" => {
                match event.text().map(|text| text.parse::<SuccessStatus>()) {
                    Some(Ok(status)) => reduction.updates.success_status = Some(status),
                    Some(Err(e)) => tracing::debug!("Ignoring success_status: {}", e),
                    None => {}
                }
            }
            "cmi.completion_status" => {
                match event.text().map(|text| text.parse::<CompletionStatus>()) {
                    Some(Ok(status)) => reduction.updates.completion_status = Some(status),
                    Some(Err(e)) => tracing::debug!("Ignoring completion_status: {}", e),
                    None => {}
                }
            }
            "cmi.score.scaled" => reduction.score.scaled = parse_float(value, None),
            "cmi.score.min" | "cmi.core.score.min" => {
                reduction.score.min = parse_float(value, None)
            }
            "cmi.score.max" | "cmi.core.score.max" => {
                reduction.score.max = parse_float(value, None)
            }
            "cmi.score.raw" | "cmi.core.score.raw" => {
                reduction.score.raw = parse_float(value, None)
            }
            "cmi.session_time" | "cmi.core.session_time" => {
                match ensure_positive("session_time", parse_duration_seconds(value)) {
                    Ok(Some(seconds)) => reduction.session_times.push(seconds),
                    Ok(None) if value.is_some() => {
                        tracing::debug!("Unparseable session time: {:?}", value);
                        record_value_rejection("session_time");
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!("Rejected session time: {}", e);
                        record_value_rejection("session_time");
                    }
                }
            }
            _ => {}
        }
    }

    reduction.updates.lesson_score = reduction.score.lesson_score();
    reduction
}
