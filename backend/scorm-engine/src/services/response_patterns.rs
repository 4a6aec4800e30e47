use std::collections::BTreeMap;

use crate::models::ScormEvent;

/// Correct-response patterns for one interaction, ordered by the SCO's own
/// pattern index rather than by arrival. A repeated index keeps the last value.
pub fn correct_response_patterns(prefix: &str, events: &[&ScormEvent]) -> Vec<String> {
    let pattern_prefix = format!("{}.correct_responses.", prefix);
    let mut patterns: BTreeMap<u32, String> = BTreeMap::new();

    for event in events {
        let Some(position) = event
            .name
            .strip_prefix(&pattern_prefix)
            .and_then(|rest| rest.strip_suffix(".pattern"))
        else {
            continue;
        };
        let Ok(position) = position.parse::<u32>() else {
            continue;
        };

        // A null pattern carries nothing to record.
        if let Some(value) = event.text() {
            patterns.insert(position, value.into_owned());
        }
    }

    patterns.into_values().collect()
}
