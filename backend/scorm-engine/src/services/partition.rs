use std::collections::BTreeMap;

use crate::models::ScormEvent;

pub const INTERACTIONS_PREFIX: &str = "cmi.interactions";

/// One batch split into per-interaction groups and activity-level events.
/// Both keep arrival order, which is what last-write-wins relies on.
#[derive(Debug, Default)]
pub struct PartitionedEvents<'a> {
    pub interactions: BTreeMap<u32, Vec<&'a ScormEvent>>,
    pub activity: Vec<&'a ScormEvent>,
    pub dropped: usize,
}

pub fn split_out_interactions(events: &[ScormEvent]) -> PartitionedEvents<'_> {
    let mut partitioned = PartitionedEvents::default();

    for event in events {
        if !event.name.starts_with(INTERACTIONS_PREFIX) {
            partitioned.activity.push(event);
            continue;
        }

        // Only cmi.interactions.N.* is expected here, anything else is dropped.
        match interaction_index(&event.name) {
            Some(index) => partitioned
                .interactions
                .entry(index)
                .or_default()
                .push(event),
            None => {
                tracing::debug!("Dropping event with malformed interaction index: {}", event.name);
                partitioned.dropped += 1;
            }
        }
    }

    partitioned
}

pub fn interaction_index(name: &str) -> Option<u32> {
    name.split('.').nth(2)?.parse::<u32>().ok()
}
