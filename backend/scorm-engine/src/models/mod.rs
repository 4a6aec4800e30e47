pub mod activity_state;
pub mod event;
pub mod interaction;

pub use activity_state::{
    ActivityKey, ActivityProgress, ActivityState, ActivityStateUpdate, CompletionStatus,
    SuccessStatus,
};
pub use event::{IngestEventsRequest, ScormEvent, ScormValue};
pub use interaction::{InteractionRecord, InteractionType, InteractionUpdate};
