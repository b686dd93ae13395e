//! Resumption state and reconnect parameter building

mod state;

pub use state::{ResumePayload, ResumptionState, CREATE_QUEUE_TOPIC, GET_DIFFS_TOPIC};
