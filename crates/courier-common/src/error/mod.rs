//! Error taxonomy for the listen pipeline

mod listen_error;

pub use listen_error::{ListenError, ListenResult, ROTATE_STATUSES};
