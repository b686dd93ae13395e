//! The listener - read loop, reconnects, and event emission

mod event_stream;
mod listener;
mod state;

pub use event_stream::EventStream;
pub use listener::{Listener, ListenerHandle};
pub use state::ListenerState;
