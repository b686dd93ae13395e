//! # courier-stream
//!
//! The real-time ingestion pipeline: unified frame transports (HTTP
//! long-poll and a persistent topic-addressed socket), resumption state,
//! the delta decoder, the event classifier, and the listener that ties
//! them together.
//!
//! Data flow: `TransportSession` -> `FrameSource` -> `Listener` ->
//! `DeltaDecoder` -> `classify` -> caller.

pub mod classify;
pub mod decode;
pub mod listener;
pub mod resume;
pub mod transport;

// Re-export commonly used types at crate root
pub use classify::classify;
pub use decode::{Decoded, DeltaDecoder, DeltaRecord};
pub use listener::{EventStream, Listener, ListenerHandle, ListenerState};
pub use resume::{ResumePayload, ResumptionState};
pub use transport::{
    FrameSource, HttpTransport, LongPollSource, RawFrame, SocketSource, TransportSession,
};
