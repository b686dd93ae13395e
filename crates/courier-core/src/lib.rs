//! # courier-core
//!
//! Domain layer containing the typed event model, value objects, and domain
//! errors. This crate has zero dependencies on transport infrastructure
//! (HTTP client, sockets, async runtime, etc.).

pub mod error;
pub mod events;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use error::DomainError;
pub use events::{
    CallEndedEvent, CallJoinedEvent, CallStartedEvent, DisconnectReason, Event, EventHeader,
    InboxCounts, MessageEvent, PlanInfo, PresenceStatus, ReactionAction, ReactionEvent,
};
pub use value_objects::{ActorId, ActorIdParseError, EventTime, ThreadRef};
