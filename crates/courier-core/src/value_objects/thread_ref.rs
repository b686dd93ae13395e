//! Thread reference - immutable identity of a conversation.
//!
//! Derived deterministically from the wire `threadKey` object. The key
//! carries exactly one of three mutually exclusive fields:
//! `threadFbId` (group conversation), `otherUserFbId` (1:1 conversation),
//! or `pageFbId` (conversation with a page).

use crate::error::DomainError;
use crate::value_objects::ActorId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identity of a conversation on the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ThreadRef {
    /// Group conversation, keyed by its own thread id
    Group(i64),
    /// 1:1 conversation, keyed by the other participant's id
    User(i64),
    /// Conversation with a page account
    Page(i64),
}

impl ThreadRef {
    /// Derive a thread reference from a wire `threadKey` object.
    ///
    /// The same key shape always yields the same identity, regardless of
    /// which caller performs the derivation.
    pub fn from_thread_key(key: &Value) -> Result<Self, DomainError> {
        if let Some(id) = int_field(key, "threadFbId") {
            return Ok(Self::Group(id));
        }
        if let Some(id) = int_field(key, "otherUserFbId") {
            return Ok(Self::User(id));
        }
        if let Some(id) = int_field(key, "pageFbId") {
            return Ok(Self::Page(id));
        }
        Err(DomainError::MissingThreadKey)
    }

    /// Derive a thread reference from a record that carries the key under
    /// one of the two places the wire puts it (`threadKey` at the top level
    /// or nested under `messageMetadata`).
    pub fn from_record(record: &Value) -> Result<Self, DomainError> {
        if let Some(key) = record.get("threadKey") {
            return Self::from_thread_key(key);
        }
        if let Some(key) = record.pointer("/messageMetadata/threadKey") {
            return Self::from_thread_key(key);
        }
        Err(DomainError::MissingThreadKey)
    }

    /// The numeric id of the conversation
    #[inline]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Group(id) | Self::User(id) | Self::Page(id) => *id,
        }
    }

    /// Whether this is a group conversation
    #[inline]
    pub const fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    /// The other participant of a 1:1 conversation, if this is one
    pub fn other_user(&self) -> Option<ActorId> {
        match self {
            Self::User(id) => Some(ActorId::new(*id)),
            _ => None,
        }
    }
}

/// Read an integer field that may be spelled as a number or a decimal string
fn int_field(value: &Value, field: &str) -> Option<i64> {
    match value.get(field)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group(id) => write!(f, "group:{id}"),
            Self::User(id) => write!(f, "user:{id}"),
            Self::Page(id) => write!(f, "page:{id}"),
        }
    }
}
