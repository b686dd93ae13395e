//! Actor ID - the numeric identity of a user, page, or bot on the remote
//! service.
//!
//! The wire is inconsistent about how it spells these: sometimes a JSON
//! number, sometimes a decimal string, and sometimes a string with an
//! `fbid:` prefix. All forms normalize to the same 64-bit identity.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Numeric identity of an actor (64-bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ActorId(i64);

impl ActorId {
    /// Create a new `ActorId` from a raw i64 value
    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    #[inline]
    pub const fn into_inner(self) -> i64 {
        self.0
    }

    /// Check if the id is zero (absent/uninitialized)
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parse from the string forms the wire uses (`"1234"` or `"fbid:1234"`)
    pub fn parse(s: &str) -> Result<Self, ActorIdParseError> {
        let digits = s.strip_prefix("fbid:").unwrap_or(s);
        digits
            .parse::<i64>()
            .map(ActorId)
            .map_err(|_| ActorIdParseError::InvalidFormat)
    }

    /// Parse from a JSON value that may be a number or a string
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ActorIdParseError> {
        match value {
            serde_json::Value::Number(n) => {
                n.as_i64().map(ActorId).ok_or(ActorIdParseError::InvalidFormat)
            }
            serde_json::Value::String(s) => Self::parse(s),
            _ => Err(ActorIdParseError::InvalidFormat),
        }
    }
}

/// Error when parsing an `ActorId` from a string
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ActorIdParseError {
    #[error("invalid actor id format")]
    InvalidFormat,
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ActorId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ActorId> for i64 {
    fn from(id: ActorId) -> Self {
        id.into_inner()
    }
}

// Serialize as a string: ids exceed the 53-bit precision of downstream
// JavaScript consumers when encoded as numbers.
impl Serialize for ActorId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for ActorId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ActorIdVisitor;

        impl serde::de::Visitor<'_> for ActorIdVisitor {
            type Value = ActorId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an actor id as a string or integer")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                ActorId::parse(v).map_err(E::custom)
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(ActorId(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                i64::try_from(v).map(ActorId).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(ActorIdVisitor)
    }
}
