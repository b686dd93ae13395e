//! Raw frame format
//!
//! One unit of data read from either transport: a topic plus an opaque JSON
//! payload. The long-poll channel produces a single synthetic topic; the
//! socket channel addresses frames by their upstream topic string.

use courier_common::{ListenError, ListenResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Synthetic topic for frames read off the long-poll channel
pub const PULL_TOPIC: &str = "pull";

/// Topic the delta sync queue delivers on
pub const SYNC_TOPIC: &str = "/t_ms";

/// One unit of data read from a transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFrame {
    /// Which channel/topic delivered the payload
    pub topic: String,

    /// The payload, untouched
    pub payload: Value,
}

impl RawFrame {
    /// Create a new frame
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Parse a topic-addressed socket message (`{"topic": ..., "payload": ...}`)
    pub fn from_socket_json(text: &str) -> ListenResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        let topic = value
            .get("topic")
            .and_then(Value::as_str)
            .ok_or_else(|| ListenError::malformed("socket frame has no topic"))?
            .to_string();
        let payload = value
            .get("payload")
            .cloned()
            .ok_or_else(|| ListenError::malformed("socket frame has no payload"))?;
        Ok(Self { topic, payload })
    }

    /// Parse a long-poll response body into a frame, stripping the
    /// anti-hijack prefix first.
    pub fn from_pull_body(body: &str) -> ListenResult<Self> {
        let json = strip_anti_hijack_prefix(body)?;
        let payload: Value = serde_json::from_str(json)?;
        Ok(Self::new(PULL_TOPIC, payload))
    }
}

/// Strip the `for (;;);` anti-hijack prefix the long-poll channel prepends
/// to every response body.
pub fn strip_anti_hijack_prefix(body: &str) -> ListenResult<&str> {
    body.find('{')
        .map(|idx| &body[idx..])
        .ok_or_else(|| ListenError::malformed("response body contains no JSON object"))
}
