//! Resumption state
//!
//! Tracks the monotonic sequence id, the one-time sync token, and the
//! per-listen session id. Owned by exactly one listener; mutated after
//! every frame; discarded when the listen loop ends.
//!
//! Reconnects always resume from the furthest durably-observed point, which
//! bounds redelivery to at most the one frame in flight at disconnect
//! (at-least-once delivery).

use courier_core::ActorId;
use rand::Rng;
use serde_json::{json, Value};

/// Topic that creates a new server-side ordered queue
pub const CREATE_QUEUE_TOPIC: &str = "/messenger_sync_create_queue";

/// Topic that resumes an existing queue from a sync token
pub const GET_DIFFS_TOPIC: &str = "/messenger_sync_get_diffs";

/// Sync protocol version the payloads speak
const SYNC_API_VERSION: u64 = 10;

/// Upper bound on deltas the client advertises it can process per batch
const MAX_DELTAS: u64 = 1000;

/// Requested server-side batch size
const DELTA_BATCH_SIZE: u64 = 500;

/// The reconnect request a transport announces on connect
#[derive(Debug, Clone)]
pub struct ResumePayload {
    /// Publish topic for the request
    pub topic: &'static str,
    /// Request body
    pub body: Value,
    /// Sequence id the request resumes from
    pub sequence_id: i64,
    /// Session id of the listen() call this belongs to
    pub session_id: u64,
}

impl ResumePayload {
    /// Whether this request creates a new queue (no sync token yet)
    #[must_use]
    pub fn is_create_queue(&self) -> bool {
        self.topic == CREATE_QUEUE_TOPIC
    }
}

/// Cursor into the remote event log plus the opaque resumption handle
#[derive(Debug)]
pub struct ResumptionState {
    sequence_id: i64,
    sync_token: Option<String>,
    session_id: u64,
}

impl ResumptionState {
    /// Create state starting from an out-of-band "current sequence id"
    pub fn new(initial_sequence_id: i64) -> Self {
        Self {
            sequence_id: initial_sequence_id,
            sync_token: None,
            session_id: rand::thread_rng().gen::<u64>() & ((1u64 << 53) - 1),
        }
    }

    /// The furthest sequence id observed so far
    #[must_use]
    pub fn sequence_id(&self) -> i64 {
        self.sequence_id
    }

    /// The sync token, once the server has issued one
    #[must_use]
    pub fn sync_token(&self) -> Option<&str> {
        self.sync_token.as_deref()
    }

    /// Session id, stable for the lifetime of one listen() call
    #[must_use]
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Build the reconnect request.
    ///
    /// Without a sync token this creates a new server-side queue at the
    /// last known sequence id; with one it resumes the existing queue
    /// exactly.
    #[must_use]
    pub fn build_resume_payload(&self, viewer: ActorId) -> ResumePayload {
        let (topic, body) = match &self.sync_token {
            None => (
                CREATE_QUEUE_TOPIC,
                json!({
                    "sync_api_version": SYNC_API_VERSION,
                    "max_deltas_able_to_process": MAX_DELTAS,
                    "delta_batch_size": DELTA_BATCH_SIZE,
                    "encoding": "JSON",
                    "entity_fbid": viewer.into_inner(),
                    "initial_titan_sequence_id": self.sequence_id,
                    "device_params": null,
                }),
            ),
            Some(token) => (
                GET_DIFFS_TOPIC,
                json!({
                    "sync_api_version": SYNC_API_VERSION,
                    "max_deltas_able_to_process": MAX_DELTAS,
                    "delta_batch_size": DELTA_BATCH_SIZE,
                    "encoding": "JSON",
                    "last_seq_id": self.sequence_id,
                    "sync_token": token,
                }),
            ),
        };

        ResumePayload {
            topic,
            body,
            sequence_id: self.sequence_id,
            session_id: self.session_id,
        }
    }

    /// Fold one frame payload into the state.
    ///
    /// Stores a fresh sync token (issued once, on the first frame of a
    /// newly created queue) and advances the sequence id, never backwards.
    /// Returns `true` when the server demanded a resync, in which case the
    /// token is cleared so the next connect recreates the queue.
    pub fn absorb(&mut self, payload: &Value) -> bool {
        if let Some(code) = payload.get("errorCode").and_then(Value::as_str) {
            tracing::warn!(
                session_id = self.session_id,
                error_code = %code,
                "Server demanded queue resync"
            );
            self.sync_token = None;
            return true;
        }

        if let Some(token) = payload.get("syncToken").and_then(Value::as_str) {
            if self.sync_token.is_none() {
                tracing::debug!(session_id = self.session_id, "Sync token acquired");
            }
            self.sync_token = Some(token.to_string());
        }

        for field in ["seq", "lastIssuedSeqId", "firstDeltaSeqId"] {
            if let Some(seq) = int_field(payload, field) {
                if seq > self.sequence_id {
                    self.sequence_id = seq;
                }
            }
        }

        false
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
