//! Test fixtures and wire-shape generators
//!
//! Builders for the JSON shapes the upstream puts on the wire, so tests
//! read as scenarios instead of raw JSON blobs.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Message metadata block shared by sync-queue deltas
pub fn metadata(actor: i64, group: i64, timestamp_ms: i64) -> Value {
    json!({
        "actorFbId": actor.to_string(),
        "threadKey": {"threadFbId": group.to_string()},
        "timestamp": timestamp_ms.to_string(),
        "messageId": format!("mid.${}", unique_suffix()),
    })
}

/// A `NewMessage` sync delta
pub fn new_message_delta(actor: i64, group: i64, body: &str) -> Value {
    json!({
        "class": "NewMessage",
        "body": body,
        "messageMetadata": metadata(actor, group, 1_600_000_000_000),
    })
}

/// A `ParticipantsAddedToGroupThread` style delta
pub fn participants_added_delta(actor: i64, group: i64, added: &[i64]) -> Value {
    json!({
        "addedParticipants": added
            .iter()
            .map(|id| json!({"userFbId": id.to_string()}))
            .collect::<Vec<_>>(),
        "messageMetadata": metadata(actor, group, 1_600_000_000_000),
    })
}

/// An `AdminTextMessage` delta with the given subtype and payload
pub fn admin_text_delta(actor: i64, group: i64, subtype: &str, untyped: Value) -> Value {
    json!({
        "class": "AdminTextMessage",
        "type": subtype,
        "untypedData": untyped,
        "messageMetadata": metadata(actor, group, 1_600_000_000_000),
    })
}

/// Encode an inner document the way the client-payload tier does: the JSON
/// text spelled as an array of UTF-8 character codes.
pub fn client_payload_delta(inner: &Value) -> Value {
    let text = inner.to_string();
    json!({
        "class": "ClientPayload",
        "payload": text.bytes().map(|b| json!(b)).collect::<Vec<_>>(),
    })
}

/// A second-tier reaction delta, wrapped ready for `client_payload_delta`
pub fn reaction_inner(user: i64, group: i64, message_id: &str, action: i64) -> Value {
    json!({
        "deltas": [{
            "deltaMessageReaction": {
                "threadKey": {"threadFbId": group.to_string()},
                "messageId": message_id,
                "userId": user.to_string(),
                "action": action,
                "reaction": "\u{1f44d}",
            }
        }]
    })
}

/// A long-poll outer frame: envelope list, string sequence id, and
/// optionally the load-balancer sticky info
pub fn pull_frame(envelopes: Vec<Value>, seq: i64) -> Value {
    json!({"ms": envelopes, "seq": seq.to_string()})
}

/// Wrap a sync delta in a long-poll `delta` envelope
pub fn delta_envelope(delta: Value) -> Value {
    json!({"type": "delta", "delta": delta})
}

/// A typing envelope (`st` spelled as a string, the way the wire does)
pub fn typing_envelope(from: i64, group: Option<i64>, typing: bool) -> Value {
    let mut envelope = json!({
        "type": "typ",
        "from": from,
        "st": if typing { "1" } else { "0" },
    });
    if let Some(group) = group {
        envelope["thread_fbid"] = json!(group);
    }
    envelope
}

/// A sync-queue payload carrying `deltas` plus queue bookkeeping fields
pub fn sync_payload(deltas: Vec<Value>, last_seq: i64, sync_token: Option<&str>) -> Value {
    let mut payload = json!({
        "deltas": deltas,
        "lastIssuedSeqId": last_seq,
    });
    if let Some(token) = sync_token {
        payload["syncToken"] = json!(token);
        payload["firstDeltaSeqId"] = json!(last_seq);
    }
    payload
}
