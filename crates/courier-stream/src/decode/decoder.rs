//! Delta decoder
//!
//! Flattens one raw frame into an ordered list of delta records, recursing
//! through batch arrays, envelope arrays, and the byte-array-encoded
//! client-payload tier. Relative order is preserved across all tiers.
//!
//! Decoding failures are scoped to the record that caused them: the rest of
//! the frame always decodes.

use super::client_payload::decode_client_payload;
use crate::classify::tags;
use crate::transport::RawFrame;
use courier_common::ListenError;
use serde_json::Value;

/// One atomic change notification, flattened out of a frame
#[derive(Debug, Clone)]
pub struct DeltaRecord {
    /// Envelope discriminator (`typ`, `inbox`, ...) when the record came
    /// from an envelope; `None` for sync-queue deltas
    pub tag: Option<String>,

    /// The record body, untouched
    pub data: Value,
}

impl DeltaRecord {
    /// A sync-queue delta (discriminated by its `class` field)
    #[must_use]
    pub fn sync(data: Value) -> Self {
        Self { tag: None, data }
    }

    /// An envelope record (discriminated by its envelope `type`)
    #[must_use]
    pub fn tagged(tag: impl Into<String>, data: Value) -> Self {
        Self {
            tag: Some(tag.into()),
            data,
        }
    }

    /// The `class` discriminator, when present
    #[must_use]
    pub fn class(&self) -> Option<&str> {
        self.data.get("class").and_then(Value::as_str)
    }

    /// Human-readable label of which discriminator produced this record
    #[must_use]
    pub fn source_label(&self) -> String {
        if let Some(tag) = &self.tag {
            return tag.clone();
        }
        self.class().map_or_else(|| "delta".to_string(), str::to_string)
    }
}

/// The outcome of decoding one frame
#[derive(Debug, Default)]
pub struct Decoded {
    /// Flattened records, in original order
    pub records: Vec<DeltaRecord>,
    /// Record-scoped failures encountered along the way
    pub failures: Vec<ListenError>,
}

/// Flattens frames into ordered delta records
pub struct DeltaDecoder;

impl DeltaDecoder {
    /// Decode one frame into its ordered records.
    ///
    /// For any frame with N records (including nested batches and
    /// client-payload tiers), exactly N records come back, in order.
    #[must_use]
    pub fn decode(frame: &RawFrame) -> Decoded {
        let mut decoded = Decoded::default();

        // Topic-addressed channels that deliver a bare record per frame
        match frame.topic.as_str() {
            "/thread_typing" | "/orca_typing_notifications" => {
                decoded
                    .records
                    .push(DeltaRecord::tagged(tags::ENV_TYPING, frame.payload.clone()));
                return decoded;
            }
            "/orca_presence" => {
                decoded.records.push(DeltaRecord::tagged(
                    tags::ENV_PROXY_PRESENCE,
                    frame.payload.clone(),
                ));
                return decoded;
            }
            _ => {}
        }

        Self::walk_payload(&frame.payload, &mut decoded);
        decoded
    }

    fn walk_payload(payload: &Value, out: &mut Decoded) {
        let mut matched = false;

        if let Some(envelopes) = payload.get("ms").and_then(Value::as_array) {
            matched = true;
            for envelope in envelopes {
                Self::walk_envelope(envelope, out);
            }
        }

        if let Some(deltas) = payload.get("deltas").and_then(Value::as_array) {
            matched = true;
            for delta in deltas {
                Self::push_delta(delta, out);
            }
        }

        if let Some(batches) = payload.get("batches").and_then(Value::as_array) {
            matched = true;
            for batch in batches {
                Self::walk_payload(batch, out);
            }
        }

        if matched {
            return;
        }

        if payload.get("type").and_then(Value::as_str).is_some() {
            Self::walk_envelope(payload, out);
        } else if payload.get("class").and_then(Value::as_str).is_some() {
            Self::push_delta(payload, out);
        }
        // Anything else (lb frames, ack payloads) carries no records.
    }

    fn walk_envelope(envelope: &Value, out: &mut Decoded) {
        let Some(kind) = envelope.get("type").and_then(Value::as_str) else {
            out.failures
                .push(ListenError::malformed("envelope has no type field"));
            return;
        };

        if kind == tags::ENV_DELTA {
            match envelope.get("delta") {
                Some(delta) => Self::push_delta(delta, out),
                None => out
                    .failures
                    .push(ListenError::malformed("delta envelope has no delta body")),
            }
            return;
        }

        out.records
            .push(DeltaRecord::tagged(kind, envelope.clone()));
    }

    fn push_delta(delta: &Value, out: &mut Decoded) {
        if delta.get("class").and_then(Value::as_str) == Some(tags::CLASS_CLIENT_PAYLOAD) {
            let payload = delta.get("payload").unwrap_or(&Value::Null);
            match decode_client_payload(payload) {
                Ok(inner) => {
                    for record in inner {
                        out.records.push(DeltaRecord::sync(record));
                    }
                }
                Err(e) => out.failures.push(e),
            }
            return;
        }

        out.records.push(DeltaRecord::sync(delta.clone()));
    }
}
