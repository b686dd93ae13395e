//! Client-payload decoding
//!
//! Some deltas wrap a second tier of deltas in a byte-array-encoded JSON
//! string: the `payload` field is an array of integers, each the UTF-8
//! character code of the encoded text. This is an upstream transport
//! artifact, so the decode lives here as one narrow step rather than a
//! general-purpose codec.
//!
//! A malformed payload is a recoverable parse failure scoped to the one
//! delta that carried it; it never aborts the surrounding frame.

use courier_common::{ListenError, ListenResult};
use serde_json::Value;

/// Decode the `payload` byte array of a client-payload delta into its
/// inner list of deltas.
pub fn decode_client_payload(payload: &Value) -> ListenResult<Vec<Value>> {
    let codes = payload
        .as_array()
        .ok_or_else(|| ListenError::malformed("client payload is not an array"))?;

    let mut bytes = Vec::with_capacity(codes.len());
    for code in codes {
        let byte = code
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .ok_or_else(|| ListenError::malformed("client payload code out of byte range"))?;
        bytes.push(byte);
    }

    let text = String::from_utf8(bytes)
        .map_err(|_| ListenError::malformed("client payload is not valid UTF-8"))?;
    let inner: Value = serde_json::from_str(&text)?;

    Ok(inner
        .get("deltas")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default())
}
