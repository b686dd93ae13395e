//! Field extraction helpers shared by the classification rules
//!
//! The wire spells the same thing several ways (numbers as strings, flags
//! as `"0"`/`"1"`, ids with an `fbid:` prefix); these helpers normalize
//! each spelling once so every rule reads the same way.

use chrono::{DateTime, Utc};
use courier_core::{ActorId, DomainError, EventHeader, EventTime, ThreadRef};
use serde_json::Value;

/// Read a string field
pub fn str_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

/// Read a string field, mapping the empty string to `None`.
///
/// The wire uses `""` to mean "cleared" for nicknames, titles, and icons.
pub fn cleared_str_field(value: &Value, field: &str) -> Option<String> {
    str_field(value, field)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Read an integer field that may be spelled as a number or a decimal string
pub fn int_field(value: &Value, field: &str) -> Option<i64> {
    match value.get(field)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Read a boolean flag that may be spelled `"0"`/`"1"`, `0`/`1`, or a bool
pub fn flag_field(value: &Value, field: &str) -> Option<bool> {
    match value.get(field)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.as_str() {
            "0" => Some(false),
            "1" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

/// Read a required actor id field
pub fn actor_field(value: &Value, field: &str) -> Result<ActorId, DomainError> {
    let raw = value.get(field).ok_or(DomainError::MissingActor)?;
    ActorId::from_json(raw).map_err(|_| DomainError::MissingActor)
}

/// Build the common header from a delta's `messageMetadata` object: actor
/// from `actorFbId`, thread from either key shape, millisecond `timestamp`.
pub fn metadata_header(data: &Value) -> Result<EventHeader, DomainError> {
    let meta = data
        .get("messageMetadata")
        .ok_or(DomainError::MissingField("messageMetadata"))?;
    let author = actor_field(meta, "actorFbId")?;
    let thread = ThreadRef::from_record(data)?;
    let at = millis_or_error(meta, "timestamp")?;
    Ok(EventHeader::new(author, thread, at))
}

/// Read a required millisecond timestamp field
pub fn millis_or_error(value: &Value, field: &'static str) -> Result<DateTime<Utc>, DomainError> {
    value
        .get(field)
        .and_then(EventTime::millis_from_json)
        .ok_or(DomainError::InvalidTimestamp(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cleared_str_field() {
        let v = json!({"nickname": "", "title": "hi"});
        assert_eq!(cleared_str_field(&v, "nickname"), None);
        assert_eq!(cleared_str_field(&v, "title"), Some("hi".to_string()));
        assert_eq!(cleared_str_field(&v, "missing"), None);
    }

    #[test]
    fn test_flag_field_spellings() {
        let v = json!({"a": "1", "b": "0", "c": 1, "d": 0, "e": true, "f": "yes"});
        assert_eq!(flag_field(&v, "a"), Some(true));
        assert_eq!(flag_field(&v, "b"), Some(false));
        assert_eq!(flag_field(&v, "c"), Some(true));
        assert_eq!(flag_field(&v, "d"), Some(false));
        assert_eq!(flag_field(&v, "e"), Some(true));
        assert_eq!(flag_field(&v, "f"), None);
    }

    #[test]
    fn test_metadata_header() {
        let data = json!({
            "messageMetadata": {
                "actorFbId": "11",
                "threadKey": {"threadFbId": "22"},
                "timestamp": "1600000000000",
            }
        });
        let header = metadata_header(&data).unwrap();
        assert_eq!(header.author, ActorId::new(11));
        assert_eq!(header.thread, ThreadRef::Group(22));
        assert_eq!(header.at.timestamp_millis(), 1_600_000_000_000);
    }

    #[test]
    fn test_metadata_header_missing_pieces() {
        assert!(matches!(
            metadata_header(&json!({})),
            Err(DomainError::MissingField("messageMetadata"))
        ));

        let no_thread = json!({"messageMetadata": {"actorFbId": 1, "timestamp": 0}});
        assert!(matches!(
            metadata_header(&no_thread),
            Err(DomainError::MissingThreadKey)
        ));

        let no_ts = json!({
            "messageMetadata": {"actorFbId": 1, "threadKey": {"threadFbId": 2}}
        });
        assert!(matches!(
            metadata_header(&no_ts),
            Err(DomainError::InvalidTimestamp("timestamp"))
        ));
    }
}
