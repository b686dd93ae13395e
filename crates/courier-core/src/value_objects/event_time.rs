//! Event time - normalization of the wire's assorted timestamp spellings.
//!
//! Depending on the delta kind, timestamps arrive as a millisecond count in
//! a decimal string, a millisecond count as a JSON number, or a second
//! count as a JSON number. Everything normalizes to `DateTime<Utc>`.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Timestamp normalization helpers
pub struct EventTime;

impl EventTime {
    /// Interpret a raw count as milliseconds since the Unix epoch
    pub fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(ms).single()
    }

    /// Interpret a raw count as seconds since the Unix epoch
    pub fn from_seconds(secs: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(secs, 0).single()
    }

    /// Read a millisecond timestamp from a JSON field that may be a number
    /// or a decimal string
    pub fn millis_from_json(value: &Value) -> Option<DateTime<Utc>> {
        Self::from_millis(int_value(value)?)
    }

    /// Read a second timestamp from a JSON field that may be a number or a
    /// decimal string
    pub fn seconds_from_json(value: &Value) -> Option<DateTime<Utc>> {
        Self::from_seconds(int_value(value)?)
    }
}

fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
