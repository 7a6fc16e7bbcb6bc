use serde_json::{Map, Value};
use std::str::FromStr;

/// One inbound feed record: a flat JSON object as sent by the feed.
///
/// A `RawRecord` only guarantees the frame was a JSON object; it says nothing about which keys
/// are present. Use [decode_record](crate::parser::live::decode_record) to turn it into a
/// [RouteUpdate](crate::models::RouteUpdate).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    /// Parses one frame. Fails if the bytes are not UTF-8 JSON or if the JSON value is not an
    /// object.
    pub fn from_slice(frame: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice::<Map<String, Value>>(frame).map(RawRecord)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the message of an `error` payload, i.e. the feed rejecting or terminating the
    /// session rather than sending a record. The key alone marks the payload; a `null` error
    /// yields an empty message.
    pub fn remote_error(&self) -> Option<String> {
        self.get("error")
            .map(|value| value_to_text(value).unwrap_or_default())
    }

    /// Returns the field rendered as text. Strings are returned as-is, any other JSON value as
    /// its JSON text. `null` counts as absent.
    pub(crate) fn text(&self, key: &str) -> Option<String> {
        self.get(key).and_then(value_to_text)
    }

    /// Returns the field as a number. Numeric strings are accepted.
    pub(crate) fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

impl FromStr for RawRecord {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RawRecord::from_slice(s.as_bytes())
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(value: Map<String, Value>) -> Self {
        RawRecord(value)
    }
}

impl TryFrom<Value> for RawRecord {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value::<Map<String, Value>>(value).map(RawRecord)
    }
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
