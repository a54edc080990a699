//! Legacy and target record shapes.
//!
//! Legacy payloads are loosely typed: every field is optional and may arrive as
//! a string, a number or not at all. [`LegacyRecord`] exposes accessors that
//! validate and default one field at a time instead of deserializing into a
//! fixed struct.

use crate::store::WriteOp;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field attached to every migrated document.
pub const MIGRATED_AT_FIELD: &str = "migratedAt";

/// An untyped record as returned by a legacy endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegacyRecord(Map<String, Value>);

impl LegacyRecord {
    /// Wrap a JSON value. Returns `None` for anything but an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// A trimmed, non-empty string. Numbers and booleans are stringified.
    pub fn str_field(&self, field: &str) -> Option<String> {
        let value = match self.0.get(field)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// Like [`str_field`](Self::str_field) but defaulting to `""`.
    pub fn str_or_default(&self, field: &str) -> String {
        self.str_field(field).unwrap_or_default()
    }

    /// First present string among several candidate field names.
    pub fn first_str(&self, fields: &[&str]) -> Option<String> {
        fields.iter().find_map(|f| self.str_field(f))
    }
}

impl From<Map<String, Value>> for LegacyRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// A mapped record ready to be merged into the target store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub collection: String,
    pub key: String,
    pub fields: Map<String, Value>,
}

impl TargetRecord {
    /// Build a record, stamping it with `migratedAt`.
    pub fn new(
        collection: impl Into<String>,
        key: impl Into<String>,
        mut fields: Map<String, Value>,
        migrated_at: DateTime<Utc>,
    ) -> Self {
        fields.insert(
            MIGRATED_AT_FIELD.to_string(),
            Value::String(migrated_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        Self {
            collection: collection.into(),
            key: key.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn into_write(self) -> WriteOp {
        WriteOp::merge(self.collection, self.key, self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> LegacyRecord {
        LegacyRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(LegacyRecord::from_value(json!([1, 2])).is_none());
        assert!(LegacyRecord::from_value(json!("x")).is_none());
    }

    #[test]
    fn test_str_field_trims_and_stringifies() {
        let r = record(json!({"a": "  x ", "b": "   ", "c": 42, "d": null, "e": true}));
        assert_eq!(r.str_field("a").as_deref(), Some("x"));
        assert_eq!(r.str_field("b"), None);
        assert_eq!(r.str_field("c").as_deref(), Some("42"));
        assert_eq!(r.str_field("d"), None);
        assert_eq!(r.str_field("e").as_deref(), Some("true"));
        assert_eq!(r.str_or_default("missing"), "");
    }

    #[test]
    fn test_first_str() {
        let r = record(json!({"sa_mail": "", "sa_email": "a@b.co"}));
        assert_eq!(
            r.first_str(&["sa_mail", "sa_email"]).as_deref(),
            Some("a@b.co")
        );
    }

    #[test]
    fn test_target_record_has_migrated_at() {
        let now = Utc::now();
        let target = TargetRecord::new("team", "jane_doe", Map::new(), now);
        let stamp = target.field(MIGRATED_AT_FIELD).and_then(|v| v.as_str()).unwrap();
        assert!(DateTime::parse_from_rfc3339(stamp).is_ok());
    }
}
