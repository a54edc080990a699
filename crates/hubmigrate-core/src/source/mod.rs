//! Legacy record sources.
//!
//! A source answers one request per entity category, optionally scoped to a
//! single user's email, with a list of loosely typed records.

mod fixed;
mod http;

pub use fixed::{FetchCall, StaticLegacySource};
pub use http::HttpLegacySource;

use crate::entities::Entity;
use crate::error::Result;
use crate::record::LegacyRecord;
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

/// Read-only access to the legacy system.
#[async_trait]
pub trait LegacySource: Send + Sync {
    /// Fetch every record of `entity`, or only those belonging to `email`.
    async fn fetch(&self, entity: Entity, email: Option<&str>) -> Result<Vec<LegacyRecord>>;

    /// Where `entity` is read from, for messages.
    fn describe(&self, entity: Entity) -> String;
}

/// Turn a decoded response body into records.
///
/// Accepts a bare array or a `{"data": [...]}` envelope. Entries that are not
/// objects are dropped. Returns `None` for any other shape, including error
/// envelopes such as `{"error": "Unauthorized"}`.
pub fn parse_records(entity: Entity, body: Value) -> Option<Vec<LegacyRecord>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };

    let total = items.len();
    let records: Vec<LegacyRecord> = items
        .into_iter()
        .filter_map(LegacyRecord::from_value)
        .collect();

    if records.len() < total {
        warn!(
            "Dropped {} non-object {} entries from legacy response",
            total - records.len(),
            entity
        );
    }

    Some(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_array() {
        let records = parse_records(Entity::Team, json!([{"a": 1}, 5, {"b": 2}])).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_parse_data_envelope() {
        let records = parse_records(Entity::Events, json!({"data": [{"a": 1}]})).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].get("a").is_some());
    }

    #[test]
    fn test_parse_rejects_objects_without_array() {
        assert!(parse_records(Entity::Team, json!({"error": "Unauthorized"})).is_none());
        assert!(parse_records(Entity::Socials, json!({"sa_platform": "x"})).is_none());
        assert!(parse_records(Entity::Events, json!({"data": {"a": 1}})).is_none());
        assert!(parse_records(Entity::Events, json!({"data": null})).is_none());
    }

    #[test]
    fn test_parse_rejects_scalars() {
        assert!(parse_records(Entity::Users, json!("nope")).is_none());
        assert!(parse_records(Entity::Users, json!(null)).is_none());
    }

    #[tokio::test]
    async fn test_static_source_records_calls() {
        let source = StaticLegacySource::new()
            .with_records(Entity::Team, vec![json!({"sa_firstname": "Jane"})])
            .with_user_failure(Entity::Certificates, "a@b.co", 500);

        assert_eq!(source.fetch(Entity::Team, None).await.unwrap().len(), 1);
        assert!(source.fetch(Entity::Events, None).await.unwrap().is_empty());
        let err = source
            .fetch(Entity::Certificates, Some("a@b.co"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));

        assert_eq!(
            source.calls()[2],
            FetchCall {
                entity: Entity::Certificates,
                email: Some("a@b.co".into())
            }
        );
    }
}
