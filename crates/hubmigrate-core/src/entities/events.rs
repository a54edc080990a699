//! Events.

use super::{Entity, Mapped};
use crate::keys::{event_key, synthetic_key};
use crate::record::{LegacyRecord, TargetRecord};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use tracing::warn;

/// Accepted legacy date-time layouts, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Accepted date-only layouts, taken as local midnight.
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

const STRING_FIELDS: &[(&str, &str)] = &[
    ("sa_name", "name"),
    ("sa_description", "description"),
    ("sa_venue", "venue"),
    ("sa_imageurl", "imageurl"),
];

/// Parse a legacy timestamp as local time.
///
/// Timestamps carrying an explicit offset (RFC 3339) keep their instant.
pub fn parse_legacy_datetime(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }

    let naive = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    // A wall-clock time inside a DST gap has no local instant; read it as UTC.
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| Some(Local.from_utc_datetime(&naive)))
}

/// Parse `field` into an RFC 3339 string, or `null` when absent or unreadable.
pub(crate) fn timestamp_field(record: &LegacyRecord, field: &str) -> Value {
    match record.str_field(field) {
        Some(raw) => match parse_legacy_datetime(&raw) {
            Some(dt) => Value::String(dt.to_rfc3339()),
            None => {
                warn!("Unparseable {} value '{}', storing null", field, raw);
                Value::Null
            }
        },
        None => Value::Null,
    }
}

/// Map one event. Registration is always closed on migrated events.
pub fn map_event(record: &LegacyRecord, migrated_at: DateTime<Utc>) -> Mapped {
    let legacy_id = record.str_field("sa_eventid");

    let mut fields = Map::new();
    for (legacy, target) in STRING_FIELDS {
        fields.insert((*target).to_string(), Value::String(record.str_or_default(legacy)));
    }
    if record.str_field("sa_imageurl").is_none() {
        fields.insert("imageurl".into(), Value::String(record.str_or_default("sa_image")));
    }
    fields.insert("startdate".into(), timestamp_field(record, "sa_start"));
    fields.insert("enddate".into(), timestamp_field(record, "sa_end"));
    fields.insert("registrationopen".into(), Value::Bool(false));
    fields.insert(
        "legacyid".into(),
        Value::String(legacy_id.clone().unwrap_or_default()),
    );

    match event_key(legacy_id.as_deref()) {
        Some(key) => Mapped::derived(TargetRecord::new(
            Entity::Events.collection(),
            key,
            fields,
            migrated_at,
        )),
        None => Mapped::synthetic(TargetRecord::new(
            Entity::Events.collection(),
            synthetic_key("event"),
            fields,
            migrated_at,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_twelve_hour_format() {
        let dt = parse_legacy_datetime("10/9/2023 8:00 AM").unwrap();
        assert_eq!(dt.naive_local(), local(2023, 10, 9, 8, 0));

        let dt = parse_legacy_datetime("1/15/2024 12:30 PM").unwrap();
        assert_eq!(dt.naive_local(), local(2024, 1, 15, 12, 30));

        let dt = parse_legacy_datetime("1/15/2024 11:05 pm").unwrap();
        assert_eq!(dt.naive_local(), local(2024, 1, 15, 23, 5));
    }

    #[test]
    fn test_parse_other_formats() {
        assert_eq!(
            parse_legacy_datetime("2023-10-09T18:45:00").unwrap().naive_local(),
            local(2023, 10, 9, 18, 45)
        );
        assert_eq!(
            parse_legacy_datetime("10/09/2023").unwrap().naive_local(),
            local(2023, 10, 9, 0, 0)
        );
        let utc = parse_legacy_datetime("2023-10-09T08:00:00Z").unwrap();
        assert_eq!(utc.with_timezone(&Utc).naive_utc(), local(2023, 10, 9, 8, 0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_legacy_datetime("").is_none());
        assert!(parse_legacy_datetime("next tuesday").is_none());
        assert!(parse_legacy_datetime("13/45/2023 8:00 AM").is_none());
    }

    #[test]
    fn test_map_event() {
        let record = LegacyRecord::from_value(json!({
            "sa_eventid": "ev1",
            "sa_name": "Meetup",
            "sa_start": "10/9/2023 8:00 AM"
        }))
        .unwrap();

        let mapped = map_event(&record, Utc::now());

        assert!(!mapped.synthetic_key);
        assert_eq!(mapped.record.collection, "events");
        assert_eq!(mapped.record.key, "ev1");
        assert_eq!(mapped.record.field("name"), Some(&json!("Meetup")));
        assert_eq!(mapped.record.field("registrationopen"), Some(&json!(false)));
        assert_eq!(mapped.record.field("enddate"), Some(&Value::Null));
        assert_eq!(mapped.record.field("description"), Some(&json!("")));

        let start = mapped.record.field("startdate").and_then(Value::as_str).unwrap();
        let start = DateTime::parse_from_rfc3339(start).unwrap().with_timezone(&Local);
        assert_eq!(start.naive_local(), local(2023, 10, 9, 8, 0));
    }

    #[test]
    fn test_event_without_id_gets_fresh_key() {
        let record = LegacyRecord::from_value(json!({"sa_name": "Untracked"})).unwrap();
        let a = map_event(&record, Utc::now());
        let b = map_event(&record, Utc::now());
        assert!(a.synthetic_key);
        assert_ne!(a.record.key, b.record.key);
        assert_eq!(a.record.field("legacyid"), Some(&json!("")));
    }
}
