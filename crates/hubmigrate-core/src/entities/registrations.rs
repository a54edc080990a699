//! Event registrations, fetched per migrated user.

use super::events::timestamp_field;
use super::{Entity, Mapped, UserRef};
use crate::keys::{registration_key, synthetic_key};
use crate::record::{LegacyRecord, TargetRecord};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

const DEFAULT_STATUS: &str = "registered";

pub fn map_registration(
    user: &UserRef,
    record: &LegacyRecord,
    migrated_at: DateTime<Utc>,
) -> Mapped {
    let event_id = record.str_field("sa_eventid");

    let mut fields = Map::new();
    fields.insert("email".into(), Value::String(user.email.clone()));
    fields.insert("userid".into(), Value::String(user.key.clone()));
    fields.insert(
        "eventid".into(),
        Value::String(event_id.clone().unwrap_or_default()),
    );
    fields.insert(
        "eventname".into(),
        Value::String(
            record
                .first_str(&["sa_eventname", "sa_name"])
                .unwrap_or_default(),
        ),
    );
    fields.insert(
        "status".into(),
        Value::String(
            record
                .str_field("sa_status")
                .map(|s| s.to_lowercase())
                .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        ),
    );
    fields.insert("registeredat".into(), timestamp_field(record, "sa_registeredat"));

    let collection = Entity::Registrations.collection();
    match event_id {
        Some(event_id) => Mapped::derived(TargetRecord::new(
            collection,
            registration_key(&user.email, &event_id),
            fields,
            migrated_at,
        )),
        None => Mapped::synthetic(TargetRecord::new(
            collection,
            synthetic_key("registration"),
            fields,
            migrated_at,
        )),
    }
}
