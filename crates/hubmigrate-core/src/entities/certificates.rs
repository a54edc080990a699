//! Certificates, fetched per migrated user.

use super::events::timestamp_field;
use super::{Entity, Mapped, UserRef};
use crate::keys::{certificate_key, synthetic_key};
use crate::record::{LegacyRecord, TargetRecord};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

pub fn map_certificate(
    user: &UserRef,
    record: &LegacyRecord,
    migrated_at: DateTime<Utc>,
) -> Mapped {
    let event_name = record.first_str(&["sa_eventname", "sa_event"]);

    let mut fields = Map::new();
    fields.insert("email".into(), Value::String(user.email.clone()));
    fields.insert("userid".into(), Value::String(user.key.clone()));
    fields.insert(
        "eventname".into(),
        Value::String(event_name.clone().unwrap_or_default()),
    );
    fields.insert(
        "certificateurl".into(),
        Value::String(
            record
                .first_str(&["sa_certificateurl", "sa_url"])
                .unwrap_or_default(),
        ),
    );
    fields.insert("issuedate".into(), timestamp_field(record, "sa_issuedate"));

    let collection = Entity::Certificates.collection();
    match event_name {
        Some(event) => Mapped::derived(TargetRecord::new(
            collection,
            certificate_key(&user.email, &event),
            fields,
            migrated_at,
        )),
        None => Mapped::synthetic(TargetRecord::new(
            collection,
            synthetic_key("certificate"),
            fields,
            migrated_at,
        )),
    }
}
