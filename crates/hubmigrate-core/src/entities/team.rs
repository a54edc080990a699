//! Team members.

use super::{Entity, Mapped};
use crate::keys::{synthetic_key, team_member_key};
use crate::record::{LegacyRecord, TargetRecord};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

/// Legacy field → target field, all optional strings.
const STRING_FIELDS: &[(&str, &str)] = &[
    ("sa_firstname", "firstname"),
    ("sa_lastname", "lastname"),
    ("sa_designation", "designation"),
    ("sa_email", "email"),
    ("sa_imageurl", "imageurl"),
    ("sa_linkedin", "linkedin"),
    ("sa_github", "github"),
    ("sa_bio", "bio"),
];

/// Map one team member. `order` is its position in the legacy list.
pub fn map_member(record: &LegacyRecord, order: usize, migrated_at: DateTime<Utc>) -> Mapped {
    let mut fields = Map::new();
    for (legacy, target) in STRING_FIELDS {
        fields.insert((*target).to_string(), Value::String(record.str_or_default(legacy)));
    }
    // Older exports used `sa_image`
    if record.str_field("sa_imageurl").is_none() {
        fields.insert("imageurl".into(), Value::String(record.str_or_default("sa_image")));
    }
    fields.insert("order".into(), json!(order));

    let first = record.str_or_default("sa_firstname");
    let last = record.str_or_default("sa_lastname");

    match team_member_key(&first, &last) {
        Some(key) => Mapped::derived(TargetRecord::new(
            Entity::Team.collection(),
            key,
            fields,
            migrated_at,
        )),
        None => Mapped::synthetic(TargetRecord::new(
            Entity::Team.collection(),
            synthetic_key("member"),
            fields,
            migrated_at,
        )),
    }
}
