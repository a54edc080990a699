//! Users.
//!
//! The email is the only stable identity a legacy user has. Users exported
//! without one still migrate, under a salted `legacy_<name>` key, but they
//! can never be matched to certificates or registrations.

use super::{Entity, Mapped, UserRef};
use crate::keys::user_key;
use crate::record::{LegacyRecord, TargetRecord};
use crate::store::Document;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Candidate legacy field names for the email, in preference order.
const EMAIL_FIELDS: &[&str] = &["sa_email", "sa_emailid", "email"];

/// Role given to every migrated user.
pub const DEFAULT_ROLE: &str = "member";

pub fn legacy_email(record: &LegacyRecord) -> Option<String> {
    record.first_str(EMAIL_FIELDS).map(|e| e.to_lowercase())
}

fn legacy_name(record: &LegacyRecord) -> Option<String> {
    record.str_field("sa_name").or_else(|| {
        let full = format!(
            "{} {}",
            record.str_or_default("sa_firstname"),
            record.str_or_default("sa_lastname")
        );
        let full = full.trim();
        if full.is_empty() {
            None
        } else {
            Some(full.to_string())
        }
    })
}

pub fn map_user(record: &LegacyRecord, migrated_at: DateTime<Utc>) -> Mapped {
    let email = legacy_email(record);
    let name = legacy_name(record);
    let key = user_key(email.as_deref(), name.as_deref());

    let mut fields = Map::new();
    fields.insert("email".into(), Value::String(email.clone().unwrap_or_default()));
    fields.insert("name".into(), Value::String(name.unwrap_or_default()));
    fields.insert("phone".into(), Value::String(record.str_or_default("sa_phone")));
    fields.insert(
        "organization".into(),
        Value::String(
            record
                .first_str(&["sa_organization", "sa_college"])
                .unwrap_or_default(),
        ),
    );
    fields.insert("role".into(), Value::String(DEFAULT_ROLE.to_string()));
    fields.insert("legacy".into(), Value::Bool(true));

    let record = TargetRecord::new(Entity::Users.collection(), key, fields, migrated_at);
    if email.is_some() {
        Mapped::derived(record)
    } else {
        Mapped::synthetic(record)
    }
}

/// The user reference of a migrated user document, if it has an email.
pub fn user_ref(doc: &Document) -> Option<UserRef> {
    doc.str_field("email").map(|email| UserRef {
        key: doc.key.clone(),
        email: email.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_user_with_email() {
        let record = LegacyRecord::from_value(json!({
            "sa_email": "Jane.Doe@Example.com",
            "sa_name": "Jane Doe",
            "sa_college": "State U"
        }))
        .unwrap();

        let mapped = map_user(&record, Utc::now());

        assert!(!mapped.synthetic_key);
        assert_eq!(mapped.record.key, "jane_doe_example_com");
        assert_eq!(mapped.record.field("email"), Some(&json!("jane.doe@example.com")));
        assert_eq!(mapped.record.field("organization"), Some(&json!("State U")));
        assert_eq!(mapped.record.field("role"), Some(&json!("member")));
        assert_eq!(mapped.record.field("phone"), Some(&json!("")));
    }

    #[test]
    fn test_map_user_without_email() {
        let record =
            LegacyRecord::from_value(json!({"sa_firstname": "Jo", "sa_lastname": "Ray"})).unwrap();

        let mapped = map_user(&record, Utc::now());

        assert!(mapped.synthetic_key);
        assert!(mapped.record.key.starts_with("legacy_jo_ray_"));
        assert_eq!(mapped.record.field("email"), Some(&json!("")));
        assert_eq!(mapped.record.field("name"), Some(&json!("Jo Ray")));
    }

    #[test]
    fn test_user_ref_requires_email() {
        let with_email = Document {
            collection: "users".into(),
            key: "a_b_co".into(),
            fields: json!({"email": "a@b.co"}).as_object().cloned().unwrap(),
        };
        let without = Document {
            collection: "users".into(),
            key: "legacy_x_1".into(),
            fields: json!({"email": ""}).as_object().cloned().unwrap(),
        };

        assert_eq!(
            user_ref(&with_email),
            Some(UserRef {
                key: "a_b_co".into(),
                email: "a@b.co".into()
            })
        );
        assert_eq!(user_ref(&without), None);
    }
}
