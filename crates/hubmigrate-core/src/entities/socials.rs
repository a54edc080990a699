//! Social links, folded into one aggregate document.

use super::Entity;
use crate::keys::SOCIALS_KEY;
use crate::record::{LegacyRecord, TargetRecord};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

/// The aggregate document and how many legacy links were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SocialsDocument {
    pub record: TargetRecord,
    pub links: usize,
    /// Legacy entries without a URL.
    pub dropped: usize,
}

/// Fold every legacy social link into the `socials/links` document.
///
/// Returns `None` when no entry has a URL.
pub fn map_socials(records: &[LegacyRecord], migrated_at: DateTime<Utc>) -> Option<SocialsDocument> {
    let mut links = Vec::new();
    let mut dropped = 0;

    for record in records {
        let Some(url) = record.first_str(&["sa_link", "sa_url"]) else {
            dropped += 1;
            continue;
        };
        let platform = record
            .first_str(&["sa_platform", "sa_name"])
            .unwrap_or_default();
        links.push(json!({ "platform": platform, "url": url }));
    }

    if links.is_empty() {
        return None;
    }

    let count = links.len();
    let mut fields = Map::new();
    fields.insert("links".into(), Value::Array(links));
    fields.insert("count".into(), json!(count));

    Some(SocialsDocument {
        record: TargetRecord::new(Entity::Socials.collection(), SOCIALS_KEY, fields, migrated_at),
        links: count,
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(values: Vec<Value>) -> Vec<LegacyRecord> {
        values
            .into_iter()
            .filter_map(LegacyRecord::from_value)
            .collect()
    }

    #[test]
    fn test_map_socials() {
        let doc = map_socials(
            &records(vec![
                json!({"sa_platform": "GitHub", "sa_link": "https://github.com/hub"}),
                json!({"sa_name": "Discord", "sa_url": "https://discord.gg/hub"}),
                json!({"sa_platform": "Fax"}),
            ]),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(doc.record.key, "links");
        assert_eq!(doc.links, 2);
        assert_eq!(doc.dropped, 1);
        assert_eq!(
            doc.record.field("links"),
            Some(&json!([
                {"platform": "GitHub", "url": "https://github.com/hub"},
                {"platform": "Discord", "url": "https://discord.gg/hub"}
            ]))
        );
    }

    #[test]
    fn test_no_links() {
        assert!(map_socials(&records(vec![json!({"sa_platform": "x"})]), Utc::now()).is_none());
        assert!(map_socials(&[], Utc::now()).is_none());
    }
}
