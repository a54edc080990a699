//! Document store trait and types.

use crate::config::MigrationConfig;
use crate::error::{MigrationError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub collection: String,
    pub key: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// A non-empty string field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// One merge-upsert inside a batch.
///
/// Creates the document when absent, otherwise overlays `fields` onto it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOp {
    pub collection: String,
    pub key: String,
    pub fields: Map<String, Value>,
}

impl WriteOp {
    pub fn merge(
        collection: impl Into<String>,
        key: impl Into<String>,
        fields: Map<String, Value>,
    ) -> Self {
        Self {
            collection: collection.into(),
            key: key.into(),
            fields,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Equality-filter query over one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, SortDirection)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a document satisfies every filter.
    pub fn matches(&self, doc: &Document) -> bool {
        doc.collection == self.collection
            && self
                .filters
                .iter()
                .all(|(field, expected)| doc.fields.get(field) == Some(expected))
    }

    /// Filter, order and truncate a collection scan.
    ///
    /// Documents missing the ordering field sort first; ties are broken by key
    /// so results are stable across backends.
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut results: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).collect();

        match &self.order_by {
            Some((field, direction)) => results.sort_by(|a, b| {
                let ord = compare_values(a.fields.get(field), b.fields.get(field))
                    .then_with(|| a.key.cmp(&b.key));
                match direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            }),
            None => results.sort_by(|a, b| a.key.cmp(&b.key)),
        }

        if let Some(limit) = self.limit {
            results.truncate(limit);
        }
        results
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Overlay `overlay` onto `target`.
///
/// Nested objects merge recursively; every other value replaces what was
/// there. Fields absent from `overlay` are left untouched.
pub fn merge_fields(target: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (field, value) in overlay {
        if let Value::Object(incoming) = value {
            if let Some(Value::Object(existing)) = target.get_mut(&field) {
                merge_fields(existing, incoming);
                continue;
            }
            target.insert(field, Value::Object(incoming));
        } else {
            target.insert(field, value);
        }
    }
}

/// Reject a batch the store would not accept atomically.
pub fn validate_batch(ops: &[WriteOp]) -> Result<()> {
    if ops.len() > MigrationConfig::BATCH_LIMIT {
        return Err(MigrationError::Write {
            message: format!(
                "batch of {} exceeds the {}-write limit",
                ops.len(),
                MigrationConfig::BATCH_LIMIT
            ),
            records: ops.len(),
        });
    }

    for op in ops {
        if op.collection.is_empty() || op.collection.contains('/') {
            return Err(MigrationError::Write {
                message: format!("invalid collection name '{}'", op.collection),
                records: ops.len(),
            });
        }
        if op.key.is_empty() || op.key.contains('/') {
            return Err(MigrationError::Write {
                message: format!("invalid document key '{}' in {}", op.key, op.collection),
                records: ops.len(),
            });
        }
    }

    Ok(())
}

/// Document store backend.
///
/// All operations are synchronous to match rusqlite's API. A batch commit is
/// all-or-nothing: on error, none of its writes are visible.
pub trait DocumentStore: Send + Sync {
    /// Get a document by key.
    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>>;

    /// Run an equality-filter query.
    fn query(&self, query: &Query) -> Result<Vec<Document>>;

    /// Atomically merge-upsert up to [`MigrationConfig::BATCH_LIMIT`] documents.
    fn commit_batch(&self, ops: &[WriteOp]) -> Result<()>;

    /// Number of documents in a collection.
    fn count(&self, collection: &str) -> Result<usize>;
}
