//! In-process document store.
//!
//! Used for dry runs (nothing leaves the process) and by tests.

use super::traits::{merge_fields, validate_batch, Document, DocumentStore, Query, WriteOp};
use crate::error::{MigrationError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

type Collections = BTreeMap<String, BTreeMap<String, Map<String, Value>>>;

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<Collections>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>> {
        self.collections.lock().map_err(|e| MigrationError::Store {
            message: format!("Failed to lock memory store: {}", e),
            source: None,
        })
    }

    /// Every document in a collection, ordered by key.
    pub fn documents(&self, collection: &str) -> Result<Vec<Document>> {
        self.query(&Query::collection(collection))
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .map(|fields| Document {
                collection: collection.to_string(),
                key: key.to_string(),
                fields: fields.clone(),
            }))
    }

    fn query(&self, query: &Query) -> Result<Vec<Document>> {
        let collections = self.lock()?;
        let docs = collections
            .get(&query.collection)
            .into_iter()
            .flat_map(|docs| docs.iter())
            .map(|(key, fields)| Document {
                collection: query.collection.clone(),
                key: key.clone(),
                fields: fields.clone(),
            });
        Ok(query.apply(docs))
    }

    fn commit_batch(&self, ops: &[WriteOp]) -> Result<()> {
        // Validation is the only failure point, so nothing is half-applied.
        validate_batch(ops)?;

        let mut collections = self.lock()?;
        for op in ops {
            let doc = collections
                .entry(op.collection.clone())
                .or_default()
                .entry(op.key.clone())
                .or_default();
            merge_fields(doc, op.fields.clone());
        }
        Ok(())
    }

    fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.lock()?;
        Ok(collections.get(collection).map_or(0, BTreeMap::len))
    }
}
