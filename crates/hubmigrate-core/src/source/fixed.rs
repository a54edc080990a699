//! Canned legacy source.
//!
//! Serves records captured ahead of time (an exported dump, or a test
//! fixture) and logs every call so the fetch pattern can be inspected.

use super::{parse_records, LegacySource};
use crate::entities::Entity;
use crate::error::{MigrationError, Result};
use crate::record::LegacyRecord;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Response {
    Records(Vec<LegacyRecord>),
    Status(u16),
}

/// A fetch made against a [`StaticLegacySource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub entity: Entity,
    pub email: Option<String>,
}

/// In-memory legacy source.
///
/// Unknown bulk entities and unknown users answer with an empty list.
#[derive(Default)]
pub struct StaticLegacySource {
    bulk: HashMap<Entity, Response>,
    per_user: HashMap<(Entity, String), Response>,
    calls: Mutex<Vec<FetchCall>>,
}

impl StaticLegacySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `records` for the bulk fetch of `entity`.
    pub fn with_records(mut self, entity: Entity, records: Vec<Value>) -> Self {
        self.bulk
            .insert(entity, Response::Records(to_records(entity, records)));
        self
    }

    /// Serve `records` for `entity` scoped to `email`.
    pub fn with_user_records(mut self, entity: Entity, email: &str, records: Vec<Value>) -> Self {
        self.per_user.insert(
            (entity, email.to_string()),
            Response::Records(to_records(entity, records)),
        );
        self
    }

    /// Answer the bulk fetch of `entity` with an HTTP error status.
    pub fn with_failure(mut self, entity: Entity, status: u16) -> Self {
        self.bulk.insert(entity, Response::Status(status));
        self
    }

    /// Answer the fetch of `entity` scoped to `email` with an HTTP error status.
    pub fn with_user_failure(mut self, entity: Entity, email: &str, status: u16) -> Self {
        self.per_user
            .insert((entity, email.to_string()), Response::Status(status));
        self
    }

    /// Every fetch made so far, in order.
    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

fn to_records(entity: Entity, records: Vec<Value>) -> Vec<LegacyRecord> {
    parse_records(entity, Value::Array(records)).unwrap_or_default()
}

#[async_trait]
impl LegacySource for StaticLegacySource {
    async fn fetch(&self, entity: Entity, email: Option<&str>) -> Result<Vec<LegacyRecord>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(FetchCall {
                entity,
                email: email.map(String::from),
            });
        }

        let response = match email {
            Some(email) => self.per_user.get(&(entity, email.to_string())),
            None => self.bulk.get(&entity),
        };

        match response {
            Some(Response::Records(records)) => Ok(records.clone()),
            Some(Response::Status(status)) => Err(MigrationError::Fetch {
                entity,
                url: self.describe(entity),
                status: Some(*status),
                message: format!("HTTP {}", status),
            }),
            None => Ok(Vec::new()),
        }
    }

    fn describe(&self, entity: Entity) -> String {
        format!("static://{}", entity)
    }
}
