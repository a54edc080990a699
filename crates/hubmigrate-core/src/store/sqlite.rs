//! SQLite-backed document store.

use super::traits::{merge_fields, validate_batch, Document, DocumentStore, Query, WriteOp};
use crate::error::{MigrationError, Result};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// SQLite document store.
///
/// Every collection lives in one `documents` table keyed by
/// `(collection, key)` with the document body stored as JSON text.
/// Thread-safe via internal mutex on the connection.
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    /// Open (or create) a store at the specified database path.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MigrationError::Io {
                message: format!("Failed to create store directory: {}", e),
                path: Some(parent.to_path_buf()),
                source: Some(e),
            })?;
        }

        let conn = Connection::open(db_path).map_err(|e| MigrationError::Store {
            message: format!("Failed to open store database: {}", e),
            source: Some(e),
        })?;

        // WAL lets application readers keep going during a migration run
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| MigrationError::Store {
                message: format!("Failed to set pragmas: {}", e),
                source: Some(e),
            })?;

        Self::from_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, key)
            );

            CREATE INDEX IF NOT EXISTS idx_documents_updated
                ON documents(collection, updated_at);
            "#,
        )
        .map_err(|e| MigrationError::Store {
            message: format!("Failed to initialize store schema: {}", e),
            source: Some(e),
        })?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| MigrationError::Store {
            message: format!("Failed to lock database: {}", e),
            source: None,
        })
    }

    fn parse_body(collection: &str, key: &str, body: &str) -> Result<Document> {
        let fields: Map<String, Value> = serde_json::from_str(body).map_err(|e| {
            MigrationError::Json {
                message: format!("Corrupt document {}/{}: {}", collection, key, e),
                source: Some(e),
            }
        })?;
        Ok(Document {
            collection: collection.to_string(),
            key: key.to_string(),
            fields,
        })
    }

    fn apply_batch(conn: &mut Connection, ops: &[WriteOp]) -> rusqlite::Result<()> {
        let now = Utc::now().to_rfc3339();
        let tx = conn.transaction()?;

        for op in ops {
            let existing: Option<String> = tx
                .query_row(
                    "SELECT body FROM documents WHERE collection = ?1 AND key = ?2",
                    params![op.collection, op.key],
                    |row| row.get(0),
                )
                .optional()?;

            // A corrupt stored body rejects the batch rather than being replaced.
            let mut fields = match existing {
                Some(body) => serde_json::from_str::<Map<String, Value>>(&body).map_err(|e| {
                    warn!("Corrupt stored document {}/{}: {}", op.collection, op.key, e);
                    rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
                })?,
                None => Map::new(),
            };
            merge_fields(&mut fields, op.fields.clone());
            let body = Value::Object(fields).to_string();

            tx.execute(
                r#"
                INSERT INTO documents (collection, key, body, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?4)
                ON CONFLICT(collection, key) DO UPDATE SET
                    body = ?3,
                    updated_at = ?4
                "#,
                params![op.collection, op.key, body, now],
            )?;
        }

        tx.commit()
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let conn = self.lock()?;

        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| MigrationError::Store {
                message: format!("Failed to read {}/{}: {}", collection, key, e),
                source: Some(e),
            })?;

        body.map(|b| Self::parse_body(collection, key, &b))
            .transpose()
    }

    fn query(&self, query: &Query) -> Result<Vec<Document>> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare("SELECT key, body FROM documents WHERE collection = ?1")
            .map_err(|e| MigrationError::Store {
                message: format!("Failed to prepare query: {}", e),
                source: Some(e),
            })?;

        let rows: Vec<(String, String)> = stmt
            .query_map(params![query.collection], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| MigrationError::Store {
                message: format!("Failed to query {}: {}", query.collection, e),
                source: Some(e),
            })?
            .collect::<rusqlite::Result<_>>()?;

        let docs = rows
            .iter()
            .map(|(key, body)| Self::parse_body(&query.collection, key, body))
            .collect::<Result<Vec<_>>>()?;

        Ok(query.apply(docs))
    }

    fn commit_batch(&self, ops: &[WriteOp]) -> Result<()> {
        validate_batch(ops)?;
        if ops.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        Self::apply_batch(&mut conn, ops).map_err(|e| MigrationError::Write {
            message: e.to_string(),
            records: ops.len(),
        })?;

        debug!("Committed batch of {} documents", ops.len());
        Ok(())
    }

    fn count(&self, collection: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
