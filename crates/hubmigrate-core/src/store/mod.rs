//! Target document store abstraction.
//!
//! The store is treated as an opaque collection/key document service that
//! supports point reads, equality queries and atomic batched merge-upserts.
//! Two backends are provided:
//! - SQLite, for a persistent local target
//! - in-memory, for dry runs and tests

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;
pub use traits::{
    merge_fields, validate_batch, Document, DocumentStore, Query, SortDirection, WriteOp,
};
