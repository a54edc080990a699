//! Hubmigrate Core - Headless engine for moving legacy community-platform data
//! into the document store.
//!
//! The engine reads loosely typed records from the legacy HTTP endpoints,
//! maps them to the new schema under deterministic keys and writes them as
//! batched merge-upserts. It can be driven programmatically without any
//! HTTP/RPC layer.
//!
//! # Example
//!
//! ```rust,ignore
//! use hubmigrate_core::{MigrationConfig, Migrator, SqliteDocumentStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> hubmigrate_core::Result<()> {
//!     let store = Arc::new(SqliteDocumentStore::new("hub.db")?);
//!     let migrator = Migrator::with_http_source(store, MigrationConfig::default())?;
//!
//!     let outcome = migrator
//!         .migrate_team(&|message: &str| println!("{}", message))
//!         .await?;
//!     println!("Migrated {} team members", outcome.count);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod entities;
pub mod error;
pub mod keys;
pub mod progress;
pub mod record;
pub mod source;
pub mod store;

// Re-export commonly used types
pub use config::{Endpoint, HttpMethod, LegacyEndpoints, MigrationConfig};
pub use engine::{EntityRun, MigrationOutcome, Migrator, Skip, SkipReason};
pub use entities::{Entity, Mapped, UserRef};
pub use error::{MigrationError, Result};
pub use progress::{CollectingReporter, ProgressReporter};
pub use record::{LegacyRecord, TargetRecord};
pub use source::{HttpLegacySource, LegacySource, StaticLegacySource};
pub use store::{
    Document, DocumentStore, MemoryDocumentStore, Query, SortDirection, SqliteDocumentStore,
    WriteOp,
};
