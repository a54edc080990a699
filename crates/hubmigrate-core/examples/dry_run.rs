//! Dry run example - migrate everything into an in-memory store and print
//! what would have been written.

use hubmigrate_core::{
    DocumentStore, Entity, MemoryDocumentStore, MigrationConfig, Migrator, Result,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Get the legacy API base URL from args or use the default
    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| MigrationConfig::DEFAULT_LEGACY_BASE_URL.to_string());

    println!("Dry run against {}", base_url);

    let store = Arc::new(MemoryDocumentStore::new());
    let config = MigrationConfig::default().with_legacy_base_url(&base_url);
    let migrator = Migrator::with_http_source(store.clone(), config)?;

    let runs = migrator
        .migrate_all(&|message: &str| println!("  {}", message))
        .await;

    for run in &runs {
        match (&run.outcome, &run.error) {
            (Some(outcome), _) => println!(
                "{}: {} written{}",
                run.entity,
                outcome.count,
                outcome
                    .note
                    .as_deref()
                    .map(|n| format!(" ({})", n))
                    .unwrap_or_default()
            ),
            (None, Some(err)) => println!("{}: failed: {}", run.entity, err),
            (None, None) => {}
        }
    }

    for entity in Entity::ALL {
        println!("{:>14}: {}", entity.collection(), store.count(entity.collection())?);
    }

    Ok(())
}
