//! Hubmigrate RPC Server - JSON-RPC trigger for the migration engine.
//!
//! This binary provides a JSON-RPC 2.0 server that wraps the hubmigrate-core
//! library so the admin back-office can start migrations and show their
//! progress.

mod handlers;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use hubmigrate_core::{
    DocumentStore, MemoryDocumentStore, MigrationConfig, Migrator, SqliteDocumentStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "hubmigrate-rpc")]
#[command(about = "JSON-RPC server for legacy data migration")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Base URL of the legacy API
    #[arg(long, default_value = MigrationConfig::DEFAULT_LEGACY_BASE_URL)]
    legacy_base_url: String,

    /// SQLite document store (defaults to the user data directory)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Keep documents in memory only (dry run)
    #[arg(long, conflicts_with = "database")]
    in_memory: bool,

    /// Records per batch commit (at most 450)
    #[arg(long, default_value_t = MigrationConfig::BATCH_LIMIT)]
    batch_limit: usize,

    /// Report per-user progress every this many users
    #[arg(long, default_value_t = MigrationConfig::USER_PROGRESS_INTERVAL)]
    user_progress_interval: usize,

    /// Timeout for each legacy request, in seconds (none by default)
    #[arg(long)]
    request_timeout_secs: Option<u64>,
}

fn default_database() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hubmigrate")
        .join("documents.db")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting Hubmigrate RPC Server");

    let store: Arc<dyn DocumentStore> = if args.in_memory {
        warn!("Using in-memory document store; nothing will be persisted");
        Arc::new(MemoryDocumentStore::new())
    } else {
        let path = args.database.unwrap_or_else(default_database);
        info!("Document store: {}", path.display());
        Arc::new(
            SqliteDocumentStore::new(&path)
                .with_context(|| format!("opening document store {}", path.display()))?,
        )
    };

    let config = MigrationConfig::default()
        .with_legacy_base_url(&args.legacy_base_url)
        .with_batch_limit(args.batch_limit)
        .with_user_progress_interval(args.user_progress_interval)
        .with_request_timeout(args.request_timeout_secs.map(Duration::from_secs));
    info!("Legacy API: {}", args.legacy_base_url);

    let migrator = Migrator::with_http_source(store, config)?;

    let addr = server::start_server(migrator, &args.host, args.port).await?;

    // Print port for the launching process to read (intentional stdout)
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
