//! HTTP server implementation using Axum.

use crate::handlers::{handle_health, handle_rpc};
use axum::{
    routing::{get, post},
    Router,
};
use hubmigrate_core::Migrator;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    pub migrator: Migrator,
}

/// Start the JSON-RPC HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    migrator: Migrator,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let state = Arc::new(AppState { migrator });

    // The admin page is served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/rpc", post(handle_rpc))
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubmigrate_core::{
        Entity, MigrationConfig, SqliteDocumentStore, StaticLegacySource,
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;

    async fn rpc(addr: SocketAddr, method: &str) -> Value {
        reqwest::Client::new()
            .post(format!("http://{}/rpc", addr))
            .json(&json!({"jsonrpc": "2.0", "method": method, "params": {}, "id": 7}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn start(temp_dir: &TempDir) -> SocketAddr {
        let store = SqliteDocumentStore::new(temp_dir.path().join("hub.db")).unwrap();
        let source = StaticLegacySource::new().with_records(
            Entity::Events,
            vec![json!({"sa_eventid": "ev1", "sa_name": "Meetup"})],
        );
        let migrator = Migrator::new(
            Arc::new(source),
            Arc::new(store),
            MigrationConfig::default(),
        )
        .unwrap();
        start_server(migrator, "127.0.0.1", 0).await.unwrap()
    }

    #[tokio::test]
    async fn test_server_starts() {
        let temp_dir = TempDir::new().unwrap();
        let addr = start(&temp_dir).await;
        assert!(addr.port() > 0);

        let health: Value = reqwest::get(format!("http://{}/health", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");
    }

    #[tokio::test]
    async fn test_rpc_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let addr = start(&temp_dir).await;

        let response = rpc(addr, "migrate_events").await;
        assert_eq!(response["id"], 7);
        assert_eq!(response["result"]["count"], 1);

        let response = rpc(addr, "get_collection_counts").await;
        assert_eq!(response["result"]["counts"]["events"], 1);

        let response = rpc(addr, "drop_everything").await;
        assert_eq!(response["error"]["code"], -32601);
        assert!(response.get("result").is_none());
    }

    #[tokio::test]
    async fn test_rejects_wrong_jsonrpc_version() {
        let temp_dir = TempDir::new().unwrap();
        let addr = start(&temp_dir).await;

        let response: Value = reqwest::Client::new()
            .post(format!("http://{}/rpc", addr))
            .json(&json!({"jsonrpc": "1.0", "method": "migrate_events", "id": 3}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(response["error"]["code"], -32600);
        assert_eq!(response["id"], 3);

        let counts = rpc(addr, "get_collection_counts").await;
        assert_eq!(counts["result"]["counts"]["events"], 0);
    }
}
