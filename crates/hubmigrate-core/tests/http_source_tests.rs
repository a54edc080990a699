//! Tests for the HTTP legacy source against a local server.

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use hubmigrate_core::{
    CollectingReporter, DocumentStore, Entity, HttpLegacySource, LegacySource,
    MemoryDocumentStore, MigrationConfig, MigrationError, Migrator, SkipReason,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn team() -> Json<Value> {
    Json(json!([
        {"sa_firstname": "Jane", "sa_lastname": "Doe", "sa_designation": "Lead"},
        {"sa_firstname": "Raj", "sa_lastname": "Patel"},
        "not a record"
    ]))
}

async fn events() -> Json<Value> {
    Json(json!({"data": [{"sa_eventid": "ev1", "sa_name": "Meetup"}]}))
}

async fn users() -> Json<Value> {
    Json(json!([
        {"sa_email": "jane@hub.org", "sa_name": "Jane"},
        {"sa_email": "down@hub.org", "sa_name": "Down"}
    ]))
}

async fn socials() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "maintenance")
}

async fn certificates(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    match headers.get("email").and_then(|v| v.to_str().ok()) {
        Some("jane@hub.org") => Ok(Json(json!([
            {"sa_eventname": "Meetup", "sa_certificateurl": "https://certs/jane.pdf"}
        ]))),
        Some("down@hub.org") => Err(StatusCode::INTERNAL_SERVER_ERROR),
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

async fn registrations() -> &'static str {
    "<html>not json</html>"
}

async fn start_legacy_server() -> SocketAddr {
    let app = Router::new()
        .route("/team/getall", get(team))
        .route("/events/getall", get(events))
        .route("/users/getall", get(users))
        .route("/socials/getall", get(socials))
        .route("/certificates/byemail", post(certificates))
        .route("/registrations/byemail", post(registrations));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A legacy API that answers some requests with status-200 error objects.
async fn start_error_envelope_server() -> SocketAddr {
    async fn unauthorized() -> Json<Value> {
        Json(json!({"error": "Unauthorized"}))
    }

    async fn certificates(headers: HeaderMap) -> Json<Value> {
        match headers.get("email").and_then(|v| v.to_str().ok()) {
            Some("jane@hub.org") => Json(json!([{"sa_eventname": "Meetup"}])),
            _ => Json(json!({"message": "No certificates found"})),
        }
    }

    let app = Router::new()
        .route("/team/getall", get(unauthorized))
        .route("/users/getall", get(users))
        .route("/certificates/byemail", post(certificates));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn config() -> MigrationConfig {
    let addr = start_legacy_server().await;
    MigrationConfig::default()
        .with_legacy_base_url(&format!("http://{}", addr))
        .with_request_timeout(Some(Duration::from_secs(5)))
}

#[tokio::test]
async fn test_fetch_array_drops_non_objects() {
    let source = HttpLegacySource::new(&config().await).unwrap();

    let records = source.fetch(Entity::Team, None).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].str_field("sa_firstname").as_deref(), Some("Jane"));
}

#[tokio::test]
async fn test_fetch_data_envelope() {
    let source = HttpLegacySource::new(&config().await).unwrap();

    let records = source.fetch(Entity::Events, None).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].str_field("sa_eventid").as_deref(), Some("ev1"));
}

#[tokio::test]
async fn test_non_success_status_is_fetch_error() {
    let source = HttpLegacySource::new(&config().await).unwrap();

    let err = source.fetch(Entity::Socials, None).await.unwrap_err();

    assert!(matches!(err, MigrationError::Fetch { status: Some(503), .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_invalid_json_is_fetch_error() {
    let source = HttpLegacySource::new(&config().await).unwrap();

    let err = source
        .fetch(Entity::Registrations, Some("jane@hub.org"))
        .await
        .unwrap_err();

    assert!(matches!(err, MigrationError::Fetch { status: Some(200), .. }));
    assert!(err.to_string().contains("invalid JSON"));
}

#[tokio::test]
async fn test_email_header_scopes_request() {
    let source = HttpLegacySource::new(&config().await).unwrap();

    let records = source
        .fetch(Entity::Certificates, Some("jane@hub.org"))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);

    let err = source.fetch(Entity::Certificates, None).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    let config = MigrationConfig::default()
        .with_legacy_base_url("http://127.0.0.1:1")
        .with_request_timeout(Some(Duration::from_secs(2)));
    let source = HttpLegacySource::new(&config).unwrap();

    let err = source.fetch(Entity::Team, None).await.unwrap_err();

    assert!(matches!(err, MigrationError::Fetch { status: None, .. }));
}

#[tokio::test]
async fn test_full_run_over_http() {
    let store = Arc::new(MemoryDocumentStore::new());
    let migrator = Migrator::with_http_source(store.clone(), config().await).unwrap();
    let reporter = CollectingReporter::new();

    let runs = migrator.migrate_all(&reporter).await;

    let by_entity = |entity: Entity| runs.iter().find(|r| r.entity == entity).unwrap();
    assert!(by_entity(Entity::Team).is_ok());
    assert!(!by_entity(Entity::Socials).is_ok());

    let certificates = by_entity(Entity::Certificates).outcome.as_ref().unwrap();
    assert_eq!(certificates.count, 1);
    assert_eq!(certificates.failed_fetches(), 1);

    // Every per-user registration fetch returns HTML.
    let registrations = by_entity(Entity::Registrations).outcome.as_ref().unwrap();
    assert_eq!(registrations.count, 0);
    assert_eq!(registrations.failed_fetches(), 2);

    assert_eq!(store.count("team").unwrap(), 2);
    assert!(store.get("team", "jane_doe").unwrap().is_some());
    assert!(store.get("certificates", "jane_hub_org_meetup").unwrap().is_some());
}

#[tokio::test]
async fn test_error_object_on_bulk_endpoint_is_fatal() {
    let addr = start_error_envelope_server().await;
    let config = MigrationConfig::default().with_legacy_base_url(&format!("http://{}", addr));
    let store = Arc::new(MemoryDocumentStore::new());
    let migrator = Migrator::with_http_source(store.clone(), config).unwrap();

    let err = migrator
        .migrate_team(&CollectingReporter::new())
        .await
        .unwrap_err();

    assert!(matches!(err, MigrationError::Fetch { status: Some(200), .. }));
    assert_eq!(store.count("team").unwrap(), 0);
}

#[tokio::test]
async fn test_error_object_on_per_user_endpoint_is_skipped() {
    let addr = start_error_envelope_server().await;
    let config = MigrationConfig::default().with_legacy_base_url(&format!("http://{}", addr));
    let store = Arc::new(MemoryDocumentStore::new());
    let migrator = Migrator::with_http_source(store.clone(), config).unwrap();
    migrator
        .migrate_users(&CollectingReporter::new())
        .await
        .unwrap();

    for _ in 0..2 {
        let outcome = migrator
            .migrate_certificates(&CollectingReporter::new())
            .await
            .unwrap();

        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.failed_fetches(), 1);
        let skip = outcome
            .skipped
            .iter()
            .find(|s| s.subject == "down@hub.org")
            .unwrap();
        assert!(matches!(
            skip.reason,
            SkipReason::FetchFailed { status: Some(200), .. }
        ));
    }

    assert_eq!(store.count("certificates").unwrap(), 1);
    assert!(store.get("certificates", "jane_hub_org_meetup").unwrap().is_some());
}
