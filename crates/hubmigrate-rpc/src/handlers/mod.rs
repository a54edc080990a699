//! JSON-RPC request handlers.

mod migration;

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use hubmigrate_core::Entity;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

// ============================================================================
// JSON-RPC types
// ============================================================================

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id,
        }
    }
}

/// JSON-RPC "invalid request".
pub const INVALID_REQUEST: i32 = -32600;
/// JSON-RPC "method not found".
pub const METHOD_NOT_FOUND: i32 = -32601;

/// Every method `/rpc` answers.
pub const METHODS: &[&str] = &[
    "health_check",
    "migrate",
    "migrate_team",
    "migrate_events",
    "migrate_users",
    "migrate_socials",
    "migrate_certificates",
    "migrate_registrations",
    "migrate_all",
    "get_collection_counts",
];

// ============================================================================
// HTTP endpoints
// ============================================================================

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Main JSON-RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let method = request.method.as_str();
    let params = request.params.unwrap_or(Value::Object(Default::default()));
    let id = request.id.clone();

    debug!("RPC call: {}({:?})", method, params);

    if request.jsonrpc != "2.0" {
        warn!("Rejecting request with jsonrpc version '{}'", request.jsonrpc);
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            )),
        );
    }

    if method == "health_check" {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::success(id, json!({"status": "ok"}))),
        );
    }

    if !METHODS.contains(&method) {
        warn!("Method not found: {}", method);
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", method),
            )),
        );
    }

    match dispatch_method(&state, method, &params).await {
        Ok(value) => (StatusCode::OK, Json(JsonRpcResponse::success(id, value))),
        Err(e) => {
            error!("RPC error for {}: {}", method, e);
            let code = e.to_rpc_error_code();
            (
                StatusCode::OK,
                Json(JsonRpcResponse::error(id, code, e.to_string())),
            )
        }
    }
}

// ============================================================================
// Method dispatcher
// ============================================================================

/// Dispatch a known method to its handler.
async fn dispatch_method(
    state: &AppState,
    method: &str,
    params: &Value,
) -> hubmigrate_core::Result<Value> {
    match method {
        "migrate" => migration::migrate_named(state, params).await,
        "migrate_team" => migration::migrate_entity(state, Entity::Team).await,
        "migrate_events" => migration::migrate_entity(state, Entity::Events).await,
        "migrate_users" => migration::migrate_entity(state, Entity::Users).await,
        "migrate_socials" => migration::migrate_entity(state, Entity::Socials).await,
        "migrate_certificates" => migration::migrate_entity(state, Entity::Certificates).await,
        "migrate_registrations" => {
            migration::migrate_entity(state, Entity::Registrations).await
        }
        "migrate_all" => migration::migrate_all(state, params).await,
        "get_collection_counts" => migration::get_collection_counts(state, params).await,
        _ => Err(hubmigrate_core::MigrationError::Other(format!(
            "Method not dispatched: {}",
            method
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_rpc_response_success() {
        let response = JsonRpcResponse::success(Some(json!(1)), json!({"count": 3}));
        assert!(response.error.is_none());
        assert!(response.result.is_some());
    }

    #[test]
    fn test_json_rpc_response_error() {
        let response = JsonRpcResponse::error(Some(json!(1)), -32000, "Test error".into());
        assert!(response.error.is_some());
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32000);
    }

    #[test]
    fn test_every_entity_has_a_method() {
        for entity in Entity::ALL {
            let method = format!("migrate_{}", entity);
            assert!(METHODS.contains(&method.as_str()), "{}", method);
        }
    }
}
