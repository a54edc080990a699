//! Migration trigger handlers.

use crate::server::AppState;
use hubmigrate_core::{CollectingReporter, Entity, MigrationError, MigrationOutcome};
use serde_json::{json, Map, Value};

/// Run one entity migration and return its outcome with the progress log.
pub async fn migrate_entity(state: &AppState, entity: Entity) -> hubmigrate_core::Result<Value> {
    let reporter = CollectingReporter::new();
    let outcome = state.migrator.migrate(entity, &reporter).await?;
    outcome_response(&outcome, reporter.take())
}

/// Run the migration named by the `entity` param, e.g. `{"entity": "events"}`.
pub async fn migrate_named(state: &AppState, params: &Value) -> hubmigrate_core::Result<Value> {
    let name = params
        .get("entity")
        .and_then(|v| v.as_str())
        .ok_or_else(|| MigrationError::Validation {
            field: "entity".into(),
            message: "missing string param".into(),
        })?;
    let entity: Entity = name.parse().map_err(|message| MigrationError::Validation {
        field: "entity".into(),
        message,
    })?;
    migrate_entity(state, entity).await
}

pub async fn migrate_all(state: &AppState, _params: &Value) -> hubmigrate_core::Result<Value> {
    let reporter = CollectingReporter::new();
    let runs = state.migrator.migrate_all(&reporter).await;

    let total: usize = runs
        .iter()
        .filter_map(|r| r.outcome.as_ref())
        .map(|o| o.count)
        .sum();
    let failed: Vec<&str> = runs
        .iter()
        .filter(|r| !r.is_ok())
        .map(|r| r.entity.as_str())
        .collect();

    Ok(json!({
        "success": failed.is_empty(),
        "count": total,
        "failed": failed,
        "runs": serde_json::to_value(&runs)?,
        "progress": reporter.take(),
    }))
}

pub async fn get_collection_counts(
    state: &AppState,
    _params: &Value,
) -> hubmigrate_core::Result<Value> {
    let store = state.migrator.store();
    let mut counts = Map::new();
    for entity in Entity::ALL {
        let collection = entity.collection();
        counts.insert(collection.to_string(), json!(store.count(collection)?));
    }

    Ok(json!({
        "success": true,
        "counts": counts,
    }))
}

fn outcome_response(
    outcome: &MigrationOutcome,
    progress: Vec<String>,
) -> hubmigrate_core::Result<Value> {
    let mut value = serde_json::to_value(outcome)?;
    if let Value::Object(map) = &mut value {
        map.insert("progress".into(), json!(progress));
    }
    Ok(value)
}
