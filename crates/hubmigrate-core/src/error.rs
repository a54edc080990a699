//! Error types for hubmigrate.
//!
//! Fatal errors surface to the caller of a migration routine with a message
//! meant to be shown verbatim. Non-fatal ones (a rejected batch, a failed
//! per-user fetch) are converted into [`Skip`](crate::Skip) entries by the
//! engine and never leave a run as an `Err`.

use crate::entities::Entity;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the migration engine.
#[derive(Debug, Error)]
pub enum MigrationError {
    // Legacy source errors
    #[error("Failed to fetch {entity} from {url}: {message}")]
    Fetch {
        entity: Entity,
        url: String,
        /// HTTP status when the endpoint answered with a non-success code.
        status: Option<u16>,
        message: String,
    },

    #[error("Failed to fetch {entity} for {email}: {message}")]
    PerRecordFetch {
        entity: Entity,
        email: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    // Target store errors
    #[error("Batch write rejected ({records} records): {message}")]
    Write { message: String, records: usize },

    #[error("Store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;

impl From<std::io::Error> for MigrationError {
    fn from(err: std::io::Error) -> Self {
        MigrationError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for MigrationError {
    fn from(err: serde_json::Error) -> Self {
        MigrationError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for MigrationError {
    fn from(err: rusqlite::Error) -> Self {
        MigrationError::Store {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for MigrationError {
    fn from(err: reqwest::Error) -> Self {
        MigrationError::Network {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl MigrationError {
    /// Scope a bulk fetch failure to a single user.
    ///
    /// Used by the per-user migrations, where the failure is recorded as a
    /// skip rather than propagated.
    pub fn into_per_record(self, email: &str) -> Self {
        match self {
            MigrationError::Fetch {
                entity,
                status,
                message,
                ..
            } => MigrationError::PerRecordFetch {
                entity,
                email: email.to_string(),
                status,
                message,
            },
            other => other,
        }
    }

    /// HTTP status attached to a fetch failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            MigrationError::Fetch { status, .. }
            | MigrationError::PerRecordFetch { status, .. } => *status,
            _ => None,
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// Custom error codes (application-defined, -32000 to -32099):
    /// - -32000: Legacy source unreachable or returned bad data
    /// - -32005: Validation / configuration error
    /// - -32010: Target store error
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            MigrationError::Fetch { .. }
            | MigrationError::PerRecordFetch { .. }
            | MigrationError::Network { .. } => -32000,

            MigrationError::Validation { .. } | MigrationError::Config { .. } => -32005,

            MigrationError::Write { .. } | MigrationError::Store { .. } => -32010,

            _ => -32603,
        }
    }

    /// Check if re-running the failed step could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            MigrationError::Network { .. } => true,
            MigrationError::Fetch { status, .. } | MigrationError::PerRecordFetch { status, .. } => {
                matches!(status, None | Some(408 | 429 | 500 | 502 | 503 | 504))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MigrationError::Fetch {
            entity: Entity::Team,
            url: "https://legacy.example/team".into(),
            status: Some(503),
            message: "HTTP 503".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to fetch team from https://legacy.example/team: HTTP 503"
        );
    }

    #[test]
    fn test_rpc_error_codes() {
        assert_eq!(
            MigrationError::Write {
                message: "denied".into(),
                records: 3
            }
            .to_rpc_error_code(),
            -32010
        );
        assert_eq!(
            MigrationError::Config {
                message: "bad".into()
            }
            .to_rpc_error_code(),
            -32005
        );
        assert_eq!(MigrationError::Other("x".into()).to_rpc_error_code(), -32603);
    }

    #[test]
    fn test_into_per_record_keeps_status() {
        let err = MigrationError::Fetch {
            entity: Entity::Certificates,
            url: "u".into(),
            status: Some(404),
            message: "HTTP 404".into(),
        }
        .into_per_record("a@b.co");

        assert!(matches!(err, MigrationError::PerRecordFetch { ref email, .. } if email == "a@b.co"));
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_errors() {
        let err = MigrationError::Fetch {
            entity: Entity::Events,
            url: "u".into(),
            status: Some(503),
            message: "HTTP 503".into(),
        };
        assert!(err.is_retryable());
        assert!(!MigrationError::Write {
            message: "denied".into(),
            records: 1
        }
        .is_retryable());
    }
}
