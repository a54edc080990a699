//! Result summaries of migration runs.

use crate::entities::Entity;
use serde::{Deserialize, Serialize};

/// Why records were left out of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// A migrated user has no email to query the legacy endpoint with.
    MissingEmail,
    /// The per-user legacy fetch failed.
    FetchFailed {
        status: Option<u16>,
        message: String,
    },
    /// The store rejected a batch commit.
    BatchRejected { message: String },
    /// The legacy entry lacked a field the target schema requires.
    Unmappable { message: String },
}

/// A non-fatal loss recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skip {
    pub reason: SkipReason,
    /// User key or email, or `batch <n>`.
    pub subject: String,
    /// Records lost, when known.
    pub records: usize,
}

/// Summary of one entity's migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationOutcome {
    pub success: bool,
    pub entity: Entity,
    /// Records successfully written.
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Batch commits attempted.
    pub batches: usize,
    pub skipped: Vec<Skip>,
}

impl MigrationOutcome {
    pub(crate) fn new(entity: Entity) -> Self {
        Self {
            success: true,
            entity,
            count: 0,
            note: None,
            batches: 0,
            skipped: Vec::new(),
        }
    }

    /// Skips matching a predicate on their reason.
    pub fn skips_where(&self, pred: impl Fn(&SkipReason) -> bool) -> impl Iterator<Item = &Skip> {
        self.skipped.iter().filter(move |s| pred(&s.reason))
    }

    pub fn rejected_batches(&self) -> usize {
        self.skips_where(|r| matches!(r, SkipReason::BatchRejected { .. }))
            .count()
    }

    pub fn failed_fetches(&self) -> usize {
        self.skips_where(|r| matches!(r, SkipReason::FetchFailed { .. }))
            .count()
    }

    pub fn users_without_email(&self) -> usize {
        self.skips_where(|r| matches!(r, SkipReason::MissingEmail))
            .count()
    }
}

/// One entity's result within a full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRun {
    pub entity: Entity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MigrationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EntityRun {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Join note fragments with `; `, or `None` when there are none.
pub(crate) fn join_note(parts: Vec<String>) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}
