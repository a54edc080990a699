//! The migration engine.
//!
//! A [`Migrator`] pairs a legacy source with a target store and moves one
//! entity category at a time. Bulk categories (team, events, users, socials)
//! are fetched in one request; certificates and registrations are fetched
//! once per already-migrated user. Writes are merge-upserts under
//! deterministic keys, so a run can be repeated.

mod batch;
mod outcome;

pub use outcome::{EntityRun, MigrationOutcome, Skip, SkipReason};

use crate::config::MigrationConfig;
use crate::entities::{
    certificates, events, registrations, socials, team, users, Entity, Mapped, UserRef,
};
use crate::error::{MigrationError, Result};
use crate::progress::ProgressReporter;
use crate::record::LegacyRecord;
use crate::source::{HttpLegacySource, LegacySource};
use crate::store::{DocumentStore, Query, SortDirection};
use batch::BatchWriter;
use chrono::{DateTime, Utc};
use outcome::join_note;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Log a progress message and hand it to the reporter.
pub(crate) fn emit(reporter: &dyn ProgressReporter, entity: Entity, message: &str) {
    info!(entity = %entity, "{}", message);
    reporter.report(message);
}

/// Moves legacy data into the document store.
pub struct Migrator {
    source: Arc<dyn LegacySource>,
    store: Arc<dyn DocumentStore>,
    config: MigrationConfig,
}

impl Migrator {
    /// Create a migrator, rejecting an invalid configuration.
    pub fn new(
        source: Arc<dyn LegacySource>,
        store: Arc<dyn DocumentStore>,
        config: MigrationConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            store,
            config,
        })
    }

    /// Create a migrator reading from the configured HTTP endpoints.
    pub fn with_http_source(
        store: Arc<dyn DocumentStore>,
        config: MigrationConfig,
    ) -> Result<Self> {
        config.validate()?;
        let source = Arc::new(HttpLegacySource::new(&config)?);
        Self::new(source, store, config)
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Migrate team members, keyed by full name.
    pub async fn migrate_team(&self, reporter: &dyn ProgressReporter) -> Result<MigrationOutcome> {
        self.migrate_bulk(Entity::Team, reporter, |index, record, at| {
            team::map_member(record, index, at)
        })
        .await
    }

    /// Migrate events, keyed by their legacy ID.
    pub async fn migrate_events(
        &self,
        reporter: &dyn ProgressReporter,
    ) -> Result<MigrationOutcome> {
        self.migrate_bulk(Entity::Events, reporter, |_, record, at| {
            events::map_event(record, at)
        })
        .await
    }

    /// Migrate users, keyed by sanitized email.
    pub async fn migrate_users(&self, reporter: &dyn ProgressReporter) -> Result<MigrationOutcome> {
        self.migrate_bulk(Entity::Users, reporter, |_, record, at| {
            users::map_user(record, at)
        })
        .await
    }

    /// Fold every social link into the single `socials/links` document.
    pub async fn migrate_socials(
        &self,
        reporter: &dyn ProgressReporter,
    ) -> Result<MigrationOutcome> {
        let entity = Entity::Socials;
        let records = self.fetch_all(entity).await?;
        let mut outcome = MigrationOutcome::new(entity);

        let Some(doc) = socials::map_socials(&records, Utc::now()) else {
            info!("No social links among {} legacy entries", records.len());
            outcome.note = Some(format!(
                "No social links found in {} legacy entries",
                records.len()
            ));
            if !records.is_empty() {
                outcome.skipped.push(Skip {
                    reason: SkipReason::Unmappable {
                        message: "social entry has no URL".into(),
                    },
                    subject: socials_subject(),
                    records: records.len(),
                });
            }
            return Ok(outcome);
        };

        let mut notes = Vec::new();
        if doc.dropped > 0 {
            warn!("Dropping {} social entries without a URL", doc.dropped);
            outcome.skipped.push(Skip {
                reason: SkipReason::Unmappable {
                    message: "social entry has no URL".into(),
                },
                subject: socials_subject(),
                records: doc.dropped,
            });
            notes.push(format!("{} entries without a URL dropped", doc.dropped));
        }

        let links = doc.links;
        let mut writer =
            BatchWriter::new(self.store.as_ref(), entity, self.config.batch_limit)
                .with_reporter(reporter, 1);
        writer.push(doc.record);
        let report = writer.finish();

        outcome.count = if report.written == 1 { links } else { 0 };
        outcome.batches = report.batches;
        outcome.skipped.extend(report.skipped);
        if outcome.rejected_batches() > 0 {
            notes.push(format!("{} links not written", links));
        }
        outcome.note = join_note(notes);

        info!("Socials migration finished: {} links", outcome.count);
        Ok(outcome)
    }

    /// Migrate certificates for every migrated user with an email.
    pub async fn migrate_certificates(
        &self,
        reporter: &dyn ProgressReporter,
    ) -> Result<MigrationOutcome> {
        self.migrate_per_user(Entity::Certificates, reporter, certificates::map_certificate)
            .await
    }

    /// Migrate event registrations for every migrated user with an email.
    pub async fn migrate_registrations(
        &self,
        reporter: &dyn ProgressReporter,
    ) -> Result<MigrationOutcome> {
        self.migrate_per_user(
            Entity::Registrations,
            reporter,
            registrations::map_registration,
        )
        .await
    }

    /// Run the migration for one entity category.
    pub async fn migrate(
        &self,
        entity: Entity,
        reporter: &dyn ProgressReporter,
    ) -> Result<MigrationOutcome> {
        match entity {
            Entity::Team => self.migrate_team(reporter).await,
            Entity::Events => self.migrate_events(reporter).await,
            Entity::Users => self.migrate_users(reporter).await,
            Entity::Socials => self.migrate_socials(reporter).await,
            Entity::Certificates => self.migrate_certificates(reporter).await,
            Entity::Registrations => self.migrate_registrations(reporter).await,
        }
    }

    /// Run every category in dependency order.
    ///
    /// A fatal error ends that category only; the rest still run.
    pub async fn migrate_all(&self, reporter: &dyn ProgressReporter) -> Vec<EntityRun> {
        let mut runs = Vec::with_capacity(Entity::ALL.len());

        for entity in Entity::ALL {
            let run = match self.migrate(entity, reporter).await {
                Ok(outcome) => EntityRun {
                    entity,
                    outcome: Some(outcome),
                    error: None,
                },
                Err(e) => {
                    error!("{} migration failed: {}", entity, e);
                    emit(reporter, entity, &format!("{}: failed: {}", entity.label(), e));
                    EntityRun {
                        entity,
                        outcome: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            runs.push(run);
        }

        let failed = runs.iter().filter(|r| !r.is_ok()).count();
        info!(
            "Full migration finished: {} categories, {} failed",
            runs.len(),
            failed
        );
        runs
    }

    async fn fetch_all(&self, entity: Entity) -> Result<Vec<LegacyRecord>> {
        info!("Fetching legacy {} from {}", entity, self.source.describe(entity));
        let records = self.source.fetch(entity, None).await?;
        info!("Fetched {} legacy {} records", records.len(), entity);
        Ok(records)
    }

    async fn migrate_bulk<F>(
        &self,
        entity: Entity,
        reporter: &dyn ProgressReporter,
        map: F,
    ) -> Result<MigrationOutcome>
    where
        F: Fn(usize, &LegacyRecord, DateTime<Utc>) -> Mapped,
    {
        let records = self.fetch_all(entity).await?;
        let mut outcome = MigrationOutcome::new(entity);

        if records.is_empty() {
            outcome.note = Some(format!("No legacy {} records found", entity));
            return Ok(outcome);
        }

        let migrated_at = Utc::now();
        let total = records.len();
        let mut synthetic = 0;
        let mut writer = BatchWriter::new(self.store.as_ref(), entity, self.config.batch_limit)
            .with_reporter(reporter, total);

        for (index, record) in records.iter().enumerate() {
            let mapped = map(index, record, migrated_at);
            if mapped.synthetic_key {
                debug!(
                    "{} record {} has no stable identity, using key {}",
                    entity, index, mapped.record.key
                );
                synthetic += 1;
            }
            writer.push(mapped.record);
        }

        let report = writer.finish();
        outcome.count = report.written;
        outcome.batches = report.batches;
        outcome.skipped = report.skipped;

        let mut notes = Vec::new();
        if synthetic > 0 {
            warn!(
                "{} {} records received generated keys and will duplicate on re-run",
                synthetic, entity
            );
            notes.push(format!("{} records received generated keys", synthetic));
        }
        if entity == Entity::Users && synthetic > 0 {
            notes.push(format!(
                "{} users have no email and cannot receive certificates or registrations",
                synthetic
            ));
        }
        push_rejection_note(&outcome, &mut notes);
        outcome.note = join_note(notes);

        info!(
            "{} migration finished: {}/{} records written in {} batches",
            entity.label(),
            outcome.count,
            total,
            outcome.batches
        );
        Ok(outcome)
    }

    /// Every migrated user, ordered by email.
    fn migrated_users(&self) -> Result<Vec<crate::store::Document>> {
        let query = Query::collection(Entity::Users.collection())
            .order_by("email", SortDirection::Asc);
        self.store.query(&query).map_err(|e| match e {
            e @ MigrationError::Store { .. } => e,
            other => MigrationError::Store {
                message: format!("failed to enumerate migrated users: {}", other),
                source: None,
            },
        })
    }

    async fn migrate_per_user<F>(
        &self,
        entity: Entity,
        reporter: &dyn ProgressReporter,
        map: F,
    ) -> Result<MigrationOutcome>
    where
        F: Fn(&UserRef, &LegacyRecord, DateTime<Utc>) -> Mapped,
    {
        let docs = self.migrated_users()?;
        let mut outcome = MigrationOutcome::new(entity);

        if docs.is_empty() {
            warn!("No migrated users found, nothing to fetch {} for", entity);
            outcome.note = Some("No migrated users found; run the users migration first".into());
            return Ok(outcome);
        }

        let total_users = docs.len();
        let mut targets = Vec::with_capacity(total_users);
        for doc in &docs {
            match users::user_ref(doc) {
                Some(user) => targets.push(user),
                None => {
                    warn!("User {} has no email, skipping {}", doc.key, entity);
                    outcome.skipped.push(Skip {
                        reason: SkipReason::MissingEmail,
                        subject: doc.key.clone(),
                        records: 0,
                    });
                }
            }
        }

        info!(
            "Migrating {} for {} users ({} without email)",
            entity,
            targets.len(),
            total_users - targets.len()
        );

        let migrated_at = Utc::now();
        let interval = self.config.user_progress_interval;
        let mut fetched = 0;
        let mut synthetic = 0;
        let mut writer = BatchWriter::new(self.store.as_ref(), entity, self.config.batch_limit);

        for (index, user) in targets.iter().enumerate() {
            match self.source.fetch(entity, Some(&user.email)).await {
                Ok(records) if records.is_empty() => {
                    debug!("No {} for {}", entity, user.email);
                }
                Ok(records) => {
                    fetched += records.len();
                    for record in &records {
                        let mapped = map(user, record, migrated_at);
                        if mapped.synthetic_key {
                            synthetic += 1;
                        }
                        writer.push(mapped.record);
                    }
                }
                Err(e) => {
                    let e = e.into_per_record(&user.email);
                    warn!("Skipping {} for {}: {}", entity, user.email, e);
                    outcome.skipped.push(Skip {
                        reason: SkipReason::FetchFailed {
                            status: e.status(),
                            message: e.to_string(),
                        },
                        subject: user.email.clone(),
                        records: 0,
                    });
                }
            }

            let processed = index + 1;
            if processed % interval == 0 {
                emit(
                    reporter,
                    entity,
                    &format!(
                        "{}: processed {}/{} users, {} records fetched, {} written, {} pending",
                        entity.label(),
                        processed,
                        targets.len(),
                        fetched,
                        writer.written(),
                        writer.queued()
                    ),
                );
            }
        }

        let report = writer.finish();
        outcome.count = report.written;
        outcome.batches = report.batches;
        outcome.skipped.extend(report.skipped);

        let mut notes = vec![format!(
            "Processed {} of {} users; skipped {} without email",
            targets.len(),
            total_users,
            total_users - targets.len()
        )];
        let failed = outcome.failed_fetches();
        if failed > 0 {
            notes.push(format!("{} user fetches failed", failed));
        }
        if synthetic > 0 {
            notes.push(format!("{} records received generated keys", synthetic));
        }
        push_rejection_note(&outcome, &mut notes);
        outcome.note = join_note(notes);

        info!(
            "{} migration finished: {} records written for {} users",
            entity.label(),
            outcome.count,
            targets.len()
        );
        Ok(outcome)
    }
}

fn socials_subject() -> String {
    format!("{}/{}", Entity::Socials.collection(), crate::keys::SOCIALS_KEY)
}

fn push_rejection_note(outcome: &MigrationOutcome, notes: &mut Vec<String>) {
    let rejected = outcome.rejected_batches();
    if rejected > 0 {
        let lost: usize = outcome
            .skips_where(|r| matches!(r, SkipReason::BatchRejected { .. }))
            .map(|s| s.records)
            .sum();
        notes.push(format!(
            "{} batches rejected ({} records not written)",
            rejected, lost
        ));
    }
}
