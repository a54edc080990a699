//! Bounded batch commit loop.

use super::outcome::{Skip, SkipReason};
use crate::entities::Entity;
use crate::progress::ProgressReporter;
use crate::record::TargetRecord;
use crate::store::{DocumentStore, WriteOp};
use tracing::{debug, warn};

/// What a [`BatchWriter`] achieved.
#[derive(Debug, Default)]
pub(crate) struct BatchReport {
    pub written: usize,
    pub batches: usize,
    pub skipped: Vec<Skip>,
}

/// Buffers records and commits them in batches of at most `limit`.
///
/// Batches are committed in the order records were pushed. A rejected batch
/// is recorded as a skip and the writer carries on with the next one.
pub(crate) struct BatchWriter<'a> {
    store: &'a dyn DocumentStore,
    entity: Entity,
    limit: usize,
    /// Reports after every commit attempt when set.
    reporter: Option<&'a dyn ProgressReporter>,
    /// Total records expected, for progress messages.
    expected: Option<usize>,
    pending: Vec<WriteOp>,
    report: BatchReport,
}

impl<'a> BatchWriter<'a> {
    pub fn new(store: &'a dyn DocumentStore, entity: Entity, limit: usize) -> Self {
        Self {
            store,
            entity,
            limit: limit.max(1),
            reporter: None,
            expected: None,
            pending: Vec::with_capacity(limit.max(1)),
            report: BatchReport::default(),
        }
    }

    pub fn with_reporter(mut self, reporter: &'a dyn ProgressReporter, expected: usize) -> Self {
        self.reporter = Some(reporter);
        self.expected = Some(expected);
        self
    }

    /// Queue a record, committing when the batch is full.
    pub fn push(&mut self, record: TargetRecord) {
        self.pending.push(record.into_write());
        if self.pending.len() >= self.limit {
            self.flush();
        }
    }

    /// Commit whatever is queued.
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let ops = std::mem::take(&mut self.pending);
        let size = ops.len();
        self.report.batches += 1;
        let batch_no = self.report.batches;

        let failure = match self.store.commit_batch(&ops) {
            Ok(()) => {
                self.report.written += size;
                debug!(
                    "{}: committed batch {} ({} records)",
                    self.entity, batch_no, size
                );
                None
            }
            Err(e) => {
                warn!(
                    "{}: batch {} rejected, skipping {} records: {}",
                    self.entity, batch_no, size, e
                );
                self.report.skipped.push(Skip {
                    reason: SkipReason::BatchRejected {
                        message: e.to_string(),
                    },
                    subject: format!("batch {}", batch_no),
                    records: size,
                });
                Some(e.to_string())
            }
        };

        if let Some(reporter) = self.reporter {
            let message = self.progress_message(batch_no, failure.as_deref());
            super::emit(reporter, self.entity, &message);
        }
    }

    /// Records committed so far.
    pub fn written(&self) -> usize {
        self.report.written
    }

    /// Records queued for the next commit.
    pub fn queued(&self) -> usize {
        self.pending.len()
    }

    fn progress_message(&self, batch_no: usize, failure: Option<&str>) -> String {
        let label = self.entity.label();
        let written = self.report.written;
        match (self.expected, failure) {
            (Some(total), None) => format!(
                "{}: batch {}/{} committed, {}/{} records written",
                label,
                batch_no,
                total.div_ceil(self.limit),
                written,
                total
            ),
            (Some(total), Some(err)) => format!(
                "{}: batch {}/{} failed ({}), {}/{} records written",
                label,
                batch_no,
                total.div_ceil(self.limit),
                err,
                written,
                total
            ),
            (None, None) => format!(
                "{}: batch {} committed, {} records written",
                label, batch_no, written
            ),
            (None, Some(err)) => format!(
                "{}: batch {} failed ({}), {} records written",
                label, batch_no, err, written
            ),
        }
    }

    /// Commit the remainder and return the totals.
    pub fn finish(mut self) -> BatchReport {
        self.flush();
        self.report
    }
}
