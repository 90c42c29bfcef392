//! Cancellable batch-save worker.
//!
//! One `SavingTask` run performs a single pass over the collection: pending
//! soft-deletions first, then every active entity's two-phase commit. It
//! never aborts on a per-entity failure; the report tells the orchestrator
//! whether a second pass is needed for parked renames.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::error::CoreError;
use crate::core::file_list::MediaFileList;
use crate::core::media_file::SaveOutcome;

#[derive(Debug, Clone)]
pub struct SaveProgress {
    pub processed: usize,
    pub total: usize,
    pub current_file: String,
}

/// Result of one save pass.
#[derive(Debug, Clone, Default)]
pub struct SaveReport {
    pub processed: usize,
    pub errors: usize,
    /// At least one rename was parked under a temporary name; run another
    /// pass so it can claim its now-free target.
    pub needs_second_pass: bool,
}

/// A cancellable unit of work that commits every pending change in a list.
///
/// Runs on a worker context; interactive mutation of the same list must be
/// suspended while a pass is in flight. Abandoning the task mid-pass is safe:
/// entities not yet committed simply keep their changed flags.
pub struct SavingTask {
    cancel_flag: Arc<AtomicBool>,
}

impl SavingTask {
    pub fn new() -> Self {
        Self {
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for requesting cooperative cancellation from another thread.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel_flag.clone()
    }

    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    /// Runs one save pass, reporting progress after every entity.
    pub async fn run<F>(
        &self,
        list: &mut MediaFileList,
        progress_callback: F,
    ) -> Result<SaveReport, CoreError>
    where
        F: Fn(SaveProgress) + Send + Sync,
    {
        let total = list.pending_deletions() + list.len();
        let mut report = SaveReport::default();

        tracing::info!(
            "Starting save pass: {} deletions, {} active entities",
            list.pending_deletions(),
            list.len()
        );

        // Deletions first, so their slots on disk are free before renames.
        let mut pending = 0;
        while pending < list.pending_deletions() {
            if self.is_cancelled() {
                tracing::info!("Save pass cancelled during deletions");
                return Err(CoreError::Cancelled);
            }
            let current_file = list
                .deleted_files()
                .get(pending)
                .map(|f| f.on_disk_name())
                .unwrap_or_default();
            match list.commit_deletion_at(pending) {
                Ok(()) => {}
                Err(e) => {
                    // The entity stays soft-deleted with its error flag set;
                    // skip it so one bad file cannot stall the pass.
                    tracing::warn!("Soft delete failed: {}", e);
                    report.errors += 1;
                    pending += 1;
                }
            }
            report.processed += 1;
            progress_callback(SaveProgress {
                processed: report.processed,
                total,
                current_file,
            });
            tokio::task::yield_now().await;
        }

        for row in 0..list.len() {
            if self.is_cancelled() {
                tracing::info!("Save pass cancelled after {} entities", report.processed);
                return Err(CoreError::Cancelled);
            }

            let current_file = list
                .file(row)
                .map(|f| f.on_disk_name())
                .unwrap_or_default();
            match list.commit_entity(row) {
                SaveOutcome::Successful => {}
                SaveOutcome::NeedsSecondTry => report.needs_second_pass = true,
                SaveOutcome::Error => report.errors += 1,
            }

            report.processed += 1;
            progress_callback(SaveProgress {
                processed: report.processed,
                total,
                current_file,
            });

            if row % 10 == 0 {
                tokio::task::yield_now().await;
            }
        }

        tracing::info!(
            "Save pass complete: {} processed, {} errors, second pass needed: {}",
            report.processed,
            report.errors,
            report.needs_second_pass
        );
        Ok(report)
    }
}

impl Default for SavingTask {
    fn default() -> Self {
        Self::new()
    }
}
