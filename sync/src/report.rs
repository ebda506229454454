//! Per-pass counters.

use std::fmt;

/// Summary of one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Bindings loaded at pass start.
    pub subjects_total: usize,
    /// Subjects whose membership was read and whose plan was attempted.
    pub subjects_synced: usize,
    /// Subjects no longer in the community.
    pub subjects_skipped_missing: usize,
    /// Subjects whose current roles could not be read.
    pub subjects_failed: usize,
    pub roles_added: usize,
    pub roles_removed: usize,
    /// Oracle errors and timeouts; those subjects were evaluated as holding nothing.
    pub oracle_failures: usize,
    pub mutation_failures: usize,
    /// The pass stopped early on request.
    pub cancelled: bool,
}

impl SyncReport {
    /// Subjects that were not reached because the pass was cancelled.
    pub fn subjects_unprocessed(&self) -> usize {
        self.subjects_total
            .saturating_sub(self.subjects_synced + self.subjects_skipped_missing + self.subjects_failed)
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} synced, {} missing, {} failed, +{} -{} roles, {} oracle failures, {} mutation failures",
            self.subjects_synced,
            self.subjects_total,
            self.subjects_skipped_missing,
            self.subjects_failed,
            self.roles_added,
            self.roles_removed,
            self.oracle_failures,
            self.mutation_failures,
        )?;
        if self.cancelled {
            write!(f, " (cancelled, {} not reached)", self.subjects_unprocessed())?;
        }
        Ok(())
    }
}
