//! Row counts of a completed bulk operation.

use serde::{Deserialize, Serialize};

/// Inserted, updated and deleted row counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsInfo {
    /// Rows inserted.
    pub inserted: usize,
    /// Rows updated.
    pub updated: usize,
    /// Rows deleted.
    pub deleted: usize,
}

impl StatsInfo {
    /// Derive counts from the total rows written and the marker counts read
    /// from the output table. Inserted rows are whatever is left.
    pub fn from_counts(total: usize, updated: usize, deleted: usize) -> Self {
        Self {
            inserted: total.saturating_sub(updated).saturating_sub(deleted),
            updated,
            deleted,
        }
    }

    /// Total rows affected.
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}
