//! Settings handed to the bulk transfer channel, and progress reporting.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mapping::PropertyColumns;

/// How the transfer channel should load rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferSettings {
    /// Qualified destination table.
    pub destination: String,
    /// Rows per batch.
    pub batch_size: usize,
    /// Rows between progress notifications.
    pub notify_after: usize,
    /// Transfer timeout; `None` keeps the channel default.
    pub timeout: Option<Duration>,
    /// Property to column mappings, in load order.
    pub column_mappings: PropertyColumns,
}

/// Fraction of `total` rows copied, rounded to four decimal places.
///
/// An empty batch is complete.
pub fn progress_fraction(total: usize, copied: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    let fraction = copied.min(total) as f64 / total as f64;
    (fraction * 10_000.0).round() / 10_000.0
}

/// Forwards transfer progress to a caller callback.
pub struct ProgressReporter<F> {
    total: usize,
    last: Option<f64>,
    callback: F,
}

impl<F: FnMut(f64)> ProgressReporter<F> {
    /// Create a reporter for a batch of `total` rows.
    pub fn new(total: usize, callback: F) -> Self {
        Self {
            total,
            last: None,
            callback,
        }
    }

    /// Report that `copied` rows have been transferred.
    ///
    /// Repeated reports of the same rounded fraction are dropped.
    pub fn report(&mut self, copied: usize) {
        let fraction = progress_fraction(self.total, copied);
        if self.last != Some(fraction) {
            self.last = Some(fraction);
            (self.callback)(fraction);
        }
    }

    /// Last fraction reported.
    pub fn last(&self) -> Option<f64> {
        self.last
    }
}
