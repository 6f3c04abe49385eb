//! Post-write reconciliation.
//!
//! Placeholder assignment before the write, then merging of database-assigned
//! values from the output rowset back into the caller's entities, statistics
//! and read-back.

mod key;
mod order;
mod read;
mod reconciler;
mod stats;

pub use key::{key_signature, key_signature_with, CompositeKey, DEFAULT_KEY_DELIMITER};
pub use order::{assign_placeholders, reset_placeholders, OrderPlan};
pub use read::merge_read_entities;
pub use reconciler::{Reconciler, Reconciliation, ReconciliationRecord, TimestampInfo};
pub use stats::StatsInfo;
