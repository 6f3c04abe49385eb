//! Sources of staging output rows.
//!
//! The SQL that fills the output table is built and run elsewhere; a source
//! only reads it back. [`OutputSource`] is the blocking convention and
//! [`AsyncOutputSource`] (feature `async`) the suspending one.

use bulkmap_core::ResolvedMapping;
use bulkmap_proto::{OutputMarker, OutputRowset};

use crate::error::BoxError;

/// What to read from the output table of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRequest {
    /// Qualified output table name.
    pub table: String,
    /// Columns to select, in output order. The row version comes last.
    pub columns: Vec<String>,
    /// Column to order rows by, when rows are matched by position.
    pub order_by: Option<String>,
}

impl OutputRequest {
    /// Describe the output table of a resolved mapping.
    pub fn for_mapping<T>(mapping: &ResolvedMapping<T>) -> Self {
        let order_by = if mapping.config.preserve_insert_order() {
            mapping.identity().map(|i| i.column.clone())
        } else {
            None
        };
        Self {
            table: mapping.staging.full_output_name(),
            columns: mapping.roles().output.values().cloned().collect(),
            order_by,
        }
    }
}

/// Blocking reader of output tables.
pub trait OutputSource {
    /// Read every row of the output table.
    fn fetch_output(&mut self, request: &OutputRequest) -> Result<OutputRowset, BoxError>;

    /// Count output rows whose marker column is set.
    fn count_marked(&mut self, request: &OutputRequest, marker: OutputMarker) -> Result<usize, BoxError>;
}

/// Suspending reader of output tables.
#[cfg(feature = "async")]
#[async_trait::async_trait]
pub trait AsyncOutputSource: Send {
    /// Read every row of the output table.
    async fn fetch_output(&mut self, request: &OutputRequest) -> Result<OutputRowset, BoxError>;

    /// Count output rows whose marker column is set.
    async fn count_marked(
        &mut self,
        request: &OutputRequest,
        marker: OutputMarker,
    ) -> Result<usize, BoxError>;
}
