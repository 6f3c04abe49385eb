//! Prepared bulk operations.
//!
//! A bulk operation runs in three steps:
//!
//! 1. [`PreparedOperation::prepare`] resolves the mapping and assigns
//!    identity placeholders. No I/O.
//! 2. The caller builds and runs the SQL and the bulk transfer.
//! 3. [`PreparedOperation::complete`] (or `complete_async`) reads the output
//!    table back and reconciles it into the entities.

use tracing::{debug, info, warn};

use bulkmap_core::{
    assign_placeholders, reset_placeholders, BulkConfig, BulkEntity, MappingResolver,
    MetadataProvider, OrderPlan, Reconciler, Reconciliation, ResolvedMapping, StatsInfo,
};
use bulkmap_proto::{OperationType, OutputMarker, OutputRowset};

use crate::error::{Error, Result};
use crate::source::{OutputRequest, OutputSource};

#[cfg(feature = "async")]
use crate::source::AsyncOutputSource;
#[cfg(feature = "async")]
use tokio_util::sync::CancellationToken;

/// Result of completing an operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outcome {
    /// What reconciliation applied.
    pub reconciliation: Reconciliation,
    /// Row counts, when requested.
    pub stats: Option<StatsInfo>,
}

/// An operation whose mapping is resolved and whose entities are ready to write.
#[derive(Debug)]
pub struct PreparedOperation<T> {
    mapping: ResolvedMapping<T>,
    plan: OrderPlan,
}

impl<T: BulkEntity> PreparedOperation<T> {
    /// Resolve the mapping for `entities` and prepare them for the write.
    ///
    /// Rounds `datetime2` values when configured and assigns identity
    /// placeholders for order-preserving writes.
    pub fn prepare<P: MetadataProvider + ?Sized>(
        resolver: &MappingResolver<'_, P>,
        entities: &mut [T],
        operation: OperationType,
        config: &BulkConfig,
    ) -> Result<Self> {
        let mapping = resolver.resolve(entities, operation, config)?;
        if config.datetime2_precision_force_round() {
            let rounded = mapping.round_datetime_values(entities)?;
            debug!(rounded, "rounded datetime2 values");
        }
        let plan = assign_placeholders(&mapping, entities)?;

        info!(
            entity = %mapping.facts.entity_type,
            operation = operation.name(),
            entities = entities.len(),
            staging = mapping.writes_to_staging(),
            output = mapping.creates_output_table(),
            "prepared bulk operation"
        );
        Ok(Self { mapping, plan })
    }
}

impl<T> PreparedOperation<T> {
    /// The resolved mapping, for the SQL builder and transfer channel.
    pub fn mapping(&self) -> &ResolvedMapping<T> {
        &self.mapping
    }

    /// The placeholder plan.
    pub fn plan(&self) -> &OrderPlan {
        &self.plan
    }

    /// Output table read request.
    pub fn output_request(&self) -> OutputRequest {
        OutputRequest::for_mapping(&self.mapping)
    }

    fn counts_stats(&self) -> bool {
        self.mapping.config.calculate_stats() && self.mapping.creates_output_table()
    }

    /// Read the output back with a blocking source and reconcile.
    ///
    /// On error, placeholder identities are cleared back to zero. Values a
    /// failed merge already wrote stay on their entities.
    pub fn complete<S>(&self, entities: &mut Vec<T>, source: &mut S) -> Result<Outcome>
    where
        S: OutputSource + ?Sized,
        T: Default,
    {
        let result = self
            .read_output(source)
            .and_then(|(rows, counts)| self.finish(entities, rows, counts));
        self.settle(entities, result)
    }

    fn read_output<S>(&self, source: &mut S) -> Result<(Option<OutputRowset>, Option<(usize, usize)>)>
    where
        S: OutputSource + ?Sized,
    {
        let request = self.output_request();
        let rows = if self.mapping.loads_output() {
            Some(source.fetch_output(&request).map_err(Error::Source)?)
        } else {
            None
        };
        let counts = if self.counts_stats() {
            let updated = source
                .count_marked(&request, OutputMarker::IsUpdate)
                .map_err(Error::Source)?;
            let deleted = source
                .count_marked(&request, OutputMarker::IsDelete)
                .map_err(Error::Source)?;
            Some((updated, deleted))
        } else {
            None
        };
        Ok((rows, counts))
    }

    /// Read the output back with a suspending source and reconcile.
    ///
    /// `cancel` is checked before each read. Errors, cancellation included,
    /// clear placeholder identities as [`complete`](Self::complete) does.
    #[cfg(feature = "async")]
    pub async fn complete_async<S>(
        &self,
        entities: &mut Vec<T>,
        source: &mut S,
        cancel: &CancellationToken,
    ) -> Result<Outcome>
    where
        S: AsyncOutputSource + ?Sized,
        T: Default,
    {
        let result = self
            .read_output_async(source, cancel)
            .await
            .and_then(|(rows, counts)| self.finish(entities, rows, counts));
        self.settle(entities, result)
    }

    #[cfg(feature = "async")]
    async fn read_output_async<S>(
        &self,
        source: &mut S,
        cancel: &CancellationToken,
    ) -> Result<(Option<OutputRowset>, Option<(usize, usize)>)>
    where
        S: AsyncOutputSource + ?Sized,
    {
        let request = self.output_request();
        let rows = if self.mapping.loads_output() {
            Some(cancellable(cancel, source.fetch_output(&request)).await?)
        } else {
            None
        };
        let counts = if self.counts_stats() {
            let updated = cancellable(cancel, source.count_marked(&request, OutputMarker::IsUpdate)).await?;
            let deleted = cancellable(cancel, source.count_marked(&request, OutputMarker::IsDelete)).await?;
            Some((updated, deleted))
        } else {
            None
        };
        Ok((rows, counts))
    }

    fn settle(&self, entities: &mut [T], result: Result<Outcome>) -> Result<Outcome> {
        if let Err(err) = &result {
            match reset_placeholders(&self.mapping, entities) {
                Ok(reset) => warn!(error = %err, reset, "bulk operation failed, placeholders cleared"),
                Err(reset_err) => warn!(error = %err, %reset_err, "bulk operation failed, placeholders kept"),
            }
        }
        result
    }

    fn finish(
        &self,
        entities: &mut Vec<T>,
        rows: Option<OutputRowset>,
        counts: Option<(usize, usize)>,
    ) -> Result<Outcome>
    where
        T: Default,
    {
        let (reconciliation, total) = match rows {
            Some(rows) => {
                let reconciliation = Reconciler::new(&self.mapping).reconcile(entities, &rows, &self.plan)?;
                if reconciliation.timestamp_info.is_some() {
                    reset_placeholders(&self.mapping, entities)?;
                }
                (reconciliation, rows.len())
            }
            None => {
                let reset = reset_placeholders(&self.mapping, entities)?;
                debug!(reset, "output not loaded, placeholders cleared");
                (Reconciliation::default(), entities.len())
            }
        };

        let stats = counts.map(|(updated, deleted)| StatsInfo::from_counts(total, updated, deleted));
        info!(
            entity = %self.mapping.facts.entity_type,
            applied = reconciliation.applied,
            skipped = reconciliation.timestamp_info.as_ref().map_or(0, |t| t.skipped_for_update),
            stats = ?stats,
            "completed bulk operation"
        );
        Ok(Outcome {
            reconciliation,
            stats,
        })
    }
}

#[cfg(feature = "async")]
async fn cancellable<V, F>(cancel: &CancellationToken, read: F) -> Result<V>
where
    F: std::future::Future<Output = std::result::Result<V, crate::error::BoxError>>,
{
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = read => result.map_err(Error::Source),
    }
}
