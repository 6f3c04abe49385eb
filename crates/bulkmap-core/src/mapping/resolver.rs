//! Mapping resolution: introspection plus classification plus accessors.

use indexmap::IndexSet;
use tracing::{debug, info};

use super::accessor::{AccessorRegistry, AccessorTable, BulkEntity};
use super::classify::{classify, Classification, KeySpec, RoleSets};
use super::facts::{IdentitySpec, RelationFacts, TimestampSpec};
use super::introspect::introspect;
use crate::catalog::MetadataProvider;
use crate::config::{BulkConfig, OUTPUT_SUFFIX, STAGING_SUFFIX};
use crate::error::{DataShapeError, Result};
use crate::transfer::TransferSettings;
use bulkmap_proto::{OperationType, Value};

/// Fractional-second digits carried by `Value::Timestamp`.
const MICROS_PRECISION: u8 = 6;

/// Names of the staging and output tables for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingNames {
    /// Schema of the staging table.
    pub schema: Option<String>,
    /// Staging table name.
    pub table: String,
    /// Output table name.
    pub output_table: String,
    /// Schema of the output table (always the target schema).
    pub output_schema: Option<String>,
    /// Whether the staging tables are session-local.
    pub session_local: bool,
    /// Whether rows are read from a caller-provided source table.
    pub from_source: bool,
}

impl StagingNames {
    /// Qualified staging table name. Session-local tables are prefixed `#`.
    pub fn full_name(&self) -> String {
        qualify(self.schema.as_deref(), &self.table, self.session_local)
    }

    /// Qualified output table name.
    pub fn full_output_name(&self) -> String {
        qualify(self.output_schema.as_deref(), &self.output_table, self.session_local)
    }
}

fn qualify(schema: Option<&str>, table: &str, session_local: bool) -> String {
    if session_local {
        return format!("#{}", table);
    }
    match schema {
        Some(schema) => format!("{}.{}", schema, table),
        None => table.to_string(),
    }
}

fn staging_names(facts: &RelationFacts, config: &BulkConfig) -> StagingNames {
    let mut suffix = String::new();
    let (schema, table, session_local, from_source) = match config.custom_source_table() {
        Some(source) => (
            source.schema.clone().or_else(|| facts.schema.clone()),
            source.name.clone(),
            false,
            true,
        ),
        None => {
            suffix.push_str(STAGING_SUFFIX);
            if config.unique_table_name_temp_db() {
                suffix.push_str(&format!("{:08x}", rand::random::<u32>()));
            }
            (
                facts.schema.clone(),
                format!("{}{}", facts.table_name, suffix),
                config.use_temp_db(),
                false,
            )
        }
    };

    StagingNames {
        output_table: format!("{}{}", table, OUTPUT_SUFFIX),
        output_schema: facts.schema.clone(),
        schema,
        table,
        session_local,
        from_source,
    }
}

/// Everything the SQL builder and the reconciler need for one operation.
///
/// Built once per operation and read-only afterwards.
#[derive(Debug)]
pub struct ResolvedMapping<T> {
    /// Operation being performed.
    pub operation: OperationType,
    /// Configuration the mapping was resolved with.
    pub config: BulkConfig,
    /// Introspected relation facts.
    pub facts: RelationFacts,
    /// Role sets and join key.
    pub classification: Classification,
    /// Staging and output table names.
    pub staging: StagingNames,
    /// Compiled accessors for every non-shadow property the mapping touches.
    pub accessors: AccessorTable<T>,
}

impl<T> ResolvedMapping<T> {
    /// Role sets.
    pub fn roles(&self) -> &RoleSets {
        &self.classification.roles
    }

    /// Join key.
    pub fn key(&self) -> &KeySpec {
        &self.classification.key
    }

    /// Identity column.
    pub fn identity(&self) -> Option<&IdentitySpec> {
        self.facts.identity.as_ref()
    }

    /// Row version column.
    pub fn timestamp(&self) -> Option<&TimestampSpec> {
        self.facts.timestamp.as_ref()
    }

    /// Properties left to their database default on insert.
    pub fn default_valued(&self) -> &IndexSet<String> {
        &self.classification.default_valued
    }

    /// Qualified target table name.
    pub fn target_name(&self) -> String {
        qualify(self.facts.schema.as_deref(), &self.facts.table_name, false)
    }

    /// Whether rows go to a staging table rather than straight into the target.
    pub fn writes_to_staging(&self) -> bool {
        if self.staging.from_source {
            return false;
        }
        !self.operation.is_insert() || self.config.set_output_identity()
    }

    /// Whether an output table is created to capture written rows.
    pub fn creates_output_table(&self) -> bool {
        self.operation != OperationType::Read
            && (self.config.set_output_identity() || self.config.calculate_stats())
    }

    /// Whether the output carries a database-assigned identifier.
    ///
    /// True when the identity column is captured, or when the single key
    /// property is left to its database default.
    pub fn has_output_identity(&self) -> bool {
        let identity_in_output = self
            .identity()
            .is_some_and(|i| self.roles().output.values().any(|c| c == &i.column));
        let defaulted_single_key = self.facts.primary_key.len() == 1
            && self
                .key()
                .first()
                .is_some_and(|(p, _)| self.default_valued().contains(p));
        identity_in_output || defaulted_single_key
    }

    /// Whether output rows are read back into the entities.
    pub fn loads_output(&self) -> bool {
        self.config.set_output_identity() && self.has_output_identity()
    }

    /// Settings for the transfer channel.
    pub fn transfer_settings(&self) -> TransferSettings {
        let destination = if self.writes_to_staging() {
            self.staging.full_name()
        } else {
            self.target_name()
        };
        TransferSettings {
            destination,
            batch_size: self.config.batch_size(),
            notify_after: self.config.notify_after(),
            timeout: self.config.bulk_copy_timeout(),
            column_mappings: self.roles().transfer.clone(),
        }
    }

    /// Round timestamps of `datetime2(n)` properties to their column precision.
    ///
    /// Rounds half away from zero; the transfer channel would truncate.
    /// Returns the number of values changed.
    pub fn round_datetime_values(&self, entities: &mut [T]) -> Result<usize> {
        let mut changed = 0;
        for (property, precision) in &self.facts.datetime2_precisions {
            if *precision >= MICROS_PRECISION {
                continue;
            }
            let Some(slot) = self.accessors.slot(property) else {
                continue;
            };
            let unit = 10i64.pow(u32::from(MICROS_PRECISION - precision));
            for entity in entities.iter_mut() {
                if let Value::Timestamp(micros) = self.accessors.get(entity, slot) {
                    let rounded = round_half_away(micros, unit);
                    if rounded != micros {
                        self.accessors.set(entity, slot, Value::Timestamp(rounded))?;
                        changed += 1;
                    }
                }
            }
        }
        Ok(changed)
    }
}

/// Rounds in `i128`; results past the `i64` range fall back one unit toward zero.
fn round_half_away(value: i64, unit: i64) -> i64 {
    let (value, unit) = (i128::from(value), i128::from(unit));
    let half = unit / 2;
    let rounded = if value >= 0 {
        (value + half) / unit * unit
    } else {
        -((-value + half) / unit * unit)
    };
    i64::try_from(rounded).unwrap_or((value / unit * unit) as i64)
}

/// Resolves the mapping of an entity type for one operation.
pub struct MappingResolver<'a, P: ?Sized> {
    provider: &'a P,
    type_name: Option<String>,
    in_transaction: bool,
}

impl<'a, P: MetadataProvider + ?Sized> MappingResolver<'a, P> {
    /// Create a resolver over a metadata provider.
    pub fn new(provider: &'a P) -> Self {
        Self {
            provider,
            type_name: None,
            in_transaction: false,
        }
    }

    /// Name the entity type instead of taking it from the batch.
    pub fn with_type_name(mut self, name: impl Into<String>) -> Self {
        self.type_name = Some(name.into());
        self
    }

    /// Mark the operation as running inside an explicit open transaction.
    pub fn in_transaction(mut self, in_transaction: bool) -> Self {
        self.in_transaction = in_transaction;
        self
    }

    /// Resolve the mapping for `entities`.
    pub fn resolve<T: BulkEntity>(
        &self,
        entities: &[T],
        operation: OperationType,
        config: &BulkConfig,
    ) -> Result<ResolvedMapping<T>> {
        let facts = introspect(
            self.provider,
            self.type_name.as_deref(),
            entities,
            operation,
            config,
            self.in_transaction,
        )?;
        let registry = AccessorRegistry::<T>::for_entity();
        let classification = classify(&facts, config, operation, entities, &registry)?;

        let roles = &classification.roles;
        let touched: IndexSet<&str> = roles
            .transfer
            .keys()
            .chain(roles.selected.keys())
            .chain(roles.compare.keys())
            .chain(roles.update.keys())
            .chain(roles.output.keys())
            .chain(classification.key.columns.keys())
            .map(|k| k.as_str())
            .collect();

        for path in &touched {
            let shadow = facts.find(path).is_some_and(|f| f.is_shadow);
            if !shadow && !registry.contains(path) {
                return Err(DataShapeError::MissingAccessor {
                    entity: facts.entity_type.clone(),
                    property: path.to_string(),
                }
                .into());
            }
        }
        // Read-back copies inline owned members even though only the key is loaded.
        let read_owned = facts
            .owned_columns
            .iter()
            .filter(|_| operation == OperationType::Read)
            .map(|c| c.property.as_str());
        let accessors = AccessorTable::compile(&registry, touched.iter().copied().chain(read_owned));
        let staging = staging_names(&facts, config);

        info!(
            entity = %facts.entity_type,
            operation = operation.name(),
            target = %qualify(facts.schema.as_deref(), &facts.table_name, false),
            staging = %staging.full_name(),
            entities = entities.len(),
            "resolved mapping"
        );
        debug!(accessors = accessors.len(), key = ?classification.key.columns, "compiled accessors");

        Ok(ResolvedMapping {
            operation,
            config: config.clone(),
            facts,
            classification,
            staging,
            accessors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_away() {
        assert_eq!(round_half_away(1_234_567, 1000), 1_235_000);
        assert_eq!(round_half_away(1_234_499, 1000), 1_234_000);
        assert_eq!(round_half_away(-1_500, 1000), -2_000);
        assert_eq!(round_half_away(-1_499, 1000), -1_000);
        assert_eq!(round_half_away(7, 1), 7);

        assert_eq!(round_half_away(i64::MAX, 1000), 9_223_372_036_854_775_000);
        assert_eq!(round_half_away(i64::MIN, 1000), -9_223_372_036_854_775_000);
        assert_eq!(round_half_away(i64::MIN, 1), i64::MIN);
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify(Some("dbo"), "ItemsTemp", false), "dbo.ItemsTemp");
        assert_eq!(qualify(Some("dbo"), "ItemsTemp", true), "#ItemsTemp");
        assert_eq!(qualify(None, "ItemsTemp", false), "ItemsTemp");
    }
}
