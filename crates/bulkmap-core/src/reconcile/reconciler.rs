//! Merges database-assigned values from the output rowset into entities.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::key::{key_signature, CompositeKey};
use super::order::OrderPlan;
use crate::error::{DataShapeError, Result};
use crate::mapping::ResolvedMapping;
use bulkmap_proto::{OutputRowset, Value};

/// Output of a write that returned fewer rows than entities.
///
/// Rows skipped by the merge (typically row version conflicts) leave the
/// entities untouched; the returned rows are kept for inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampInfo {
    /// Number of entities with no output row.
    pub skipped_for_update: usize,
    /// Rows the write did return.
    pub output: OutputRowset,
}

/// Values to write onto one entity, taken from one output row.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationRecord {
    /// Index of the entity in the caller's batch.
    pub original_index: usize,
    /// Key signature of the output row, for diagnostics.
    pub key_signature: String,
    /// Database-assigned identifier.
    pub identity: Option<Value>,
    /// Database-assigned row version.
    pub timestamp: Option<Value>,
    /// Computed and defaulted values, by property.
    pub computed: Vec<(String, Value)>,
}

/// What reconciliation did.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reconciliation {
    /// Entities that received values.
    pub applied: usize,
    /// Set when the output was short and nothing was applied.
    pub timestamp_info: Option<TimestampInfo>,
}

/// Writes output rows back into entities for one resolved mapping.
pub struct Reconciler<'m, T> {
    mapping: &'m ResolvedMapping<T>,
}

/// Column positions of the output rowset, by role.
struct OutputLayout {
    identifier: Option<(usize, usize)>,
    timestamp: Option<(usize, usize)>,
    computed: Vec<(String, usize, usize)>,
    key: Vec<usize>,
}

impl<'m, T> Reconciler<'m, T> {
    /// Create a reconciler for a mapping.
    pub fn new(mapping: &'m ResolvedMapping<T>) -> Self {
        Self { mapping }
    }

    /// Property that identifies an output row: the identity, else the first key property.
    fn identifier_property(&self) -> Option<&'m str> {
        match self.mapping.identity() {
            Some(identity) => Some(identity.property.as_str()),
            None => self.mapping.key().first().map(|(p, _)| p),
        }
    }

    /// Whether rows are matched to entities by key value instead of position.
    fn matches_by_key(&self) -> bool {
        let identifier = self.identifier_property();
        let key = self.mapping.key().first().map(|(p, _)| p);
        self.mapping.operation.is_upsert_family() && identifier.is_some() && identifier != key
    }

    fn layout(&self, rows: &OutputRowset) -> OutputLayout {
        let mapping = self.mapping;
        let output = &mapping.roles().output;
        // (accessor slot, rowset column) for a property captured in the output.
        let locate = |property: &str| -> Option<(usize, usize)> {
            let slot = mapping.accessors.slot(property)?;
            let column = rows.column_index(output.get(property)?)?;
            Some((slot, column))
        };

        let identifier = self.identifier_property();
        let timestamp = mapping.timestamp().map(|t| t.property.as_str());

        let computed = output
            .keys()
            .map(|p| p.as_str())
            .filter(|p| Some(*p) != identifier && Some(*p) != timestamp)
            .filter(|p| mapping.default_valued().contains(*p) || !mapping.roles().transfer.contains_key(*p))
            .filter_map(|p| locate(p).map(|(slot, column)| (p.to_string(), slot, column)))
            .collect();

        let key = mapping
            .key()
            .columns
            .values()
            .filter_map(|column| rows.column_index(column))
            .collect();

        OutputLayout {
            identifier: identifier.and_then(locate),
            timestamp: timestamp.and_then(locate),
            computed,
            key,
        }
    }

    /// Build one record per output row, in output order.
    ///
    /// Rows are matched positionally through `plan`, or by key value when an
    /// upsert matches on properties other than the identifier. Rows that match
    /// no entity are skipped.
    pub fn records(
        &self,
        entities: &[T],
        rows: &OutputRowset,
        plan: &OrderPlan,
    ) -> Result<Vec<ReconciliationRecord>> {
        let layout = self.layout(rows);
        let by_key = if self.matches_by_key() {
            Some(self.index_by_key(entities)?)
        } else {
            None
        };

        let count = match by_key {
            Some(_) => rows.len(),
            None => entities.len().min(rows.len()),
        };
        let mut records = Vec::with_capacity(count);
        for row in 0..count {
            let key_values: Vec<Value> = layout
                .key
                .iter()
                .filter_map(|column| rows.value_at(row, *column).cloned())
                .collect();

            let target = match &by_key {
                Some(index) => {
                    let key = CompositeKey::new(key_values.iter().cloned());
                    if key.has_null() {
                        continue;
                    }
                    match index.get(&key) {
                        Some(i) => *i,
                        None => {
                            debug!(row, key = %key_signature(&key_values), "output row matched no entity");
                            continue;
                        }
                    }
                }
                None => match plan.entity_at(row) {
                    Some(i) => i,
                    None => continue,
                },
            };

            let value = |located: Option<(usize, usize)>| {
                located.and_then(|(_, column)| rows.value_at(row, column).cloned())
            };
            records.push(ReconciliationRecord {
                original_index: target,
                key_signature: key_signature(&key_values),
                identity: value(layout.identifier),
                timestamp: value(layout.timestamp),
                computed: layout
                    .computed
                    .iter()
                    .filter_map(|(p, _, column)| {
                        rows.value_at(row, *column).map(|v| (p.clone(), v.clone()))
                    })
                    .collect(),
            });
        }
        Ok(records)
    }

    fn index_by_key(&self, entities: &[T]) -> Result<HashMap<CompositeKey, usize>> {
        let slots: Vec<usize> = self
            .mapping
            .key()
            .properties()
            .filter_map(|p| self.mapping.accessors.slot(p))
            .collect();
        let mut index = HashMap::with_capacity(entities.len());
        for (i, entity) in entities.iter().enumerate() {
            let values: Vec<Value> = slots
                .iter()
                .map(|slot| self.mapping.accessors.get(entity, *slot))
                .collect();
            let key = CompositeKey::new(values.iter().cloned());
            if index.insert(key, i).is_some() {
                return Err(DataShapeError::DuplicateKey(key_signature(&values)).into());
            }
        }
        Ok(index)
    }

    /// Write the values of each record onto its entity.
    ///
    /// Stops at the first setter that fails; records before it stay applied.
    pub fn apply_records(&self, entities: &mut [T], records: Vec<ReconciliationRecord>) -> Result<usize> {
        let mapping = self.mapping;
        let identifier_slot = self
            .identifier_property()
            .and_then(|p| mapping.accessors.slot(p));
        let timestamp_slot = mapping
            .timestamp()
            .and_then(|t| mapping.accessors.slot(&t.property));

        let mut applied = 0;
        for record in records {
            let Some(entity) = entities.get_mut(record.original_index) else {
                continue;
            };
            if let (Some(slot), Some(value)) = (identifier_slot, record.identity) {
                mapping.accessors.set(entity, slot, value)?;
            }
            if let (Some(slot), Some(value)) = (timestamp_slot, record.timestamp) {
                mapping.accessors.set(entity, slot, value)?;
            }
            for (property, value) in record.computed {
                if let Some(slot) = mapping.accessors.slot(&property) {
                    mapping.accessors.set(entity, slot, value)?;
                }
            }
            applied += 1;
        }
        Ok(applied)
    }

    /// Merge output rows into entities in place, keeping the caller's order.
    ///
    /// A short output is not an error: nothing is applied and the rows are
    /// returned in [`Reconciliation::timestamp_info`].
    pub fn merge(&self, entities: &mut [T], rows: &OutputRowset, plan: &OrderPlan) -> Result<Reconciliation> {
        if rows.len() < entities.len() {
            let skipped = entities.len() - rows.len();
            warn!(
                entity = %self.mapping.facts.entity_type,
                skipped,
                returned = rows.len(),
                "output has fewer rows than entities, values not merged"
            );
            return Ok(Reconciliation {
                applied: 0,
                timestamp_info: Some(TimestampInfo {
                    skipped_for_update: skipped,
                    output: rows.clone(),
                }),
            });
        }

        let records = self.records(entities, rows, plan)?;
        let applied = self.apply_records(entities, records)?;
        debug!(entity = %self.mapping.facts.entity_type, applied, "merged output rows");
        Ok(Reconciliation {
            applied,
            timestamp_info: None,
        })
    }

    /// Reconcile according to the mapping's order setting: merge in place when
    /// preserving order, otherwise replace the collection.
    pub fn reconcile(&self, entities: &mut Vec<T>, rows: &OutputRowset, plan: &OrderPlan) -> Result<Reconciliation>
    where
        T: Default,
    {
        if self.mapping.config.preserve_insert_order() {
            self.merge(entities, rows, plan)
        } else {
            let applied = self.replace(entities, rows)?;
            Ok(Reconciliation {
                applied,
                timestamp_info: None,
            })
        }
    }
}

impl<T: Default> Reconciler<'_, T> {
    /// Replace the collection with entities built from the output rows, in
    /// returned order.
    pub fn replace(&self, entities: &mut Vec<T>, rows: &OutputRowset) -> Result<usize> {
        let mapping = self.mapping;
        let columns: Vec<(usize, usize)> = mapping
            .roles()
            .output
            .iter()
            .filter_map(|(property, column)| {
                Some((mapping.accessors.slot(property)?, rows.column_index(column)?))
            })
            .collect();

        let mut materialized = Vec::with_capacity(rows.len());
        for row in 0..rows.len() {
            let mut entity = T::default();
            for (slot, column) in &columns {
                if let Some(value) = rows.value_at(row, *column) {
                    mapping.accessors.set(&mut entity, *slot, value.clone())?;
                }
            }
            materialized.push(entity);
        }

        entities.clear();
        entities.extend(materialized);
        debug!(entity = %mapping.facts.entity_type, rows = rows.len(), "replaced entities with output rows");
        Ok(rows.len())
    }
}
