//! Read-back: copy rows loaded by key onto the caller's entities.

use std::collections::HashMap;

use indexmap::IndexSet;
use tracing::debug;

use super::key::key_signature;
use crate::catalog::ProviderKind;
use crate::error::Result;
use crate::mapping::ResolvedMapping;
use bulkmap_proto::Value;

/// Correlate `entities` with `existing` rows by key and copy every selected
/// property and every inline owned member from the matching row.
///
/// Rows are matched by key signature; the first row wins for a repeated
/// signature. On PostgreSQL an unmatched entity takes the row at the same
/// position. Returns the number of entities updated.
pub fn merge_read_entities<T>(
    mapping: &ResolvedMapping<T>,
    entities: &mut [T],
    existing: &[T],
) -> Result<usize> {
    let accessors = &mapping.accessors;
    let key_slots: Vec<usize> = mapping
        .key()
        .properties()
        .filter(|p| mapping.roles().transfer.contains_key(*p))
        .filter_map(|p| accessors.slot(p))
        .collect();
    let copy_slots: IndexSet<usize> = mapping
        .roles()
        .selected
        .keys()
        .map(String::as_str)
        .chain(mapping.facts.owned_columns.iter().map(|c| c.property.as_str()))
        .filter_map(|p| accessors.slot(p))
        .collect();

    let signature = |entity: &T| {
        let values: Vec<Value> = key_slots.iter().map(|slot| accessors.get(entity, *slot)).collect();
        key_signature(&values)
    };

    let mut by_signature: HashMap<String, usize> = HashMap::with_capacity(existing.len());
    for (i, row) in existing.iter().enumerate() {
        by_signature.entry(signature(row)).or_insert(i);
    }

    let positional_fallback = mapping.facts.provider == ProviderKind::PostgreSql;
    let mut merged = 0;
    for (i, entity) in entities.iter_mut().enumerate() {
        let matched = match by_signature.get(&signature(entity)) {
            Some(index) => existing.get(*index),
            None if positional_fallback => existing.get(i),
            None => None,
        };
        let Some(row) = matched else {
            continue;
        };
        for slot in &copy_slots {
            accessors.set(entity, *slot, accessors.get(row, *slot))?;
        }
        merged += 1;
    }

    debug!(
        entity = %mapping.facts.entity_type,
        entities = entities.len(),
        existing = existing.len(),
        merged,
        "merged read entities"
    );
    Ok(merged)
}
