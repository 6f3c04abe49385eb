//! Identity placeholders that keep output rows in caller order.
//!
//! Before an order-preserving write, entities whose identity is still zero get
//! distinct negative placeholders (`-n ..= -1`). The staging table is then
//! ordered by identity, so output rows come back in the same order as the
//! entities and can be matched by position.

use tracing::debug;

use crate::error::{DataShapeError, Result};
use crate::mapping::ResolvedMapping;
use bulkmap_proto::{OperationType, Value};

/// Outcome of placeholder assignment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderPlan {
    /// Whether placeholders were assigned.
    pub placeholders_assigned: bool,
    /// Entity indices in output order: pre-existing entities by identity
    /// ascending, then new entities in their original order. `None` means
    /// original order.
    pub sorted: Option<Vec<usize>>,
}

impl OrderPlan {
    /// A plan that keeps the original order and assigns nothing.
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// Entity index that the `position`-th output row belongs to.
    pub fn entity_at(&self, position: usize) -> Option<usize> {
        match &self.sorted {
            Some(order) => order.get(position).copied(),
            None => Some(position),
        }
    }
}

fn identity_as_i64(value: &Value) -> Result<i64> {
    if value.is_null() {
        return Ok(0);
    }
    value
        .as_i64()
        .ok_or_else(|| DataShapeError::NonIntegralIdentity(value.to_string()).into())
}

/// Identity slot, when order-preserving placeholders apply to this mapping.
fn placeholder_slot<T>(mapping: &ResolvedMapping<T>, len: usize) -> Option<usize> {
    let identity = mapping.identity()?;
    let key = mapping.key();
    let sole_key = key.len() == 1 && key.first().is_some_and(|(_, column)| column == identity.column);
    if !mapping.config.preserve_insert_order() || len <= 1 || !sole_key {
        return None;
    }
    mapping.accessors.slot(&identity.property)
}

/// Assign negative identity placeholders to entities whose identity is zero.
///
/// Skipped for a plain insert where every entity already carries a non-zero
/// identity. For upsert-family operations capturing output, also records the
/// order output rows will come back in.
pub fn assign_placeholders<T>(mapping: &ResolvedMapping<T>, entities: &mut [T]) -> Result<OrderPlan> {
    let Some(slot) = placeholder_slot(mapping, entities.len()) else {
        return Ok(OrderPlan::unchanged());
    };
    let Some(identity) = mapping.identity() else {
        return Ok(OrderPlan::unchanged());
    };

    let current: Vec<i64> = entities
        .iter()
        .map(|e| identity_as_i64(&mapping.accessors.get(e, slot)))
        .collect::<Result<_>>()?;

    if mapping.operation == OperationType::Insert && current.iter().all(|id| *id != 0) {
        debug!(entities = entities.len(), "identities already set, no placeholders");
        return Ok(OrderPlan::unchanged());
    }

    let mut next = -(entities.len() as i64);
    let mut assigned = 0;
    for (entity, id) in entities.iter_mut().zip(&current) {
        if *id == 0 {
            let placeholder = identity
                .clr_type
                .integral_value(next)
                .ok_or_else(|| DataShapeError::NonIntegralIdentity(next.to_string()))?;
            mapping.accessors.set(entity, slot, placeholder)?;
            next += 1;
            assigned += 1;
        }
    }

    let sorted = if mapping.config.set_output_identity() && mapping.operation.is_upsert_family() {
        let mut existing: Vec<(i64, usize)> = current
            .iter()
            .enumerate()
            .filter(|(_, id)| **id != 0)
            .map(|(i, id)| (*id, i))
            .collect();
        existing.sort_unstable();
        if let Some(pair) = existing.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(DataShapeError::DuplicateKey(pair[0].0.to_string()).into());
        }
        let mut order: Vec<usize> = existing.into_iter().map(|(_, i)| i).collect();
        order.extend(current.iter().enumerate().filter(|(_, id)| **id == 0).map(|(i, _)| i));
        Some(order)
    } else {
        None
    };

    debug!(
        entities = entities.len(),
        assigned,
        sorted = sorted.is_some(),
        "assigned identity placeholders"
    );

    Ok(OrderPlan {
        placeholders_assigned: true,
        sorted,
    })
}

/// Clear negative identity placeholders back to zero.
///
/// Used when the write did not return identities, so entities are left as
/// the caller passed them. Returns the number of entities reset.
pub fn reset_placeholders<T>(mapping: &ResolvedMapping<T>, entities: &mut [T]) -> Result<usize> {
    let Some(slot) = placeholder_slot(mapping, entities.len()) else {
        return Ok(0);
    };
    let Some(identity) = mapping.identity() else {
        return Ok(0);
    };
    let zero = identity
        .clr_type
        .integral_value(0)
        .ok_or_else(|| DataShapeError::NonIntegralIdentity("0".to_string()))?;

    let mut reset = 0;
    for entity in entities.iter_mut() {
        if identity_as_i64(&mapping.accessors.get(entity, slot))? < 0 {
            mapping.accessors.set(entity, slot, zero.clone())?;
            reset += 1;
        }
    }
    Ok(reset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_positions() {
        let plan = OrderPlan::unchanged();
        assert_eq!(plan.entity_at(3), Some(3));

        let plan = OrderPlan {
            placeholders_assigned: true,
            sorted: Some(vec![2, 0, 1]),
        };
        assert_eq!(plan.entity_at(0), Some(2));
        assert_eq!(plan.entity_at(3), None);
    }

    #[test]
    fn test_identity_as_i64() {
        assert_eq!(identity_as_i64(&Value::Null).unwrap(), 0);
        assert_eq!(identity_as_i64(&Value::Int16(-4)).unwrap(), -4);
        assert!(identity_as_i64(&Value::from("x")).is_err());
    }
}
