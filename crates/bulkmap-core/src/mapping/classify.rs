//! Property classification into role sets and a join key.

use indexmap::IndexSet;
use tracing::debug;

use super::accessor::AccessorRegistry;
use super::facts::{ColumnFact, PropertyColumns, RelationFacts};
use crate::catalog::ClrType;
use crate::config::{BulkConfig, PropertyFilter};
use crate::error::{ConfigError, Result};
use bulkmap_proto::OperationType;

/// Columns used in each role of a bulk operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoleSets {
    /// Columns moved by the transfer channel into the staging or target table.
    pub transfer: PropertyColumns,
    /// Columns kept by the general include/exclude filter.
    pub selected: PropertyColumns,
    /// Columns written by the insert branch: transfer minus the identity
    /// column and minus default-valued properties.
    pub insert: PropertyColumns,
    /// Columns compared to detect changed rows.
    pub compare: PropertyColumns,
    /// Columns assigned by the update branch.
    pub update: PropertyColumns,
    /// Columns captured into the output table; the row version comes last.
    pub output: PropertyColumns,
}

/// The join key of a set operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeySpec {
    /// Key property to column, in key order.
    pub columns: PropertyColumns,
    /// Whether the key comes from `update_by_properties`.
    pub explicit: bool,
}

impl KeySpec {
    /// Check if the key has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of key columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if `property` is part of the key.
    pub fn contains(&self, property: &str) -> bool {
        self.columns.contains_key(property)
    }

    /// Key property names in order.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    /// First key property and its column.
    pub fn first(&self) -> Option<(&str, &str)> {
        self.columns
            .first()
            .map(|(p, c)| (p.as_str(), c.as_str()))
    }
}

/// Result of classifying a relation's properties for one operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification {
    /// Role sets.
    pub roles: RoleSets,
    /// Join key.
    pub key: KeySpec,
    /// Properties left to their database default on insert.
    pub default_valued: IndexSet<String>,
    /// Shadow, non-foreign-key columns of the transfer set.
    pub shadow_columns: Vec<String>,
    /// Whether any key property accepts null.
    pub key_nullable: bool,
}

fn columns_of<'a>(facts: impl IntoIterator<Item = &'a ColumnFact>) -> PropertyColumns {
    facts
        .into_iter()
        .map(|f| (f.property.clone(), f.column_name.clone()))
        .collect()
}

/// Partition the relation's properties into role sets.
///
/// `entities` and `registry` are only read to decide which properties hold
/// their type's default across the whole batch.
pub fn classify<T>(
    facts: &RelationFacts,
    config: &BulkConfig,
    operation: OperationType,
    entities: &[T],
    registry: &AccessorRegistry<T>,
) -> Result<Classification> {
    let key = resolve_key(facts, config)?;
    if operation.loads_only_key() && key.is_empty() {
        return Err(ConfigError::MissingKey {
            entity: facts.entity_type.clone(),
            operation,
        }
        .into());
    }

    let general = merge_key_into_include(config.properties(), &key);
    validate_filter(facts, config, &general, "properties_to_include", "properties_to_exclude")?;
    validate_filter(
        facts,
        config,
        config.compare_properties(),
        "properties_to_include_on_compare",
        "properties_to_exclude_on_compare",
    )?;
    validate_filter(
        facts,
        config,
        config.update_properties(),
        "properties_to_include_on_update",
        "properties_to_exclude_on_update",
    )?;

    let base: Vec<&ColumnFact> = facts
        .columns
        .iter()
        .filter(|c| !facts.is_timestamp(&c.property))
        .collect();
    let writable: Vec<&ColumnFact> = base.iter().copied().filter(|c| !c.is_computed()).collect();
    let selected_facts: Vec<&ColumnFact> = writable
        .iter()
        .copied()
        .filter(|c| general.allows(&c.property))
        .collect();

    let mut roles = RoleSets {
        selected: columns_of(selected_facts.iter().copied()),
        ..RoleSets::default()
    };

    roles.compare = match config.compare_properties() {
        PropertyFilter::All => roles.selected.clone(),
        filter => columns_of(writable.iter().copied().filter(|c| filter.allows(&c.property))),
    };
    roles.update = match config.update_properties() {
        PropertyFilter::All => columns_of(
            selected_facts
                .iter()
                .copied()
                .filter(|c| !key.contains(&c.property)),
        ),
        filter => columns_of(writable.iter().copied().filter(|c| filter.allows(&c.property))),
    };
    roles.transfer = if operation.loads_only_key() {
        columns_of(selected_facts.iter().copied().filter(|c| key.contains(&c.property)))
    } else {
        roles.selected.clone()
    };
    roles.output = columns_of(base.iter().copied());

    if !operation.loads_only_key() {
        for owned in &facts.owned_columns {
            if !general.allows(&owned.property) {
                continue;
            }
            let entry = (owned.property.clone(), owned.column_name.clone());
            roles.transfer.insert(entry.0.clone(), entry.1.clone());
            roles.selected.insert(entry.0.clone(), entry.1.clone());
            roles.compare.insert(entry.0.clone(), entry.1.clone());
            roles.update.insert(entry.0.clone(), entry.1.clone());
            roles.output.insert(entry.0, entry.1);
        }
    }
    if let Some(timestamp) = &facts.timestamp {
        roles
            .output
            .insert(timestamp.property.clone(), timestamp.column.clone());
    }

    let default_valued = detect_default_valued(&base, &key, entities, registry);

    roles.insert = roles
        .transfer
        .iter()
        .filter(|(property, _)| !facts.is_identity(property) && !default_valued.contains(*property))
        .map(|(p, c)| (p.clone(), c.clone()))
        .collect();

    let shadow_columns = roles
        .transfer
        .keys()
        .filter_map(|p| facts.find(p))
        .filter(|f| f.is_shadow && !f.is_foreign_key)
        .map(|f| f.column_name.clone())
        .collect();
    let key_nullable = selected_facts
        .iter()
        .any(|c| key.contains(&c.property) && c.is_nullable);

    debug!(
        entity = %facts.entity_type,
        operation = operation.name(),
        transfer = roles.transfer.len(),
        insert = roles.insert.len(),
        compare = roles.compare.len(),
        update = roles.update.len(),
        output = roles.output.len(),
        default_valued = default_valued.len(),
        "classified properties"
    );

    Ok(Classification {
        roles,
        key,
        default_valued,
        shadow_columns,
        key_nullable,
    })
}

fn resolve_key(facts: &RelationFacts, config: &BulkConfig) -> Result<KeySpec> {
    if config.update_by_properties().is_empty() {
        return Ok(KeySpec {
            columns: facts.primary_key_columns(),
            explicit: false,
        });
    }

    let mut columns = PropertyColumns::new();
    for name in config.update_by_properties() {
        let fact = facts
            .columns
            .iter()
            .find(|c| &c.property == name)
            .ok_or_else(|| ConfigError::UnknownProperty {
                entity: facts.entity_type.clone(),
                list: "update_by_properties",
                property: name.clone(),
            })?;
        columns.insert(fact.property.clone(), fact.column_name.clone());
    }
    Ok(KeySpec {
        columns,
        explicit: true,
    })
}

/// An explicit include list always carries the join key.
fn merge_key_into_include(filter: &PropertyFilter, key: &KeySpec) -> PropertyFilter {
    match filter {
        PropertyFilter::Include(names) => {
            let mut merged = names.clone();
            for property in key.properties() {
                if !merged.iter().any(|n| n == property) {
                    merged.push(property.to_string());
                }
            }
            PropertyFilter::Include(merged)
        }
        other => other.clone(),
    }
}

fn validate_filter(
    facts: &RelationFacts,
    config: &BulkConfig,
    filter: &PropertyFilter,
    include_list: &'static str,
    exclude_list: &'static str,
) -> Result<()> {
    let list = if filter.is_include() {
        include_list
    } else {
        exclude_list
    };
    let allows_empty = list == "properties_to_include_on_update";

    for name in filter.names() {
        let known = facts.has_property(name)
            || (allows_empty && name.is_empty())
            || config.temporal_columns().iter().any(|c| c == name)
            || (name.contains('.') && !facts.refers_to_inline_owned(name))
            || facts.refers_to_separate_owned(name);
        if !known {
            return Err(ConfigError::UnknownProperty {
                entity: facts.entity_type.clone(),
                list,
                property: name.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// A property is left to its database default only when every entity holds
/// the type default; a client-generatable UUID key is always left out.
fn detect_default_valued<T>(
    base: &[&ColumnFact],
    key: &KeySpec,
    entities: &[T],
    registry: &AccessorRegistry<T>,
) -> IndexSet<String> {
    let mut default_valued = IndexSet::new();
    for fact in base {
        if fact.is_shadow || !fact.has_database_default() {
            continue;
        }
        let uuid_key = key.contains(&fact.property) && fact.clr_type == ClrType::Uuid;
        let all_default = match registry.get(&fact.property) {
            Some(accessor) => entities
                .iter()
                .all(|e| fact.clr_type.is_default(&accessor.get(e), fact.is_nullable)),
            None => false,
        };
        if all_default || uuid_key {
            default_valued.insert(fact.property.clone());
        }
    }
    default_valued
}
