//! Schema introspection: metadata provider facts to [`RelationFacts`].

use indexmap::IndexMap;
use tracing::debug;

use super::accessor::BulkEntity;
use super::facts::{datetime2_precision, ColumnFact, IdentitySpec, RelationFacts, TimestampSpec};
use crate::catalog::{
    ClrType, EntityTypeDef, GenerationStrategy, MetadataProvider, PropertyDef, ProviderKind,
    ValueGenerated,
};
use crate::config::BulkConfig;
use crate::error::{ConfigError, DataShapeError, Result};
use bulkmap_proto::OperationType;

/// Precision at or above which no rounding is needed.
const FULL_DATETIME2_PRECISION: u8 = 7;

/// Read the metadata of the target relation for one operation.
///
/// `type_name` names the entity type; when absent, or unknown to the model,
/// the runtime type of the first entity is used.
pub fn introspect<P, T>(
    provider: &P,
    type_name: Option<&str>,
    entities: &[T],
    operation: OperationType,
    config: &BulkConfig,
    in_transaction: bool,
) -> Result<RelationFacts>
where
    P: MetadataProvider + ?Sized,
    T: BulkEntity,
{
    if config.use_temp_db()
        && !in_transaction
        && (!operation.is_insert() || config.set_output_identity())
    {
        return Err(ConfigError::TempDbOutsideTransaction { operation }.into());
    }

    let (entity_type, has_abstract_list) = resolve_entity_type(provider, type_name, entities)?;
    let provider_kind = ProviderKind::from_provider_name(provider.provider_name());

    let entity_table = entity_type
        .table_name
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| DataShapeError::MissingTableName(entity_type.name.clone()))?;

    let custom = config.custom_destination_table();
    let table_name = custom.map_or(entity_table, |t| t.name.as_str()).to_string();
    let schema = custom
        .and_then(|t| t.schema.clone())
        .or_else(|| entity_type.schema.clone())
        .or_else(|| provider_kind.default_schema().map(str::to_string));

    let mut facts = RelationFacts {
        entity_type: entity_type.name.clone(),
        provider: provider_kind,
        schema,
        table_name,
        columns: Vec::new(),
        owned_columns: Vec::new(),
        primary_key: entity_type.primary_key.clone(),
        identity: None,
        timestamp: None,
        inline_owned_members: Vec::new(),
        separate_owned_members: Vec::new(),
        has_temporal_columns: false,
        has_abstract_list,
        column_types: IndexMap::new(),
        datetime2_precisions: IndexMap::new(),
        converters: IndexMap::new(),
    };

    let mut properties: Vec<&PropertyDef> = entity_type.properties.iter().collect();
    if entity_type.is_abstract {
        for derived_name in &entity_type.derived_types {
            let derived = provider
                .find_entity_type(derived_name)
                .ok_or_else(|| DataShapeError::UnknownEntityType(derived_name.clone()))?;
            for property in &derived.properties {
                if !properties.iter().any(|p| p.name == property.name) {
                    properties.push(property);
                }
            }
        }
    }

    for property in properties {
        let Some(column) = property.column_name.as_deref() else {
            continue;
        };
        let is_temporal = property.shadow
            && property.clr_type == ClrType::Timestamp
            && config.temporal_columns().iter().any(|c| c == column);
        if is_temporal {
            facts.has_temporal_columns = true;
            continue;
        }

        facts
            .column_types
            .insert(column.to_string(), property.store_type.clone());
        if config.datetime2_precision_force_round() {
            if let Some(precision) = datetime2_precision(&property.store_type) {
                if precision < FULL_DATETIME2_PRECISION {
                    facts
                        .datetime2_precisions
                        .insert(property.name.clone(), precision);
                }
            }
        }
        if let Some(converter) = &property.converter {
            facts.converters.insert(column.to_string(), converter.clone());
        }

        facts.columns.push(ColumnFact::from_property(
            property,
            property.name.clone(),
            column.to_string(),
            entity_type.is_key(&property.name),
        ));
    }

    facts.identity = detect_identity(&facts, provider_kind);
    if !config.ignore_row_version() {
        facts.timestamp = facts
            .columns
            .iter()
            .find(|c| c.is_concurrency_token && c.value_generated == ValueGenerated::OnAddOrUpdate)
            .map(|c| TimestampSpec {
                property: c.property.clone(),
                column: c.column_name.clone(),
            });
    }

    collect_owned(provider, entity_type, "", None, &mut facts)?;

    debug!(
        entity = %facts.entity_type,
        table = %facts.table_name,
        columns = facts.columns.len(),
        owned = facts.owned_columns.len(),
        identity = ?facts.identity.as_ref().map(|i| &i.column),
        timestamp = ?facts.timestamp.as_ref().map(|t| &t.column),
        "introspected relation"
    );

    Ok(facts)
}

fn resolve_entity_type<'p, P, T>(
    provider: &'p P,
    type_name: Option<&str>,
    entities: &[T],
) -> Result<(&'p EntityTypeDef, bool)>
where
    P: MetadataProvider + ?Sized,
    T: BulkEntity,
{
    if let Some(entity_type) = type_name.and_then(|name| provider.find_entity_type(name)) {
        return Ok((entity_type, false));
    }

    let runtime_name = match entities.first() {
        Some(entity) => entity.entity_type(),
        None => {
            return Err(match type_name {
                Some(name) => DataShapeError::UnknownEntityType(name.to_string()),
                None => DataShapeError::EmptyBatch,
            }
            .into())
        }
    };

    provider
        .find_entity_type(runtime_name)
        .map(|entity_type| (entity_type, true))
        .ok_or_else(|| DataShapeError::UnknownEntityType(runtime_name.to_string()).into())
}

fn detect_identity(facts: &RelationFacts, provider: ProviderKind) -> Option<IdentitySpec> {
    let to_spec = |fact: &ColumnFact| IdentitySpec {
        property: fact.property.clone(),
        column: fact.column_name.clone(),
        clr_type: fact.clr_type.clone(),
    };

    if provider.has_generation_strategy() {
        let native = match provider {
            ProviderKind::SqlServer => GenerationStrategy::IdentityColumn,
            _ => GenerationStrategy::IdentityByDefaultColumn,
        };
        return facts
            .columns
            .iter()
            .find(|c| c.generation_strategy == Some(native))
            .map(to_spec);
    }

    // Without strategy metadata, the only on-add integral key is the identity.
    let mut candidates = facts.columns.iter().filter(|c| {
        c.is_key && c.value_generated == ValueGenerated::OnAdd && c.clr_type.is_identity_candidate()
    });
    match (candidates.next(), candidates.next()) {
        (Some(fact), None) => Some(to_spec(fact)),
        _ => None,
    }
}

fn collect_owned<P>(
    provider: &P,
    owner: &EntityTypeDef,
    prefix: &str,
    root: Option<&str>,
    facts: &mut RelationFacts,
) -> Result<()>
where
    P: MetadataProvider + ?Sized,
{
    for navigation in owner.owned_navigations() {
        let path = format!("{}{}", prefix, navigation.name);
        if !navigation.is_inline_owned() {
            facts.separate_owned_members.push(path);
            continue;
        }

        let owned = provider
            .find_entity_type(&navigation.target_type)
            .ok_or_else(|| DataShapeError::UnknownEntityType(navigation.target_type.clone()))?;
        let root_member = root.unwrap_or(&navigation.name).to_string();
        facts.inline_owned_members.push(path.clone());

        for property in &owned.properties {
            if owned.is_key(&property.name) {
                continue;
            }
            let Some(column) = property.column_name.as_deref() else {
                continue;
            };
            let mut fact = ColumnFact::from_property(
                property,
                format!("{}.{}", path, property.name),
                column.to_string(),
                false,
            );
            fact.owned_member = Some(root_member.clone());
            if let Some(converter) = &property.converter {
                facts.converters.insert(column.to_string(), converter.clone());
            }
            facts
                .column_types
                .insert(column.to_string(), property.store_type.clone());
            facts.owned_columns.push(fact);
        }

        collect_owned(provider, owned, &format!("{}.", path), Some(&root_member), facts)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Model, NavigationDef};
    use crate::mapping::accessor::AccessorRegistry;

    struct Row(&'static str);

    impl BulkEntity for Row {
        fn entity_type(&self) -> &str {
            self.0
        }

        fn register_accessors(_registry: &mut AccessorRegistry<Self>) {}
    }

    fn model() -> Model {
        Model::sql_server()
            .with_entity_type(
                EntityTypeDef::new("Order", "Orders")
                    .with_property(
                        PropertyDef::new("Id", ClrType::Int32, "int")
                            .identity(GenerationStrategy::IdentityColumn),
                    )
                    .with_property(PropertyDef::new("Placed", ClrType::Timestamp, "datetime2(3)"))
                    .with_property(PropertyDef::new("Note", ClrType::String, "nvarchar(max)").unmapped())
                    .with_property(
                        PropertyDef::new("PeriodStart", ClrType::Timestamp, "datetime2").shadow(),
                    )
                    .with_property(PropertyDef::new("Version", ClrType::Bytes, "rowversion").row_version())
                    .with_key(["Id"])
                    .with_navigation(NavigationDef::owned("Ship", "Address"))
                    .with_navigation(NavigationDef::owned("Audit", "AuditInfo").in_separate_table()),
            )
            .with_entity_type(
                EntityTypeDef::owned("Address")
                    .with_property(PropertyDef::new("OrderId", ClrType::Int32, "int"))
                    .with_property(
                        PropertyDef::new("City", ClrType::String, "nvarchar(100)").with_column("Ship_City"),
                    )
                    .with_key(["OrderId"]),
            )
    }

    #[test]
    fn test_introspect_basic() {
        let config = BulkConfig::builder()
            .datetime2_precision_force_round(true)
            .build()
            .unwrap();
        let facts = introspect(
            &model(),
            Some("Order"),
            &[Row("Order")],
            OperationType::Insert,
            &config,
            false,
        )
        .unwrap();

        assert_eq!(facts.schema.as_deref(), Some("dbo"));
        assert_eq!(facts.table_name, "Orders");
        assert!(facts.has_temporal_columns);
        assert!(!facts.has_abstract_list);
        assert!(!facts.has_property("Note"));
        assert!(!facts.has_property("PeriodStart"));
        assert_eq!(facts.identity.as_ref().unwrap().column, "Id");
        assert_eq!(facts.timestamp.as_ref().unwrap().property, "Version");
        assert_eq!(facts.datetime2_precisions.get("Placed"), Some(&3));

        assert_eq!(facts.owned_columns.len(), 1);
        assert_eq!(facts.owned_columns[0].property, "Ship.City");
        assert_eq!(facts.owned_columns[0].column_name, "Ship_City");
        assert_eq!(facts.separate_owned_members, vec!["Audit"]);
        assert!(facts.refers_to_separate_owned("Audit.By"));
        assert!(facts.refers_to_inline_owned("Ship.City"));
    }

    #[test]
    fn test_runtime_type_fallback() {
        let config = BulkConfig::default();
        let facts = introspect(&model(), None, &[Row("Order")], OperationType::Insert, &config, false)
            .unwrap();
        assert!(facts.has_abstract_list);

        let empty: [Row; 0] = [];
        let err = introspect(&model(), None, &empty, OperationType::Insert, &config, false).unwrap_err();
        assert!(matches!(err, crate::Error::DataShape(DataShapeError::EmptyBatch)));

        let err = introspect(&model(), None, &[Row("Nope")], OperationType::Insert, &config, false)
            .unwrap_err();
        assert!(matches!(err, crate::Error::DataShape(DataShapeError::UnknownEntityType(_))));
    }

    #[test]
    fn test_temp_db_requires_transaction() {
        let config = BulkConfig::builder().use_temp_db(true).build().unwrap();
        let rows = [Row("Order")];

        assert!(introspect(&model(), None, &rows, OperationType::Insert, &config, false).is_ok());
        let err = introspect(&model(), None, &rows, OperationType::Update, &config, false).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Config(ConfigError::TempDbOutsideTransaction { .. })
        ));
        assert!(introspect(&model(), None, &rows, OperationType::Update, &config, true).is_ok());
    }

    #[test]
    fn test_ignore_row_version() {
        let config = BulkConfig::builder().ignore_row_version(true).build().unwrap();
        let facts = introspect(&model(), None, &[Row("Order")], OperationType::Insert, &config, false)
            .unwrap();
        assert!(facts.timestamp.is_none());
        assert!(facts.has_property("Version"));
    }
}
