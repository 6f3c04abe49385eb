//! In-memory model: a snapshot of entity types for one provider.

use std::collections::HashMap;

use super::entity::EntityTypeDef;
use super::provider::{MetadataProvider, ProviderKind};

/// An in-memory snapshot of entity types, usable as a [`MetadataProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Provider identity string.
    pub provider_name: String,
    /// Entity types keyed by name.
    pub entity_types: HashMap<String, EntityTypeDef>,
}

impl Model {
    /// Create an empty model for the given provider.
    pub fn new(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            entity_types: HashMap::new(),
        }
    }

    /// Create an empty SQL Server model.
    pub fn sql_server() -> Self {
        Self::new("Microsoft.EntityFrameworkCore.SqlServer")
    }

    /// Create an empty PostgreSQL model.
    pub fn postgres() -> Self {
        Self::new("Npgsql.EntityFrameworkCore.PostgreSQL")
    }

    /// Create an empty SQLite model.
    pub fn sqlite() -> Self {
        Self::new("Microsoft.EntityFrameworkCore.Sqlite")
    }

    /// Add an entity type.
    pub fn with_entity_type(mut self, entity_type: EntityTypeDef) -> Self {
        self.entity_types.insert(entity_type.name.clone(), entity_type);
        self
    }

    /// Engine family of this model.
    pub fn provider_kind(&self) -> ProviderKind {
        ProviderKind::from_provider_name(&self.provider_name)
    }

    /// List all entity type names.
    pub fn entity_type_names(&self) -> Vec<&str> {
        self.entity_types.keys().map(|s| s.as_str()).collect()
    }
}

impl MetadataProvider for Model {
    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn find_entity_type(&self, name: &str) -> Option<&EntityTypeDef> {
        self.entity_types.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ClrType, PropertyDef};

    #[test]
    fn test_model_lookup() {
        let model = Model::sqlite().with_entity_type(
            EntityTypeDef::new("Item", "Items")
                .with_property(PropertyDef::new("Id", ClrType::Int64, "INTEGER"))
                .with_key(["Id"]),
        );

        assert_eq!(model.provider_kind(), ProviderKind::Sqlite);
        assert!(model.find_entity_type("Item").is_some());
        assert!(model.find_entity_type("Missing").is_none());
        assert_eq!(model.entity_type_names(), vec!["Item"]);
    }
}
