//! Entity type definitions.

use super::navigation::NavigationDef;
use super::property::PropertyDef;

/// An entity type definition (table-backed or owned).
#[derive(Debug, Clone, PartialEq)]
pub struct EntityTypeDef {
    /// Entity type name (unique within the model).
    pub name: String,
    /// Schema of the backing table.
    pub schema: Option<String>,
    /// Backing table name. Owned types stored inline have none of their own.
    pub table_name: Option<String>,
    /// Property definitions in declaration order.
    pub properties: Vec<PropertyDef>,
    /// Primary key property names.
    pub primary_key: Vec<String>,
    /// Navigations to other entity types.
    pub navigations: Vec<NavigationDef>,
    /// Whether the type is abstract (instances are always a derived type).
    pub is_abstract: bool,
    /// Names of directly derived entity types.
    pub derived_types: Vec<String>,
}

impl EntityTypeDef {
    /// Create a new entity type backed by `table_name`.
    pub fn new(name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            table_name: Some(table_name.into()),
            properties: Vec::new(),
            primary_key: Vec::new(),
            navigations: Vec::new(),
            is_abstract: false,
            derived_types: Vec::new(),
        }
    }

    /// Create an owned value type with no table of its own.
    pub fn owned(name: impl Into<String>) -> Self {
        Self {
            table_name: None,
            ..Self::new(name, "")
        }
    }

    /// Set the schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Add a property.
    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    /// Add multiple properties.
    pub fn with_properties(mut self, properties: impl IntoIterator<Item = PropertyDef>) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Set the primary key.
    pub fn with_key<S: Into<String>>(mut self, key: impl IntoIterator<Item = S>) -> Self {
        self.primary_key = key.into_iter().map(Into::into).collect();
        self
    }

    /// Add a navigation.
    pub fn with_navigation(mut self, navigation: NavigationDef) -> Self {
        self.navigations.push(navigation);
        self
    }

    /// Mark as abstract with the given directly derived types.
    pub fn abstract_over<S: Into<String>>(mut self, derived: impl IntoIterator<Item = S>) -> Self {
        self.is_abstract = true;
        self.derived_types = derived.into_iter().map(Into::into).collect();
        self
    }

    /// Get a property by name.
    pub fn get_property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Check if a property is part of the primary key.
    pub fn is_key(&self, name: &str) -> bool {
        self.primary_key.iter().any(|k| k == name)
    }

    /// Get a navigation by name.
    pub fn get_navigation(&self, name: &str) -> Option<&NavigationDef> {
        self.navigations.iter().find(|n| n.name == name)
    }

    /// Navigations whose target is an owned type.
    pub fn owned_navigations(&self) -> impl Iterator<Item = &NavigationDef> {
        self.navigations.iter().filter(|n| n.is_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ClrType;

    #[test]
    fn test_entity_builder() {
        let entity = EntityTypeDef::new("Order", "Orders")
            .with_schema("sales")
            .with_property(PropertyDef::new("Id", ClrType::Int64, "bigint"))
            .with_property(PropertyDef::new("Total", ClrType::Decimal, "decimal(18,2)"))
            .with_key(["Id"])
            .with_navigation(NavigationDef::owned("Address", "Address"));

        assert_eq!(entity.name, "Order");
        assert_eq!(entity.schema.as_deref(), Some("sales"));
        assert_eq!(entity.properties.len(), 2);
        assert!(entity.is_key("Id"));
        assert!(!entity.is_key("Total"));
        assert_eq!(entity.owned_navigations().count(), 1);
    }

    #[test]
    fn test_owned_type_has_no_table() {
        let address = EntityTypeDef::owned("Address");
        assert!(address.table_name.is_none());
        assert!(address.get_property("Street").is_none());
    }
}
