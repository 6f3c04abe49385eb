//! Property definitions for entity types.

use super::types::{ClrType, GenerationStrategy, ValueGenerated};
use bulkmap_proto::Value;

/// A property definition as reported by the metadata provider.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    /// Property name on the entity.
    pub name: String,
    /// Column the property maps to. `None` for unmapped properties.
    pub column_name: Option<String>,
    /// Store type of the column (e.g. `int`, `datetime2(3)`).
    pub store_type: String,
    /// Host type of the property.
    pub clr_type: ClrType,
    /// Whether the property accepts null.
    pub nullable: bool,
    /// Shadow properties exist in the model but not on the entity object.
    pub shadow: bool,
    /// Whether the property is part of a foreign key.
    pub foreign_key: bool,
    /// When the database generates the value.
    pub value_generated: ValueGenerated,
    /// Provider-native generation strategy, if annotated.
    pub generation_strategy: Option<GenerationStrategy>,
    /// Whether the property participates in optimistic concurrency checks.
    pub concurrency_token: bool,
    /// Computed column expression.
    pub computed_sql: Option<String>,
    /// Column default expression.
    pub default_sql: Option<String>,
    /// Column default value.
    pub default_value: Option<Value>,
    /// Name of the value converter applied between property and column.
    pub converter: Option<String>,
}

impl PropertyDef {
    /// Create a mapped property whose column has the same name.
    pub fn new(name: impl Into<String>, clr_type: ClrType, store_type: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            column_name: Some(name.clone()),
            name,
            store_type: store_type.into(),
            clr_type,
            nullable: false,
            shadow: false,
            foreign_key: false,
            value_generated: ValueGenerated::Never,
            generation_strategy: None,
            concurrency_token: false,
            computed_sql: None,
            default_sql: None,
            default_value: None,
            converter: None,
        }
    }

    /// Create a nullable mapped property.
    pub fn optional(name: impl Into<String>, clr_type: ClrType, store_type: impl Into<String>) -> Self {
        Self::new(name, clr_type, store_type).nullable()
    }

    /// Map to a differently named column.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column_name = Some(column.into());
        self
    }

    /// Mark as not mapped to any column.
    pub fn unmapped(mut self) -> Self {
        self.column_name = None;
        self
    }

    /// Mark as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark as a shadow property.
    pub fn shadow(mut self) -> Self {
        self.shadow = true;
        self
    }

    /// Mark as part of a foreign key.
    pub fn foreign_key(mut self) -> Self {
        self.foreign_key = true;
        self
    }

    /// Set when the value is generated.
    pub fn generated(mut self, value_generated: ValueGenerated) -> Self {
        self.value_generated = value_generated;
        self
    }

    /// Mark as a provider identity column (`OnAdd` plus a native strategy).
    pub fn identity(mut self, strategy: GenerationStrategy) -> Self {
        self.value_generated = ValueGenerated::OnAdd;
        self.generation_strategy = Some(strategy);
        self
    }

    /// Mark as a row version: a concurrency token regenerated on every write.
    pub fn row_version(mut self) -> Self {
        self.concurrency_token = true;
        self.value_generated = ValueGenerated::OnAddOrUpdate;
        self
    }

    /// Mark as a concurrency token without changing generation.
    pub fn concurrency_token(mut self) -> Self {
        self.concurrency_token = true;
        self
    }

    /// Set a computed column expression.
    pub fn computed(mut self, sql: impl Into<String>) -> Self {
        self.computed_sql = Some(sql.into());
        self
    }

    /// Set a default column expression.
    pub fn with_default_sql(mut self, sql: impl Into<String>) -> Self {
        self.default_sql = Some(sql.into());
        self
    }

    /// Set a default column value.
    pub fn with_default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Attach a value converter.
    pub fn with_converter(mut self, converter: impl Into<String>) -> Self {
        self.converter = Some(converter.into());
        self
    }

    /// Check if this is a computed column.
    pub fn is_computed(&self) -> bool {
        self.computed_sql.is_some()
    }

    /// Check if the database supplies a value when none is given.
    ///
    /// A default value only counts when the property is generated; UUID
    /// properties always carry a model default and are ignored here.
    pub fn has_database_default(&self) -> bool {
        self.default_sql.is_some()
            || (self.default_value.is_some()
                && self.value_generated != ValueGenerated::Never
                && self.clr_type != ClrType::Uuid)
    }
}
