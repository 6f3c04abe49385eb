//! Normalized facts about one relation, produced by introspection.

use indexmap::IndexMap;

use crate::catalog::{ClrType, GenerationStrategy, PropertyDef, ProviderKind, ValueGenerated};
use bulkmap_proto::Value;

/// Ordered mapping from property path to column name.
pub type PropertyColumns = IndexMap<String, String>;

/// A mapped property of the relation.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFact {
    /// Property path; dotted (`Address.Street`) for owned members.
    pub property: String,
    /// Column name.
    pub column_name: String,
    /// Store type of the column.
    pub store_type: String,
    /// Host type of the property.
    pub clr_type: ClrType,
    /// Part of the declared primary key.
    pub is_key: bool,
    /// Shadow property (no member on the entity object).
    pub is_shadow: bool,
    /// Part of a foreign key.
    pub is_foreign_key: bool,
    /// Accepts null.
    pub is_nullable: bool,
    /// Optimistic concurrency token.
    pub is_concurrency_token: bool,
    /// When the database generates the value.
    pub value_generated: ValueGenerated,
    /// Provider-native generation strategy.
    pub generation_strategy: Option<GenerationStrategy>,
    /// Computed column expression.
    pub computed_sql: Option<String>,
    /// Column default expression.
    pub default_sql: Option<String>,
    /// Column default value.
    pub default_value: Option<Value>,
    /// Value converter name.
    pub converter: Option<String>,
    /// Root owned member this fact belongs to, for dotted facts.
    pub owned_member: Option<String>,
}

impl ColumnFact {
    /// Build a fact for a property mapped to `column_name`.
    pub fn from_property(
        property: &PropertyDef,
        path: String,
        column_name: String,
        is_key: bool,
    ) -> Self {
        Self {
            property: path,
            column_name,
            store_type: property.store_type.clone(),
            clr_type: property.clr_type.clone(),
            is_key,
            is_shadow: property.shadow,
            is_foreign_key: property.foreign_key,
            is_nullable: property.nullable,
            is_concurrency_token: property.concurrency_token,
            value_generated: property.value_generated,
            generation_strategy: property.generation_strategy,
            computed_sql: property.computed_sql.clone(),
            default_sql: property.default_sql.clone(),
            default_value: property.default_value.clone(),
            converter: property.converter.clone(),
            owned_member: None,
        }
    }

    /// Check if this is a computed column.
    pub fn is_computed(&self) -> bool {
        self.computed_sql.is_some()
    }

    /// Check if the database supplies a value for this column on insert.
    pub fn has_database_default(&self) -> bool {
        self.default_sql.is_some()
            || (self.default_value.is_some()
                && self.value_generated != ValueGenerated::Never
                && self.clr_type != ClrType::Uuid)
    }

    /// Check if this fact belongs to an owned member.
    pub fn is_owned(&self) -> bool {
        self.owned_member.is_some()
    }
}

/// The database-assigned identity column.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentitySpec {
    /// Property name.
    pub property: String,
    /// Column name.
    pub column: String,
    /// Host type, used to build placeholder values.
    pub clr_type: ClrType,
}

/// The row version column regenerated on every write.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampSpec {
    /// Property name.
    pub property: String,
    /// Column name.
    pub column: String,
}

/// Everything introspection learned about the target relation.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationFacts {
    /// Resolved entity type name.
    pub entity_type: String,
    /// Engine family.
    pub provider: ProviderKind,
    /// Target schema.
    pub schema: Option<String>,
    /// Target table name.
    pub table_name: String,
    /// Mapped properties of the entity type, in declaration order. Includes
    /// properties of directly derived types for abstract entity types.
    pub columns: Vec<ColumnFact>,
    /// Dotted facts for owned members stored inline.
    pub owned_columns: Vec<ColumnFact>,
    /// Declared primary key property names.
    pub primary_key: Vec<String>,
    /// Identity column, if any.
    pub identity: Option<IdentitySpec>,
    /// Row version column, if any.
    pub timestamp: Option<TimestampSpec>,
    /// Names of owned members stored inline.
    pub inline_owned_members: Vec<String>,
    /// Names of owned members stored in another table or as collections.
    pub separate_owned_members: Vec<String>,
    /// Whether temporal period columns were skipped.
    pub has_temporal_columns: bool,
    /// Whether the type came from the batch rather than the caller.
    pub has_abstract_list: bool,
    /// Column name to store type.
    pub column_types: IndexMap<String, String>,
    /// Property name to fractional-second precision, for `datetime2(n)`
    /// columns with `n < 7` when rounding is forced.
    pub datetime2_precisions: IndexMap<String, u8>,
    /// Column name to value converter name.
    pub converters: IndexMap<String, String>,
}

impl RelationFacts {
    /// Find a fact by property path, including owned facts.
    pub fn find(&self, property: &str) -> Option<&ColumnFact> {
        self.columns
            .iter()
            .chain(self.owned_columns.iter())
            .find(|c| c.property == property)
    }

    /// Check if `property` names a mapped property or owned fact.
    pub fn has_property(&self, property: &str) -> bool {
        self.find(property).is_some()
    }

    /// Column of a property.
    pub fn column_of(&self, property: &str) -> Option<&str> {
        self.find(property).map(|c| c.column_name.as_str())
    }

    /// Check if `property` is the identity property.
    pub fn is_identity(&self, property: &str) -> bool {
        self.identity.as_ref().is_some_and(|i| i.property == property)
    }

    /// Check if `property` is the row version property.
    pub fn is_timestamp(&self, property: &str) -> bool {
        self.timestamp.as_ref().is_some_and(|t| t.property == property)
    }

    /// Declared primary key as property to column.
    pub fn primary_key_columns(&self) -> PropertyColumns {
        self.primary_key
            .iter()
            .filter_map(|name| {
                self.column_of(name)
                    .map(|column| (name.clone(), column.to_string()))
            })
            .collect()
    }

    /// Check if a dotted name refers to an owned member stored elsewhere.
    pub fn refers_to_separate_owned(&self, name: &str) -> bool {
        self.separate_owned_members
            .iter()
            .any(|member| name.strip_prefix(member.as_str()).is_some_and(|rest| rest.starts_with('.')))
    }

    /// Check if a dotted name refers to an owned member stored inline.
    pub fn refers_to_inline_owned(&self, name: &str) -> bool {
        self.inline_owned_members
            .iter()
            .any(|member| name.strip_prefix(member.as_str()).is_some_and(|rest| rest.starts_with('.')))
    }
}

/// Parse the precision of a `datetime2(n)` store type.
pub(crate) fn datetime2_precision(store_type: &str) -> Option<u8> {
    let inner = store_type
        .trim()
        .to_ascii_lowercase()
        .strip_prefix("datetime2(")?
        .strip_suffix(')')?
        .trim()
        .to_string();
    inner.parse().ok()
}
