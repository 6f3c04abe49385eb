//! Core type definitions for the metadata model.

use bulkmap_proto::Value;

/// Host-language type of an entity property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClrType {
    /// Boolean.
    Bool,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// Fixed-point decimal.
    Decimal,
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
    /// Binary data.
    Bytes,
    /// Date and time.
    Timestamp,
    /// Globally unique identifier.
    Uuid,
    /// Array of 32-bit integers.
    Int32Array,
    /// Array of 64-bit integers.
    Int64Array,
    /// Array of strings.
    StringArray,
    /// Any other type, identified by name (spatial, JSON documents, ...).
    Other(String),
}

impl ClrType {
    /// Check if this is an integer type.
    pub fn is_integer(&self) -> bool {
        matches!(self, ClrType::Int16 | ClrType::Int32 | ClrType::Int64)
    }

    /// Types an engine can assign as an auto-incrementing identity.
    pub fn is_identity_candidate(&self) -> bool {
        self.is_integer() || matches!(self, ClrType::Decimal)
    }

    /// Reference types have no zero value; their default is null.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            ClrType::String
                | ClrType::Bytes
                | ClrType::Int32Array
                | ClrType::Int64Array
                | ClrType::StringArray
                | ClrType::Other(_)
        )
    }

    /// The value an unset property of this type holds.
    pub fn default_value(&self) -> Value {
        match self {
            ClrType::Bool => Value::Bool(false),
            ClrType::Int16 => Value::Int16(0),
            ClrType::Int32 => Value::Int32(0),
            ClrType::Int64 => Value::Int64(0),
            ClrType::Decimal => Value::Decimal {
                mantissa: 0,
                scale: 0,
            },
            ClrType::Float32 => Value::Float32(0.0),
            ClrType::Float64 => Value::Float64(0.0),
            ClrType::Timestamp => Value::Timestamp(0),
            ClrType::Uuid => Value::Uuid([0u8; 16]),
            _ => Value::Null,
        }
    }

    /// Check whether `value` equals the default of this type.
    ///
    /// Nullable properties default to null. Numeric values compare by
    /// magnitude, so a decimal zero with any scale counts as default.
    pub fn is_default(&self, value: &Value, nullable: bool) -> bool {
        if nullable || self.is_reference() {
            return value.is_null();
        }
        match (self, value) {
            (ClrType::Decimal, Value::Decimal { mantissa, .. }) => *mantissa == 0,
            (ClrType::Float32 | ClrType::Float64, v) => v.as_f64() == Some(0.0),
            (t, v) if t.is_integer() => v.as_i64() == Some(0),
            (t, v) => *v == t.default_value(),
        }
    }

    /// Build a value of this type from an integer, for identity placeholders.
    ///
    /// Returns `None` for non-identity types or when the integer does not fit.
    pub fn integral_value(&self, value: i64) -> Option<Value> {
        match self {
            ClrType::Int16 => i16::try_from(value).ok().map(Value::Int16),
            ClrType::Int32 => i32::try_from(value).ok().map(Value::Int32),
            ClrType::Int64 => Some(Value::Int64(value)),
            ClrType::Decimal => Some(Value::Decimal {
                mantissa: value as i128,
                scale: 0,
            }),
            _ => None,
        }
    }
}

/// When the database generates a property's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueGenerated {
    /// The caller always supplies the value.
    #[default]
    Never,
    /// Generated when the row is inserted.
    OnAdd,
    /// Generated on insert and on every update.
    OnAddOrUpdate,
}

/// Provider-native value generation strategy annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStrategy {
    /// SQL Server `IDENTITY` column.
    IdentityColumn,
    /// PostgreSQL `GENERATED BY DEFAULT AS IDENTITY` column.
    IdentityByDefaultColumn,
    /// PostgreSQL `GENERATED ALWAYS AS IDENTITY` column.
    IdentityAlwaysColumn,
    /// Values drawn from a sequence.
    Sequence,
    /// Hi-lo block allocation on the client.
    HiLo,
}
