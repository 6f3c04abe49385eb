//! Runtime value types exchanged with the transfer channel and metadata model.

use std::fmt;

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::error::Error;

/// A runtime value read from or written to an entity property.
///
/// Covers the property types a bulk operation moves between caller objects and
/// staging relations. Arrays are typed (e.g., Int32Array) to avoid recursive
/// type issues with rkyv serialization.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 16-bit signed integer.
    Int16(i16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 32-bit floating point.
    Float32(f32),
    /// 64-bit floating point.
    Float64(f64),
    /// Fixed-point decimal: `mantissa / 10^scale`.
    Decimal {
        /// Unscaled value.
        mantissa: i128,
        /// Number of digits after the decimal point.
        scale: u8,
    },
    /// UTF-8 string.
    String(String),
    /// Binary data (row versions, blobs).
    Bytes(Vec<u8>),
    /// Timestamp as microseconds since Unix epoch.
    Timestamp(i64),
    /// UUID as 16 bytes.
    Uuid([u8; 16]),
    /// Array of 32-bit integers.
    Int32Array(Vec<i32>),
    /// Array of 64-bit integers.
    Int64Array(Vec<i64>),
    /// Array of strings.
    StringArray(Vec<String>),
    /// Array of UUIDs.
    UuidArray(Vec<[u8; 16]>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is an array type (binary data counts as an array of bytes).
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Value::Bytes(_)
                | Value::Int32Array(_)
                | Value::Int64Array(_)
                | Value::StringArray(_)
                | Value::UuidArray(_)
        )
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Decimal { .. } => "decimal",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
            Value::Int32Array(_) => "int32[]",
            Value::Int64Array(_) => "int64[]",
            Value::StringArray(_) => "string[]",
            Value::UuidArray(_) => "uuid[]",
        }
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64.
    ///
    /// Widens the smaller integer variants and accepts decimals without a
    /// fractional part, which is how integral identities surface on some engines.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(i) => Some(*i as i64),
            Value::Int32(i) => Some(*i as i64),
            Value::Int64(i) => Some(*i),
            Value::Decimal { mantissa, scale } => {
                let divisor = 10i128.checked_pow(*scale as u32)?;
                if mantissa % divisor != 0 {
                    return None;
                }
                i64::try_from(mantissa / divisor).ok()
            }
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(f) => Some(*f),
            Value::Float32(f) => Some(*f as f64),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bytes reference.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get as timestamp.
    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Try to get as UUID.
    pub fn as_uuid(&self) -> Option<&[u8; 16]> {
        match self {
            Value::Uuid(u) => Some(u),
            _ => None,
        }
    }

    /// Split an array value into its elements.
    ///
    /// Returns `None` for scalars.
    pub fn array_elements(&self) -> Option<Vec<Value>> {
        match self {
            Value::Bytes(v) => Some(v.iter().map(|b| Value::Int16(*b as i16)).collect()),
            Value::Int32Array(v) => Some(v.iter().copied().map(Value::Int32).collect()),
            Value::Int64Array(v) => Some(v.iter().copied().map(Value::Int64).collect()),
            Value::StringArray(v) => Some(v.iter().cloned().map(Value::String).collect()),
            Value::UuidArray(v) => Some(v.iter().copied().map(Value::Uuid).collect()),
            _ => None,
        }
    }
}

fn write_uuid(f: &mut fmt::Formatter<'_>, u: &[u8; 16]) -> fmt::Result {
    write!(
        f,
        "{}-{}-{}-{}-{}",
        hex::encode(&u[0..4]),
        hex::encode(&u[4..6]),
        hex::encode(&u[6..8]),
        hex::encode(&u[8..10]),
        hex::encode(&u[10..16])
    )
}

fn write_decimal(f: &mut fmt::Formatter<'_>, mantissa: i128, scale: u8) -> fmt::Result {
    if scale == 0 {
        return write!(f, "{}", mantissa);
    }
    let sign = if mantissa < 0 { "-" } else { "" };
    let digits = mantissa.unsigned_abs().to_string();
    let scale = scale as usize;
    let padded = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    write!(f, "{}{}.{}", sign, int_part, frac_part)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int16(i) => write!(f, "{}", i),
            Value::Int32(i) => write!(f, "{}", i),
            Value::Int64(i) => write!(f, "{}", i),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal { mantissa, scale } => write_decimal(f, *mantissa, *scale),
            Value::String(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Value::Timestamp(t) => write!(f, "{}", t),
            Value::Uuid(u) => write_uuid(f, u),
            Value::Int32Array(_)
            | Value::Int64Array(_)
            | Value::StringArray(_)
            | Value::UuidArray(_) => {
                let elements = self.array_elements().unwrap_or_default();
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
        }
    }
}

// Conversion implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<[u8; 16]> for Value {
    fn from(v: [u8; 16]) -> Self {
        Value::Uuid(v)
    }
}

impl From<Vec<i32>> for Value {
    fn from(v: Vec<i32>) -> Self {
        Value::Int32Array(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::Int64Array(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::StringArray(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// Conversion from a [`Value`] back into a typed property.
///
/// Property setters use this to accept values produced by the database, which
/// may arrive in a wider integer representation than the property declares.
pub trait FromValue: Sized {
    /// Convert the value, failing on a type mismatch or an out-of-range integer.
    fn from_value(value: Value) -> Result<Self, Error>;
}

fn mismatch(expected: &'static str, value: &Value) -> Error {
    Error::TypeMismatch {
        expected,
        actual: value.type_name(),
    }
}

macro_rules! integral_from_value {
    ($ty:ty, $name:literal) => {
        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self, Error> {
                let wide = value.as_i64().ok_or_else(|| mismatch($name, &value))?;
                <$ty>::try_from(wide).map_err(|_| Error::OutOfRange {
                    target: $name,
                    value: wide.to_string(),
                })
            }
        }
    };
}

integral_from_value!(i16, "int16");
integral_from_value!(i32, "int32");
integral_from_value!(i64, "int64");

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, Error> {
        value.as_bool().ok_or_else(|| mismatch("bool", &value))
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Float32(f) => Ok(f),
            other => Err(mismatch("float32", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, Error> {
        value.as_f64().ok_or_else(|| mismatch("float64", &value))
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Bytes(b) => Ok(b),
            other => Err(mismatch("bytes", &other)),
        }
    }
}

impl FromValue for [u8; 16] {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Uuid(u) => Ok(u),
            other => Err(mismatch("uuid", &other)),
        }
    }
}

impl FromValue for Vec<i64> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Int64Array(v) => Ok(v),
            Value::Int32Array(v) => Ok(v.into_iter().map(i64::from).collect()),
            other => Err(mismatch("int64[]", &other)),
        }
    }
}

impl FromValue for Vec<String> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::StringArray(v) => Ok(v),
            other => Err(mismatch("string[]", &other)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, Error> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(true).is_null());

        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int16(7).as_i64(), Some(7));
        assert_eq!(Value::Int32(42).as_i64(), Some(42));
        assert_eq!(
            Value::Decimal {
                mantissa: 1200,
                scale: 2
            }
            .as_i64(),
            Some(12)
        );
        assert_eq!(
            Value::Decimal {
                mantissa: 1250,
                scale: 2
            }
            .as_i64(),
            None
        );
        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Int64(-3).to_string(), "-3");
        assert_eq!(
            Value::Decimal {
                mantissa: -5,
                scale: 3
            }
            .to_string(),
            "-0.005"
        );
        assert_eq!(
            Value::Uuid([0xab; 16]).to_string(),
            "abababab-abab-abab-abab-abababababab"
        );
        assert_eq!(Value::Int32Array(vec![1, 2]).to_string(), "[1, 2]");
    }

    #[test]
    fn test_from_value_narrows_integers() {
        assert_eq!(i32::from_value(Value::Int64(12)).unwrap(), 12);
        assert!(matches!(
            i16::from_value(Value::Int64(70_000)),
            Err(Error::OutOfRange { .. })
        ));
        assert!(matches!(
            i64::from_value(Value::String("1".into())),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_from_value_option() {
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
        assert_eq!(
            Option::<String>::from_value(Value::String("a".into())).unwrap(),
            Some("a".to_string())
        );
    }
}
