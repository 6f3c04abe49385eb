//! Correlation keys between caller entities and database rows.

use std::fmt::Write;
use std::hash::{Hash, Hasher};

use bulkmap_proto::Value;

/// Delimiter placed between property values in a key signature.
pub const DEFAULT_KEY_DELIMITER: &str = "_";

/// Build a key signature with the default delimiter.
///
/// ```
/// use bulkmap_core::reconcile::key_signature;
/// use bulkmap_core::proto::Value;
///
/// assert_eq!(key_signature(&[Value::Int32(1), Value::from("x")]), "1_x");
/// assert_eq!(key_signature(&[Value::Int32(1), Value::from("x"), Value::Null]), "1_x_null");
/// ```
pub fn key_signature(values: &[Value]) -> String {
    key_signature_with(values, DEFAULT_KEY_DELIMITER)
}

/// Build a key signature: values rendered as text and joined by `delimiter`.
///
/// Array elements are concatenated without a delimiter and null renders as
/// `null`. Distinct keys can produce the same signature (`"a_b"` + `"c"` and
/// `"a"` + `"b_c"`); use [`CompositeKey`] where that matters.
pub fn key_signature_with(values: &[Value], delimiter: &str) -> String {
    let mut signature = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            signature.push_str(delimiter);
        }
        match value.array_elements() {
            Some(elements) => {
                for element in elements {
                    let _ = write!(signature, "{}", element);
                }
            }
            None => {
                let _ = write!(signature, "{}", value);
            }
        }
    }
    signature
}

/// An ordered tuple of key values with structural equality.
///
/// Integers of any width compare by value, decimals compare after removing
/// trailing fractional zeros, and floats compare by bit pattern.
#[derive(Debug, Clone)]
pub struct CompositeKey(Vec<Value>);

impl CompositeKey {
    /// Build a key from values in key order.
    pub fn new(values: impl IntoIterator<Item = Value>) -> Self {
        Self(values.into_iter().map(normalize).collect())
    }

    /// Key values.
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Check if any component is null.
    pub fn has_null(&self) -> bool {
        self.0.iter().any(Value::is_null)
    }
}

fn normalize(value: Value) -> Value {
    match value {
        Value::Int16(i) => Value::Int64(i as i64),
        Value::Int32(i) => Value::Int64(i as i64),
        Value::Decimal {
            mut mantissa,
            mut scale,
        } => {
            while scale > 0 && mantissa % 10 == 0 {
                mantissa /= 10;
                scale -= 1;
            }
            if scale == 0 {
                if let Ok(i) = i64::try_from(mantissa) {
                    return Value::Int64(i);
                }
            }
            Value::Decimal { mantissa, scale }
        }
        Value::Float32(f) => Value::Float64(f as f64),
        other => other,
    }
}

fn same(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float64(x), Value::Float64(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

impl PartialEq for CompositeKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| same(a, b))
    }
}

impl Eq for CompositeKey {}

impl Hash for CompositeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for value in &self.0 {
            std::mem::discriminant(value).hash(state);
            match value {
                Value::Null => {}
                Value::Bool(b) => b.hash(state),
                Value::Int16(i) => i.hash(state),
                Value::Int32(i) => i.hash(state),
                Value::Int64(i) => i.hash(state),
                Value::Float32(f) => f.to_bits().hash(state),
                Value::Float64(f) => f.to_bits().hash(state),
                Value::Decimal { mantissa, scale } => {
                    mantissa.hash(state);
                    scale.hash(state);
                }
                Value::String(s) => s.hash(state),
                Value::Bytes(b) => b.hash(state),
                Value::Timestamp(t) => t.hash(state),
                Value::Uuid(u) => u.hash(state),
                Value::Int32Array(v) => v.hash(state),
                Value::Int64Array(v) => v.hash(state),
                Value::StringArray(v) => v.hash(state),
                Value::UuidArray(v) => v.hash(state),
            }
        }
    }
}
