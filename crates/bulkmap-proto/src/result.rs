//! Rowsets returned from staging output relations.

use crate::error::Error;
use crate::value::Value;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// Column data within an output rowset.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct ColumnData {
    /// Column name as it appears in the output relation.
    pub name: String,
    /// Values for each row.
    pub values: Vec<Value>,
}

impl ColumnData {
    /// Create a new column.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Rows read back from a staging output relation after a bulk write.
///
/// Uses column-oriented storage; every column holds exactly `len()` values.
/// Row order is the order the engine returned them in, which the reconciler
/// relies on.
#[derive(Debug, Clone, PartialEq, Default, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
#[serde(try_from = "RawOutputRowset")]
pub struct OutputRowset {
    columns: Vec<ColumnData>,
    row_count: usize,
}

/// Wire shape of [`OutputRowset`] before the column lengths are checked.
#[derive(SerdeDeserialize)]
struct RawOutputRowset {
    columns: Vec<ColumnData>,
    row_count: usize,
}

impl TryFrom<RawOutputRowset> for OutputRowset {
    type Error = Error;

    fn try_from(raw: RawOutputRowset) -> Result<Self, Self::Error> {
        OutputRowset::validated(raw.columns, raw.row_count)
    }
}

impl OutputRowset {
    /// Create an empty rowset with no columns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a rowset from columns, checking that all have the same length.
    pub fn with_columns(columns: Vec<ColumnData>) -> Result<Self, Error> {
        let row_count = columns.first().map(|c| c.values.len()).unwrap_or(0);
        for column in &columns {
            if column.values.len() != row_count {
                return Err(Error::RaggedRowset {
                    column: column.name.clone(),
                    expected: row_count,
                    actual: column.values.len(),
                });
            }
        }
        Ok(Self { columns, row_count })
    }

    /// Rebuild a rowset received from elsewhere. A rowset without columns
    /// keeps its row count; otherwise every column must hold `row_count` values.
    fn validated(columns: Vec<ColumnData>, row_count: usize) -> Result<Self, Error> {
        if columns.is_empty() {
            return Ok(Self { columns, row_count });
        }
        let rowset = Self::with_columns(columns)?;
        if rowset.row_count != row_count {
            return Err(Error::RaggedRowset {
                column: rowset.columns[0].name.clone(),
                expected: row_count,
                actual: rowset.row_count,
            });
        }
        Ok(rowset)
    }

    /// Create a rowset from row-major data.
    pub fn from_rows(
        column_names: &[&str],
        rows: impl IntoIterator<Item = Vec<Value>>,
    ) -> Result<Self, Error> {
        let mut columns: Vec<ColumnData> = column_names
            .iter()
            .map(|name| ColumnData::new(*name, Vec::new()))
            .collect();
        let mut row_count = 0;
        for row in rows {
            if row.len() != columns.len() {
                return Err(Error::RaggedRowset {
                    column: format!("row {}", row_count),
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(value);
            }
            row_count += 1;
        }
        Ok(Self { columns, row_count })
    }

    /// Get the number of rows.
    pub fn len(&self) -> usize {
        self.row_count
    }

    /// Check if the rowset has no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Get all columns in output order.
    pub fn columns(&self) -> &[ColumnData] {
        &self.columns
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get the position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get the value at a specific row and column.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        self.column(column).and_then(|c| c.values.get(row))
    }

    /// Get the value at a specific row and column position.
    pub fn value_at(&self, row: usize, column: usize) -> Option<&Value> {
        self.columns.get(column).and_then(|c| c.values.get(row))
    }

    /// Iterate over rows as (column, value) pairs.
    pub fn rows(&self) -> impl Iterator<Item = Vec<(&str, &Value)>> {
        (0..self.row_count).map(move |i| {
            self.columns
                .iter()
                .filter_map(|col| col.values.get(i).map(|v| (col.name.as_str(), v)))
                .collect()
        })
    }

    /// Serialize the rowset to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a rowset from bytes, rejecting ragged columns.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let rowset = rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))?;
        Self::validated(rowset.columns, rowset.row_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OutputRowset {
        OutputRowset::from_rows(
            &["Id", "Name"],
            vec![
                vec![Value::Int64(10), Value::String("a".into())],
                vec![Value::Int64(11), Value::String("b".into())],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows() {
        let rows = sample();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.get(1, "Id"), Some(&Value::Int64(11)));
        assert_eq!(rows.column_index("Name"), Some(1));
        assert!(rows.get(0, "Missing").is_none());

        let collected: Vec<_> = rows.rows().collect();
        assert_eq!(collected[0], vec![("Id", &Value::Int64(10)), ("Name", &Value::String("a".into()))]);
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let result = OutputRowset::with_columns(vec![
            ColumnData::new("Id", vec![Value::Int64(1), Value::Int64(2)]),
            ColumnData::new("Name", vec![Value::Null]),
        ]);
        assert!(matches!(result, Err(Error::RaggedRowset { actual: 1, .. })));

        let result = OutputRowset::from_rows(&["Id"], vec![vec![Value::Int64(1), Value::Null]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bytes_roundtrip() {
        let rows = sample();
        let bytes = rows.to_bytes().unwrap();
        assert_eq!(OutputRowset::from_bytes(&bytes).unwrap(), rows);
    }

    #[test]
    fn test_json_shape() {
        let rows = sample();
        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(json["row_count"], 2);
        assert_eq!(json["columns"][0]["name"], "Id");

        let back: OutputRowset = serde_json::from_value(json).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_ragged_payload_rejected() {
        let json = r#"{"columns":[{"name":"Id","values":[{"Int64":1}]}],"row_count":3}"#;
        let err = serde_json::from_str::<OutputRowset>(json).unwrap_err();
        assert!(err.to_string().contains("Id"));

        let json = r#"{"columns":[{"name":"Id","values":[{"Int64":1}]},{"name":"Name","values":[]}],"row_count":1}"#;
        assert!(serde_json::from_str::<OutputRowset>(json).is_err());

        let json = r#"{"columns":[],"row_count":2}"#;
        let rows: OutputRowset = serde_json::from_str(json).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.rows().all(|row| row.is_empty()));
    }

    #[test]
    fn test_ragged_bytes_rejected() {
        let ragged = OutputRowset {
            columns: vec![ColumnData::new("Id", vec![Value::Int64(1)])],
            row_count: 3,
        };
        let bytes = ragged.to_bytes().unwrap();
        assert!(matches!(
            OutputRowset::from_bytes(&bytes),
            Err(Error::RaggedRowset { expected: 3, actual: 1, .. })
        ));
    }
}
