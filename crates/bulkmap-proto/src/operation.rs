//! Bulk operation kinds and staging output markers.

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// A set-based bulk operation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub enum OperationType {
    /// Insert every entity.
    Insert,
    /// Insert new entities, update existing ones.
    InsertOrUpdate,
    /// Insert or update, then delete target rows absent from the batch.
    InsertOrUpdateOrDelete,
    /// Update existing entities.
    Update,
    /// Delete entities matching the batch keys.
    Delete,
    /// Read target rows matching the batch keys back into the batch.
    Read,
}

impl OperationType {
    /// Operations that go through a merge and may return rows for both
    /// pre-existing and newly inserted entities.
    pub fn is_upsert_family(&self) -> bool {
        matches!(
            self,
            OperationType::Update
                | OperationType::InsertOrUpdate
                | OperationType::InsertOrUpdateOrDelete
        )
    }

    /// Operations that only need the join key loaded into the staging relation.
    pub fn loads_only_key(&self) -> bool {
        matches!(self, OperationType::Delete | OperationType::Read)
    }

    /// Check if this is a plain insert.
    pub fn is_insert(&self) -> bool {
        matches!(self, OperationType::Insert)
    }

    /// Operation name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            OperationType::Insert => "insert",
            OperationType::InsertOrUpdate => "insert_or_update",
            OperationType::InsertOrUpdateOrDelete => "insert_or_update_or_delete",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
            OperationType::Read => "read",
        }
    }
}

/// Marker columns written to the staging output relation by merge statements.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub enum OutputMarker {
    /// Row was updated rather than inserted.
    IsUpdate,
    /// Row was deleted.
    IsDelete,
}

impl OutputMarker {
    /// Column name of the marker in the output relation.
    pub fn column_name(&self) -> &'static str {
        match self {
            OutputMarker::IsUpdate => "IsUpdate",
            OutputMarker::IsDelete => "IsDelete",
        }
    }
}
