//! Core error types.

use bulkmap_proto::OperationType;
use thiserror::Error;

/// Configuration errors, always raised before any database I/O.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Include and exclude lists were both given for one role.
    #[error("only one of include or exclude may be set for {role} properties")]
    MultiplePropertyLists { role: &'static str },

    /// A configured property name does not exist on the entity type.
    #[error("property '{property}' in {list} does not exist on entity type '{entity}'")]
    UnknownProperty {
        entity: String,
        list: &'static str,
        property: String,
    },

    /// The operation matches on a key but none is available.
    #[error("{operation:?} on '{entity}' requires a primary key or update-by properties")]
    MissingKey {
        entity: String,
        operation: OperationType,
    },

    /// A session-local staging relation would outlive the statement that created it.
    #[error("use_temp_db requires an explicit open transaction for {operation:?}")]
    TempDbOutsideTransaction { operation: OperationType },

    /// A table name override could not be parsed.
    #[error("invalid table name '{0}'")]
    InvalidTableName(String),

    /// A numeric setting is out of range.
    #[error("invalid value for {setting}: {reason}")]
    InvalidSetting {
        setting: &'static str,
        reason: String,
    },
}

/// Errors raised when the entity batch or model does not fit the mapping.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataShapeError {
    /// The entity type is not part of the model.
    #[error("entity type '{0}' is not part of the model")]
    UnknownEntityType(String),

    /// No type name was given and the batch is empty.
    #[error("cannot determine entity type of an empty batch")]
    EmptyBatch,

    /// The entity type has no backing table.
    #[error("entity type '{0}' is not mapped to a table")]
    MissingTableName(String),

    /// A mapped property has no registered accessor on the entity type.
    #[error("no accessor registered for property '{property}' of '{entity}'")]
    MissingAccessor { entity: String, property: String },

    /// Two entities share a correlation key.
    #[error("duplicate correlation key {0}")]
    DuplicateKey(String),

    /// An identity value was not integral.
    #[error("identity value {0} is not an integer")]
    NonIntegralIdentity(String),
}

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Data shape error.
    #[error("data shape error: {0}")]
    DataShape(#[from] DataShapeError),

    /// Value conversion error.
    #[error("value error: {0}")]
    Value(#[from] bulkmap_proto::Error),
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
