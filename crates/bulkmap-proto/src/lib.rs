//! bulkmap protocol types.
//!
//! Types exchanged between the mapping core and its collaborators: the SQL
//! builder, the bulk transfer channel and whatever reads staging output back.
//!
//! # Modules
//!
//! - [`value`] - Runtime value type and typed conversions
//! - [`result`] - Output rowsets read from staging relations
//! - [`operation`] - Operation kinds and output marker columns
//! - [`error`] - Protocol error types
//!
//! All data types derive `rkyv::Archive` for zero-copy transfer and serde
//! traits for diagnostics.

pub mod error;
pub mod operation;
pub mod result;
pub mod value;

pub use error::Error;

pub use operation::{OperationType, OutputMarker};
pub use result::{ColumnData, OutputRowset};
pub use value::{FromValue, Value};
