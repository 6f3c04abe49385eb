//! bulkmap - mapping and reconciliation driver for set-based bulk database
//! operations.
//!
//! Resolves how an entity batch maps onto a relation, prepares the batch for
//! a bulk write, then merges database-assigned identities, row versions and
//! computed values back into the batch.
//!
//! # Quick Start
//!
//! ```ignore
//! use bulkmap::{BulkConfig, MappingResolver, Model, PreparedOperation};
//! use bulkmap::proto::OperationType;
//!
//! let model = Model::sql_server().with_entity_type(order_type());
//! let config = BulkConfig::builder().set_output_identity(true).build()?;
//!
//! let resolver = MappingResolver::new(&model).in_transaction(true);
//! let prepared = PreparedOperation::prepare(&resolver, &mut orders, OperationType::Insert, &config)?;
//!
//! // Build the SQL from prepared.mapping() and run the bulk transfer.
//!
//! let outcome = prepared.complete(&mut orders, &mut output_source)?;
//! println!("applied {} identities", outcome.reconciliation.applied);
//! ```
//!
//! # Features
//!
//! - `async` - `complete_async` over an [`AsyncOutputSource`] with
//!   cooperative cancellation

pub mod error;
pub mod operation;
pub mod source;

pub use error::{BoxError, Error, Result};
pub use operation::{Outcome, PreparedOperation};
pub use source::{OutputRequest, OutputSource};

#[cfg(feature = "async")]
pub use source::AsyncOutputSource;
#[cfg(feature = "async")]
pub use tokio_util::sync::CancellationToken;

pub use bulkmap_core::{
    AccessorRegistry, BulkConfig, BulkConfigBuilder, BulkEntity, ClrType, ConfigError,
    DataShapeError, EntityTypeDef, GenerationStrategy, MappingResolver, MetadataProvider, Model,
    NavigationDef, PropertyDef, Reconciliation, ResolvedMapping, StatsInfo, TimestampInfo,
    ValueGenerated,
};

/// Re-export protocol types.
pub use bulkmap_proto as proto;
