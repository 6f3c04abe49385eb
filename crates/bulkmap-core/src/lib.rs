//! bulkmap core - mapping resolution and output reconciliation for set-based
//! bulk database operations.
//!
//! [`MappingResolver`] reads an entity type from a [`MetadataProvider`] and
//! resolves which properties map to which columns in each role of an
//! operation. After the write, [`Reconciler`] merges identities, row versions
//! and computed values from the output rowset back into the caller's entities.

pub mod catalog;
pub mod config;
pub mod error;
pub mod mapping;
pub mod reconcile;
pub mod transfer;

pub use catalog::{
    ClrType, EntityTypeDef, GenerationStrategy, MetadataProvider, Model, NavigationDef, Ownership,
    PropertyDef, ProviderKind, ValueGenerated,
};
pub use config::{BulkConfig, BulkConfigBuilder, PropertyFilter, RawBulkConfig, TableName};
pub use error::{ConfigError, DataShapeError, Error, Result};
pub use mapping::{
    AccessorRegistry, AccessorTable, BulkEntity, Classification, KeySpec, MappingResolver,
    PropertyColumns, RelationFacts, ResolvedMapping, RoleSets, StagingNames,
};
pub use reconcile::{
    assign_placeholders, key_signature, merge_read_entities, reset_placeholders, OrderPlan,
    Reconciler, Reconciliation, StatsInfo, TimestampInfo,
};
pub use transfer::{progress_fraction, ProgressReporter, TransferSettings};

/// Re-export protocol types.
pub use bulkmap_proto as proto;
