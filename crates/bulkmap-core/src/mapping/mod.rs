//! Mapping resolution.
//!
//! Turns an entity type and a configuration into a [`ResolvedMapping`]:
//! introspection reads the metadata model into [`RelationFacts`], the
//! classifier partitions properties into role sets and a join key, and the
//! resolver compiles the accessors and names the staging tables.

mod accessor;
mod classify;
mod facts;
mod introspect;
mod resolver;

pub use accessor::{Accessor, AccessorRegistry, AccessorTable, BulkEntity, Getter, Setter};
pub use classify::{classify, Classification, KeySpec, RoleSets};
pub use facts::{ColumnFact, IdentitySpec, PropertyColumns, RelationFacts, TimestampSpec};
pub use introspect::introspect;
pub use resolver::{MappingResolver, ResolvedMapping, StagingNames};
