//! Metadata model consumed by introspection.
//!
//! Entity types, their properties and navigations, as reported by the ORM
//! model behind a [`MetadataProvider`].

mod entity;
mod model;
mod navigation;
mod property;
mod provider;
mod types;

pub use entity::EntityTypeDef;
pub use model::Model;
pub use navigation::{NavigationDef, Ownership};
pub use property::PropertyDef;
pub use provider::{MetadataProvider, ProviderKind};
pub use types::{ClrType, GenerationStrategy, ValueGenerated};
