//! Typed property accessors for caller entities.
//!
//! Entity types register a getter and a setter per property path once; the
//! resolver compiles the paths a mapping needs into an [`AccessorTable`]
//! indexed by slot, which the reconciler uses on the hot path.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;

use bulkmap_proto::Value;

/// Reads a property value from an entity.
pub type Getter<T> = fn(&T) -> Value;

/// Writes a property value onto an entity.
pub type Setter<T> = fn(&mut T, Value) -> Result<(), bulkmap_proto::Error>;

/// An entity type that can take part in bulk operations.
///
/// # Example
///
/// ```
/// use bulkmap_core::{AccessorRegistry, BulkEntity};
/// use bulkmap_core::proto::{FromValue, Value};
///
/// #[derive(Default)]
/// struct Item {
///     id: i64,
///     name: String,
/// }
///
/// impl BulkEntity for Item {
///     fn entity_type(&self) -> &str {
///         "Item"
///     }
///
///     fn register_accessors(registry: &mut AccessorRegistry<Self>) {
///         registry
///             .register("Id", |e| e.id.into(), |e, v| {
///                 e.id = i64::from_value(v)?;
///                 Ok(())
///             })
///             .register("Name", |e| e.name.clone().into(), |e, v| {
///                 e.name = String::from_value(v)?;
///                 Ok(())
///             });
///     }
/// }
///
/// let registry = AccessorRegistry::<Item>::for_entity();
/// assert!(registry.contains("Name"));
/// ```
pub trait BulkEntity: Sized {
    /// Name of the entity type this instance belongs to.
    ///
    /// For a batch of mixed derived types this reports the runtime type.
    fn entity_type(&self) -> &str;

    /// Register accessors for every mapped property, using dotted paths
    /// (`Address.Street`) for members of owned types.
    fn register_accessors(registry: &mut AccessorRegistry<Self>);
}

/// A getter/setter pair.
pub struct Accessor<T> {
    getter: Getter<T>,
    setter: Setter<T>,
}

impl<T> Accessor<T> {
    /// Read the value from `entity`.
    #[inline]
    pub fn get(&self, entity: &T) -> Value {
        (self.getter)(entity)
    }

    /// Write `value` onto `entity`.
    #[inline]
    pub fn set(&self, entity: &mut T, value: Value) -> Result<(), bulkmap_proto::Error> {
        (self.setter)(entity, value)
    }
}

impl<T> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Accessor<T> {}

impl<T> fmt::Debug for Accessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor").finish_non_exhaustive()
    }
}

/// Accessors registered by an entity type, by property path.
pub struct AccessorRegistry<T> {
    accessors: IndexMap<String, Accessor<T>>,
}

impl<T> AccessorRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            accessors: IndexMap::new(),
        }
    }

    /// Register an accessor pair. A later registration for the same path wins.
    pub fn register(
        &mut self,
        path: impl Into<String>,
        getter: Getter<T>,
        setter: Setter<T>,
    ) -> &mut Self {
        self.accessors.insert(path.into(), Accessor { getter, setter });
        self
    }

    /// Get the accessor for a path.
    pub fn get(&self, path: &str) -> Option<&Accessor<T>> {
        self.accessors.get(path)
    }

    /// Check if a path has an accessor.
    pub fn contains(&self, path: &str) -> bool {
        self.accessors.contains_key(path)
    }

    /// Registered paths in registration order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.accessors.keys().map(|k| k.as_str())
    }

    /// Number of registered accessors.
    pub fn len(&self) -> usize {
        self.accessors.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.accessors.is_empty()
    }
}

impl<T: BulkEntity> AccessorRegistry<T> {
    /// Collect the accessors the entity type registers.
    pub fn for_entity() -> Self {
        let mut registry = Self::new();
        T::register_accessors(&mut registry);
        registry
    }
}

impl<T> Default for AccessorRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for AccessorRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.accessors.keys()).finish()
    }
}

/// Accessors compiled for one mapping, addressed by slot.
pub struct AccessorTable<T> {
    paths: Vec<String>,
    slots: Vec<Accessor<T>>,
    index: HashMap<String, usize>,
}

impl<T> AccessorTable<T> {
    /// Compile the accessors for `paths`. Paths without an accessor are skipped.
    pub fn compile<'a>(
        registry: &AccessorRegistry<T>,
        paths: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut table = Self {
            paths: Vec::new(),
            slots: Vec::new(),
            index: HashMap::new(),
        };
        for path in paths {
            if table.index.contains_key(path) {
                continue;
            }
            if let Some(accessor) = registry.get(path) {
                table.index.insert(path.to_string(), table.slots.len());
                table.paths.push(path.to_string());
                table.slots.push(*accessor);
            }
        }
        table
    }

    /// Slot of a path.
    pub fn slot(&self, path: &str) -> Option<usize> {
        self.index.get(path).copied()
    }

    /// Path stored at a slot.
    pub fn path(&self, slot: usize) -> Option<&str> {
        self.paths.get(slot).map(|p| p.as_str())
    }

    /// Read the value at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` was not produced by this table.
    #[inline]
    pub fn get(&self, entity: &T, slot: usize) -> Value {
        self.slots[slot].get(entity)
    }

    /// Write the value at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` was not produced by this table.
    #[inline]
    pub fn set(&self, entity: &mut T, slot: usize, value: Value) -> Result<(), bulkmap_proto::Error> {
        self.slots[slot].set(entity, value)
    }

    /// Read a value by path.
    pub fn get_by_path(&self, entity: &T, path: &str) -> Option<Value> {
        self.slot(path).map(|slot| self.get(entity, slot))
    }

    /// Number of compiled accessors.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<T> fmt::Debug for AccessorTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorTable")
            .field("paths", &self.paths)
            .finish()
    }
}
