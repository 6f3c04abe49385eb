//! Navigation definitions between entity types.

/// How a navigation's target is persisted relative to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Regular reference to an independent entity type.
    Reference,
    /// Owned value object stored in the owner's table.
    OwnedInline,
    /// Owned value object stored in a table of its own.
    OwnedSeparate,
}

/// A navigation from one entity type to another.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationDef {
    /// Navigation (member) name on the owner.
    pub name: String,
    /// Target entity type name.
    pub target_type: String,
    /// Whether the navigation holds a collection.
    pub collection: bool,
    /// How the target is persisted.
    pub ownership: Ownership,
}

impl NavigationDef {
    /// Create a reference navigation to an independent entity type.
    pub fn reference(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_type: target_type.into(),
            collection: false,
            ownership: Ownership::Reference,
        }
    }

    /// Create an owned navigation persisted inline in the owner's table.
    pub fn owned(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_type: target_type.into(),
            collection: false,
            ownership: Ownership::OwnedInline,
        }
    }

    /// Store the owned target in its own table.
    pub fn in_separate_table(mut self) -> Self {
        if self.ownership == Ownership::OwnedInline {
            self.ownership = Ownership::OwnedSeparate;
        }
        self
    }

    /// Mark as collection-valued.
    pub fn collection(mut self) -> Self {
        self.collection = true;
        self
    }

    /// Check if the target is an owned type.
    pub fn is_owned(&self) -> bool {
        matches!(self.ownership, Ownership::OwnedInline | Ownership::OwnedSeparate)
    }

    /// Owned, single-valued and stored in the owner's table.
    pub fn is_inline_owned(&self) -> bool {
        self.ownership == Ownership::OwnedInline && !self.collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership() {
        let address = NavigationDef::owned("Address", "Address");
        assert!(address.is_owned());
        assert!(address.is_inline_owned());

        let audit = NavigationDef::owned("Audit", "AuditInfo").in_separate_table();
        assert!(audit.is_owned());
        assert!(!audit.is_inline_owned());

        let tags = NavigationDef::owned("Tags", "Tag").collection();
        assert!(!tags.is_inline_owned());

        let customer = NavigationDef::reference("Customer", "Customer").in_separate_table();
        assert_eq!(customer.ownership, Ownership::Reference);
        assert!(!customer.is_owned());
    }
}
