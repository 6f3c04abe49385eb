//! The metadata provider seam.

use super::entity::EntityTypeDef;

/// Source of entity-type metadata, typically an ORM model.
///
/// Introspection calls this once per operation. Implementations are expected
/// to be cheap, in-memory lookups.
pub trait MetadataProvider {
    /// Provider identity string (e.g. `Microsoft.EntityFrameworkCore.SqlServer`).
    fn provider_name(&self) -> &str;

    /// Look up an entity type by name.
    fn find_entity_type(&self, name: &str) -> Option<&EntityTypeDef>;
}

/// Database engine family, derived from the provider identity string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Microsoft SQL Server.
    SqlServer,
    /// PostgreSQL.
    PostgreSql,
    /// SQLite.
    Sqlite,
    /// Anything else.
    Other,
}

impl ProviderKind {
    /// Classify a provider identity string by its suffix, case-insensitively.
    pub fn from_provider_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name.ends_with("sqlserver") {
            ProviderKind::SqlServer
        } else if name.ends_with("postgresql") {
            ProviderKind::PostgreSql
        } else if name.ends_with("sqlite") {
            ProviderKind::Sqlite
        } else {
            ProviderKind::Other
        }
    }

    /// Schema used when neither the caller nor the model names one.
    pub fn default_schema(&self) -> Option<&'static str> {
        match self {
            ProviderKind::SqlServer => Some("dbo"),
            _ => None,
        }
    }

    /// Whether identity columns are recognised from generation-strategy annotations.
    pub fn has_generation_strategy(&self) -> bool {
        matches!(self, ProviderKind::SqlServer | ProviderKind::PostgreSql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind() {
        assert_eq!(
            ProviderKind::from_provider_name("Microsoft.EntityFrameworkCore.SqlServer"),
            ProviderKind::SqlServer
        );
        assert_eq!(
            ProviderKind::from_provider_name("Npgsql.EntityFrameworkCore.PostgreSQL"),
            ProviderKind::PostgreSql
        );
        assert_eq!(
            ProviderKind::from_provider_name("Microsoft.EntityFrameworkCore.Sqlite"),
            ProviderKind::Sqlite
        );
        assert_eq!(ProviderKind::from_provider_name("Oracle"), ProviderKind::Other);

        assert_eq!(ProviderKind::SqlServer.default_schema(), Some("dbo"));
        assert_eq!(ProviderKind::Sqlite.default_schema(), None);
        assert!(!ProviderKind::Sqlite.has_generation_strategy());
    }
}
