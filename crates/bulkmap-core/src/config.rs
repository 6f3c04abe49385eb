//! Bulk operation configuration.
//!
//! [`BulkConfig`] is immutable once built. All validation that does not need
//! the entity model happens here, so a bad combination of options fails before
//! any metadata is read.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of rows sent per batch.
pub const DEFAULT_BATCH_SIZE: usize = 2000;

/// Suffix appended to the target table name to name the staging table.
pub const STAGING_SUFFIX: &str = "Temp";

/// Suffix appended to the staging table name to name the output table.
pub const OUTPUT_SUFFIX: &str = "Output";

/// Shadow columns maintained by temporal tables.
pub const DEFAULT_TEMPORAL_COLUMNS: [&str; 2] = ["PeriodStart", "PeriodEnd"];

/// Which properties a role uses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyFilter {
    /// Every candidate property.
    #[default]
    All,
    /// Only the named properties.
    Include(Vec<String>),
    /// Every candidate property except the named ones.
    Exclude(Vec<String>),
}

impl PropertyFilter {
    /// Build a filter from optional include and exclude lists.
    ///
    /// Empty lists count as absent. Both present is an error.
    pub fn from_lists(
        role: &'static str,
        include: Vec<String>,
        exclude: Vec<String>,
    ) -> Result<Self, ConfigError> {
        match (include.is_empty(), exclude.is_empty()) {
            (true, true) => Ok(PropertyFilter::All),
            (false, true) => Ok(PropertyFilter::Include(include)),
            (true, false) => Ok(PropertyFilter::Exclude(exclude)),
            (false, false) => Err(ConfigError::MultiplePropertyLists { role }),
        }
    }

    /// Check whether the filter keeps `name`.
    pub fn allows(&self, name: &str) -> bool {
        match self {
            PropertyFilter::All => true,
            PropertyFilter::Include(names) => names.iter().any(|n| n == name),
            PropertyFilter::Exclude(names) => !names.iter().any(|n| n == name),
        }
    }

    /// Names listed by the filter.
    pub fn names(&self) -> &[String] {
        match self {
            PropertyFilter::All => &[],
            PropertyFilter::Include(names) | PropertyFilter::Exclude(names) => names,
        }
    }

    /// Check if this is an include list.
    pub fn is_include(&self) -> bool {
        matches!(self, PropertyFilter::Include(_))
    }
}

/// A possibly schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableName {
    /// Schema, when qualified.
    pub schema: Option<String>,
    /// Unqualified table name.
    pub name: String,
}

impl TableName {
    /// Parse `table` or `schema.table`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidTableName(raw.to_string());
        match raw.split_once('.') {
            Some((schema, name)) => {
                if schema.is_empty() || name.is_empty() || name.contains('.') {
                    return Err(invalid());
                }
                Ok(Self {
                    schema: Some(schema.to_string()),
                    name: name.to_string(),
                })
            }
            None if raw.is_empty() => Err(invalid()),
            None => Ok(Self {
                schema: None,
                name: raw.to_string(),
            }),
        }
    }
}

/// Flat, serde-friendly form of [`BulkConfig`].
///
/// Accepts separate include and exclude lists per role and is validated when
/// converted into a [`BulkConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBulkConfig {
    pub use_temp_db: bool,
    pub unique_table_name_temp_db: bool,
    pub preserve_insert_order: bool,
    pub set_output_identity: bool,
    pub calculate_stats: bool,
    pub ignore_row_version: bool,
    pub properties_to_include: Vec<String>,
    pub properties_to_exclude: Vec<String>,
    pub properties_to_include_on_compare: Vec<String>,
    pub properties_to_exclude_on_compare: Vec<String>,
    pub properties_to_include_on_update: Vec<String>,
    pub properties_to_exclude_on_update: Vec<String>,
    pub update_by_properties: Vec<String>,
    pub custom_source_table_name: Option<String>,
    pub custom_destination_table_name: Option<String>,
    pub temporal_columns: Vec<String>,
    pub datetime2_precision_force_round: bool,
    pub batch_size: usize,
    /// Transfer timeout in seconds.
    pub bulk_copy_timeout: Option<u64>,
    pub notify_after: Option<usize>,
}

impl Default for RawBulkConfig {
    fn default() -> Self {
        Self {
            use_temp_db: false,
            unique_table_name_temp_db: false,
            preserve_insert_order: true,
            set_output_identity: false,
            calculate_stats: false,
            ignore_row_version: false,
            properties_to_include: Vec::new(),
            properties_to_exclude: Vec::new(),
            properties_to_include_on_compare: Vec::new(),
            properties_to_exclude_on_compare: Vec::new(),
            properties_to_include_on_update: Vec::new(),
            properties_to_exclude_on_update: Vec::new(),
            update_by_properties: Vec::new(),
            custom_source_table_name: None,
            custom_destination_table_name: None,
            temporal_columns: DEFAULT_TEMPORAL_COLUMNS.iter().map(|s| s.to_string()).collect(),
            datetime2_precision_force_round: false,
            batch_size: DEFAULT_BATCH_SIZE,
            bulk_copy_timeout: None,
            notify_after: None,
        }
    }
}

/// Validated, immutable configuration for one bulk operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBulkConfig", into = "RawBulkConfig")]
pub struct BulkConfig {
    use_temp_db: bool,
    unique_table_name_temp_db: bool,
    preserve_insert_order: bool,
    set_output_identity: bool,
    calculate_stats: bool,
    ignore_row_version: bool,
    properties: PropertyFilter,
    compare_properties: PropertyFilter,
    update_properties: PropertyFilter,
    update_by_properties: Vec<String>,
    custom_source_table: Option<TableName>,
    custom_destination_table: Option<TableName>,
    temporal_columns: Vec<String>,
    datetime2_precision_force_round: bool,
    batch_size: usize,
    bulk_copy_timeout: Option<Duration>,
    notify_after: Option<usize>,
}

impl BulkConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> BulkConfigBuilder {
        BulkConfigBuilder::default()
    }

    /// Stage rows in a session-local table.
    pub fn use_temp_db(&self) -> bool {
        self.use_temp_db
    }

    /// Add a random token to staging table names.
    pub fn unique_table_name_temp_db(&self) -> bool {
        self.unique_table_name_temp_db
    }

    /// Write generated values back to the original positions.
    pub fn preserve_insert_order(&self) -> bool {
        self.preserve_insert_order
    }

    /// Capture generated values into an output table.
    pub fn set_output_identity(&self) -> bool {
        self.set_output_identity
    }

    /// Count inserted/updated/deleted rows.
    pub fn calculate_stats(&self) -> bool {
        self.calculate_stats
    }

    /// Treat row version columns as ordinary columns.
    pub fn ignore_row_version(&self) -> bool {
        self.ignore_row_version
    }

    /// General property filter, applied to every role.
    pub fn properties(&self) -> &PropertyFilter {
        &self.properties
    }

    /// Filter for the compare role.
    pub fn compare_properties(&self) -> &PropertyFilter {
        &self.compare_properties
    }

    /// Filter for the update role.
    pub fn update_properties(&self) -> &PropertyFilter {
        &self.update_properties
    }

    /// Properties used to match rows instead of the primary key.
    pub fn update_by_properties(&self) -> &[String] {
        &self.update_by_properties
    }

    /// Existing table to read rows from instead of a staging table.
    pub fn custom_source_table(&self) -> Option<&TableName> {
        self.custom_source_table.as_ref()
    }

    /// Table to write to instead of the mapped one.
    pub fn custom_destination_table(&self) -> Option<&TableName> {
        self.custom_destination_table.as_ref()
    }

    /// Shadow timestamp columns maintained by temporal tables.
    pub fn temporal_columns(&self) -> &[String] {
        &self.temporal_columns
    }

    /// Round timestamps to the precision of `datetime2(n)` columns.
    pub fn datetime2_precision_force_round(&self) -> bool {
        self.datetime2_precision_force_round
    }

    /// Rows per batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Transfer timeout.
    pub fn bulk_copy_timeout(&self) -> Option<Duration> {
        self.bulk_copy_timeout
    }

    /// Rows between progress notifications; defaults to the batch size.
    pub fn notify_after(&self) -> usize {
        self.notify_after.unwrap_or(self.batch_size)
    }
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            use_temp_db: false,
            unique_table_name_temp_db: false,
            preserve_insert_order: true,
            set_output_identity: false,
            calculate_stats: false,
            ignore_row_version: false,
            properties: PropertyFilter::All,
            compare_properties: PropertyFilter::All,
            update_properties: PropertyFilter::All,
            update_by_properties: Vec::new(),
            custom_source_table: None,
            custom_destination_table: None,
            temporal_columns: DEFAULT_TEMPORAL_COLUMNS.iter().map(|s| s.to_string()).collect(),
            datetime2_precision_force_round: false,
            batch_size: DEFAULT_BATCH_SIZE,
            bulk_copy_timeout: None,
            notify_after: None,
        }
    }
}

impl TryFrom<RawBulkConfig> for BulkConfig {
    type Error = ConfigError;

    fn try_from(raw: RawBulkConfig) -> Result<Self, Self::Error> {
        let properties =
            PropertyFilter::from_lists("general", raw.properties_to_include, raw.properties_to_exclude)?;
        let compare_properties = PropertyFilter::from_lists(
            "compare",
            raw.properties_to_include_on_compare,
            raw.properties_to_exclude_on_compare,
        )?;
        let update_properties = PropertyFilter::from_lists(
            "update",
            raw.properties_to_include_on_update,
            raw.properties_to_exclude_on_update,
        )?;

        if raw.batch_size == 0 {
            return Err(ConfigError::InvalidSetting {
                setting: "batch_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if raw.notify_after == Some(0) {
            return Err(ConfigError::InvalidSetting {
                setting: "notify_after",
                reason: "must be greater than zero".to_string(),
            });
        }

        let custom_source_table = raw
            .custom_source_table_name
            .as_deref()
            .map(TableName::parse)
            .transpose()?;
        let custom_destination_table = raw
            .custom_destination_table_name
            .as_deref()
            .map(TableName::parse)
            .transpose()?;

        Ok(Self {
            use_temp_db: raw.use_temp_db,
            unique_table_name_temp_db: raw.unique_table_name_temp_db,
            preserve_insert_order: raw.preserve_insert_order,
            set_output_identity: raw.set_output_identity,
            calculate_stats: raw.calculate_stats,
            ignore_row_version: raw.ignore_row_version,
            properties,
            compare_properties,
            update_properties,
            update_by_properties: raw.update_by_properties,
            custom_source_table,
            custom_destination_table,
            temporal_columns: raw.temporal_columns,
            datetime2_precision_force_round: raw.datetime2_precision_force_round,
            batch_size: raw.batch_size,
            bulk_copy_timeout: raw.bulk_copy_timeout.map(Duration::from_secs),
            notify_after: raw.notify_after,
        })
    }
}

fn split_filter(filter: PropertyFilter) -> (Vec<String>, Vec<String>) {
    match filter {
        PropertyFilter::All => (Vec::new(), Vec::new()),
        PropertyFilter::Include(names) => (names, Vec::new()),
        PropertyFilter::Exclude(names) => (Vec::new(), names),
    }
}

fn join_table_name(table: TableName) -> String {
    match table.schema {
        Some(schema) => format!("{}.{}", schema, table.name),
        None => table.name,
    }
}

impl From<BulkConfig> for RawBulkConfig {
    fn from(config: BulkConfig) -> Self {
        let (properties_to_include, properties_to_exclude) = split_filter(config.properties);
        let (properties_to_include_on_compare, properties_to_exclude_on_compare) =
            split_filter(config.compare_properties);
        let (properties_to_include_on_update, properties_to_exclude_on_update) =
            split_filter(config.update_properties);

        Self {
            use_temp_db: config.use_temp_db,
            unique_table_name_temp_db: config.unique_table_name_temp_db,
            preserve_insert_order: config.preserve_insert_order,
            set_output_identity: config.set_output_identity,
            calculate_stats: config.calculate_stats,
            ignore_row_version: config.ignore_row_version,
            properties_to_include,
            properties_to_exclude,
            properties_to_include_on_compare,
            properties_to_exclude_on_compare,
            properties_to_include_on_update,
            properties_to_exclude_on_update,
            update_by_properties: config.update_by_properties,
            custom_source_table_name: config.custom_source_table.map(join_table_name),
            custom_destination_table_name: config.custom_destination_table.map(join_table_name),
            temporal_columns: config.temporal_columns,
            datetime2_precision_force_round: config.datetime2_precision_force_round,
            batch_size: config.batch_size,
            bulk_copy_timeout: config.bulk_copy_timeout.map(|d| d.as_secs()),
            notify_after: config.notify_after,
        }
    }
}

/// Builder for [`BulkConfig`].
#[derive(Debug, Clone, Default)]
pub struct BulkConfigBuilder {
    raw: RawBulkConfig,
}

fn to_strings<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Vec<String> {
    names.into_iter().map(Into::into).collect()
}

impl BulkConfigBuilder {
    /// Stage rows in a session-local table.
    pub fn use_temp_db(mut self, enabled: bool) -> Self {
        self.raw.use_temp_db = enabled;
        self
    }

    /// Add a random token to staging table names.
    pub fn unique_table_name_temp_db(mut self, enabled: bool) -> Self {
        self.raw.unique_table_name_temp_db = enabled;
        self
    }

    /// Write generated values back to the original positions.
    pub fn preserve_insert_order(mut self, enabled: bool) -> Self {
        self.raw.preserve_insert_order = enabled;
        self
    }

    /// Capture generated values into an output table.
    pub fn set_output_identity(mut self, enabled: bool) -> Self {
        self.raw.set_output_identity = enabled;
        self
    }

    /// Count inserted/updated/deleted rows.
    pub fn calculate_stats(mut self, enabled: bool) -> Self {
        self.raw.calculate_stats = enabled;
        self
    }

    /// Treat row version columns as ordinary columns.
    pub fn ignore_row_version(mut self, enabled: bool) -> Self {
        self.raw.ignore_row_version = enabled;
        self
    }

    /// Only use the named properties.
    pub fn include_properties<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.raw.properties_to_include = to_strings(names);
        self
    }

    /// Use every property except the named ones.
    pub fn exclude_properties<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.raw.properties_to_exclude = to_strings(names);
        self
    }

    /// Only compare the named properties.
    pub fn include_on_compare<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.raw.properties_to_include_on_compare = to_strings(names);
        self
    }

    /// Compare every property except the named ones.
    pub fn exclude_on_compare<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.raw.properties_to_exclude_on_compare = to_strings(names);
        self
    }

    /// Only update the named properties.
    pub fn include_on_update<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.raw.properties_to_include_on_update = to_strings(names);
        self
    }

    /// Update every property except the named ones.
    pub fn exclude_on_update<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.raw.properties_to_exclude_on_update = to_strings(names);
        self
    }

    /// Match rows on the named properties instead of the primary key.
    pub fn update_by<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.raw.update_by_properties = to_strings(names);
        self
    }

    /// Read rows from an existing table instead of a staging table.
    pub fn custom_source_table(mut self, name: impl Into<String>) -> Self {
        self.raw.custom_source_table_name = Some(name.into());
        self
    }

    /// Write to a table other than the mapped one.
    pub fn custom_destination_table(mut self, name: impl Into<String>) -> Self {
        self.raw.custom_destination_table_name = Some(name.into());
        self
    }

    /// Replace the temporal column names.
    pub fn temporal_columns<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.raw.temporal_columns = to_strings(names);
        self
    }

    /// Round timestamps to the precision of `datetime2(n)` columns.
    pub fn datetime2_precision_force_round(mut self, enabled: bool) -> Self {
        self.raw.datetime2_precision_force_round = enabled;
        self
    }

    /// Set rows per batch.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.raw.batch_size = size;
        self
    }

    /// Set the transfer timeout, truncated to whole seconds.
    pub fn bulk_copy_timeout(mut self, timeout: Duration) -> Self {
        self.raw.bulk_copy_timeout = Some(timeout.as_secs());
        self
    }

    /// Set rows between progress notifications.
    pub fn notify_after(mut self, rows: usize) -> Self {
        self.raw.notify_after = Some(rows);
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<BulkConfig, ConfigError> {
        BulkConfig::try_from(self.raw)
    }
}
