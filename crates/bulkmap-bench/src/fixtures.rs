//! Test data generation for benchmarks.
//!
//! Generators are seeded so every run measures the same batches.

use bulkmap::{AsyncOutputSource, BoxError, OutputRequest, OutputSource};
use bulkmap_core::{
    AccessorRegistry, BulkEntity, ClrType, EntityTypeDef, GenerationStrategy, Model, NavigationDef,
    PropertyDef, ValueGenerated,
};
use bulkmap_proto::{FromValue, OutputMarker, OutputRowset, Value};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Batch size presets.
#[derive(Clone, Copy, Debug, Default)]
pub enum Scale {
    /// 10 entities.
    Tiny,
    /// 100 entities.
    Small,
    /// One default transfer batch.
    #[default]
    Medium,
    /// 100,000 entities.
    Large,
}

impl Scale {
    /// Get the entity count for this scale.
    pub fn count(&self) -> usize {
        match self {
            Scale::Tiny => 10,
            Scale::Small => 100,
            Scale::Medium => 2_000,
            Scale::Large => 100_000,
        }
    }
}

/// Customer entity used across benchmarks.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub tier: i32,
    pub balance: i64,
    pub created: i64,
    pub version: Vec<u8>,
    pub street: String,
    pub city: String,
}

impl BulkEntity for Customer {
    fn entity_type(&self) -> &str {
        "Customer"
    }

    fn register_accessors(registry: &mut AccessorRegistry<Self>) {
        registry
            .register("Id", |e| e.id.into(), |e, v| {
                e.id = i64::from_value(v)?;
                Ok(())
            })
            .register("Name", |e| e.name.clone().into(), |e, v| {
                e.name = String::from_value(v)?;
                Ok(())
            })
            .register("Email", |e| e.email.clone().into(), |e, v| {
                e.email = String::from_value(v)?;
                Ok(())
            })
            .register("Tier", |e| e.tier.into(), |e, v| {
                e.tier = i32::from_value(v)?;
                Ok(())
            })
            .register("Balance", |e| e.balance.into(), |e, v| {
                e.balance = i64::from_value(v)?;
                Ok(())
            })
            .register("Created", |e| Value::Timestamp(e.created), |e, v| {
                e.created = v.as_timestamp().unwrap_or_default();
                Ok(())
            })
            .register("Version", |e| e.version.clone().into(), |e, v| {
                e.version = Vec::<u8>::from_value(v)?;
                Ok(())
            })
            .register("Address.Street", |e| e.street.clone().into(), |e, v| {
                e.street = String::from_value(v)?;
                Ok(())
            })
            .register("Address.City", |e| e.city.clone().into(), |e, v| {
                e.city = String::from_value(v)?;
                Ok(())
            });
    }
}

/// SQL Server model with `Customer` and its owned `Address`.
pub fn customer_model() -> Model {
    Model::sql_server()
        .with_entity_type(
            EntityTypeDef::new("Customer", "Customers")
                .with_property(
                    PropertyDef::new("Id", ClrType::Int64, "bigint").identity(GenerationStrategy::IdentityColumn),
                )
                .with_property(PropertyDef::new("Name", ClrType::String, "nvarchar(100)"))
                .with_property(PropertyDef::new("Email", ClrType::String, "nvarchar(200)"))
                .with_property(
                    PropertyDef::new("Tier", ClrType::Int32, "int")
                        .with_default_value(Value::Int32(1))
                        .generated(ValueGenerated::OnAdd),
                )
                .with_property(PropertyDef::new("Balance", ClrType::Int64, "bigint"))
                .with_property(
                    PropertyDef::new("Created", ClrType::Timestamp, "datetime2(3)")
                        .with_default_sql("sysutcdatetime()"),
                )
                .with_property(PropertyDef::new("Version", ClrType::Bytes, "rowversion").row_version())
                .with_key(["Id"])
                .with_navigation(NavigationDef::owned("Address", "CustomerAddress")),
        )
        .with_entity_type(
            EntityTypeDef::owned("CustomerAddress")
                .with_property(PropertyDef::new("CustomerId", ClrType::Int64, "bigint"))
                .with_property(
                    PropertyDef::new("Street", ClrType::String, "nvarchar(200)").with_column("Address_Street"),
                )
                .with_property(
                    PropertyDef::new("City", ClrType::String, "nvarchar(100)").with_column("Address_City"),
                )
                .with_key(["CustomerId"]),
        )
}

/// Generate a random string of specified length.
fn random_string(rng: &mut StdRng, len: usize) -> String {
    (0..len).map(|_| rng.sample(Alphanumeric) as char).collect()
}

/// Generate new customers (identity zero) with realistic field distribution.
pub fn generate_customers(count: usize) -> Vec<Customer> {
    const SEED: u64 = 12345;
    let mut rng = StdRng::seed_from_u64(SEED);
    let cities = ["Lisbon", "Oslo", "Quito", "Perth", "Osaka"];

    (0..count)
        .map(|i| Customer {
            name: format!("{}_{}", random_string(&mut rng, 8), i),
            email: format!("customer{}@example{}.com", i, i % 10),
            balance: rng.gen_range(0..1_000_000),
            created: 1_700_000_000_000_000 + rng.gen_range(0..1_000_000_000),
            street: random_string(&mut rng, 16),
            city: cities[i % cities.len()].to_string(),
            ..Customer::default()
        })
        .collect()
}

/// Output rowset for `count` inserted customers with identities from `first_id`.
pub fn output_rowset(count: usize, first_id: i64) -> OutputRowset {
    OutputRowset::from_rows(
        &["Id", "Tier", "Created", "Version"],
        (0..count).map(|i| {
            vec![
                Value::Int64(first_id + i as i64),
                Value::Int32(1),
                Value::Timestamp(1_700_000_000_000_000),
                Value::Bytes((i as u64).to_be_bytes().to_vec()),
            ]
        }),
    )
    .unwrap_or_default()
}

/// Output source that returns the same rows every time.
#[derive(Debug, Clone, Default)]
pub struct CannedOutput {
    pub rows: OutputRowset,
}

impl OutputSource for CannedOutput {
    fn fetch_output(&mut self, _request: &OutputRequest) -> Result<OutputRowset, BoxError> {
        Ok(self.rows.clone())
    }

    fn count_marked(&mut self, _request: &OutputRequest, _marker: OutputMarker) -> Result<usize, BoxError> {
        Ok(0)
    }
}

#[async_trait::async_trait]
impl AsyncOutputSource for CannedOutput {
    async fn fetch_output(&mut self, _request: &OutputRequest) -> Result<OutputRowset, BoxError> {
        Ok(self.rows.clone())
    }

    async fn count_marked(
        &mut self,
        _request: &OutputRequest,
        _marker: OutputMarker,
    ) -> Result<usize, BoxError> {
        Ok(0)
    }
}
