//! Shared fixtures: an `Order` entity with an identity key, a database
//! default, a computed column, a row version and an inline owned address.

#![allow(dead_code)]

use bulkmap_core::proto::{Error as ValueError, FromValue, OutputRowset, Value};
use bulkmap_core::{
    AccessorRegistry, BulkEntity, ClrType, EntityTypeDef, GenerationStrategy, Model,
    NavigationDef, PropertyDef, ValueGenerated,
};

/// Route library logs to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub code: String,
    pub quantity: i32,
    pub status: i32,
    pub total: i64,
    pub version: Vec<u8>,
    pub placed: i64,
    pub street: String,
    pub city: String,
}

impl Order {
    pub fn new(code: &str, quantity: i32) -> Self {
        Self {
            code: code.to_string(),
            quantity,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }
}

impl BulkEntity for Order {
    fn entity_type(&self) -> &str {
        "Order"
    }

    fn register_accessors(registry: &mut AccessorRegistry<Self>) {
        registry
            .register("Id", |e| e.id.into(), |e, v| {
                e.id = i64::from_value(v)?;
                Ok(())
            })
            .register("Code", |e| e.code.clone().into(), |e, v| {
                e.code = String::from_value(v)?;
                Ok(())
            })
            .register("Quantity", |e| e.quantity.into(), |e, v| {
                e.quantity = i32::from_value(v)?;
                Ok(())
            })
            .register("Status", |e| e.status.into(), |e, v| {
                e.status = i32::from_value(v)?;
                Ok(())
            })
            .register("Total", |e| e.total.into(), |e, v| {
                e.total = i64::from_value(v)?;
                Ok(())
            })
            .register("Version", |e| e.version.clone().into(), |e, v| {
                e.version = Vec::<u8>::from_value(v)?;
                Ok(())
            })
            .register("Placed", |e| Value::Timestamp(e.placed), |e, v| {
                e.placed = v.as_timestamp().ok_or(ValueError::TypeMismatch {
                    expected: "timestamp",
                    actual: v.type_name(),
                })?;
                Ok(())
            })
            .register("Shipping.Street", |e| e.street.clone().into(), |e, v| {
                e.street = String::from_value(v)?;
                Ok(())
            })
            .register("Shipping.City", |e| e.city.clone().into(), |e, v| {
                e.city = String::from_value(v)?;
                Ok(())
            });
    }
}

pub fn order_type() -> EntityTypeDef {
    EntityTypeDef::new("Order", "Orders")
        .with_property(
            PropertyDef::new("Id", ClrType::Int64, "bigint").identity(GenerationStrategy::IdentityColumn),
        )
        .with_property(PropertyDef::new("Code", ClrType::String, "nvarchar(20)"))
        .with_property(PropertyDef::new("Quantity", ClrType::Int32, "int"))
        .with_property(
            PropertyDef::new("Status", ClrType::Int32, "int")
                .with_default_value(Value::Int32(1))
                .generated(ValueGenerated::OnAdd),
        )
        .with_property(PropertyDef::new("Total", ClrType::Int64, "bigint").computed("[Quantity] * 10"))
        .with_property(PropertyDef::new("Version", ClrType::Bytes, "rowversion").row_version())
        .with_property(PropertyDef::new("Placed", ClrType::Timestamp, "datetime2(3)"))
        .with_key(["Id"])
        .with_navigation(NavigationDef::owned("Shipping", "Address"))
}

pub fn address_type() -> EntityTypeDef {
    EntityTypeDef::owned("Address")
        .with_property(PropertyDef::new("OrderId", ClrType::Int64, "bigint"))
        .with_property(PropertyDef::new("Street", ClrType::String, "nvarchar(100)").with_column("Shipping_Street"))
        .with_property(PropertyDef::new("City", ClrType::String, "nvarchar(50)").with_column("Shipping_City"))
        .with_key(["OrderId"])
}

pub fn model() -> Model {
    Model::sql_server()
        .with_entity_type(order_type())
        .with_entity_type(address_type())
}

pub fn postgres_model() -> Model {
    Model::postgres()
        .with_entity_type(order_type())
        .with_entity_type(address_type())
}

/// Output rowset with identity, database default, computed value and row version.
pub fn output_rows(rows: &[(i64, i32, i64, u8)]) -> OutputRowset {
    OutputRowset::from_rows(
        &["Id", "Status", "Total", "Version"],
        rows.iter().map(|(id, status, total, version)| {
            vec![
                Value::Int64(*id),
                Value::Int32(*status),
                Value::Int64(*total),
                Value::Bytes(vec![0, 0, 0, *version]),
            ]
        }),
    )
    .unwrap()
}
