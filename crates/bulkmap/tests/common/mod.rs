//! Shared fixtures: a `Ticket` entity and an in-memory output source.

#![allow(dead_code)]

use bulkmap::proto::{FromValue, OutputMarker, OutputRowset, Value};
use bulkmap::{
    AccessorRegistry, BoxError, BulkEntity, ClrType, EntityTypeDef, GenerationStrategy, Model,
    OutputRequest, OutputSource, PropertyDef,
};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Ticket {
    pub id: i32,
    pub title: String,
    pub version: Vec<u8>,
}

impl Ticket {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }
}

impl BulkEntity for Ticket {
    fn entity_type(&self) -> &str {
        "Ticket"
    }

    fn register_accessors(registry: &mut AccessorRegistry<Self>) {
        registry
            .register("Id", |e| e.id.into(), |e, v| {
                e.id = i32::from_value(v)?;
                Ok(())
            })
            .register("Title", |e| e.title.clone().into(), |e, v| {
                e.title = String::from_value(v)?;
                Ok(())
            })
            .register("Version", |e| e.version.clone().into(), |e, v| {
                e.version = Vec::<u8>::from_value(v)?;
                Ok(())
            });
    }
}

pub fn model() -> Model {
    Model::sql_server().with_entity_type(
        EntityTypeDef::new("Ticket", "Tickets")
            .with_property(PropertyDef::new("Id", ClrType::Int32, "int").identity(GenerationStrategy::IdentityColumn))
            .with_property(PropertyDef::new("Title", ClrType::String, "nvarchar(100)"))
            .with_property(PropertyDef::new("Version", ClrType::Bytes, "rowversion").row_version())
            .with_key(["Id"]),
    )
}

pub fn tickets() -> Vec<Ticket> {
    vec![Ticket::new("first"), Ticket::new("second"), Ticket::new("third")]
}

/// Output rows for identities `first..first + count`.
pub fn output(first: i32, count: i32) -> OutputRowset {
    OutputRowset::from_rows(
        &["Id", "Title", "Version"],
        (0..count).map(|i| {
            vec![
                Value::Int32(first + i),
                Value::from(format!("row {i}")),
                Value::Bytes(vec![i as u8]),
            ]
        }),
    )
    .unwrap()
}

/// Output source over canned rows and marker counts.
#[derive(Debug, Default)]
pub struct MemorySource {
    pub rows: OutputRowset,
    pub updated: usize,
    pub deleted: usize,
    pub fail: bool,
    pub requests: Vec<OutputRequest>,
    pub counts: Vec<OutputMarker>,
}

impl MemorySource {
    pub fn with_rows(rows: OutputRowset) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    fn read(&mut self, request: &OutputRequest) -> Result<OutputRowset, BoxError> {
        if self.fail {
            return Err("output table is gone".into());
        }
        self.requests.push(request.clone());
        Ok(self.rows.clone())
    }

    fn count(&mut self, marker: OutputMarker) -> Result<usize, BoxError> {
        self.counts.push(marker);
        Ok(match marker {
            OutputMarker::IsUpdate => self.updated,
            OutputMarker::IsDelete => self.deleted,
        })
    }
}

impl OutputSource for MemorySource {
    fn fetch_output(&mut self, request: &OutputRequest) -> Result<OutputRowset, BoxError> {
        self.read(request)
    }

    fn count_marked(&mut self, _request: &OutputRequest, marker: OutputMarker) -> Result<usize, BoxError> {
        self.count(marker)
    }
}

#[cfg(feature = "async")]
#[async_trait::async_trait]
impl bulkmap::AsyncOutputSource for MemorySource {
    async fn fetch_output(&mut self, request: &OutputRequest) -> Result<OutputRowset, BoxError> {
        tokio::task::yield_now().await;
        self.read(request)
    }

    async fn count_marked(
        &mut self,
        _request: &OutputRequest,
        marker: OutputMarker,
    ) -> Result<usize, BoxError> {
        self.count(marker)
    }
}
