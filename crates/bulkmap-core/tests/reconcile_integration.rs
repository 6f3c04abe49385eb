//! Integration tests for placeholder assignment and output reconciliation.

mod common;

use std::collections::HashSet;

use bulkmap_core::proto::{OperationType, OutputRowset, Value};
use bulkmap_core::{
    assign_placeholders, merge_read_entities, reset_placeholders, BulkConfig, DataShapeError, Error,
    MappingResolver, Model, OrderPlan, Reconciler, ResolvedMapping, StatsInfo,
};
use common::{model, output_rows, postgres_model, Order};

fn resolve(
    model: &Model,
    entities: &[Order],
    operation: OperationType,
    config: &BulkConfig,
) -> ResolvedMapping<Order> {
    MappingResolver::new(model)
        .with_type_name("Order")
        .in_transaction(true)
        .resolve(entities, operation, config)
        .unwrap()
}

fn output_config() -> BulkConfig {
    BulkConfig::builder().set_output_identity(true).build().unwrap()
}

fn batch() -> Vec<Order> {
    vec![Order::new("a", 1), Order::new("b", 2), Order::new("c", 3)]
}

#[test]
fn test_insert_identity_round_trip() {
    common::init_tracing();
    let model = model();
    let mut entities = batch();
    let mapping = resolve(&model, &entities, OperationType::Insert, &output_config());

    let plan = assign_placeholders(&mapping, &mut entities).unwrap();
    assert!(plan.placeholders_assigned);
    assert!(plan.sorted.is_none());
    assert_eq!(entities.iter().map(|e| e.id).collect::<Vec<_>>(), vec![-3, -2, -1]);

    let rows = output_rows(&[(101, 1, 10, 1), (102, 1, 20, 2), (103, 1, 30, 3)]);
    let result = Reconciler::new(&mapping).merge(&mut entities, &rows, &plan).unwrap();
    assert_eq!(result.applied, 3);
    assert!(result.timestamp_info.is_none());

    for (i, entity) in entities.iter().enumerate() {
        let n = i as i64 + 1;
        assert_eq!(entity.id, 100 + n);
        assert_eq!(entity.status, 1);
        assert_eq!(entity.total, 10 * n);
        assert_eq!(entity.version, vec![0, 0, 0, n as u8]);
    }
    assert_eq!(entities[1].code, "b");
}

#[test]
fn test_placeholders_are_distinct_and_negative() {
    let model = model();
    let mut entities = vec![
        Order::new("a", 1),
        Order::new("b", 1).with_id(7),
        Order::new("c", 1),
        Order::new("d", 1),
        Order::new("e", 1).with_id(8),
    ];
    let mapping = resolve(&model, &entities, OperationType::Insert, &output_config());

    assign_placeholders(&mapping, &mut entities).unwrap();
    let placeholders: Vec<i64> = entities.iter().map(|e| e.id).filter(|id| *id < 0).collect();
    assert_eq!(placeholders.len(), 3);
    assert_eq!(placeholders.iter().collect::<HashSet<_>>().len(), 3);
    assert!(placeholders.iter().all(|id| *id >= -(entities.len() as i64)));
    assert_eq!(entities[1].id, 7);
    assert_eq!(entities[4].id, 8);

    assert_eq!(reset_placeholders(&mapping, &mut entities).unwrap(), 3);
    assert_eq!(
        entities.iter().map(|e| e.id).collect::<Vec<_>>(),
        vec![0, 7, 0, 0, 8]
    );
}

#[test]
fn test_preset_identities_skip_placeholders() {
    let model = model();
    let mut entities = vec![Order::new("a", 1).with_id(5), Order::new("b", 1).with_id(6)];
    let mapping = resolve(&model, &entities, OperationType::Insert, &output_config());

    let plan = assign_placeholders(&mapping, &mut entities).unwrap();
    assert_eq!(plan, OrderPlan::unchanged());
    assert_eq!(entities[0].id, 5);
    assert_eq!(entities[1].id, 6);

    let mut single = vec![Order::new("a", 1)];
    let plan = assign_placeholders(&mapping, &mut single).unwrap();
    assert!(!plan.placeholders_assigned);
    assert_eq!(single[0].id, 0);
}

#[test]
fn test_short_output_is_reported() {
    common::init_tracing();
    let model = model();
    let mut entities = batch();
    let mapping = resolve(&model, &entities, OperationType::Insert, &output_config());
    let plan = assign_placeholders(&mapping, &mut entities).unwrap();

    let rows = output_rows(&[(101, 1, 10, 1), (102, 1, 20, 2)]);
    let result = Reconciler::new(&mapping).merge(&mut entities, &rows, &plan).unwrap();
    assert_eq!(result.applied, 0);
    let info = result.timestamp_info.unwrap();
    assert_eq!(info.skipped_for_update, 1);
    assert_eq!(info.output.len(), 2);
    assert!(entities.iter().all(|e| e.id < 0 && e.version.is_empty()));

    assert_eq!(reset_placeholders(&mapping, &mut entities).unwrap(), 3);
    assert!(entities.iter().all(|e| e.id == 0));
}

#[test]
fn test_upsert_output_order() {
    let model = model();
    let mut entities = vec![
        Order::new("a", 1).with_id(9),
        Order::new("b", 1),
        Order::new("c", 1).with_id(4),
    ];
    let mapping = resolve(&model, &entities, OperationType::InsertOrUpdate, &output_config());

    let plan = assign_placeholders(&mapping, &mut entities).unwrap();
    assert_eq!(plan.sorted, Some(vec![2, 0, 1]));
    assert_eq!(entities[1].id, -3);

    // Existing rows by identity, then the inserted row.
    let rows = output_rows(&[(4, 1, 10, 1), (9, 1, 10, 2), (50, 1, 10, 3)]);
    let result = Reconciler::new(&mapping).merge(&mut entities, &rows, &plan).unwrap();
    assert_eq!(result.applied, 3);
    assert_eq!(entities[0].id, 9);
    assert_eq!(entities[1].id, 50);
    assert_eq!(entities[2].id, 4);
    assert_eq!(entities[1].version, vec![0, 0, 0, 3]);
    assert_eq!(entities[0].version, vec![0, 0, 0, 2]);
}

#[test]
fn test_upsert_rejects_duplicate_identities() {
    let model = model();
    let mut entities = vec![
        Order::new("a", 1).with_id(4),
        Order::new("b", 1).with_id(4),
        Order::new("c", 1),
    ];
    let mapping = resolve(&model, &entities, OperationType::InsertOrUpdate, &output_config());
    let err = assign_placeholders(&mapping, &mut entities).unwrap_err();
    assert!(matches!(err, Error::DataShape(DataShapeError::DuplicateKey(_))));
}

#[test]
fn test_lookup_by_update_by_properties() {
    let model = model();
    let config = BulkConfig::builder()
        .set_output_identity(true)
        .update_by(["Code"])
        .build()
        .unwrap();
    let mut entities = batch();
    let mapping = resolve(&model, &entities, OperationType::InsertOrUpdate, &config);

    let plan = assign_placeholders(&mapping, &mut entities).unwrap();
    assert!(!plan.placeholders_assigned);

    let rows = OutputRowset::from_rows(
        &["Id", "Code"],
        vec![
            vec![Value::Int64(31), Value::from("c")],
            vec![Value::Int64(11), Value::from("a")],
            vec![Value::Int64(99), Value::from("zz")],
            vec![Value::Int64(21), Value::from("b")],
        ],
    )
    .unwrap();
    let result = Reconciler::new(&mapping).merge(&mut entities, &rows, &plan).unwrap();
    assert_eq!(result.applied, 3);
    assert_eq!(
        entities.iter().map(|e| e.id).collect::<Vec<_>>(),
        vec![11, 21, 31]
    );

    let mut duplicated = vec![Order::new("a", 1), Order::new("a", 2)];
    let rows = OutputRowset::from_rows(
        &["Id", "Code"],
        vec![
            vec![Value::Int64(1), Value::from("a")],
            vec![Value::Int64(2), Value::from("a")],
        ],
    )
    .unwrap();
    let err = Reconciler::new(&mapping)
        .merge(&mut duplicated, &rows, &OrderPlan::unchanged())
        .unwrap_err();
    assert!(matches!(err, Error::DataShape(DataShapeError::DuplicateKey(_))));
}

#[test]
fn test_records_carry_key_signatures() {
    let model = model();
    let mut entities = batch();
    let mapping = resolve(&model, &entities, OperationType::Insert, &output_config());
    let plan = assign_placeholders(&mapping, &mut entities).unwrap();

    let rows = output_rows(&[(101, 1, 10, 1), (102, 1, 20, 2), (103, 1, 30, 3)]);
    let records = Reconciler::new(&mapping).records(&entities, &rows, &plan).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].original_index, 2);
    assert_eq!(records[2].key_signature, "103");
    assert_eq!(records[2].identity, Some(Value::Int64(103)));
    assert!(records[2]
        .computed
        .iter()
        .any(|(p, v)| p == "Total" && *v == Value::Int64(30)));
}

#[test]
fn test_replace_when_order_not_preserved() {
    let model = model();
    let config = BulkConfig::builder()
        .set_output_identity(true)
        .preserve_insert_order(false)
        .build()
        .unwrap();
    let mut entities = batch();
    let mapping = resolve(&model, &entities, OperationType::Insert, &config);

    let plan = assign_placeholders(&mapping, &mut entities).unwrap();
    assert!(!plan.placeholders_assigned);

    let rows = OutputRowset::from_rows(
        &["Id", "Code", "Quantity", "Shipping_Street", "Version"],
        vec![
            vec![
                Value::Int64(12),
                Value::from("b"),
                Value::Int32(2),
                Value::from("Elm"),
                Value::Bytes(vec![1]),
            ],
            vec![
                Value::Int64(11),
                Value::from("a"),
                Value::Int32(1),
                Value::from("Oak"),
                Value::Bytes(vec![2]),
            ],
        ],
    )
    .unwrap();
    let result = Reconciler::new(&mapping).reconcile(&mut entities, &rows, &plan).unwrap();
    assert_eq!(result.applied, 2);
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0].id, 12);
    assert_eq!(entities[0].code, "b");
    assert_eq!(entities[0].street, "Elm");
    assert_eq!(entities[1].quantity, 1);
    assert_eq!(entities[1].version, vec![2]);
}

fn stored(id: i64, code: &str) -> Order {
    Order {
        quantity: 5,
        status: 2,
        placed: 1_000,
        street: "Main".to_string(),
        ..Order::new(code, 0).with_id(id)
    }
}

#[test]
fn test_read_merge_by_key() {
    let model = model();
    let mut entities = vec![
        Order::default().with_id(2),
        Order::default().with_id(1),
        Order::default().with_id(99),
    ];
    let mapping = resolve(&model, &entities, OperationType::Read, &BulkConfig::default());
    let existing = vec![stored(1, "one"), stored(2, "two")];

    let merged = merge_read_entities(&mapping, &mut entities, &existing).unwrap();
    assert_eq!(merged, 2);
    assert_eq!(entities[0].code, "two");
    assert_eq!(entities[1].code, "one");
    assert_eq!(entities[1].quantity, 5);
    assert_eq!(entities[1].placed, 1_000);
    assert_eq!(entities[2], Order::default().with_id(99));
    // Inline owned members are copied even though only the key was loaded.
    assert_eq!(entities[0].street, "Main");
    assert_eq!(entities[1].street, "Main");
    assert_eq!(entities[2].street, "");
}

#[test]
fn test_read_merge_positional_fallback() {
    let model = postgres_model();
    let mut entities = vec![
        Order::default().with_id(2),
        Order::default().with_id(1),
        Order::default().with_id(99),
    ];
    let mapping = resolve(&model, &entities, OperationType::Read, &BulkConfig::default());
    let existing = vec![stored(1, "one"), stored(2, "two"), stored(3, "three")];

    let merged = merge_read_entities(&mapping, &mut entities, &existing).unwrap();
    assert_eq!(merged, 3);
    assert_eq!(entities[2].id, 3);
    assert_eq!(entities[2].code, "three");
}

#[test]
fn test_stats_from_marker_counts() {
    let stats = StatsInfo::from_counts(10, 4, 1);
    assert_eq!(
        stats,
        StatsInfo {
            inserted: 5,
            updated: 4,
            deleted: 1
        }
    );
    assert_eq!(StatsInfo::from_counts(1, 1, 1).inserted, 0);
}
