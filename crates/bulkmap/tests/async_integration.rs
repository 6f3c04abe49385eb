//! Integration tests for the suspending operation driver.

#![cfg(feature = "async")]

mod common;

use bulkmap::proto::OperationType;
use bulkmap::{BulkConfig, CancellationToken, Error, MappingResolver, PreparedOperation};
use common::{model, output, tickets, MemorySource};

fn output_config() -> BulkConfig {
    BulkConfig::builder()
        .set_output_identity(true)
        .calculate_stats(true)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_blocking_and_async_agree() {
    let model = model();
    let resolver = MappingResolver::new(&model).in_transaction(true);
    let config = output_config();

    let mut blocking = tickets();
    blocking[1].id = 5;
    let mut suspending = blocking.clone();

    let prepared =
        PreparedOperation::prepare(&resolver, &mut blocking, OperationType::InsertOrUpdate, &config).unwrap();
    let mut source = MemorySource {
        updated: 1,
        ..MemorySource::with_rows(output(5, 3))
    };
    let expected = prepared.complete(&mut blocking, &mut source).unwrap();

    let prepared =
        PreparedOperation::prepare(&resolver, &mut suspending, OperationType::InsertOrUpdate, &config).unwrap();
    let mut source = MemorySource {
        updated: 1,
        ..MemorySource::with_rows(output(5, 3))
    };
    let outcome = prepared
        .complete_async(&mut suspending, &mut source, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, expected);
    assert_eq!(suspending, blocking);
    // The existing row comes back first, then the new ones in batch order.
    assert_eq!(blocking.iter().map(|e| e.id).collect::<Vec<_>>(), vec![6, 5, 7]);
}

#[tokio::test]
async fn test_cancelled_before_read() {
    let model = model();
    let resolver = MappingResolver::new(&model);
    let mut entities = tickets();

    let prepared =
        PreparedOperation::prepare(&resolver, &mut entities, OperationType::Insert, &output_config()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut source = MemorySource::with_rows(output(1, 3));
    let err = prepared
        .complete_async(&mut entities, &mut source, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(source.requests.is_empty());
    assert!(entities.iter().all(|e| e.id == 0));
}
