//! Batched reads under partial responses from the store.

use fabryk_acl::{AclBackend, Error};
use fabryk_acl_dynamodb::{DynamoDbConfig, MemoryTableStore};
use std::time::Duration;
use tokio::time::Instant;

use crate::common::{TestHarness, field_set};

#[tokio::test(start_paused = true)]
async fn test_union_retries_throttled_round_once() {
    let harness = TestHarness::new();
    harness.grant("roles", "a", "x").await;
    harness.grant("roles", "b", "y").await;
    harness.store.throttle_batch_reads(1);

    let start = Instant::now();
    let fields = harness
        .backend
        .union("roles", ["a", "b"].into())
        .await
        .unwrap();

    assert_eq!(fields, field_set(&["x", "y"]));
    assert_eq!(harness.store.batch_read_calls(), 2);
    assert!(start.elapsed() >= Duration::from_secs(1));
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_union_collects_partial_responses() {
    let harness = TestHarness::with_store(
        MemoryTableStore::new().with_batch_read_limit(2),
        DynamoDbConfig::default(),
    );
    for (key, field) in [("a", "p"), ("b", "q"), ("c", "r"), ("d", "s"), ("e", "t")] {
        harness.grant("groups", key, field).await;
    }

    let fields = harness
        .backend
        .union("groups", ["a", "b", "c", "d", "e"].into())
        .await
        .unwrap();

    assert_eq!(fields, field_set(&["p", "q", "r", "s", "t"]));
    assert_eq!(harness.store.batch_read_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_ceiling_surfaces_exhaustion() {
    let harness = TestHarness::with_config(
        DynamoDbConfig::default()
            .with_retry_base_delay(Duration::from_millis(10))
            .with_max_batch_retries(Some(3)),
    );
    harness.grant("roles", "a", "x").await;
    harness.store.throttle_batch_reads(100);

    let err = harness
        .backend
        .union("roles", "a".into())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(harness.store.batch_read_calls(), 4);
}

#[tokio::test]
async fn test_store_failure_is_passed_through() {
    let harness = TestHarness::new();
    harness.grant("roles", "a", "x").await;
    harness.store.fail_operation("batch-get-item");

    let err = harness
        .backend
        .union("roles", "a".into())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store { operation: "batch-get-item", .. }));
}
