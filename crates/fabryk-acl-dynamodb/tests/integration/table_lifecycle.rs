//! Lazy table creation, the table registry and cleanup.

use fabryk_acl::{AclBackend, Error};
use fabryk_acl_dynamodb::{DynamoDbBackend, DynamoDbConfig, TableStore};
use std::sync::Arc;

use crate::common::{TestHarness, field_set};

#[tokio::test]
async fn test_table_created_once_across_many_adds() {
    let harness = TestHarness::new();
    for user in ["u1", "u2", "u3"] {
        harness.grant("users", user, "member").await;
    }
    harness.grant("allows_a", "u1", "x").await;
    harness.grant("allows_b", "u1", "y").await;

    assert_eq!(harness.store.create_table_calls(), 2);
    assert_eq!(
        harness.backend.tracked_tables(),
        vec!["acl_allows", "acl_users"]
    );
}

#[tokio::test]
async fn test_failed_creation_needs_explicit_forget() {
    let harness = TestHarness::new();
    harness.store.fail_operation("create-table");

    let mut tx = harness.backend.begin();
    harness
        .backend
        .add(&mut tx, "users", "u1".into(), "member".into())
        .unwrap();
    assert!(harness.backend.end(tx).await.is_err());
    harness.store.clear_failures();

    // Still registered: the retry skips creation and the update fails.
    let mut tx = harness.backend.begin();
    harness
        .backend
        .add(&mut tx, "users", "u1".into(), "member".into())
        .unwrap();
    let err = harness.backend.end(tx).await.unwrap_err();
    assert!(matches!(err, Error::TableNotFound { .. }));

    assert!(harness.backend.forget_table("acl_users"));
    harness.grant("users", "u1", "member").await;
    assert_eq!(harness.fields("users", "u1").await, field_set(&["member"]));
}

#[tokio::test]
async fn test_refresh_picks_up_existing_tables() {
    let harness = TestHarness::new();
    harness.grant("users", "u1", "member").await;
    harness.grant("allows_docs", "u1", "read").await;

    let restarted = DynamoDbBackend::new(
        Arc::clone(&harness.store) as Arc<dyn TableStore>,
        DynamoDbConfig::default().with_prefix("acl_"),
    )
    .unwrap();
    assert!(restarted.tracked_tables().is_empty());
    assert_eq!(restarted.refresh_tables().await.unwrap(), 2);

    let mut tx = restarted.begin();
    restarted
        .add(&mut tx, "users", "u2".into(), "member".into())
        .unwrap();
    assert_eq!(tx.len(), 1);
    restarted.end(tx).await.unwrap();
    assert_eq!(harness.store.create_table_calls(), 2);
}

#[tokio::test]
async fn test_clean_drops_every_tracked_table() {
    let harness = TestHarness::new();
    harness.grant("users", "u1", "member").await;
    harness.grant("roles", "admin", "all").await;
    harness.grant("allows_docs", "admin", "read").await;

    harness.backend.clean().await.unwrap();

    assert!(harness.store.table_names().is_empty());
    assert!(harness.backend.tracked_tables().is_empty());
    assert!(harness.fields("users", "u1").await.is_empty());

    harness.grant("users", "u1", "member").await;
    assert_eq!(harness.store.table_names(), vec!["acl_users"]);
}

#[tokio::test]
async fn test_transaction_reports_first_failure_after_running_all() {
    let harness = TestHarness::new();
    harness.grant("docs", "seed", "x").await;
    harness.store.fail_operation("batch-write-item");

    let mut tx = harness.backend.begin();
    harness
        .backend
        .add(&mut tx, "docs", "u1".into(), "read".into())
        .unwrap();
    harness.backend.del(&mut tx, "docs", "seed".into()).unwrap();
    harness
        .backend
        .add(&mut tx, "docs", "u2".into(), "write".into())
        .unwrap();
    let err = harness.backend.end(tx).await.unwrap_err();

    assert!(matches!(err, Error::Store { operation: "batch-write-item", .. }));
    assert_eq!(harness.fields("docs", "u1").await, field_set(&["read"]));
    assert_eq!(harness.fields("docs", "u2").await, field_set(&["write"]));
    assert_eq!(harness.fields("docs", "seed").await, field_set(&["x"]));
}
