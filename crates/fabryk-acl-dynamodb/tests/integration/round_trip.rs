//! Read/write round trips through the `AclBackend` surface.

use fabryk_acl::{AclBackend, Error, Values};

use crate::common::{TestHarness, field_set};

#[tokio::test]
async fn test_add_then_get_returns_added_fields() {
    let harness = TestHarness::new();
    harness.grant("docs", "u1", ["read", "write"]).await;

    assert_eq!(harness.fields("docs", "u1").await, field_set(&["read", "write"]));
}

#[tokio::test]
async fn test_remove_drops_only_named_fields() {
    let harness = TestHarness::new();
    harness.grant("docs", "u1", ["read", "write"]).await;

    let mut tx = harness.backend.begin();
    harness
        .backend
        .remove(&mut tx, "docs", "u1".into(), "write".into())
        .unwrap();
    harness.backend.end(tx).await.unwrap();

    assert_eq!(harness.fields("docs", "u1").await, field_set(&["read"]));
}

#[tokio::test]
async fn test_numeric_keys_and_values_are_encoded_as_text() {
    let harness = TestHarness::new();
    harness.grant("meta", 42, [1, 2]).await;

    assert_eq!(harness.fields("meta", "42").await, field_set(&["1", "2"]));
}

#[tokio::test]
async fn test_union_merges_field_sets() {
    let harness = TestHarness::new();
    harness.grant("roles", "a", "x").await;
    harness.grant("roles", "b", "y").await;

    let fields = harness
        .backend
        .union("roles", ["a", "b"].into())
        .await
        .unwrap();
    assert_eq!(fields, field_set(&["x", "y"]));
}

#[tokio::test]
async fn test_reads_of_unknown_data_are_empty() {
    let harness = TestHarness::new();
    assert!(harness.fields("never_written", "u1").await.is_empty());
    assert!(
        harness
            .backend
            .union("never_written", ["a", "b"].into())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_del_removes_whole_keys() {
    let harness = TestHarness::new();
    harness.grant("users", "a", "x").await;
    harness.grant("users", "b", "y").await;
    harness.grant("users", "c", "z").await;

    let mut tx = harness.backend.begin();
    harness
        .backend
        .del(&mut tx, "users", ["a", "b"].into())
        .unwrap();
    harness.backend.end(tx).await.unwrap();

    assert!(harness.fields("users", "a").await.is_empty());
    assert_eq!(harness.fields("users", "c").await, field_set(&["z"]));
}

#[tokio::test(start_paused = true)]
async fn test_revoked_grant_is_gone_after_throttled_delete() {
    let harness = TestHarness::new();
    harness.grant("allows_admin", "editor", "delete").await;
    harness.store.throttle_batch_deletes(1);

    let mut tx = harness.backend.begin();
    harness
        .backend
        .del(&mut tx, "allows_admin", "editor".into())
        .unwrap();
    harness.backend.end(tx).await.unwrap();

    assert_eq!(harness.store.batch_delete_calls(), 2);
    assert!(harness.fields("allows_admin", "editor").await.is_empty());
}

#[tokio::test]
async fn test_allows_buckets_are_isolated_within_shared_table() {
    let harness = TestHarness::new();
    harness.grant("allows_blogs", "editor", "post").await;
    harness.grant("allows_admin", "editor", "ban").await;

    assert_eq!(harness.store.table_names(), vec!["acl_allows"]);
    assert_eq!(
        harness.fields("allows_blogs", "editor").await,
        field_set(&["post"])
    );
    assert_eq!(
        harness.fields("allows_admin", "editor").await,
        field_set(&["ban"])
    );
}

#[tokio::test]
async fn test_single_table_mode_keeps_buckets_apart() {
    let harness = TestHarness::single_table();
    harness.grant("users", "u1", "member").await;
    harness.grant("roles", "u1", "admin").await;
    harness.grant("allows_blogs", "u1", "edit").await;

    assert_eq!(harness.store.table_names(), vec!["acl_single_resources"]);
    assert_eq!(harness.store.item_count("acl_single_resources"), Some(3));
    assert_eq!(harness.fields("users", "u1").await, field_set(&["member"]));
    assert_eq!(harness.fields("roles", "u1").await, field_set(&["admin"]));

    let mut tx = harness.backend.begin();
    harness.backend.del(&mut tx, "users", "u1".into()).unwrap();
    harness.backend.end(tx).await.unwrap();
    assert!(harness.fields("users", "u1").await.is_empty());
    assert_eq!(harness.fields("roles", "u1").await, field_set(&["admin"]));
}

#[tokio::test]
async fn test_reserved_field_is_rejected_before_queueing() {
    let harness = TestHarness::new();
    let mut tx = harness.backend.begin();

    let err = harness
        .backend
        .add(&mut tx, "docs", "u1".into(), ["read", "key"].into())
        .unwrap_err();

    assert!(matches!(err, Error::ReservedAttribute { .. }));
    assert!(tx.is_empty());
    harness.backend.end(tx).await.unwrap();
    assert!(harness.store.table_names().is_empty());
}

#[tokio::test]
async fn test_empty_value_list_only_creates_the_table() {
    let harness = TestHarness::new();
    let mut tx = harness.backend.begin();
    harness
        .backend
        .add(&mut tx, "docs", "u1".into(), Values::new())
        .unwrap();
    assert_eq!(tx.labels(), vec!["create-table acl_docs"]);
    harness.backend.end(tx).await.unwrap();

    assert_eq!(harness.store.item_count("acl_docs"), Some(0));
}
