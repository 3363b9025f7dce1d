//! Transaction behavior seen from a backend.

use fabryk_acl::{Error, Transaction};
use std::sync::{Arc, Mutex};

fn recorder() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

fn push_record(tx: &mut Transaction, log: &Arc<Mutex<Vec<String>>>, label: &str) {
    let log = Arc::clone(log);
    let entry = label.to_string();
    tx.push(label, move || async move {
        log.lock().unwrap().push(entry);
        Ok(())
    });
}

#[tokio::test]
async fn test_operations_are_deferred_until_execute() {
    let log = recorder();
    let mut tx = Transaction::new();
    push_record(&mut tx, &log, "create-table acl_users");
    push_record(&mut tx, &log, "update-item acl_users/u1");

    assert!(log.lock().unwrap().is_empty());
    assert_eq!(
        tx.labels(),
        vec!["create-table acl_users", "update-item acl_users/u1"]
    );

    tx.execute().await.unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["create-table acl_users", "update-item acl_users/u1"]
    );
}

#[tokio::test]
async fn test_failure_in_the_middle_is_reported_last() {
    let log = recorder();
    let mut tx = Transaction::new();
    push_record(&mut tx, &log, "first");
    tx.push("second", || async {
        Err(Error::store("update-item", "conditional check failed"))
    });
    push_record(&mut tx, &log, "third");

    let err = tx.execute().await.unwrap_err();

    assert_eq!(*log.lock().unwrap(), vec!["first", "third"]);
    match err {
        Error::Store {
            operation, message, ..
        } => {
            assert_eq!(operation, "update-item");
            assert_eq!(message, "conditional check failed");
        }
        other => unreachable!("Expected Store error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_partial_failure_is_not_rolled_back() {
    let log = recorder();
    let mut tx = Transaction::new();
    push_record(&mut tx, &log, "applied");
    tx.push("broken", || async { Err(Error::table_not_found("acl_docs")) });

    assert!(tx.execute().await.is_err());
    assert_eq!(*log.lock().unwrap(), vec!["applied"]);
}

#[test]
fn test_debug_lists_labels() {
    let mut tx = Transaction::new();
    tx.push("batch-delete acl_users", || async { Ok(()) });
    assert_eq!(
        format!("{tx:?}"),
        r#"Transaction { steps: ["batch-delete acl_users"] }"#
    );
}
