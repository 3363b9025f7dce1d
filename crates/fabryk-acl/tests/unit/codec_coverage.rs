//! Key and field value normalization.

use fabryk_acl::{Value, Values};

#[test]
fn test_scalars_become_single_element_sequences() {
    assert_eq!(Values::from("read").encode(), vec!["read"]);
    assert_eq!(Values::from(7).encode(), vec!["7"]);
    assert_eq!(Values::from(Value::from(2.5)).encode(), vec!["2.5"]);
}

#[test]
fn test_sequences_keep_order() {
    let values = Values::from(vec!["write", "read", "admin"]);
    assert_eq!(values.encode(), vec!["write", "read", "admin"]);
}

#[test]
fn test_mixed_values_encode_as_text() {
    let values: Values = [Value::from("u1"), Value::from(42u64), Value::from(-3)]
        .into_iter()
        .collect();
    assert_eq!(values.encode(), vec!["u1", "42", "-3"]);
}

#[test]
fn test_duplicates_collapse_in_first_seen_order() {
    let values = Values::from(["read", "write", "read", "write", "admin"]);
    assert_eq!(values.len(), 5);
    assert_eq!(values.encode_unique(), vec!["read", "write", "admin"]);
}

#[test]
fn test_number_and_text_spellings_collide() {
    let values: Values = [Value::from(1), Value::from("1")].into_iter().collect();
    assert_eq!(values.encode_unique(), vec!["1"]);
}
