//! Tests for the value model

use chrono::NaiveDate;
use resilient_rdbc::{Row, Value};

#[test]
fn test_value_json_round_trip() {
    let values = vec![
        Value::Null,
        Value::Bool(true),
        Value::Int64(-42),
        Value::Float64(1.25),
        Value::String("hello".into()),
        Value::Bytes(vec![0xde, 0xad]),
        Value::Date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()),
    ];

    let json = serde_json::to_string(&values).unwrap();
    let back: Vec<Value> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, values);
}

#[test]
fn test_row_serializes_with_columns() {
    let row = Row::new(
        vec!["id".into(), "name".into()],
        vec![Value::Int64(7), Value::String("alice".into())],
    );

    let json = serde_json::to_value(&row).unwrap();
    assert_eq!(json["columns"][1], "name");
    assert_eq!(json["values"][0]["Int64"], 7);
}

#[test]
fn test_null_coalescing_from_option() {
    assert_eq!(Value::from(Some(5_i64)), Value::Int64(5));
    assert!(Value::from(None::<String>).is_null());
}
