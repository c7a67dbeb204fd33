//! Integration tests for the Value type
//!
//! Tests conversions, typed extraction, and equality.

use plotline_foundation::{EntityKind, TypedId, Value};

#[test]
fn conversions() {
    assert_eq!(Value::from(3), Value::Int(3));
    assert_eq!(Value::from(true), Value::Bool(true));
    assert_eq!(Value::from(None::<i64>), Value::Null);
    assert_eq!(Value::from("x").as_str(), Some("x"));
    assert_eq!(Value::from(vec![1, 2]), Value::list([1, 2]));
}

#[test]
fn typed_extraction() {
    let v = Value::from(TypedId::place("tavern"));
    let id: TypedId = v.extract().unwrap();
    assert_eq!(id.kind, EntityKind::Place);
    assert_eq!(id.to_string(), "Place:tavern");
    assert_eq!(v.extract::<i64>(), None);
}

#[test]
fn floats_compare_by_bits() {
    assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    assert_ne!(Value::Float(0.0), Value::Float(-0.0));
}

#[test]
fn kinds_round_trip_through_text() {
    for kind in EntityKind::ALL {
        assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
    }
    assert!("Vehicle".parse::<EntityKind>().is_err());
}
