//! Integration tests for operator semantics
//!
//! Tests how Equal, Add and Subtract combine stored values with deltas.

use plotline_foundation::{Operator, TypedId, Value, apply};
use proptest::prelude::*;

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn parses_short_and_long_forms() {
    assert_eq!(" = ".parse::<Operator>().unwrap(), Operator::Equal);
    assert_eq!("+".parse::<Operator>().unwrap(), Operator::Add);
    assert_eq!("+=".parse::<Operator>().unwrap(), Operator::Add);
    assert_eq!("-=".parse::<Operator>().unwrap(), Operator::Subtract);
    assert!("*=".parse::<Operator>().is_err());
}

// =============================================================================
// Scalars
// =============================================================================

#[test]
fn absent_old_value_takes_delta() {
    for op in [Operator::Equal, Operator::Add, Operator::Subtract] {
        assert_eq!(apply(op, None, &Value::Int(5)), Value::Int(5));
    }
}

#[test]
fn numbers() {
    assert_eq!(apply(Operator::Add, Some(&Value::Int(10)), &Value::Int(5)), Value::Int(15));
    assert_eq!(apply(Operator::Subtract, Some(&Value::Int(10)), &Value::Int(15)), Value::Int(-5));
    assert_eq!(
        apply(Operator::Add, Some(&Value::Float(1.5)), &Value::Float(1.0)),
        Value::Float(2.5)
    );
}

#[test]
fn overflow_leaves_value_unchanged() {
    let max = Value::Int(i64::MAX);
    assert_eq!(apply(Operator::Add, Some(&max), &Value::Int(1)), max);
}

#[test]
fn strings_concatenate() {
    let old = Value::from("gold: ");
    assert_eq!(apply(Operator::Add, Some(&old), &Value::from("many")), Value::from("gold: many"));
    assert_eq!(apply(Operator::Add, Some(&old), &Value::Int(3)), Value::from("gold: 3"));
}

#[test]
fn mismatched_types_are_a_no_op() {
    let old = Value::Bool(true);
    assert_eq!(apply(Operator::Add, Some(&old), &Value::Int(1)), old);
    assert_eq!(apply(Operator::Subtract, Some(&Value::from("abc")), &Value::from("c")), Value::from("abc"));
}

// =============================================================================
// Collections
// =============================================================================

#[test]
fn list_add_and_subtract() {
    let bag = Value::list(["torch", "rope", "torch"]);
    assert_eq!(
        apply(Operator::Add, Some(&bag), &Value::from("map")),
        Value::list(["torch", "rope", "torch", "map"])
    );
    assert_eq!(
        apply(Operator::Subtract, Some(&bag), &Value::from("torch")),
        Value::list(["rope", "torch"])
    );
    assert_eq!(
        apply(Operator::Subtract, Some(&bag), &Value::list(["torch"])),
        Value::list(["rope"])
    );
}

#[test]
fn list_holds_references() {
    let party = Value::list([Value::from(TypedId::character("alice"))]);
    let joined = apply(Operator::Add, Some(&party), &Value::from(TypedId::character("bob")));
    assert_eq!(joined.as_list().map(|l| l.len()), Some(2));
}

#[test]
fn map_add_keeps_existing_keys() {
    let old = Value::map([("hp", 10)]);
    let merged = apply(Operator::Add, Some(&old), &Value::map([("hp", 99), ("mp", 5)]));
    assert_eq!(merged, Value::map([("hp", 10), ("mp", 5)]));
}

#[test]
fn map_subtract_removes_keys() {
    let old = Value::map([("a", 1), ("b", 2), ("c", 3)]);
    assert_eq!(apply(Operator::Subtract, Some(&old), &Value::from("a")), Value::map([("b", 2), ("c", 3)]));
    assert_eq!(
        apply(Operator::Subtract, Some(&old), &Value::list(["a", "c"])),
        Value::map([("b", 2)])
    );
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn add_grows_list_by_one(items in prop::collection::vec(0_i64..50, 0..20), x in 50_i64..100) {
        let list = Value::list(items.clone());
        let grown = apply(Operator::Add, Some(&list), &Value::Int(x));
        prop_assert_eq!(grown.as_list().map(|l| l.len()), Some(items.len() + 1));

        let back = apply(Operator::Subtract, Some(&grown), &Value::Int(x));
        prop_assert_eq!(back, list);
    }

    #[test]
    fn equal_replaces(old in any::<i64>(), new in any::<i64>()) {
        prop_assert_eq!(apply(Operator::Equal, Some(&Value::Int(old)), &Value::Int(new)), Value::Int(new));
    }
}
