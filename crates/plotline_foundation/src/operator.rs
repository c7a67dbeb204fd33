//! Modification operators and how they combine a value with a delta.
//!
//! [`apply`] is total: any pairing it does not support leaves the old value
//! unchanged and logs a warning.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::collections::{LtMap, LtVec};
use crate::error::Error;
use crate::value::Value;

/// How a modification combines the stored value with a delta.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operator {
    /// Replace the stored value.
    Equal,
    /// Sum, concatenate, append or merge.
    Add,
    /// Difference or removal.
    Subtract,
}

impl Operator {
    /// Returns the canonical textual form.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::Add => "+=",
            Self::Subtract => "-=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" => Ok(Self::Equal),
            "+=" | "+" => Ok(Self::Add),
            "-=" | "-" => Ok(Self::Subtract),
            other => Err(Error::bad_request(format!("unknown operator: {other:?}"))),
        }
    }
}

/// Combines `old` with `new` under `op`.
///
/// An absent old value always yields `new`, whatever the operator.
#[must_use]
pub fn apply(op: Operator, old: Option<&Value>, new: &Value) -> Value {
    let Some(old) = old else {
        return new.clone();
    };
    match op {
        Operator::Equal => new.clone(),
        Operator::Add => add(old, new),
        Operator::Subtract => subtract(old, new),
    }
}

fn add(old: &Value, delta: &Value) -> Value {
    match (old, delta) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map_or_else(|| unchanged(Operator::Add, old, delta), Value::Int),
        (Value::Float(a), Value::Float(b)) => finite_or_unchanged(a + b, Operator::Add, old, delta),
        (Value::String(a), Value::String(b)) => Value::from(format!("{a}{b}")),
        (Value::String(a), other) => Value::from(format!("{a}{other}")),
        (Value::List(list), Value::List(items)) => Value::List(list.concat(items)),
        (Value::List(list), item) => Value::List(list.push_back(item.clone())),
        (Value::Map(map), Value::Map(entries)) => {
            let mut merged = map.clone();
            for (key, value) in entries {
                if !merged.contains_key(key) {
                    merged.set(key.clone(), value.clone());
                }
            }
            Value::Map(merged)
        }
        _ => unchanged(Operator::Add, old, delta),
    }
}

fn subtract(old: &Value, delta: &Value) -> Value {
    match (old, delta) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_sub(*b)
            .map_or_else(|| unchanged(Operator::Subtract, old, delta), Value::Int),
        (Value::Float(a), Value::Float(b)) => finite_or_unchanged(a - b, Operator::Subtract, old, delta),
        (Value::List(list), Value::List(items)) => Value::List(
            list.iter()
                .filter(|item| !items.contains(item))
                .cloned()
                .collect::<LtVec<_>>(),
        ),
        (Value::List(list), item) => match list.position(item).and_then(|i| list.remove_at(i)) {
            Some(shorter) => Value::List(shorter),
            None => old.clone(),
        },
        (Value::Map(map), Value::String(key)) => Value::Map(map.remove(key.as_ref())),
        (Value::Map(map), Value::List(keys)) => Value::Map(remove_keys(map, keys)),
        _ => unchanged(Operator::Subtract, old, delta),
    }
}

fn remove_keys(map: &LtMap<Arc<str>, Value>, keys: &LtVec<Value>) -> LtMap<Arc<str>, Value> {
    let mut out = map.clone();
    for key in keys.iter().filter_map(Value::as_str) {
        out.take(key);
    }
    out
}

fn finite_or_unchanged(result: f64, op: Operator, old: &Value, delta: &Value) -> Value {
    if result.is_finite() {
        Value::Float(result)
    } else {
        unchanged(op, old, delta)
    }
}

fn unchanged(op: Operator, old: &Value, delta: &Value) -> Value {
    tracing::warn!(
        operator = %op,
        stored = old.type_name(),
        delta = delta.type_name(),
        "unsupported modification, value left unchanged"
    );
    old.clone()
}
