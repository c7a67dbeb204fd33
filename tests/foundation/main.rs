//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: Value, Operator, Error, and persistent collections.

mod errors;
mod operators;
mod values;
