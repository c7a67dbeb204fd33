//! Core types, values, and persistent collections for plotline.
//!
//! This crate provides:
//! - [`Value`] - The tagged value type for attributes and settings
//! - [`EntityKind`] and [`TypedId`] - Entity kinds and typed references
//! - [`Operator`] and [`apply`] - How modifications combine values
//! - [`Error`] - Rich error types with stable codes
//! - Persistent collections ([`LtVec`], [`LtMap`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collections;
pub mod entity;
pub mod error;
pub mod operator;
pub mod value;

pub use collections::{LtMap, LtVec};
pub use entity::{EntityKind, TypedId};
pub use error::{Error, ErrorCode, ErrorContext, ErrorKind};
pub use operator::{Operator, apply};
pub use value::{FromValue, Value};

/// Result type for plotline operations.
pub type Result<T> = std::result::Result<T, Error>;
