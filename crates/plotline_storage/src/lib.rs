//! Entities, world snapshots, and game settings for plotline.
//!
//! This crate provides:
//! - [`Entity`] - Typed game objects with core and dynamic attributes
//! - [`WorldState`] - Entities grouped by kind, with cheap snapshots
//! - [`GameState`] - Flat per-block settings
//! - [`AtomicOperation`] - Create/modify/delete requests and their results

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod entity;
pub mod game_state;
pub mod operation;
pub mod world;

pub use entity::{CORE_ATTRIBUTES, ENTITY_ID, ENTITY_TYPE, Entity, IS_DESTROYED, QUANTITY};
pub use game_state::GameState;
pub use operation::{AtomicOperation, OperationResult, OperationResults};
pub use world::WorldState;
