//! Plotline - Branching story trees of versioned world snapshots
//!
//! This crate re-exports all layers of the plotline system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: plotline_runtime    - Block tree manager, locks, persistence
//! Layer 2: plotline_block      - Blocks, status state machine, conflicts
//! Layer 1: plotline_storage    - Entities, world and game state, operations
//! Layer 0: plotline_foundation - Core types (Value, Operator, Error)
//! ```

pub use plotline_block as block;
pub use plotline_foundation as foundation;
pub use plotline_runtime as runtime;
pub use plotline_storage as storage;
