//! Integration tests for Layer 1: Storage
//!
//! Tests for entities, world snapshots, game settings, and atomic operations.

mod game_state;
mod world;
