//! Story blocks and their lifecycle for plotline.
//!
//! This crate provides:
//! - [`Block`] and [`BlockId`] - Tree nodes holding content and world snapshots
//! - [`BlockStatus`] - A block paired with its [`Status`] and the transitions between statuses
//! - [`detect_conflicts`] - Overlap detection between workflow output and user edits

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod block;
pub mod conflict;
pub mod status;

pub use block::{Block, BlockId, METADATA_ERROR, METADATA_OUTPUT_VARIABLES};
pub use conflict::{Conflict, conflict_key, detect_conflicts, overlaps};
pub use status::{BlockStatus, Status, StatusCode, WorkflowOutcome};
