//! Concurrent block tree management for plotline.
//!
//! This crate provides:
//! - [`BlockTreeManager`] - Owns a story's blocks and serializes access per block
//! - [`TreeConfig`] - Root id, id seeding and archive settings
//! - [`archive`] - JSON and `MessagePack` persistence of the whole tree

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod archive;
pub mod config;
pub mod ids;
pub mod locks;
pub mod manager;

pub use archive::Archive;
pub use config::{ARCHIVE_VERSION, ArchiveFormat, DEFAULT_ROOT_ID, TreeConfig};
pub use ids::IdGenerator;
pub use locks::{BlockGuard, LockTable};
pub use manager::{BlockTreeManager, NodeInfo};
