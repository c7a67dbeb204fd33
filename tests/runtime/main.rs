//! Integration tests for Layer 3: Runtime
//!
//! Tests the block tree manager end to end: workflows, concurrency,
//! structural edits, and persistence.

mod concurrency;
mod workflow;

use plotline_runtime::{BlockTreeManager, TreeConfig};

/// Installs a test-writer subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A manager with reproducible ids.
pub fn seeded_manager() -> BlockTreeManager {
    init_tracing();
    BlockTreeManager::new(TreeConfig::deterministic(2024))
}
