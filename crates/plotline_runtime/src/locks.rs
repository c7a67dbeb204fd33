//! Per-block async locks.
//!
//! One `tokio::sync::Mutex` per block id, created on first use and removed
//! when the block is deleted. Table guards never outlive a lookup, so no
//! shard lock is held across an `.await`. A guard is only handed out for
//! the mutex currently in the table: a waiter whose entry was removed or
//! replaced while it waited goes round again.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use plotline_block::BlockId;

/// Proof that a block's lock is held.
pub type BlockGuard = OwnedMutexGuard<()>;

/// Lazily populated table of block locks.
#[derive(Debug, Default)]
pub struct LockTable {
    locks: DashMap<BlockId, Arc<Mutex<()>>>,
}

impl LockTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn handle(&self, id: &BlockId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(id.clone()).or_default().value())
    }

    /// Returns true if `guard` holds the table's current mutex for `id`.
    #[must_use]
    pub fn is_current(&self, id: &BlockId, guard: &BlockGuard) -> bool {
        self.locks
            .get(id)
            .is_some_and(|m| Arc::ptr_eq(m.value(), OwnedMutexGuard::mutex(guard)))
    }

    /// Waits for one block's lock.
    pub async fn lock(&self, id: &BlockId) -> BlockGuard {
        loop {
            let handle = self.handle(id);
            tracing::debug!(block_id = %id, "acquiring block lock");
            let guard = handle.lock_owned().await;
            if self.is_current(id, &guard) {
                return guard;
            }
            tracing::debug!(block_id = %id, "lock entry replaced while waiting, retrying");
        }
    }

    /// Waits for several blocks' locks, in ascending id order.
    ///
    /// Duplicate ids are locked once.
    pub async fn lock_many(&self, ids: impl IntoIterator<Item = BlockId>) -> Vec<BlockGuard> {
        let mut ids: Vec<BlockId> = ids.into_iter().collect();
        ids.sort();
        ids.dedup();
        let mut guards = Vec::with_capacity(ids.len());
        for id in &ids {
            guards.push(self.lock(id).await);
        }
        guards
    }

    /// Releases a lock and drops its entry, unless the entry has already
    /// been replaced by a newer mutex.
    pub fn discard(&self, id: &BlockId, guard: BlockGuard) {
        let mutex = Arc::clone(OwnedMutexGuard::mutex(&guard));
        self.locks.remove_if(id, |_, m| Arc::ptr_eq(m, &mutex));
        drop(guard);
    }

    /// Drops a block's lock entry.
    pub fn remove(&self, id: &BlockId) {
        self.locks.remove(id);
    }

    /// Keeps only the entries whose id satisfies `keep`.
    pub fn retain(&self, mut keep: impl FnMut(&BlockId) -> bool) {
        self.locks.retain(|id, _| keep(id));
    }

    /// Returns the number of lock entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns true if no lock has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
