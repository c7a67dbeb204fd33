//! The block tree manager.
//!
//! [`BlockTreeManager`] owns every block of one story, keyed by id, plus
//! the super-root. Each operation takes the lock of the block it touches
//! and holds it only for the transition; structural edits take every lock
//! they need up front in ascending id order, then re-check the tree and
//! fail closed if it moved underneath them.
//!
//! Workflows run outside the manager. A caller creates a Loading child,
//! runs the workflow with no lock held, then reports back through
//! [`BlockTreeManager::handle_workflow_completion`].

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use plotline_block::{BlockId, BlockStatus, METADATA_OUTPUT_VARIABLES, StatusCode, WorkflowOutcome};
use plotline_foundation::{Error, ErrorContext, ErrorKind, LtMap, Result, Value};
use plotline_storage::{AtomicOperation, OperationResult};

use crate::archive::{self, Archive};
use crate::config::TreeConfig;
use crate::ids::IdGenerator;
use crate::locks::{BlockGuard, LockTable};

/// Topology of one block, without its world snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeInfo {
    /// Block id.
    pub id: BlockId,
    /// Parent id, `None` for the super-root.
    pub parent: Option<BlockId>,
    /// Child ids in insertion order.
    pub children: Vec<BlockId>,
    /// Current status.
    pub status: StatusCode,
}

/// Concurrent owner of a story's block tree.
#[derive(Debug)]
pub struct BlockTreeManager {
    config: TreeConfig,
    blocks: DashMap<BlockId, BlockStatus>,
    locks: LockTable,
    // Held, never across an await, while links are re-checked and rewritten.
    structure: Mutex<()>,
    ids: IdGenerator,
}

impl Default for BlockTreeManager {
    fn default() -> Self {
        Self::new(TreeConfig::default())
    }
}

fn within<'a>(operation: &'static str, id: &'a BlockId) -> impl FnOnce(Error) -> Error + 'a {
    move |e| e.with_context(ErrorContext::new().with_operation(operation).with_block(id.as_str()))
}

impl BlockTreeManager {
    /// Creates a tree holding only the super-root.
    #[must_use]
    pub fn new(config: TreeConfig) -> Self {
        let manager = Self {
            ids: IdGenerator::new(config.id_seed),
            blocks: DashMap::new(),
            locks: LockTable::new(),
            structure: Mutex::new(()),
            config,
        };
        manager.install_root();
        manager
    }

    fn install_root(&self) {
        let root_id = self.config.root_id.clone();
        self.blocks.insert(root_id.clone(), BlockStatus::root(root_id));
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Returns the super-root id.
    #[must_use]
    pub const fn root_id(&self) -> &BlockId {
        &self.config.root_id
    }

    /// Returns the number of blocks, the super-root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns true if the tree holds no blocks, which never happens once built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns true if the block exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    /// Returns every block id in ascending order.
    #[must_use]
    pub fn block_ids(&self) -> Vec<BlockId> {
        let mut ids: Vec<BlockId> = self.blocks.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Returns the topology of every block, ordered by id.
    #[must_use]
    pub fn nodes(&self) -> Vec<NodeInfo> {
        let mut nodes: Vec<NodeInfo> = self
            .blocks
            .iter()
            .map(|e| NodeInfo {
                id: e.key().clone(),
                parent: e.block().parent_id().cloned(),
                children: e.block().children().to_vec(),
                status: e.code(),
            })
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    fn is_root(&self, id: &BlockId) -> bool {
        *id == self.config.root_id
    }

    fn code_of(&self, id: &BlockId) -> Result<StatusCode> {
        self.blocks
            .get(id)
            .map(|e| e.code())
            .ok_or_else(|| Error::not_found(id.as_str()))
    }

    /// Runs `f` on a block. The caller must hold the block's lock, and `f`
    /// must not touch the block map.
    fn with_block<T>(&self, id: &BlockId, f: impl FnOnce(&mut BlockStatus) -> Result<T>) -> Result<T> {
        let mut entry = self
            .blocks
            .get_mut(id)
            .ok_or_else(|| Error::not_found(id.as_str()))?;
        f(&mut entry)
    }

    /// Takes an existing block's lock. A missing block, or one deleted while
    /// waiting, is `NotFound` and leaves no lock entry behind.
    async fn lock_block(&self, id: &BlockId) -> Result<BlockGuard> {
        if !self.contains(id.as_str()) {
            return Err(Error::not_found(id.as_str()));
        }
        let guard = self.locks.lock(id).await;
        if self.contains(id.as_str()) {
            Ok(guard)
        } else {
            self.locks.discard(id, guard);
            Err(Error::not_found(id.as_str()))
        }
    }

    /// Drops the lock entries of blocks that no longer exist.
    fn prune_locks<'a>(&self, ids: impl IntoIterator<Item = &'a BlockId>) {
        for id in ids {
            if !self.contains(id.as_str()) {
                self.locks.remove(id);
            }
        }
    }

    fn unused_id(&self, id: BlockId) -> Result<BlockId> {
        if self.blocks.contains_key(&id) {
            tracing::error!(block_id = %id, "generated block id already exists");
            return Err(Error::internal(format!("generated block id {id} already exists")));
        }
        Ok(id)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Returns a snapshot of a block taken under its lock.
    pub async fn get_block(&self, id: &BlockId) -> Option<BlockStatus> {
        let _guard = self.lock_block(id).await.ok()?;
        self.blocks.get(id).map(|e| e.value().clone())
    }

    /// Returns the active branch through `start`, root first.
    ///
    /// Walks down from `start` taking the last child at each step, then up
    /// to the root. An unknown start, a dangling link or a cycle yields an
    /// empty path.
    #[must_use]
    pub fn get_path_to_root(&self, start: &BlockId) -> Vec<BlockId> {
        if !self.contains(start.as_str()) {
            tracing::warn!(block_id = %start, "path requested for unknown block");
            return Vec::new();
        }

        let mut visited = HashSet::from([start.clone()]);
        let mut leaf = start.clone();
        loop {
            let next = match self.blocks.get(&leaf) {
                Some(entry) => entry.block().last_child().cloned(),
                None => {
                    tracing::error!(block_id = %leaf, "dangling child link");
                    return Vec::new();
                }
            };
            let Some(child) = next else { break };
            if !visited.insert(child.clone()) {
                tracing::error!(block_id = %child, "cycle while descending");
                return Vec::new();
            }
            leaf = child;
        }

        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(leaf);
        while let Some(id) = cursor {
            if !seen.insert(id.clone()) {
                tracing::error!(block_id = %id, "cycle while ascending");
                return Vec::new();
            }
            cursor = match self.blocks.get(&id) {
                Some(entry) => entry.block().parent_id().cloned(),
                None => {
                    tracing::error!(block_id = %id, "dangling parent link");
                    return Vec::new();
                }
            };
            path.push(id);
        }
        path.reverse();
        path
    }

    /// Returns every descendant of a block, breadth first.
    #[must_use]
    pub fn find_all_descendants(&self, id: &BlockId) -> Vec<BlockId> {
        let mut found = Vec::new();
        let mut visited = HashSet::from([id.clone()]);
        let mut queue = VecDeque::from([id.clone()]);
        while let Some(current) = queue.pop_front() {
            let children = match self.blocks.get(&current) {
                Some(entry) => entry.block().children().to_vec(),
                None => {
                    tracing::error!(block_id = %current, "dangling child link");
                    continue;
                }
            };
            for child in children {
                if visited.insert(child.clone()) {
                    found.push(child.clone());
                    queue.push_back(child);
                }
            }
        }
        found
    }

    // =========================================================================
    // Block lifecycle
    // =========================================================================

    /// Creates a Loading child under `parent`, or under the super-root.
    ///
    /// # Errors
    ///
    /// `NotFound` if the parent is missing, `InvalidState` unless it is Idle.
    pub async fn create_child(
        &self,
        parent: Option<&BlockId>,
        params: LtMap<Arc<str>, Value>,
    ) -> Result<BlockStatus> {
        let parent_id = parent.unwrap_or(&self.config.root_id).clone();
        if !params.values().all(Value::is_finite) {
            return Err(within("create_child", &parent_id)(Error::bad_request(
                "child parameters hold a non-finite float",
            )));
        }

        let _parent_guard = self
            .lock_block(&parent_id)
            .await
            .map_err(within("create_child", &parent_id))?;
        let child_id = self
            .unused_id(self.ids.child_id())
            .map_err(within("create_child", &parent_id))?;
        let child = self
            .with_block(&parent_id, |parent| parent.spawn_child(child_id.clone(), params))
            .map_err(within("create_child", &parent_id))?;

        // The child is unreachable until inserted, so its lock is free
        let _child_guard = self.locks.lock(&child_id).await;
        self.blocks.insert(child_id.clone(), child.clone());
        tracing::info!(block_id = %child_id, parent_id = %parent_id, "child block created");
        Ok(child)
    }

    /// Applies user edits, or queues them while a workflow runs.
    ///
    /// Returns the per-operation results and the status they were routed by.
    ///
    /// # Errors
    ///
    /// `NotFound` if the block is missing, `InvalidState` in Conflict or Error.
    pub async fn enqueue_or_execute_atomic_operations(
        &self,
        id: &BlockId,
        ops: &[AtomicOperation],
    ) -> Result<(Vec<OperationResult>, StatusCode)> {
        let _guard = self
            .lock_block(id)
            .await
            .map_err(within("enqueue_or_execute_atomic_operations", id))?;
        self.with_block(id, |block| {
            let results = block.apply_operations(ops)?;
            Ok((results, block.code()))
        })
        .map_err(within("enqueue_or_execute_atomic_operations", id))
    }

    /// Edits an Idle block's content and metadata.
    ///
    /// A `None` metadata value removes the key.
    ///
    /// # Errors
    ///
    /// `NotFound` if the block is missing, `InvalidState` unless it is Idle.
    pub async fn update_block_details(
        &self,
        id: &BlockId,
        content: Option<String>,
        metadata: Option<BTreeMap<String, Option<String>>>,
    ) -> Result<()> {
        let _guard = self.lock_block(id).await.map_err(within("update_block_details", id))?;
        self.with_block(id, |status| {
            if status.code() != StatusCode::Idle {
                return Err(Error::invalid_state(id.as_str(), status.code(), "update block details"));
            }
            let block = status.block_mut();
            if let Some(content) = content {
                block.set_content(content);
            }
            for (key, value) in metadata.into_iter().flatten() {
                match value {
                    Some(value) => block.metadata_mut().insert(key, Some(value)),
                    None => block.metadata_mut().remove(&key),
                };
            }
            Ok(())
        })
        .map_err(within("update_block_details", id))
    }

    /// Writes game settings. Allowed in every status.
    ///
    /// # Errors
    ///
    /// `NotFound` if the block is missing.
    pub async fn update_game_state<K, I>(&self, id: &BlockId, updates: I) -> Result<()>
    where
        K: Into<Arc<str>>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let updates: Vec<(Arc<str>, Value)> = updates.into_iter().map(|(k, v)| (k.into(), v)).collect();
        if let Some((key, _)) = updates.iter().find(|(_, v)| !v.is_finite()) {
            return Err(within("update_game_state", id)(Error::bad_request(format!(
                "setting {key} holds a non-finite float"
            ))));
        }
        let _guard = self.lock_block(id).await.map_err(within("update_game_state", id))?;
        self.with_block(id, |status| {
            let game_state = status.block_mut().game_state_mut();
            for (key, value) in updates {
                game_state.set(key, value);
            }
            Ok(())
        })
        .map_err(within("update_game_state", id))
    }

    /// Records a workflow's result for a Loading block.
    ///
    /// On success the output variables are stored as JSON text under
    /// [`METADATA_OUTPUT_VARIABLES`]. A completion for a block that is no
    /// longer Loading is stale and rejected.
    ///
    /// # Errors
    ///
    /// `NotFound` if the block is missing, `InvalidState` unless it is
    /// Loading, or a serialization error for unencodable output variables.
    pub async fn handle_workflow_completion(
        &self,
        id: &BlockId,
        success: bool,
        content: String,
        commands: Vec<AtomicOperation>,
        output_variables: Option<serde_json::Value>,
    ) -> Result<WorkflowOutcome> {
        let _guard = self
            .lock_block(id)
            .await
            .map_err(within("handle_workflow_completion", id))?;
        self.with_block(id, |status| {
            if status.code() != StatusCode::Loading {
                tracing::warn!(block_id = %id, status = %status.code(), "discarding stale workflow completion");
                return Err(Error::invalid_state(id.as_str(), status.code(), "complete workflow"));
            }
            if success {
                if let Some(vars) = output_variables {
                    let text = serde_json::to_string(&vars)
                        .map_err(|e| Error::new(ErrorKind::Serialization(e.to_string())))?;
                    status
                        .block_mut()
                        .metadata_mut()
                        .insert(METADATA_OUTPUT_VARIABLES.to_string(), Some(text));
                }
            }
            status.complete_workflow(success, content, commands)
        })
        .map_err(within("handle_workflow_completion", id))
    }

    /// Settles a Conflict block with the commands the user chose.
    ///
    /// # Errors
    ///
    /// `NotFound` if the block is missing, `InvalidState` unless it is in Conflict.
    pub async fn apply_resolved_commands(
        &self,
        id: &BlockId,
        resolved: &[AtomicOperation],
    ) -> Result<WorkflowOutcome> {
        let _guard = self.lock_block(id).await.map_err(within("apply_resolved_commands", id))?;
        self.with_block(id, |status| status.resolve_conflict(resolved))
            .map_err(within("apply_resolved_commands", id))
    }

    /// Sends an Idle or Error block back to Loading.
    ///
    /// # Errors
    ///
    /// `CannotPerformOnRoot` for the super-root, `NotFound` if the block is
    /// missing, `InvalidState` unless it is Idle or Error.
    pub async fn start_regeneration(&self, id: &BlockId) -> Result<BlockStatus> {
        if self.is_root(id) {
            return Err(within("start_regeneration", id)(Error::cannot_perform_on_root("regenerate")));
        }
        let _guard = self.lock_block(id).await.map_err(within("start_regeneration", id))?;
        self.with_block(id, |status| {
            status.start_regeneration()?;
            Ok(status.clone())
        })
        .map_err(within("start_regeneration", id))
    }

    // =========================================================================
    // Manual tree edits
    // =========================================================================

    /// Creates an Idle block under `parent` without running a workflow.
    ///
    /// # Errors
    ///
    /// `NotFound` if the parent is missing, `InvalidState` unless it is
    /// Idle, or an internal error on an id collision.
    pub async fn create_block_manually(
        &self,
        parent: &BlockId,
        initial_metadata: Option<BTreeMap<String, Option<String>>>,
    ) -> Result<BlockStatus> {
        let _parent_guard = self
            .lock_block(parent)
            .await
            .map_err(within("create_block_manually", parent))?;
        let child_id = self
            .unused_id(self.ids.manual_id())
            .map_err(within("create_block_manually", parent))?;
        let mut child = self
            .with_block(parent, |parent| parent.spawn_child(child_id.clone(), LtMap::new()))
            .map_err(within("create_block_manually", parent))?;
        child.force_idle();
        if let Some(metadata) = initial_metadata {
            child.block_mut().metadata_mut().extend(metadata);
        }

        let _child_guard = self.locks.lock(&child_id).await;
        self.blocks.insert(child_id.clone(), child.clone());
        tracing::info!(block_id = %child_id, parent_id = %parent, "block created manually");
        Ok(child)
    }

    /// Validates a deletion and returns the parent and every block to remove.
    fn deletion_plan(&self, id: &BlockId, recursive: bool, force: bool) -> Result<(Option<BlockId>, Vec<BlockId>)> {
        let (parent, has_children, code) = {
            let entry = self.blocks.get(id).ok_or_else(|| Error::not_found(id.as_str()))?;
            (
                entry.block().parent_id().cloned(),
                !entry.block().children().is_empty(),
                entry.code(),
            )
        };
        let deletable = |code: StatusCode| force || matches!(code, StatusCode::Idle | StatusCode::Error);
        if !deletable(code) {
            return Err(Error::invalid_state(id.as_str(), code, "delete block"));
        }
        if has_children && !recursive {
            return Err(Error::bad_request(format!(
                "block {id} has children; delete recursively to remove them"
            )));
        }

        let mut targets = vec![id.clone()];
        if recursive {
            for descendant in self.find_all_descendants(id) {
                let code = self.code_of(&descendant)?;
                if !deletable(code) {
                    return Err(Error::invalid_state(descendant.as_str(), code, "delete block"));
                }
                targets.push(descendant);
            }
        }
        Ok((parent, targets))
    }

    /// Deletes a block, and its subtree when `recursive`.
    ///
    /// Without `force` every removed block must be Idle or Error.
    ///
    /// # Errors
    ///
    /// `CannotPerformOnRoot` for the super-root, `NotFound` if the block is
    /// missing, `InvalidState` for a busy block, `BadRequest` for a
    /// non-recursive delete of a block with children, or an internal error
    /// if the tree changed while locks were being acquired.
    pub async fn delete_block_manually(&self, id: &BlockId, recursive: bool, force: bool) -> Result<()> {
        let ctx = || within("delete_block_manually", id);
        if self.is_root(id) {
            return Err(ctx()(Error::cannot_perform_on_root("delete")));
        }
        let plan = self.deletion_plan(id, recursive, force).map_err(ctx())?;

        let lock_ids: Vec<BlockId> = plan.1.iter().cloned().chain(plan.0.clone()).collect();
        let guards = self.locks.lock_many(lock_ids.iter().cloned()).await;
        let committed = self.commit_delete(id, recursive, force, &plan);
        drop(guards);
        match committed {
            Ok(()) => {
                for target in &plan.1 {
                    self.locks.remove(target);
                }
                tracing::info!(block_id = %id, removed = plan.1.len(), "block deleted");
                Ok(())
            }
            Err(e) => {
                self.prune_locks(&lock_ids);
                Err(ctx()(e))
            }
        }
    }

    /// Re-checks a deletion under the structure guard and unlinks it. The
    /// caller holds the lock of every block in the plan.
    fn commit_delete(
        &self,
        id: &BlockId,
        recursive: bool,
        force: bool,
        plan: &(Option<BlockId>, Vec<BlockId>),
    ) -> Result<()> {
        let _structure = self.structure.lock();
        if self.deletion_plan(id, recursive, force)? != *plan {
            tracing::warn!(block_id = %id, "tree changed while locking for delete");
            return Err(Error::internal("tree changed while acquiring locks"));
        }
        let (parent, targets) = plan;
        if let Some(parent) = parent {
            if let Some(mut entry) = self.blocks.get_mut(parent) {
                entry.block_mut().remove_child(id);
            }
        }
        for target in targets {
            self.blocks.remove(target);
        }
        Ok(())
    }

    /// Validates a move and returns the current parent.
    fn move_plan(&self, id: &BlockId, new_parent: &BlockId) -> Result<Option<BlockId>> {
        let old_parent = self
            .blocks
            .get(id)
            .ok_or_else(|| Error::not_found(id.as_str()))?
            .block()
            .parent_id()
            .cloned();
        let code = self.code_of(new_parent)?;
        if old_parent.as_ref() == Some(new_parent) {
            return Ok(old_parent);
        }
        if self.find_all_descendants(id).contains(new_parent) {
            return Err(Error::cyclic(id.as_str(), new_parent.as_str()));
        }
        if code != StatusCode::Idle {
            return Err(Error::invalid_state(new_parent.as_str(), code, "move block under"));
        }
        Ok(old_parent)
    }

    /// Re-parents a block and its subtree.
    ///
    /// Moving a block under its current parent changes nothing.
    ///
    /// # Errors
    ///
    /// `CannotPerformOnRoot` for the super-root, `CyclicOperation` for a
    /// move under itself or a descendant, `NotFound` if either block is
    /// missing, `InvalidState` unless the new parent is Idle, or an internal
    /// error if the tree changed while locks were being acquired.
    pub async fn move_block_manually(&self, id: &BlockId, new_parent: &BlockId) -> Result<()> {
        let ctx = || within("move_block_manually", id);
        if self.is_root(id) {
            return Err(ctx()(Error::cannot_perform_on_root("move")));
        }
        if id == new_parent {
            return Err(ctx()(Error::cyclic(id.as_str(), new_parent.as_str())));
        }
        let old_parent = self.move_plan(id, new_parent).map_err(ctx())?;
        if old_parent.as_ref() == Some(new_parent) {
            return Ok(());
        }

        let lock_ids: Vec<BlockId> = [id.clone(), new_parent.clone()]
            .into_iter()
            .chain(old_parent.clone())
            .collect();
        let guards = self.locks.lock_many(lock_ids.iter().cloned()).await;
        let committed = self.commit_move(id, new_parent, old_parent.as_ref());
        drop(guards);
        if let Err(e) = committed {
            self.prune_locks(&lock_ids);
            return Err(ctx()(e));
        }
        tracing::info!(block_id = %id, new_parent = %new_parent, "block moved");
        Ok(())
    }

    /// Re-checks a move under the structure guard and rewires the links.
    /// The caller holds the locks of the block and both parents.
    ///
    /// The cycle check walks the moved subtree, which the caller has not
    /// locked; the structure guard keeps other moves from rewiring it
    /// meanwhile.
    fn commit_move(&self, id: &BlockId, new_parent: &BlockId, old_parent: Option<&BlockId>) -> Result<()> {
        let _structure = self.structure.lock();
        if self.move_plan(id, new_parent)?.as_ref() != old_parent {
            tracing::warn!(block_id = %id, "tree changed while locking for move");
            return Err(Error::internal("tree changed while acquiring locks"));
        }
        if let Some(old) = old_parent {
            if let Some(mut entry) = self.blocks.get_mut(old) {
                entry.block_mut().remove_child(id);
            }
        }
        if let Some(mut entry) = self.blocks.get_mut(new_parent) {
            entry.block_mut().add_child(id.clone());
        }
        if let Some(mut entry) = self.blocks.get_mut(id) {
            entry.block_mut().set_parent(Some(new_parent.clone()));
        }
        Ok(())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Takes every block's lock and captures the whole tree.
    pub async fn to_archive(&self, blind_storage: serde_json::Value) -> Archive {
        let ids = self.block_ids();
        let guards = self.locks.lock_many(ids.iter().cloned()).await;
        let blocks = self
            .blocks
            .iter()
            .map(|e| (e.key().clone(), e.block().clone()))
            .collect();
        drop(guards);
        self.prune_locks(&ids);
        Archive {
            archive_version: self.config.archive_version.clone(),
            blind_storage,
            blocks,
        }
    }

    /// Replaces the tree with an archive's blocks, each forced Idle.
    ///
    /// Returns the archive's caller payload.
    pub async fn restore_archive(&self, archive: Archive) -> serde_json::Value {
        let guards = self.locks.lock_many(self.block_ids()).await;
        if archive.archive_version != self.config.archive_version {
            tracing::warn!(
                found = %archive.archive_version,
                expected = %self.config.archive_version,
                "archive version differs"
            );
        }
        self.replace_blocks(archive.blocks.into_iter().map(|(key, block)| {
            if key != *block.id() {
                tracing::warn!(key = %key, block_id = %block.id(), "archive key differs from block id");
            }
            BlockStatus::restore(block)
        }));
        drop(guards);
        self.retain_live_locks();
        tracing::info!(blocks = self.blocks.len(), "tree loaded");
        archive.blind_storage
    }

    async fn reset(&self) {
        let guards = self.locks.lock_many(self.block_ids()).await;
        self.replace_blocks([BlockStatus::root(self.config.root_id.clone())]);
        drop(guards);
        self.retain_live_locks();
    }

    /// Swaps in a new set of blocks, adding a super-root if none is given.
    fn replace_blocks(&self, blocks: impl IntoIterator<Item = BlockStatus>) {
        let _structure = self.structure.lock();
        self.blocks.clear();
        for status in blocks {
            self.blocks.insert(status.id().clone(), status);
        }
        if !self.blocks.contains_key(&self.config.root_id) {
            tracing::warn!(root_id = %self.config.root_id, "archive has no super-root, inserting a fresh one");
            self.install_root();
        }
    }

    /// Drops lock entries for blocks that are gone. Entries of surviving
    /// blocks stay, so tasks already queued on them keep excluding newcomers.
    fn retain_live_locks(&self) {
        self.locks.retain(|id| self.blocks.contains_key(id));
    }

    /// Saves the tree in the configured format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn save_to_writer<W: Write>(&self, writer: W, blind_storage: serde_json::Value) -> Result<()> {
        let archive = self.to_archive(blind_storage).await;
        archive::write_to(&archive, self.config.archive_format, writer)?;
        tracing::info!(blocks = archive.blocks.len(), "tree saved");
        Ok(())
    }

    /// Loads a tree saved in either format and returns the caller payload.
    ///
    /// An unreadable archive leaves a fresh tree holding only the super-root.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the archive is invalid.
    pub async fn load_from_reader<R: Read>(&self, reader: R) -> Result<serde_json::Value> {
        match archive::read_from(reader) {
            Ok(archive) => Ok(self.restore_archive(archive).await),
            Err(e) => {
                tracing::error!(error = %e, "failed to load tree, resetting");
                self.reset().await;
                Err(e)
            }
        }
    }

    /// Saves the tree to a file in the configured format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn save_to_path<P: AsRef<Path>>(&self, path: P, blind_storage: serde_json::Value) -> Result<()> {
        let archive = self.to_archive(blind_storage).await;
        archive::save_to_file(&archive, self.config.archive_format, path)
    }

    /// Loads a tree from a file and returns the caller payload.
    ///
    /// An unreadable archive leaves a fresh tree holding only the super-root.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub async fn load_from_path<P: AsRef<Path>>(&self, path: P) -> Result<serde_json::Value> {
        match archive::load_from_file(path) {
            Ok(archive) => Ok(self.restore_archive(archive).await),
            Err(e) => {
                tracing::error!(error = %e, "failed to load tree, resetting");
                self.reset().await;
                Err(e)
            }
        }
    }
}
