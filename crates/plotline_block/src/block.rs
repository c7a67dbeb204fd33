//! Blocks: the nodes of the story tree.
//!
//! A block carries its links, content, metadata, one [`GameState`] and up
//! to four [`WorldState`] snapshots. Which snapshot is current depends on
//! the status wrapped around it, see [`crate::status`].

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use plotline_foundation::{LtMap, Value};
use plotline_storage::{GameState, WorldState};

/// Metadata key holding the failures that sent a block to Error.
pub const METADATA_ERROR: &str = "Error";
/// Metadata key holding the workflow's output variables as JSON text.
pub const METADATA_OUTPUT_VARIABLES: &str = "WorkflowOutputVariables";

/// Block identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct BlockId(Arc<str>);

impl BlockId {
    /// Creates a block id.
    #[must_use]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for BlockId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// One versioned node of the story tree.
#[derive(Clone, Debug)]
pub struct Block {
    id: BlockId,
    parent: Option<BlockId>,
    children: Vec<BlockId>,
    content: String,
    metadata: BTreeMap<String, Option<String>>,
    triggered_child_params: LtMap<Arc<str>, Value>,
    game_state: GameState,
    pub(crate) ws_input: WorldState,
    pub(crate) ws_temp: Option<WorldState>,
    pub(crate) ws_post_ai: Option<WorldState>,
    pub(crate) ws_post_user: Option<WorldState>,
}

impl Block {
    /// Creates a parentless block whose input is an empty world.
    #[must_use]
    pub fn root(id: BlockId) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            content: String::new(),
            metadata: BTreeMap::new(),
            triggered_child_params: LtMap::new(),
            game_state: GameState::new(),
            ws_input: WorldState::new(),
            ws_temp: None,
            ws_post_ai: None,
            ws_post_user: None,
        }
    }

    /// Creates a block that starts from the given snapshots, with scratch state ready.
    pub(crate) fn child(id: BlockId, parent: BlockId, input: WorldState, game_state: GameState) -> Self {
        Self {
            parent: Some(parent),
            game_state,
            ws_temp: Some(input.clone()),
            ws_input: input,
            ..Self::root(id)
        }
    }

    /// Returns the block id.
    #[must_use]
    pub const fn id(&self) -> &BlockId {
        &self.id
    }

    /// Returns the parent id, `None` for the root.
    #[must_use]
    pub const fn parent_id(&self) -> Option<&BlockId> {
        self.parent.as_ref()
    }

    /// Re-parents the block. Callers keep both parents' child lists in step.
    pub fn set_parent(&mut self, parent: Option<BlockId>) {
        self.parent = parent;
    }

    /// Returns child ids in insertion order.
    #[must_use]
    pub fn children(&self) -> &[BlockId] {
        &self.children
    }

    /// Returns the most recently added child, the active branch tip.
    #[must_use]
    pub fn last_child(&self) -> Option<&BlockId> {
        self.children.last()
    }

    /// Appends a child id.
    pub fn add_child(&mut self, child: BlockId) {
        self.children.push(child);
    }

    /// Removes a child id. Returns true if it was listed.
    pub fn remove_child(&mut self, child: &BlockId) -> bool {
        let before = self.children.len();
        self.children.retain(|c| c != child);
        self.children.len() != before
    }

    /// Returns the content text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replaces the content text.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Returns the metadata. A key may hold an explicit null.
    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, Option<String>> {
        &self.metadata
    }

    /// Returns the metadata for editing.
    pub fn metadata_mut(&mut self) -> &mut BTreeMap<String, Option<String>> {
        &mut self.metadata
    }

    /// Returns the parameters recorded when the last child was spawned.
    #[must_use]
    pub const fn triggered_child_params(&self) -> &LtMap<Arc<str>, Value> {
        &self.triggered_child_params
    }

    pub(crate) fn set_triggered_child_params(&mut self, params: LtMap<Arc<str>, Value>) {
        self.triggered_child_params = params;
    }

    /// Returns the game settings.
    #[must_use]
    pub const fn game_state(&self) -> &GameState {
        &self.game_state
    }

    /// Returns the game settings for editing. Allowed in every status.
    pub fn game_state_mut(&mut self) -> &mut GameState {
        &mut self.game_state
    }

    /// The state this block started from.
    #[must_use]
    pub const fn ws_input(&self) -> &WorldState {
        &self.ws_input
    }

    /// Scratch state used while a workflow is in flight.
    #[must_use]
    pub const fn ws_temp(&self) -> Option<&WorldState> {
        self.ws_temp.as_ref()
    }

    /// Input plus the workflow's commands.
    #[must_use]
    pub const fn ws_post_ai(&self) -> Option<&WorldState> {
        self.ws_post_ai.as_ref()
    }

    /// Workflow output plus the user's edits; current once Idle.
    #[must_use]
    pub const fn ws_post_user(&self) -> Option<&WorldState> {
        self.ws_post_user.as_ref()
    }
}

#[cfg(feature = "serde")]
mod serde_support {
    use super::{Block, BlockId};
    use plotline_foundation::{LtMap, Value};
    use plotline_storage::{GameState, WorldState};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    const WS_INPUT: &str = "wsInput";
    const WS_POST_AI: &str = "wsPostAI";
    const WS_POST_USER: &str = "wsPostUser";

    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct BlockRecordRef<'a> {
        block_id: &'a BlockId,
        parent_block_id: Option<&'a BlockId>,
        children_ids: &'a [BlockId],
        block_content: &'a str,
        metadata: &'a BTreeMap<String, Option<String>>,
        triggered_child_params: &'a LtMap<Arc<str>, Value>,
        game_state: &'a GameState,
        world_states: BTreeMap<&'static str, &'a WorldState>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct BlockRecord {
        block_id: BlockId,
        #[serde(default)]
        parent_block_id: Option<BlockId>,
        #[serde(default)]
        children_ids: Vec<BlockId>,
        #[serde(default)]
        block_content: String,
        #[serde(default)]
        metadata: BTreeMap<String, Option<String>>,
        #[serde(default)]
        triggered_child_params: LtMap<Arc<str>, Value>,
        #[serde(default)]
        game_state: GameState,
        #[serde(default)]
        world_states: BTreeMap<String, WorldState>,
    }

    impl Serialize for Block {
        fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            // Scratch state is transient and never persisted
            let mut world_states = BTreeMap::new();
            world_states.insert(WS_INPUT, &self.ws_input);
            if let Some(ws) = &self.ws_post_ai {
                world_states.insert(WS_POST_AI, ws);
            }
            if let Some(ws) = &self.ws_post_user {
                world_states.insert(WS_POST_USER, ws);
            }
            BlockRecordRef {
                block_id: &self.id,
                parent_block_id: self.parent.as_ref(),
                children_ids: &self.children,
                block_content: &self.content,
                metadata: &self.metadata,
                triggered_child_params: &self.triggered_child_params,
                game_state: &self.game_state,
                world_states,
            }
            .serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for Block {
        fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let mut record = BlockRecord::deserialize(deserializer)?;
            let ws_input = record.world_states.remove(WS_INPUT).unwrap_or_else(|| {
                tracing::error!(block_id = %record.block_id, "saved block has no wsInput, starting from an empty world");
                WorldState::new()
            });
            Ok(Block {
                id: record.block_id,
                parent: record.parent_block_id,
                children: record.children_ids,
                content: record.block_content,
                metadata: record.metadata,
                triggered_child_params: record.triggered_child_params,
                game_state: record.game_state,
                ws_input,
                ws_temp: None,
                ws_post_ai: record.world_states.remove(WS_POST_AI),
                ws_post_user: record.world_states.remove(WS_POST_USER),
            })
        }
    }
}
