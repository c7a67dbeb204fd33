//! Block status and the transitions between statuses.
//!
//! A [`BlockStatus`] pairs a [`Block`] with its [`Status`]. Every method
//! here assumes the caller already holds the block's lock; nothing in this
//! module synchronizes.
//!
//! ```text
//!            spawn                complete (no overlap)
//!   Idle ──────────▶ Loading ─────────────────────────▶ Idle
//!    ▲                │  │                               │
//!    │      overlap   │  │ failure / failed replay       │ regenerate
//!    │    ┌───────────┘  └──────────────▶ Error ◀────────┘
//!    │    ▼                                 │
//!   Conflict ── resolve ──▶ Idle            └── regenerate ──▶ Loading
//! ```

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use plotline_foundation::{Error, LtMap, Result, Value};
use plotline_storage::{AtomicOperation, OperationResult, OperationResults, WorldState};

use crate::block::{Block, BlockId, METADATA_ERROR, METADATA_OUTPUT_VARIABLES};
use crate::conflict::{Conflict, detect_conflicts};

/// Field-less status tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StatusCode {
    /// Settled; user edits apply directly.
    Idle,
    /// A workflow is in flight; user edits are queued.
    Loading,
    /// Workflow and user edits overlap and wait for resolution.
    Conflict,
    /// The workflow or a replayed edit failed.
    Error,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "Idle",
            Self::Loading => "Loading",
            Self::Conflict => "Conflict",
            Self::Error => "Error",
        };
        f.write_str(s)
    }
}

/// Block status with the data only that status needs.
#[derive(Clone, Debug, PartialEq)]
pub enum Status {
    /// Settled.
    Idle,
    /// Waiting for a workflow.
    Loading {
        /// User edits made while the workflow ran, in order.
        pending_user_commands: Vec<AtomicOperation>,
    },
    /// Waiting for the user to pick a resolution.
    Conflict {
        /// Workflow commands involved in an overlap.
        conflicting_ai_commands: Vec<AtomicOperation>,
        /// User edits involved in an overlap.
        conflicting_user_commands: Vec<AtomicOperation>,
    },
    /// Failed; only regeneration leaves this status.
    Error,
}

impl Status {
    /// Returns the tag of this status.
    #[must_use]
    pub const fn code(&self) -> StatusCode {
        match self {
            Self::Idle => StatusCode::Idle,
            Self::Loading { .. } => StatusCode::Loading,
            Self::Conflict { .. } => StatusCode::Conflict,
            Self::Error => StatusCode::Error,
        }
    }

    const fn loading() -> Self {
        Self::Loading {
            pending_user_commands: Vec::new(),
        }
    }
}

/// What a workflow completion or a conflict resolution produced.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowOutcome {
    /// Status after the transition.
    pub status: StatusCode,
    /// Per-operation results of everything applied, workflow commands first.
    pub results: Vec<OperationResult>,
}

/// A block together with its current status.
#[derive(Clone, Debug)]
pub struct BlockStatus {
    block: Block,
    status: Status,
}

impl BlockStatus {
    /// Creates an Idle root over an empty world.
    #[must_use]
    pub fn root(id: BlockId) -> Self {
        let mut root = Self {
            block: Block::root(id),
            status: Status::Idle,
        };
        root.force_idle();
        root
    }

    /// Wraps a block read back from storage and forces it Idle.
    ///
    /// A missing `wsPostUser` is rebuilt from `wsPostAI` or `wsInput` and
    /// the recovery is logged.
    #[must_use]
    pub fn restore(block: Block) -> Self {
        if block.ws_post_user.is_none() {
            tracing::warn!(block_id = %block.id(), "restored block has no wsPostUser, recovering");
        }
        let mut restored = Self {
            block,
            status: Status::Idle,
        };
        restored.force_idle();
        restored
    }

    /// Returns the block.
    #[must_use]
    pub const fn block(&self) -> &Block {
        &self.block
    }

    /// Returns the block for editing links, content or metadata.
    pub fn block_mut(&mut self) -> &mut Block {
        &mut self.block
    }

    /// Unwraps the block.
    #[must_use]
    pub fn into_block(self) -> Block {
        self.block
    }

    /// Returns the block id.
    #[must_use]
    pub const fn id(&self) -> &BlockId {
        self.block.id()
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> &Status {
        &self.status
    }

    /// Returns the status tag.
    #[must_use]
    pub const fn code(&self) -> StatusCode {
        self.status.code()
    }

    /// The world user edits currently apply to.
    ///
    /// Idle blocks expose `wsPostUser`, Loading blocks `wsTemp`. Conflict
    /// and Error blocks have none.
    #[must_use]
    pub const fn current_world_state(&self) -> Option<&WorldState> {
        match self.status {
            Status::Idle => self.block.ws_post_user.as_ref(),
            Status::Loading { .. } => self.block.ws_temp.as_ref(),
            Status::Conflict { .. } | Status::Error => None,
        }
    }

    fn invalid(&self, operation: &'static str) -> Error {
        Error::invalid_state(self.id().as_str(), self.code(), operation)
    }

    /// Applies user edits according to the status.
    ///
    /// Idle blocks apply to `wsPostUser`. Loading blocks apply to `wsTemp`
    /// and queue the successful edits for replay.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` in Conflict or Error; nothing is changed.
    pub fn apply_operations(&mut self, ops: &[AtomicOperation]) -> Result<Vec<OperationResult>> {
        let block = &mut self.block;
        match &mut self.status {
            Status::Idle => {
                if block.ws_post_user.is_none() {
                    tracing::error!(block_id = %block.id(), "idle block had no wsPostUser");
                    block.ws_post_user = Some(block.ws_post_ai.clone().unwrap_or_else(|| block.ws_input.clone()));
                }
                let world = block.ws_post_user.get_or_insert_with(WorldState::new);
                Ok(world.apply_all(ops))
            }
            Status::Loading {
                pending_user_commands,
            } => {
                if block.ws_temp.is_none() {
                    tracing::error!(block_id = %block.id(), "loading block had no wsTemp");
                    block.ws_temp = Some(block.ws_input.clone());
                }
                let world = block.ws_temp.get_or_insert_with(WorldState::new);
                let results = world.apply_all(ops);
                pending_user_commands.extend(results.succeeded());
                tracing::debug!(
                    block_id = %block.id(),
                    queued = pending_user_commands.len(),
                    "queued user edits while loading"
                );
                Ok(results)
            }
            Status::Conflict { .. } => Err(Error::invalid_state(
                block.id().as_str(),
                StatusCode::Conflict,
                "apply operations",
            )),
            Status::Error => Err(Error::invalid_state(
                block.id().as_str(),
                StatusCode::Error,
                "apply operations",
            )),
        }
    }

    /// Creates a Loading child starting from this block's current output.
    ///
    /// Records `params` as the trigger parameters and lists the child.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless this block is Idle.
    pub fn spawn_child(&mut self, child_id: BlockId, params: LtMap<Arc<str>, Value>) -> Result<Self> {
        if self.code() != StatusCode::Idle {
            return Err(self.invalid("create child"));
        }
        let input = match &self.block.ws_post_user {
            Some(world) => world.clone(),
            None => {
                tracing::warn!(block_id = %self.id(), "parent has no wsPostUser, child starts from wsInput");
                self.block.ws_input.clone()
            }
        };
        let child = Block::child(
            child_id.clone(),
            self.id().clone(),
            input,
            self.block.game_state().clone(),
        );
        self.block.set_triggered_child_params(params);
        self.block.add_child(child_id);
        Ok(Self {
            block: child,
            status: Status::loading(),
        })
    }

    /// Records a workflow's completion.
    ///
    /// On failure the block goes to Error and keeps its scratch state. On
    /// success the workflow commands are checked against queued user edits:
    /// any overlap parks the block in Conflict with nothing applied,
    /// otherwise both are applied, workflow first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the block is Loading.
    pub fn complete_workflow(
        &mut self,
        success: bool,
        content: String,
        commands: Vec<AtomicOperation>,
    ) -> Result<WorkflowOutcome> {
        let Status::Loading {
            pending_user_commands,
        } = &mut self.status
        else {
            return Err(self.invalid("complete workflow"));
        };
        let pending = std::mem::take(pending_user_commands);

        if !success {
            tracing::info!(block_id = %self.id(), "workflow failed");
            self.status = Status::Error;
            return Ok(WorkflowOutcome {
                status: StatusCode::Error,
                results: Vec::new(),
            });
        }

        self.block.set_content(content);
        if let Some(Conflict {
            ai_commands,
            user_commands,
        }) = detect_conflicts(&commands, &pending)
        {
            tracing::info!(
                block_id = %self.id(),
                ai = ai_commands.len(),
                user = user_commands.len(),
                "workflow output conflicts with user edits"
            );
            self.status = Status::Conflict {
                conflicting_ai_commands: ai_commands,
                conflicting_user_commands: user_commands,
            };
            return Ok(WorkflowOutcome {
                status: StatusCode::Conflict,
                results: Vec::new(),
            });
        }

        Ok(self.finalize(&commands, &pending))
    }

    /// Applies the commands chosen to settle a conflict onto `wsInput`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the block is in Conflict.
    pub fn resolve_conflict(&mut self, resolved: &[AtomicOperation]) -> Result<WorkflowOutcome> {
        if self.code() != StatusCode::Conflict {
            return Err(self.invalid("apply resolved commands"));
        }
        Ok(self.finalize(resolved, &[]))
    }

    /// Builds `wsPostAI` and `wsPostUser` from `wsInput` and settles the block.
    fn finalize(&mut self, ai: &[AtomicOperation], user: &[AtomicOperation]) -> WorkflowOutcome {
        let mut post_ai = self.block.ws_input.clone();
        let mut results = post_ai.apply_all(ai);
        let mut post_user = post_ai.clone();
        results.extend(post_user.apply_all(user));
        self.block.ws_temp = None;

        if results.any_failed() {
            let failures = results.failures();
            tracing::warn!(block_id = %self.id(), failed = failures.len(), "commands failed, block goes to Error");
            self.block
                .metadata_mut()
                .insert(METADATA_ERROR.to_string(), Some(failures.join("; ")));
            self.block.ws_post_ai = None;
            self.block.ws_post_user = None;
            self.status = Status::Error;
        } else {
            self.block.metadata_mut().remove(METADATA_ERROR);
            self.block.ws_post_ai = Some(post_ai);
            self.block.ws_post_user = Some(post_user);
            self.status = Status::Idle;
            tracing::info!(block_id = %self.id(), applied = results.len(), "block settled");
        }
        WorkflowOutcome {
            status: self.code(),
            results,
        }
    }

    /// Sends the block back to Loading so a workflow can run again.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the block is Idle or Error.
    pub fn start_regeneration(&mut self) -> Result<()> {
        if !matches!(self.status, Status::Idle | Status::Error) {
            return Err(self.invalid("regenerate"));
        }
        self.block.ws_post_ai = None;
        self.block.ws_post_user = None;
        self.block.ws_temp = Some(self.block.ws_input.clone());
        self.block.metadata_mut().remove(METADATA_OUTPUT_VARIABLES);
        self.status = Status::loading();
        tracing::info!(block_id = %self.id(), "regeneration started");
        Ok(())
    }

    /// Forces the block Idle, rebuilding missing output snapshots.
    ///
    /// Queued or conflicting commands are dropped.
    pub fn force_idle(&mut self) {
        let block = &mut self.block;
        let post_ai = block
            .ws_post_ai
            .take()
            .unwrap_or_else(|| block.ws_input.clone());
        let post_user = block.ws_post_user.take().unwrap_or_else(|| post_ai.clone());
        block.ws_post_ai = Some(post_ai);
        block.ws_post_user = Some(post_user);
        block.ws_temp = None;
        self.status = Status::Idle;
    }
}
