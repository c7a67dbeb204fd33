//! Overlap detection between workflow commands and pending user edits.
//!
//! Two operations overlap when they target the same entity kind and id and
//! either touch the same attribute or at least one of them is a create or
//! delete. Whole-entity operations have no attribute and so overlap with
//! anything on that entity.

use plotline_foundation::EntityKind;
use plotline_storage::AtomicOperation;

/// The commands on both sides that overlap, each in submission order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Conflict {
    /// Workflow commands that overlap with at least one user edit.
    pub ai_commands: Vec<AtomicOperation>,
    /// User edits that overlap with at least one workflow command.
    pub user_commands: Vec<AtomicOperation>,
}

/// The address an operation writes to: kind, id and attribute.
///
/// `None` stands for every attribute of the entity.
#[must_use]
pub fn conflict_key(op: &AtomicOperation) -> (EntityKind, &str, Option<&str>) {
    (op.kind(), op.id(), op.attribute())
}

/// Returns true if both operations write to the same address.
#[must_use]
pub fn overlaps(a: &AtomicOperation, b: &AtomicOperation) -> bool {
    let (a_kind, a_id, a_attr) = conflict_key(a);
    let (b_kind, b_id, b_attr) = conflict_key(b);
    if a_kind != b_kind || a_id != b_id {
        return false;
    }
    match (a_attr, b_attr) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    }
}

/// Compares workflow commands against pending user edits.
///
/// Returns `None` when nothing overlaps.
#[must_use]
pub fn detect_conflicts(ai: &[AtomicOperation], user: &[AtomicOperation]) -> Option<Conflict> {
    let ai_commands: Vec<AtomicOperation> = ai
        .iter()
        .filter(|a| user.iter().any(|u| overlaps(a, u)))
        .cloned()
        .collect();
    if ai_commands.is_empty() {
        return None;
    }
    let user_commands = user
        .iter()
        .filter(|u| ai.iter().any(|a| overlaps(a, u)))
        .cloned()
        .collect();
    Some(Conflict {
        ai_commands,
        user_commands,
    })
}
