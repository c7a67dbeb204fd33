//! Integration tests for block status transitions
//!
//! Walks blocks through spawn, completion, conflict, resolution and
//! regeneration.

use plotline_block::{BlockId, BlockStatus, METADATA_ERROR, Status, StatusCode};
use plotline_foundation::{EntityKind, ErrorCode, LtMap, Operator, TypedId};
use plotline_storage::{AtomicOperation, WorldState};

fn gold(world: &WorldState) -> Option<i64> {
    world
        .find_entity(&TypedId::character("hero"), false)
        .and_then(|e| e.try_get::<i64>("gold"))
}

fn add_gold(amount: i64) -> AtomicOperation {
    AtomicOperation::modify(EntityKind::Character, "hero", "gold", Operator::Add, amount)
}

fn root_with_hero() -> BlockStatus {
    let mut root = BlockStatus::root(BlockId::new("__WORLD__"));
    root.apply_operations(&[AtomicOperation::create_with(
        EntityKind::Character,
        "hero",
        [("gold", 10)],
    )])
    .unwrap();
    root
}

// =============================================================================
// Chains
// =============================================================================

#[test]
fn settled_blocks_chain_their_outputs() {
    let mut root = root_with_hero();
    let mut first = root.spawn_child("first".into(), LtMap::new()).unwrap();
    first.complete_workflow(true, "You find a purse.".into(), vec![add_gold(5)]).unwrap();

    let mut second = first.spawn_child("second".into(), LtMap::new()).unwrap();
    assert_eq!(gold(second.block().ws_input()), Some(15));

    second.complete_workflow(true, "You pay the toll.".into(), vec![add_gold(-3)]).unwrap();
    assert_eq!(gold(second.current_world_state().unwrap()), Some(12));
    assert_eq!(gold(first.current_world_state().unwrap()), Some(15));
}

#[test]
fn user_edits_during_loading_replay_after_workflow() {
    let mut root = root_with_hero();
    let mut child = root.spawn_child("child".into(), LtMap::new()).unwrap();
    child.apply_operations(&[AtomicOperation::modify(
        EntityKind::Character,
        "hero",
        "title",
        Operator::Equal,
        "Sir",
    )])
    .unwrap();

    let outcome = child.complete_workflow(true, "Knighted.".into(), vec![add_gold(100)]).unwrap();
    assert_eq!(outcome.status, StatusCode::Idle);

    let hero = |w: &WorldState| w.find_entity(&TypedId::character("hero"), false).cloned();
    let post_ai = hero(child.block().ws_post_ai().unwrap()).unwrap();
    let post_user = hero(child.block().ws_post_user().unwrap()).unwrap();
    assert_eq!(post_ai.get("title"), None);
    assert_eq!(post_user.try_get::<String>("title").as_deref(), Some("Sir"));
    assert_eq!(post_user.try_get::<i64>("gold"), Some(110));
}

// =============================================================================
// Failure Paths
// =============================================================================

#[test]
fn replayed_edit_that_fails_routes_to_error() {
    let mut root = root_with_hero();
    let mut child = root.spawn_child("child".into(), LtMap::new()).unwrap();
    let touch = AtomicOperation::modify(EntityKind::Character, "hero", "mood", Operator::Equal, "calm");
    child.apply_operations(&[touch]).unwrap();

    let outcome = child
        .complete_workflow(true, "The hero falls.".into(), vec![add_gold(1)])
        .unwrap();
    assert_eq!(outcome.status, StatusCode::Idle);

    let mut grandchild = child.spawn_child("grandchild".into(), LtMap::new()).unwrap();
    grandchild
        .apply_operations(&[AtomicOperation::modify(EntityKind::Character, "hero", "mood", Operator::Equal, "sad")])
        .unwrap();
    let outcome = grandchild
        .complete_workflow(
            true,
            "Gone.".into(),
            vec![AtomicOperation::delete(EntityKind::Character, "hero")],
        )
        .unwrap();
    // Delete overlaps every attribute of the hero
    assert_eq!(outcome.status, StatusCode::Conflict);

    let outcome = grandchild
        .resolve_conflict(&[
            AtomicOperation::delete(EntityKind::Character, "hero"),
            AtomicOperation::modify(EntityKind::Character, "hero", "mood", Operator::Equal, "sad"),
        ])
        .unwrap();
    assert_eq!(outcome.status, StatusCode::Error);
    let failures = grandchild.block().metadata()[METADATA_ERROR].as_deref().unwrap_or_default();
    assert!(failures.contains("hero"));
    assert!(grandchild.current_world_state().is_none());
}

#[test]
fn error_blocks_only_regenerate() {
    let mut root = root_with_hero();
    let mut child = root.spawn_child("child".into(), LtMap::new()).unwrap();
    child.complete_workflow(false, String::new(), Vec::new()).unwrap();
    assert_eq!(child.code(), StatusCode::Error);

    assert_eq!(child.apply_operations(&[add_gold(1)]).unwrap_err().code(), ErrorCode::InvalidState);
    assert_eq!(
        child.spawn_child("x".into(), LtMap::new()).unwrap_err().code(),
        ErrorCode::InvalidState
    );
    assert_eq!(child.resolve_conflict(&[]).unwrap_err().code(), ErrorCode::InvalidState);

    child.start_regeneration().unwrap();
    assert!(matches!(child.status(), Status::Loading { pending_user_commands } if pending_user_commands.is_empty()));
    assert_eq!(gold(child.current_world_state().unwrap()), Some(10));
}
