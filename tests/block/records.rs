//! Integration tests for the persisted form of a block

use plotline_block::{Block, BlockId, BlockStatus, StatusCode};
use plotline_foundation::{EntityKind, LtMap, TypedId};
use plotline_storage::AtomicOperation;

#[test]
fn record_uses_pascal_case_and_named_snapshots() {
    let mut root = BlockStatus::root(BlockId::new("__WORLD__"));
    root.apply_operations(&[AtomicOperation::create(EntityKind::Place, "tavern")])
        .unwrap();
    let json = serde_json::to_value(root.block()).unwrap();

    assert_eq!(json["BlockId"], "__WORLD__");
    assert!(json["ParentBlockId"].is_null());
    let snapshots = json["WorldStates"].as_object().unwrap();
    let mut names: Vec<&str> = snapshots.keys().map(String::as_str).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["wsInput", "wsPostAI", "wsPostUser"]);
    assert_eq!(
        json["WorldStates"]["wsPostUser"]["Places"]["tavern"]["EntityType"],
        serde_json::json!({"String": "Place"})
    );
}

#[test]
fn scratch_state_is_not_persisted() {
    let mut root = BlockStatus::root(BlockId::new("r"));
    let child = root.spawn_child("c".into(), LtMap::new()).unwrap();
    let json = serde_json::to_value(child.block()).unwrap();
    let snapshots = json["WorldStates"].as_object().unwrap();
    assert_eq!(snapshots.len(), 1);
    assert!(snapshots.contains_key("wsInput"));
}

#[test]
fn restored_blocks_are_idle_with_outputs() {
    let mut root = BlockStatus::root(BlockId::new("r"));
    root.apply_operations(&[AtomicOperation::create_with(
        EntityKind::Character,
        "alice",
        [("home", TypedId::place("tavern"))],
    )])
    .unwrap();
    let mut child = root.spawn_child("c".into(), LtMap::new()).unwrap();
    child.apply_operations(&[AtomicOperation::delete(EntityKind::Character, "alice")]).unwrap();

    let text = serde_json::to_string(child.block()).unwrap();
    let restored = BlockStatus::restore(serde_json::from_str::<Block>(&text).unwrap());

    assert_eq!(restored.code(), StatusCode::Idle);
    assert_eq!(restored.block().parent_id(), Some(&BlockId::new("r")));
    // Queued edits lived in scratch state and are gone
    let alice = restored
        .current_world_state()
        .unwrap()
        .find_entity(&TypedId::character("alice"), false)
        .unwrap();
    assert_eq!(alice.try_get::<TypedId>("home"), Some(TypedId::place("tavern")));
}

#[test]
fn missing_input_falls_back_to_empty_world() {
    let json = serde_json::json!({"BlockId": "orphan", "WorldStates": {}});
    let block: Block = serde_json::from_value(json).unwrap();
    assert!(block.ws_input().is_empty());
    assert!(block.ws_post_user().is_none());
}
