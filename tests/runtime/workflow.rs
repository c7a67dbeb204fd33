//! End-to-end workflow tests
//!
//! A caller creates a Loading child, runs a workflow without holding any
//! lock, and reports the result back.

use plotline_block::{Status, StatusCode};
use plotline_foundation::{EntityKind, ErrorCode, LtMap, Operator, TypedId, Value};
use plotline_storage::AtomicOperation;

use crate::seeded_manager;

fn damage(value: i64) -> AtomicOperation {
    AtomicOperation::modify(EntityKind::Item, "item_sword", "damage", Operator::Equal, value)
}

// =============================================================================
// Conflict Scenario
// =============================================================================

#[tokio::test]
async fn user_and_workflow_disagree_on_sword_damage() {
    let m = seeded_manager();
    let root = m.root_id().clone();
    m.enqueue_or_execute_atomic_operations(
        &root,
        &[AtomicOperation::create_with(EntityKind::Item, "item_sword", [("damage", 10)])],
    )
    .await
    .unwrap();

    let child = m.create_child(None, LtMap::new()).await.unwrap();
    let (_, routed) = m
        .enqueue_or_execute_atomic_operations(child.id(), &[damage(15)])
        .await
        .unwrap();
    assert_eq!(routed, StatusCode::Loading);

    let outcome = m
        .handle_workflow_completion(child.id(), true, "The sword sharpens.".into(), vec![damage(20)], None)
        .await
        .unwrap();
    assert_eq!(outcome.status, StatusCode::Conflict);

    let block = m.get_block(child.id()).await.unwrap();
    let Status::Conflict {
        conflicting_ai_commands,
        conflicting_user_commands,
    } = block.status()
    else {
        panic!("expected Conflict, got {:?}", block.code());
    };
    assert_eq!(conflicting_ai_commands, &vec![damage(20)]);
    assert_eq!(conflicting_user_commands, &vec![damage(15)]);
    assert!(block.block().ws_post_ai().is_none());
}

// =============================================================================
// Branching
// =============================================================================

#[tokio::test]
async fn siblings_branch_from_the_same_parent_output() {
    let m = seeded_manager();
    let root = m.root_id().clone();
    m.enqueue_or_execute_atomic_operations(&root, &[AtomicOperation::create(EntityKind::Place, "crossroads")])
        .await
        .unwrap();

    let left = m
        .create_child(None, [(std::sync::Arc::from("choice"), Value::from("left"))].into_iter().collect())
        .await
        .unwrap();
    let right = m
        .create_child(None, [(std::sync::Arc::from("choice"), Value::from("right"))].into_iter().collect())
        .await
        .unwrap();

    m.handle_workflow_completion(
        left.id(),
        true,
        "You go left.".into(),
        vec![AtomicOperation::create(EntityKind::Place, "forest")],
        None,
    )
    .await
    .unwrap();
    m.handle_workflow_completion(
        right.id(),
        true,
        "You go right.".into(),
        vec![AtomicOperation::create(EntityKind::Place, "river")],
        None,
    )
    .await
    .unwrap();

    let left = m.get_block(left.id()).await.unwrap();
    let right = m.get_block(right.id()).await.unwrap();
    let has = |b: &plotline_block::BlockStatus, id: &str| {
        b.current_world_state()
            .unwrap()
            .find_entity(&TypedId::place(id), false)
            .is_some()
    };
    assert!(has(&left, "forest") && !has(&left, "river"));
    assert!(has(&right, "river") && !has(&right, "forest"));
    assert!(has(&left, "crossroads") && has(&right, "crossroads"));

    // The last spawned child is the active branch
    assert_eq!(m.get_path_to_root(&root), vec![root.clone(), right.id().clone()]);
    let root_block = m.get_block(&root).await.unwrap();
    assert_eq!(
        root_block.block().triggered_child_params().get("choice"),
        Some(&Value::from("right"))
    );
}

#[tokio::test]
async fn regenerated_block_reruns_from_its_input() {
    let m = seeded_manager();
    let child = m.create_child(None, LtMap::new()).await.unwrap();
    m.handle_workflow_completion(
        child.id(),
        true,
        "draft".into(),
        vec![AtomicOperation::create(EntityKind::Character, "stranger")],
        Some(serde_json::json!({"tone": "dark"})),
    )
    .await
    .unwrap();

    let regenerating = m.start_regeneration(child.id()).await.unwrap();
    assert_eq!(regenerating.code(), StatusCode::Loading);
    assert!(regenerating.current_world_state().unwrap().is_empty());

    let outcome = m
        .handle_workflow_completion(
            child.id(),
            true,
            "rewrite".into(),
            vec![AtomicOperation::create(EntityKind::Character, "stranger")],
            None,
        )
        .await
        .unwrap();
    assert_eq!(outcome.status, StatusCode::Idle);
}

#[tokio::test]
async fn failed_command_reports_error_status() {
    let m = seeded_manager();
    let child = m.create_child(None, LtMap::new()).await.unwrap();
    let outcome = m
        .handle_workflow_completion(child.id(), true, "oops".into(), vec![damage(1)], None)
        .await
        .unwrap();

    assert_eq!(outcome.status, StatusCode::Error);
    assert!(!outcome.results[0].is_ok());
    let err = m
        .update_block_details(child.id(), Some("fix".into()), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
}
