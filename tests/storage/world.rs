//! Integration tests for world state
//!
//! Tests lookups, snapshots, and batch application of atomic operations.

use plotline_foundation::{EntityKind, Operator, TypedId, Value};
use plotline_storage::{AtomicOperation, Entity, OperationResult, OperationResults, WorldState};

fn tavern_world() -> WorldState {
    let mut world = WorldState::new();
    world.add_entity(Entity::place("tavern").with("lit", true));
    world.add_entity(Entity::character("alice").with("location", TypedId::place("tavern")));
    world.add_entity(Entity::item("mug").with("quantity", 2));
    world
}

// =============================================================================
// Lookups
// =============================================================================

#[test]
fn kinds_are_separate_namespaces() {
    let mut world = tavern_world();
    world.add_entity(Entity::character("tavern"));

    assert_eq!(world.len(), 4);
    assert!(world.find_entity_by_id("tavern", EntityKind::Place, false).is_some());
    assert!(world.find_entity_by_id("tavern", EntityKind::Character, false).is_some());
}

#[test]
fn entities_iterate_in_id_order() {
    let mut world = WorldState::new();
    for id in ["c", "a", "b"] {
        world.add_entity(Entity::item(id));
    }
    let ids: Vec<&str> = world.entities(EntityKind::Item).map(Entity::id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn references_resolve() {
    let world = tavern_world();
    let alice = world.find_entity(&TypedId::character("alice"), false).unwrap();
    let location: TypedId = alice.try_get("location").unwrap();
    assert!(world.find_entity(&location, false).is_some());
}

// =============================================================================
// Snapshots
// =============================================================================

#[test]
fn snapshots_do_not_share_writes() {
    let input = tavern_world();
    let mut post = input.clone();
    post.apply(&AtomicOperation::modify(EntityKind::Place, "tavern", "lit", Operator::Equal, false));

    let lit = |w: &WorldState| {
        w.find_entity(&TypedId::place("tavern"), false)
            .and_then(|e| e.try_get::<bool>("lit"))
    };
    assert_eq!(lit(&input), Some(true));
    assert_eq!(lit(&post), Some(false));
}

// =============================================================================
// Operations
// =============================================================================

#[test]
fn delete_hides_but_keeps_entity() {
    let mut world = tavern_world();
    world.apply(&AtomicOperation::delete(EntityKind::Item, "mug"));

    assert!(world.find_entity(&TypedId::item("mug"), false).is_none());
    assert!(world.find_entity(&TypedId::item("mug"), true).is_some());

    let modify = AtomicOperation::modify(EntityKind::Item, "mug", "quantity", Operator::Add, 1);
    assert!(!world.apply(&modify).is_ok());
}

#[test]
fn batch_reports_each_operation() {
    let mut world = tavern_world();
    let results = world.apply_all(&[
        AtomicOperation::modify(EntityKind::Item, "mug", "quantity", Operator::Add, 3),
        AtomicOperation::create(EntityKind::Character, "alice"),
        AtomicOperation::modify(EntityKind::Character, "alice", "tags", Operator::Add, Value::list(["thirsty"])),
        AtomicOperation::modify(EntityKind::Character, "alice", "tags", Operator::Equal, Value::Null),
    ]);

    let oks: Vec<bool> = results.iter().map(OperationResult::is_ok).collect();
    assert_eq!(oks, vec![true, false, true, false]);
    assert!(results.any_failed());
    assert_eq!(results.succeeded().len(), 2);

    let mug = world.find_entity(&TypedId::item("mug"), false).unwrap();
    assert_eq!(mug.try_get::<i64>("quantity"), Some(5));
    let alice = world.find_entity(&TypedId::character("alice"), false).unwrap();
    assert_eq!(alice.get("tags"), Some(Value::list(["thirsty"])));
}
