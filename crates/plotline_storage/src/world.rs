//! World state: every entity visible at one point of the story.
//!
//! A `WorldState` is three id → [`Entity`] maps, one per kind. It is not
//! synchronized; the owning block's lock guards it. Clones are O(1) and
//! independent thanks to structural sharing.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use plotline_foundation::{EntityKind, LtMap, TypedId};

use crate::entity::Entity;
use crate::operation::{AtomicOperation, OperationResult};

/// Entities grouped by kind and addressed by id.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "PascalCase")
)]
pub struct WorldState {
    items: LtMap<Arc<str>, Entity>,
    characters: LtMap<Arc<str>, Entity>,
    places: LtMap<Arc<str>, Entity>,
}

impl WorldState {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    const fn group(&self, kind: EntityKind) -> &LtMap<Arc<str>, Entity> {
        match kind {
            EntityKind::Item => &self.items,
            EntityKind::Character => &self.characters,
            EntityKind::Place => &self.places,
        }
    }

    fn group_mut(&mut self, kind: EntityKind) -> &mut LtMap<Arc<str>, Entity> {
        match kind {
            EntityKind::Item => &mut self.items,
            EntityKind::Character => &mut self.characters,
            EntityKind::Place => &mut self.places,
        }
    }

    /// Adds an entity, replacing any entity of the same kind and id.
    ///
    /// Returns the replaced entity. Replacing a live entity is logged.
    pub fn add_entity(&mut self, entity: Entity) -> Option<Entity> {
        let key: Arc<str> = entity.id().into();
        let replaced = self.group_mut(entity.kind()).set(key, entity);
        if let Some(old) = &replaced {
            if !old.is_destroyed() {
                tracing::warn!(entity = %old.typed_id(), "overwriting an existing entity");
            }
        }
        replaced
    }

    /// Finds an entity by id and kind.
    #[must_use]
    pub fn find_entity_by_id(&self, id: &str, kind: EntityKind, include_destroyed: bool) -> Option<&Entity> {
        self.group(kind)
            .get(id)
            .filter(|e| include_destroyed || !e.is_destroyed())
    }

    /// Finds an entity by typed reference.
    #[must_use]
    pub fn find_entity(&self, target: &TypedId, include_destroyed: bool) -> Option<&Entity> {
        self.find_entity_by_id(&target.id, target.kind, include_destroyed)
    }

    /// Finds an entity by id and kind for mutation.
    pub fn find_entity_by_id_mut(
        &mut self,
        id: &str,
        kind: EntityKind,
        include_destroyed: bool,
    ) -> Option<&mut Entity> {
        self.group_mut(kind)
            .get_mut(id)
            .filter(|e| include_destroyed || !e.is_destroyed())
    }

    /// Finds an entity by typed reference for mutation.
    pub fn find_entity_mut(&mut self, target: &TypedId, include_destroyed: bool) -> Option<&mut Entity> {
        self.find_entity_by_id_mut(&target.id, target.kind, include_destroyed)
    }

    /// Iterates every entity of one kind, destroyed ones included, in id order.
    pub fn entities(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.group(kind).values()
    }

    /// Returns the number of stored entities, destroyed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len() + self.characters.len() + self.places.len()
    }

    /// Returns true if no entity is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies one atomic operation.
    ///
    /// Failures are reported in the result; the world is left unchanged by
    /// a failed operation.
    pub fn apply(&mut self, op: &AtomicOperation) -> OperationResult {
        match op {
            AtomicOperation::Create { kind, id, attributes } => {
                if self.find_entity_by_id(id, *kind, false).is_some() {
                    return OperationResult::fail(op.clone(), format!("entity {kind}:{id} already exists"));
                }
                let mut entity = Entity::new(*kind, Arc::clone(id));
                for (name, value) in attributes {
                    entity.set(name, value.clone());
                }
                self.add_entity(entity);
                OperationResult::ok(op.clone())
            }
            AtomicOperation::Modify {
                kind,
                id,
                attribute,
                operator,
                value,
            } => {
                if value.is_null() {
                    return OperationResult::fail(op.clone(), "modify value cannot be null");
                }
                let Some(entity) = self.find_entity_by_id_mut(id, *kind, false) else {
                    return OperationResult::fail(op.clone(), format!("entity {kind}:{id} not found or destroyed"));
                };
                entity.modify(attribute, *operator, value);
                OperationResult::ok(op.clone())
            }
            AtomicOperation::Delete { kind, id } => {
                // Idempotent: deleting a missing entity still succeeds
                if let Some(entity) = self.find_entity_by_id_mut(id, *kind, false) {
                    entity.set_destroyed(true);
                }
                OperationResult::ok(op.clone())
            }
        }
    }

    /// Applies operations in order, allowing partial success.
    pub fn apply_all(&mut self, ops: &[AtomicOperation]) -> Vec<OperationResult> {
        ops.iter().map(|op| self.apply(op)).collect()
    }
}
