//! Entities: typed game objects with core and dynamic attributes.
//!
//! Core attributes (`EntityId`, `EntityType`, `IsDestroyed`) live in fixed
//! fields. Everything else is an ordered name → [`Value`] map.

use std::sync::Arc;

use plotline_foundation::{EntityKind, FromValue, LtMap, Operator, TypedId, Value, apply};

/// Name of the immutable id attribute.
pub const ENTITY_ID: &str = "EntityId";
/// Name of the immutable kind attribute.
pub const ENTITY_TYPE: &str = "EntityType";
/// Name of the soft-delete flag.
pub const IS_DESTROYED: &str = "IsDestroyed";
/// All core attribute names.
pub const CORE_ATTRIBUTES: [&str; 3] = [ENTITY_ID, ENTITY_TYPE, IS_DESTROYED];
/// Item attribute that is always a non-negative integer.
pub const QUANTITY: &str = "quantity";

/// A typed game object.
///
/// Cloning is cheap and yields an independent entity: attribute containers
/// are persistent, so writes to a clone never show through to the original.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    kind: EntityKind,
    id: Arc<str>,
    destroyed: bool,
    attributes: LtMap<Arc<str>, Value>,
}

impl Entity {
    /// Creates an entity with no dynamic attributes.
    #[must_use]
    pub fn new(kind: EntityKind, id: impl Into<Arc<str>>) -> Self {
        Self {
            kind,
            id: id.into(),
            destroyed: false,
            attributes: LtMap::new(),
        }
    }

    /// Creates an item.
    #[must_use]
    pub fn item(id: impl Into<Arc<str>>) -> Self {
        Self::new(EntityKind::Item, id)
    }

    /// Creates a character.
    #[must_use]
    pub fn character(id: impl Into<Arc<str>>) -> Self {
        Self::new(EntityKind::Character, id)
    }

    /// Creates a place.
    #[must_use]
    pub fn place(id: impl Into<Arc<str>>) -> Self {
        Self::new(EntityKind::Place, id)
    }

    /// Builder-style attribute set.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value.into());
        self
    }

    /// Returns the entity kind.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns the entity id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns a typed reference to this entity.
    #[must_use]
    pub fn typed_id(&self) -> TypedId {
        TypedId::new(self.kind, Arc::clone(&self.id))
    }

    /// Returns true if the entity has been soft-deleted.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Sets the soft-delete flag.
    pub fn set_destroyed(&mut self, destroyed: bool) {
        self.destroyed = destroyed;
    }

    /// Reads an attribute, core or dynamic.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        match name {
            ENTITY_ID => Some(Value::String(Arc::clone(&self.id))),
            ENTITY_TYPE => Some(Value::from(self.kind.as_str())),
            IS_DESTROYED => Some(Value::Bool(self.destroyed)),
            _ => self.attributes.get(name).cloned(),
        }
    }

    /// Reads an attribute and converts it to `T`.
    ///
    /// Returns `None` if the attribute is absent or has another type.
    #[must_use]
    pub fn try_get<T: FromValue>(&self, name: &str) -> Option<T> {
        match name {
            ENTITY_ID | ENTITY_TYPE | IS_DESTROYED => self.get(name).and_then(|v| T::from_value(&v)),
            _ => self.attributes.get(name).and_then(T::from_value),
        }
    }

    /// Writes an attribute.
    ///
    /// `EntityId` and `EntityType` are immutable, `IsDestroyed` only
    /// accepts a bool and infinite or NaN floats are refused; rejected
    /// writes are logged and return false.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        if !value.is_finite() {
            tracing::warn!(entity = %self.typed_id(), attribute = name, "non-finite float, write ignored");
            return false;
        }
        match name {
            ENTITY_ID | ENTITY_TYPE => {
                tracing::warn!(entity = %self.typed_id(), attribute = name, "core attribute is immutable, write ignored");
                false
            }
            IS_DESTROYED => {
                if let Some(flag) = value.as_bool() {
                    self.destroyed = flag;
                    true
                } else {
                    tracing::warn!(
                        entity = %self.typed_id(),
                        got = value.type_name(),
                        "IsDestroyed requires a bool, write ignored"
                    );
                    false
                }
            }
            QUANTITY if self.kind == EntityKind::Item => {
                self.attributes.set(name.into(), normalize_quantity(&value));
                true
            }
            _ => {
                self.attributes.set(name.into(), value);
                true
            }
        }
    }

    /// Combines the stored value with `delta` under `op` and writes the result back.
    ///
    /// The write goes through [`set`](Self::set), so core-attribute and
    /// quantity rules still hold. `IsDestroyed` takes `delta` as is.
    pub fn modify(&mut self, name: &str, op: Operator, delta: &Value) -> bool {
        if name == IS_DESTROYED {
            return self.set(name, delta.clone());
        }
        let current = self.get(name);
        let next = apply(op, current.as_ref(), delta);
        self.set(name, next)
    }

    /// Removes a dynamic attribute.
    ///
    /// Core attributes cannot be removed and return false.
    pub fn delete(&mut self, name: &str) -> bool {
        if CORE_ATTRIBUTES.contains(&name) {
            tracing::warn!(entity = %self.typed_id(), attribute = name, "core attribute cannot be deleted");
            return false;
        }
        if self.attributes.take(name).is_none() {
            tracing::debug!(entity = %self.typed_id(), attribute = name, "deleted attribute was not present");
        }
        true
    }

    /// Returns the dynamic attributes only.
    #[must_use]
    pub const fn attributes(&self) -> &LtMap<Arc<str>, Value> {
        &self.attributes
    }

    /// Returns every attribute, core and dynamic, as one map.
    ///
    /// The map is a snapshot; changing it does not touch the entity.
    #[must_use]
    pub fn get_all(&self) -> LtMap<Arc<str>, Value> {
        let mut all = self.attributes.clone();
        for name in CORE_ATTRIBUTES {
            if let Some(value) = self.get(name) {
                all.set(name.into(), value);
            }
        }
        all
    }

    /// Rebuilds an entity from a full attribute map as produced by [`get_all`](Self::get_all).
    ///
    /// Returns `None` if `EntityId` or `EntityType` is missing or malformed.
    #[must_use]
    pub fn from_attributes(all: &LtMap<Arc<str>, Value>) -> Option<Self> {
        let id: Arc<str> = all.get(ENTITY_ID)?.extract()?;
        let kind = all.get(ENTITY_TYPE)?.as_str()?.parse().ok()?;
        let mut entity = Self::new(kind, id);
        entity.destroyed = all.get(IS_DESTROYED).and_then(Value::as_bool).unwrap_or(false);
        for (name, value) in all {
            if !CORE_ATTRIBUTES.contains(&name.as_ref()) {
                entity.set(name, value.clone());
            }
        }
        Some(entity)
    }
}

fn normalize_quantity(value: &Value) -> Value {
    match value {
        Value::Int(n) if *n >= 0 => Value::Int(*n),
        _ => {
            tracing::debug!(got = %value, "quantity coerced to 0");
            Value::Int(0)
        }
    }
}

#[cfg(feature = "serde")]
mod serde_support {
    use super::Entity;
    use plotline_foundation::{LtMap, Value};
    use serde::de;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::sync::Arc;

    impl Serialize for Entity {
        fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            // Persisted as the flat attribute map, core fields included
            self.get_all().serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for Entity {
        fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let all = LtMap::<Arc<str>, Value>::deserialize(deserializer)?;
            Entity::from_attributes(&all).ok_or_else(|| {
                de::Error::custom("entity attributes need a string EntityId and a valid EntityType")
            })
        }
    }
}
