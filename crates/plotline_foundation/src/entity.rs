//! Entity kinds and typed entity references.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The closed set of entity kinds a world can hold.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EntityKind {
    /// A carryable object.
    Item,
    /// A person or creature.
    Character,
    /// A location.
    Place,
}

impl EntityKind {
    /// Every kind, in storage order.
    pub const ALL: [Self; 3] = [Self::Item, Self::Character, Self::Place];

    /// Returns the canonical name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Item => "Item",
            Self::Character => "Character",
            Self::Place => "Place",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Item" | "item" => Ok(Self::Item),
            "Character" | "character" => Ok(Self::Character),
            "Place" | "place" => Ok(Self::Place),
            other => Err(Error::bad_request(format!("unknown entity kind: {other}"))),
        }
    }
}

/// A reference to an entity by kind and id.
///
/// Typed references are plain values: they do not own the target and may
/// dangle if the target is never created.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TypedId {
    /// Kind of the target entity.
    pub kind: EntityKind,
    /// Id of the target entity, unique within its kind.
    pub id: Arc<str>,
}

impl TypedId {
    /// Creates a new typed reference.
    #[must_use]
    pub fn new(kind: EntityKind, id: impl Into<Arc<str>>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for an item reference.
    #[must_use]
    pub fn item(id: impl Into<Arc<str>>) -> Self {
        Self::new(EntityKind::Item, id)
    }

    /// Shorthand for a character reference.
    #[must_use]
    pub fn character(id: impl Into<Arc<str>>) -> Self {
        Self::new(EntityKind::Character, id)
    }

    /// Shorthand for a place reference.
    #[must_use]
    pub fn place(id: impl Into<Arc<str>>) -> Self {
        Self::new(EntityKind::Place, id)
    }
}

impl fmt::Display for TypedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
