//! Atomic operations against a world state, and their per-operation results.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use plotline_foundation::{EntityKind, LtMap, Operator, TypedId, Value};

/// A single create, modify or delete request against one entity.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AtomicOperation {
    /// Create a new entity with initial attributes.
    Create {
        /// Entity kind.
        kind: EntityKind,
        /// Entity id.
        id: Arc<str>,
        /// Attributes set on the new entity.
        attributes: LtMap<Arc<str>, Value>,
    },
    /// Modify one attribute of an existing entity.
    Modify {
        /// Entity kind.
        kind: EntityKind,
        /// Entity id.
        id: Arc<str>,
        /// Attribute to modify.
        attribute: Arc<str>,
        /// How to combine the delta with the stored value.
        operator: Operator,
        /// The delta.
        value: Value,
    },
    /// Soft-delete an entity.
    Delete {
        /// Entity kind.
        kind: EntityKind,
        /// Entity id.
        id: Arc<str>,
    },
}

impl AtomicOperation {
    /// Creates a create operation with no initial attributes.
    #[must_use]
    pub fn create(kind: EntityKind, id: impl Into<Arc<str>>) -> Self {
        Self::Create {
            kind,
            id: id.into(),
            attributes: LtMap::new(),
        }
    }

    /// Creates a create operation with initial attributes.
    #[must_use]
    pub fn create_with<K, V>(
        kind: EntityKind,
        id: impl Into<Arc<str>>,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<Arc<str>>,
        V: Into<Value>,
    {
        Self::Create {
            kind,
            id: id.into(),
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Creates a modify operation.
    #[must_use]
    pub fn modify(
        kind: EntityKind,
        id: impl Into<Arc<str>>,
        attribute: impl Into<Arc<str>>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        Self::Modify {
            kind,
            id: id.into(),
            attribute: attribute.into(),
            operator,
            value: value.into(),
        }
    }

    /// Creates a delete operation.
    #[must_use]
    pub fn delete(kind: EntityKind, id: impl Into<Arc<str>>) -> Self {
        Self::Delete {
            kind,
            id: id.into(),
        }
    }

    /// Returns the kind of the targeted entity.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Create { kind, .. } | Self::Modify { kind, .. } | Self::Delete { kind, .. } => *kind,
        }
    }

    /// Returns the id of the targeted entity.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Create { id, .. } | Self::Modify { id, .. } | Self::Delete { id, .. } => id,
        }
    }

    /// Returns a typed reference to the targeted entity.
    #[must_use]
    pub fn target(&self) -> TypedId {
        TypedId::new(self.kind(), self.id())
    }

    /// Returns the modified attribute, or `None` for whole-entity operations.
    #[must_use]
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::Modify { attribute, .. } => Some(attribute),
            Self::Create { .. } | Self::Delete { .. } => None,
        }
    }
}

impl fmt::Display for AtomicOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { kind, id, attributes } => {
                write!(f, "create {kind}:{id} ({} attributes)", attributes.len())
            }
            Self::Modify {
                kind,
                id,
                attribute,
                operator,
                value,
            } => write!(f, "modify {kind}:{id}.{attribute} {operator} {value}"),
            Self::Delete { kind, id } => write!(f, "delete {kind}:{id}"),
        }
    }
}

/// The outcome of applying one operation.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationResult {
    /// The operation that was applied.
    pub operation: AtomicOperation,
    /// Why the operation failed, if it did.
    pub error: Option<String>,
}

impl OperationResult {
    /// A successful result.
    #[must_use]
    pub const fn ok(operation: AtomicOperation) -> Self {
        Self {
            operation,
            error: None,
        }
    }

    /// A failed result.
    #[must_use]
    pub fn fail(operation: AtomicOperation, reason: impl Into<String>) -> Self {
        Self {
            operation,
            error: Some(reason.into()),
        }
    }

    /// Returns true if the operation succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Helpers over a batch of results.
pub trait OperationResults {
    /// Returns true if any result failed.
    fn any_failed(&self) -> bool;
    /// Returns the operations that succeeded, in order.
    fn succeeded(&self) -> Vec<AtomicOperation>;
    /// Returns the failure messages, in order.
    fn failures(&self) -> Vec<String>;
}

impl OperationResults for [OperationResult] {
    fn any_failed(&self) -> bool {
        self.iter().any(|r| !r.is_ok())
    }

    fn succeeded(&self) -> Vec<AtomicOperation> {
        self.iter()
            .filter(|r| r.is_ok())
            .map(|r| r.operation.clone())
            .collect()
    }

    fn failures(&self) -> Vec<String> {
        self.iter()
            .filter_map(|r| {
                r.error
                    .as_ref()
                    .map(|reason| format!("{}: {reason}", r.operation))
            })
            .collect()
    }
}
