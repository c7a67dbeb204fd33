//! Per-block game settings, kept apart from the entity world.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use plotline_foundation::{LtMap, Value};

/// A flat key → value store of scalar settings.
///
/// An explicit [`Value::Null`] is stored as such and is distinct from an
/// absent key.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct GameState {
    settings: LtMap<Arc<str>, Value>,
}

impl GameState {
    /// Creates an empty game state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a setting.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// Writes a setting, returning the previous value.
    pub fn set(&mut self, key: impl Into<Arc<str>>, value: impl Into<Value>) -> Option<Value> {
        self.settings.set(key.into(), value.into())
    }

    /// Removes a setting. Returns true if it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.settings.take(key).is_some()
    }

    /// Returns a snapshot of every setting.
    #[must_use]
    pub fn all_settings(&self) -> LtMap<Arc<str>, Value> {
        self.settings.clone()
    }

    /// Returns the number of settings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// Returns true if there are no settings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

impl<K: Into<Arc<str>>, V: Into<Value>> FromIterator<(K, V)> for GameState {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            settings: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
