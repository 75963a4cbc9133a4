//! The unordered collection of unique hashable elements.
//!
//! Storage is insertion-ordered for deterministic iteration and repr, like
//! the dict it shares its key form with.

use ahash::RandomState;
use indexmap::IndexMap;

use crate::{heap::HeapId, types::dict::Key, value::Value};

/// Method names exposed on sets.
pub(crate) const SET_METHODS: &[&str] = &[
    "add",
    "remove",
    "discard",
    "union",
    "intersection",
    "difference",
    "copy",
    "clear",
];

#[derive(Debug, Default)]
pub(crate) struct Set {
    entries: IndexMap<Key, Value, RandomState>,
}

impl Set {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    /// Adds an element; a re-added element keeps its original position.
    pub fn add(&mut self, key: Key, value: Value) {
        self.entries.entry(key).or_insert(value);
    }

    pub fn discard(&mut self, key: &Key) -> bool {
        self.entries.shift_remove(key).is_some()
    }

    pub fn get_index(&self, index: usize) -> Option<Value> {
        self.entries.get_index(index).map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, Value)> + '_ {
        self.entries.iter().map(|(key, value)| (key, *value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> + '_ {
        self.entries.keys()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn copy(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }

    /// Structural equality: same elements, any order.
    pub fn set_eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len() && self.entries.keys().all(|key| other.entries.contains_key(key))
    }

    pub fn union_with(&self, other: &Self) -> Self {
        let mut out = self.copy();
        for (key, value) in &other.entries {
            out.add(key.clone(), *value);
        }
        out
    }

    pub fn intersection_with(&self, other: &Self) -> Self {
        let mut out = Self::new();
        for (key, value) in &self.entries {
            if other.entries.contains_key(key) {
                out.add(key.clone(), *value);
            }
        }
        out
    }

    pub fn difference_with(&self, other: &Self) -> Self {
        let mut out = Self::new();
        for (key, value) in &self.entries {
            if !other.entries.contains_key(key) {
                out.add(key.clone(), *value);
            }
        }
        out
    }

    pub fn symmetric_difference_with(&self, other: &Self) -> Self {
        let mut out = self.difference_with(other);
        for (key, value) in &other.entries {
            if !self.entries.contains_key(key) {
                out.add(key.clone(), *value);
            }
        }
        out
    }

    pub fn trace(&self, out: &mut Vec<HeapId>) {
        for value in self.entries.values() {
            value.trace(out);
        }
    }
}
