//! The insertion-ordered mapping type.
//!
//! Hashable values are lowered to an owned [`Key`] so hashing never touches
//! the heap: string and tuple keys copy their content, mutable values are
//! rejected, and instances key by identity. Integral floats and bools
//! normalize to ints so `1`, `1.0` and `True` share a slot.

use ahash::RandomState;
use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::{
    exception::{ExcType, RunResult},
    heap::{Heap, HeapData, HeapId},
    resource::ResourceTracker,
    value::Value,
};

/// Method names exposed on dicts.
pub(crate) const DICT_METHODS: &[&str] = &[
    "get", "keys", "values", "items", "update", "pop", "clear", "setdefault", "copy",
];

/// An owned, hashable form of a value used as a dict or set key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Key {
    None,
    Int(i64),
    Big(BigInt),
    /// Non-integral float, stored as bits.
    Float(u64),
    Str(String),
    Tuple(Vec<Key>),
    Builtin(crate::builtins::Builtins),
    /// Identity key for hashable heap values (instances, functions, classes).
    Ref(u32),
}

impl Key {
    /// Lowers a value to its key form, or raises `TypeError` for unhashable
    /// values.
    pub fn from_value(heap: &Heap<impl ResourceTracker>, value: Value) -> RunResult<Self> {
        match value {
            Value::None => Ok(Self::None),
            Value::Bool(b) => Ok(Self::Int(i64::from(b))),
            Value::Int(i) => Ok(Self::Int(i)),
            Value::Float(f) => {
                // integral floats collide with the equal int
                if f.fract() == 0.0 && (i64::MIN as f64..=i64::MAX as f64).contains(&f) {
                    Ok(Self::Int(f as i64))
                } else {
                    Ok(Self::Float(f.to_bits()))
                }
            }
            Value::NotImplemented => Ok(Self::Ref(u32::MAX)),
            Value::Builtin(builtin) => Ok(Self::Builtin(builtin)),
            Value::Ref(id) => match heap.get(id) {
                HeapData::Str(text) => Ok(Self::Str(text.clone())),
                HeapData::LongInt(big) => match big.to_i64() {
                    Some(small) => Ok(Self::Int(small)),
                    None => Ok(Self::Big(big.clone())),
                },
                HeapData::Tuple(tuple) => {
                    let mut keys = Vec::with_capacity(tuple.len());
                    for item in tuple.items() {
                        keys.push(Self::from_value(heap, *item)?);
                    }
                    Ok(Self::Tuple(keys))
                }
                HeapData::Instance(_)
                | HeapData::Exception(_)
                | HeapData::Function(_)
                | HeapData::BoundMethod(_)
                | HeapData::Class(_)
                | HeapData::Range(_) => Ok(Self::Ref(id.raw())),
                data => Err(ExcType::type_error_unhashable(data.type_of())),
            },
        }
    }
}

#[derive(Debug)]
struct DictEntry {
    key: Value,
    value: Value,
}

/// Insertion-ordered mapping from hashable values to values.
#[derive(Debug, Default)]
pub(crate) struct Dict {
    entries: IndexMap<Key, DictEntry, RandomState>,
}

impl Dict {
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

    pub fn get(&self, key: &Key) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value)
    }

    /// Inserts or overwrites; the original key value is kept on overwrite so
    /// insertion order is preserved.
    pub fn set(&mut self, key: Key, key_value: Value, value: Value) {
        match self.entries.get_mut(&key) {
            Some(entry) => entry.value = value,
            None => {
                self.entries.insert(
                    key,
                    DictEntry {
                        key: key_value,
                        value,
                    },
                );
            }
        }
    }

    /// Removes an entry, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &Key) -> Option<Value> {
        self.entries.shift_remove(key).map(|entry| entry.value)
    }

    /// The (key, value) pair at an insertion-order position.
    pub fn get_index(&self, index: usize) -> Option<(Value, Value)> {
        self.entries.get_index(index).map(|(_, entry)| (entry.key, entry.value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Value, Value)> + '_ {
        self.entries.values().map(|entry| (entry.key, entry.value))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn copy(&self) -> Self {
        let mut entries = IndexMap::with_capacity_and_hasher(self.entries.len(), RandomState::default());
        for (key, entry) in &self.entries {
            entries.insert(
                key.clone(),
                DictEntry {
                    key: entry.key,
                    value: entry.value,
                },
            );
        }
        Self { entries }
    }

    pub fn trace(&self, out: &mut Vec<HeapId>) {
        for entry in self.entries.values() {
            entry.key.trace(out);
            entry.value.trace(out);
        }
    }
}
