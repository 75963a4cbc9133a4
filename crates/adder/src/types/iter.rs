//! Iterator state for `for` loops and the lazy builtin iterators.
//!
//! Iterators are index-based rather than wrapping Rust iterators, so
//! advancing can take `&mut Heap` without borrow conflicts: the evaluator
//! reads the state, fetches the next value, then writes the advanced index
//! back. Iterators whose `next` may call user code (`map`, `filter`, user
//! `__next__` objects) are driven entirely by the evaluator.

use crate::{heap::HeapId, value::Value};

/// Iteration state, stored on the heap.
#[derive(Debug)]
pub(crate) enum Iter {
    /// Index cursor over a list or tuple (tolerates mutation during
    /// iteration, like the reference semantics).
    Seq { seq: Value, index: usize },
    /// Character cursor over a string, tracking the byte offset for O(1)
    /// stepping.
    Str { string: HeapId, byte: usize },
    Range { next: i64, stop: i64, step: i64 },
    DictKeys { dict: HeapId, index: usize },
    DictValues { dict: HeapId, index: usize },
    DictItems { dict: HeapId, index: usize },
    Set { set: HeapId, index: usize },
    /// Materialized elements (`reversed`, generator expressions, dict view
    /// snapshots).
    Elems { items: Vec<Value>, index: usize },
    Enumerate { inner: HeapId, count: i64 },
    Zip { inners: Vec<HeapId> },
    Map { func: Value, inners: Vec<HeapId> },
    /// `filter(func, iterable)`; a `None` func keeps truthy elements.
    Filter { func: Value, inner: HeapId },
    /// A user object driven through its `__next__` method.
    User { obj: Value },
}

impl Iter {
    pub fn trace(&self, out: &mut Vec<HeapId>) {
        match self {
            Self::Seq { seq, .. } => seq.trace(out),
            Self::Str { string, .. } => out.push(*string),
            Self::Range { .. } => {}
            Self::DictKeys { dict, .. } | Self::DictValues { dict, .. } | Self::DictItems { dict, .. } => {
                out.push(*dict);
            }
            Self::Set { set, .. } => out.push(*set),
            Self::Elems { items, .. } => {
                for item in items {
                    item.trace(out);
                }
            }
            Self::Enumerate { inner, .. } => out.push(*inner),
            Self::Zip { inners } => out.extend_from_slice(inners),
            Self::Map { func, inners } => {
                func.trace(out);
                out.extend_from_slice(inners);
            }
            Self::Filter { func, inner } => {
                func.trace(out);
                out.push(*inner);
            }
            Self::User { obj } => obj.trace(out),
        }
    }
}
