//! Lexical scopes.
//!
//! Scopes live on the heap so closures keep their defining environment alive
//! and cycles through captured environments stay collectable. The evaluator
//! resolves names by walking the parent chain: current scope, then each
//! enclosing function scope (class-body scopes are skipped), then the module
//! scope, then builtins.

use ahash::{AHashSet, RandomState};
use indexmap::IndexMap;

use crate::{heap::HeapId, value::Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    Module,
    Function,
    /// Class body: visible to its own statements, but skipped from the
    /// closure chain of functions defined inside it.
    Class,
    /// Comprehension body: bindings do not leak to the enclosing scope.
    Comprehension,
}

#[derive(Debug)]
pub(crate) struct Scope {
    kind: ScopeKind,
    bindings: IndexMap<String, Value, RandomState>,
    parent: Option<HeapId>,
    /// Names declared `global` in this scope.
    globals: AHashSet<String>,
    /// Names declared `nonlocal` in this scope.
    nonlocals: AHashSet<String>,
    /// For class-body scopes: the cell that receives the class object when
    /// the `class` statement completes (zero-arg `super()` support).
    class_cell: Option<HeapId>,
}

impl Scope {
    pub fn new(kind: ScopeKind, parent: Option<HeapId>) -> Self {
        Self {
            kind,
            bindings: IndexMap::default(),
            parent,
            globals: AHashSet::new(),
            nonlocals: AHashSet::new(),
            class_cell: None,
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<HeapId> {
        self.parent
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).copied()
    }

    pub fn set(&mut self, name: String, value: Value) {
        self.bindings.insert(name, value);
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.bindings.shift_remove(name).is_some()
    }

    pub fn declare_global(&mut self, name: String) {
        self.globals.insert(name);
    }

    pub fn declare_nonlocal(&mut self, name: String) {
        self.nonlocals.insert(name);
    }

    pub fn is_declared_global(&self, name: &str) -> bool {
        self.globals.contains(name)
    }

    pub fn is_declared_nonlocal(&self, name: &str) -> bool {
        self.nonlocals.contains(name)
    }

    pub fn class_cell(&self) -> Option<HeapId> {
        self.class_cell
    }

    pub fn set_class_cell(&mut self, cell: HeapId) {
        self.class_cell = Some(cell);
    }

    /// The bindings in insertion order; a finished class body's bindings
    /// become the class namespace.
    pub fn bindings(&self) -> &IndexMap<String, Value, RandomState> {
        &self.bindings
    }

    pub fn take_bindings(&mut self) -> IndexMap<String, Value, RandomState> {
        std::mem::take(&mut self.bindings)
    }

    pub fn trace(&self, out: &mut Vec<HeapId>) {
        for value in self.bindings.values() {
            value.trace(out);
        }
        if let Some(parent) = self.parent {
            out.push(parent);
        }
        if let Some(cell) = self.class_cell {
            out.push(cell);
        }
    }
}
