//! User-defined function values.

use std::rc::Rc;

use crate::{expressions::FunctionDef, heap::HeapId, signature::Signature, value::Value};

/// A function created by `def` or `lambda`.
///
/// Holds the shared body AST, the defining scope (the closure), the default
/// values evaluated at definition time, and - for methods - the cell that
/// receives the defining class once the `class` statement finishes, backing
/// zero-argument `super()`.
#[derive(Debug)]
pub(crate) struct Function {
    pub name: String,
    pub def: Rc<FunctionDef>,
    pub signature: Signature,
    /// The scope the function was defined in; calls chain their new scope to
    /// it. Class-body scopes are skipped at definition time.
    pub closure: HeapId,
    /// Default values in signature layout order.
    pub defaults: Vec<Value>,
    /// The `__class__` cell for functions defined directly in a class body.
    pub class_cell: Option<HeapId>,
}

impl Function {
    pub fn trace(&self, out: &mut Vec<HeapId>) {
        out.push(self.closure);
        for value in &self.defaults {
            value.trace(out);
        }
        if let Some(cell) = self.class_cell {
            out.push(cell);
        }
    }
}
