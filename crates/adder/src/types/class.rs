//! Class objects, instances, and the descriptor-flavored wrappers.
//!
//! `ClassObject` is created by executing a `class` statement; calling it
//! creates an `Instance`. Attribute lookup walks the MRO computed here by C3
//! linearization.
//!
//! # Scoping
//!
//! Class body scope is special: class body variables are not visible to
//! methods (methods use `self.x` or `ClassName.x`), but the body itself can
//! capture names from enclosing function scopes.

use std::borrow::Cow;

use ahash::RandomState;
use indexmap::IndexMap;

use crate::{
    exception::{ExcType, RunResult},
    heap::{Heap, HeapData, HeapId},
    resource::{MAX_MRO_LENGTH, ResourceTracker},
    value::Value,
};

/// A user-defined class.
#[derive(Debug)]
pub(crate) struct ClassObject {
    name: String,
    /// Direct base classes in declaration order. Empty means implicit root.
    bases: Vec<HeapId>,
    /// Method Resolution Order computed by C3 linearization, starting with
    /// this class itself and ending with the implicit root class.
    mro: Vec<HeapId>,
    /// Class namespace in insertion order (attributes and methods).
    namespace: IndexMap<String, Value, RandomState>,
    /// The built-in exception type this class derives from, if any; makes
    /// instances raisable and catchable through the built-in hierarchy.
    builtin_base: Option<ExcType>,
}

impl ClassObject {
    pub fn new(name: String, namespace: IndexMap<String, Value, RandomState>, bases: Vec<HeapId>) -> Self {
        Self {
            name,
            bases,
            mro: Vec::new(),
            namespace,
            builtin_base: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bases(&self) -> &[HeapId] {
        &self.bases
    }

    /// The MRO, the first element always being this class itself.
    pub fn mro(&self) -> &[HeapId] {
        &self.mro
    }

    /// Sets the MRO after allocation, since it includes the class's own id.
    pub fn set_mro(&mut self, mro: Vec<HeapId>) {
        self.mro = mro;
    }

    pub fn builtin_base(&self) -> Option<ExcType> {
        self.builtin_base
    }

    pub fn set_builtin_base(&mut self, exc_type: ExcType) {
        self.builtin_base = Some(exc_type);
    }

    pub fn get_attr(&self, name: &str) -> Option<Value> {
        self.namespace.get(name).copied()
    }

    pub fn set_attr(&mut self, name: String, value: Value) {
        self.namespace.insert(name, value);
    }

    pub fn namespace(&self) -> &IndexMap<String, Value, RandomState> {
        &self.namespace
    }

    pub fn trace(&self, out: &mut Vec<HeapId>) {
        out.extend_from_slice(&self.bases);
        out.extend_from_slice(&self.mro);
        for value in self.namespace.values() {
            value.trace(out);
        }
    }
}

/// An instance of a user-defined class.
#[derive(Debug)]
pub(crate) struct Instance {
    class: HeapId,
    attrs: IndexMap<String, Value, RandomState>,
}

impl Instance {
    pub fn new(class: HeapId) -> Self {
        Self {
            class,
            attrs: IndexMap::default(),
        }
    }

    pub fn class(&self) -> HeapId {
        self.class
    }

    pub fn get_attr(&self, name: &str) -> Option<Value> {
        self.attrs.get(name).copied()
    }

    pub fn set_attr(&mut self, name: String, value: Value) {
        self.attrs.insert(name, value);
    }

    pub fn delete_attr(&mut self, name: &str) -> bool {
        self.attrs.shift_remove(name).is_some()
    }

    pub fn trace(&self, out: &mut Vec<HeapId>) {
        out.push(self.class);
        for value in self.attrs.values() {
            value.trace(out);
        }
    }
}

/// A (function, receiver) pair; calling it prepends the receiver.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BoundMethod {
    pub func: Value,
    pub receiver: Value,
}

impl BoundMethod {
    pub fn trace(&self, out: &mut Vec<HeapId>) {
        self.func.trace(out);
        self.receiver.trace(out);
    }
}

/// The object returned by zero-argument `super()`: method lookup resumes
/// from the position after `start_class` in the receiver's MRO.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SuperProxy {
    pub start_class: HeapId,
    pub receiver: Value,
}

impl SuperProxy {
    pub fn trace(&self, out: &mut Vec<HeapId>) {
        out.push(self.start_class);
        self.receiver.trace(out);
    }
}

/// A property descriptor holding up to three callables.
///
/// With a setter present it is a data descriptor and shadows instance
/// attributes during lookup. `@foo.setter` produces a new property sharing
/// `fget` and substituting `fset`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Property {
    pub fget: Option<Value>,
    pub fset: Option<Value>,
    pub fdel: Option<Value>,
}

impl Property {
    pub fn getter(fget: Value) -> Self {
        Self {
            fget: Some(fget),
            ..Self::default()
        }
    }

    pub fn is_data_descriptor(&self) -> bool {
        self.fset.is_some()
    }

    pub fn trace(&self, out: &mut Vec<HeapId>) {
        for value in [self.fget, self.fset, self.fdel].into_iter().flatten() {
            value.trace(out);
        }
    }
}

/// A built-in exception instance, e.g. `ValueError("boom")` or the value
/// bound by `except ... as e`.
#[derive(Debug)]
pub(crate) struct ExcInstance {
    exc_type: ExcType,
    /// The user exception class, when constructed from one.
    class: Option<HeapId>,
    args: Vec<Value>,
}

impl ExcInstance {
    pub fn new(exc_type: ExcType, class: Option<HeapId>, args: Vec<Value>) -> Self {
        Self { exc_type, class, args }
    }

    pub fn exc_type(&self) -> ExcType {
        self.exc_type
    }

    pub fn class(&self) -> Option<HeapId> {
        self.class
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn class_name<'a>(&self, heap: &'a Heap<impl ResourceTracker>) -> Cow<'a, str> {
        match self.class {
            Some(id) => match heap.get(id) {
                HeapData::Class(class) => Cow::Owned(class.name().to_owned()),
                _ => Cow::Borrowed(self.exc_type.into()),
            },
            None => Cow::Borrowed(self.exc_type.into()),
        }
    }

    pub fn trace(&self, out: &mut Vec<HeapId>) {
        if let Some(class) = self.class {
            out.push(class);
        }
        for value in &self.args {
            value.trace(out);
        }
    }
}

/// C3 linearization of a class with the given direct bases.
///
/// `L[C] = [C] + merge(L[B1], ..., L[Bn], [B1, ..., Bn])` where `merge`
/// repeatedly takes the head of the first list whose head appears in no tail
/// of the other lists. Every linearization ends with `root` (the implicit
/// `object`-like class).
pub(crate) fn compute_c3_mro(
    self_id: HeapId,
    bases: &[HeapId],
    root: HeapId,
    heap: &Heap<impl ResourceTracker>,
) -> RunResult<Vec<HeapId>> {
    if bases.is_empty() {
        return Ok(vec![self_id, root]);
    }
    if bases.contains(&self_id) {
        return Err(ExcType::type_error("a class cannot inherit from itself"));
    }

    // collect the MROs of all base classes
    let mut linearizations: Vec<Vec<HeapId>> = Vec::with_capacity(bases.len() + 1);
    for &base_id in bases {
        if base_id == root {
            linearizations.push(vec![root]);
            continue;
        }
        match heap.get(base_id) {
            HeapData::Class(class) => linearizations.push(class.mro().to_vec()),
            _ => return Err(ExcType::type_error("bases must be classes")),
        }
    }
    // the list of bases itself is the last sequence to merge
    linearizations.push(bases.to_vec());

    let mut result = vec![self_id];
    loop {
        linearizations.retain(|l| !l.is_empty());
        if linearizations.is_empty() {
            break;
        }

        // a good head is one that appears in no tail of the other lists
        let mut found = None;
        for lin in &linearizations {
            let candidate = lin[0];
            let in_tail = linearizations.iter().any(|other| other[1..].contains(&candidate));
            if !in_tail {
                found = Some(candidate);
                break;
            }
        }

        match found {
            Some(next) => {
                result.push(next);
                for lin in &mut linearizations {
                    if lin.first() == Some(&next) {
                        lin.remove(0);
                    }
                }
            }
            None => {
                let base_names: Vec<String> = bases
                    .iter()
                    .map(|&id| match heap.get(id) {
                        HeapData::Class(class) => class.name().to_owned(),
                        _ => "?".to_owned(),
                    })
                    .collect();
                return Err(ExcType::type_error(format!(
                    "Cannot create a consistent method resolution order (MRO) for bases {}",
                    base_names.join(", ")
                )));
            }
        }

        if result.len() > MAX_MRO_LENGTH {
            return Err(ExcType::type_error("MRO exceeds maximum length"));
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::NoLimitTracker;

    fn new_class(heap: &mut Heap<NoLimitTracker>, name: &str, bases: Vec<HeapId>, root: HeapId) -> HeapId {
        let class = ClassObject::new(name.to_owned(), IndexMap::default(), bases.clone());
        let id = heap.allocate(HeapData::Class(class)).unwrap();
        let mro = compute_c3_mro(id, &bases, root, heap).unwrap();
        match heap.get_mut(id) {
            HeapData::Class(class) => class.set_mro(mro),
            _ => unreachable!(),
        }
        id
    }

    fn root(heap: &mut Heap<NoLimitTracker>) -> HeapId {
        let class = ClassObject::new("object".to_owned(), IndexMap::default(), Vec::new());
        let id = heap.allocate(HeapData::Class(class)).unwrap();
        match heap.get_mut(id) {
            HeapData::Class(class) => class.set_mro(vec![id]),
            _ => unreachable!(),
        }
        id
    }

    fn mro_of(heap: &Heap<NoLimitTracker>, id: HeapId) -> Vec<HeapId> {
        match heap.get(id) {
            HeapData::Class(class) => class.mro().to_vec(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn diamond_linearization() {
        let mut heap = Heap::new(NoLimitTracker);
        let object = root(&mut heap);
        let base = new_class(&mut heap, "Base", vec![], object);
        let first = new_class(&mut heap, "First", vec![base], object);
        let second = new_class(&mut heap, "Second", vec![base], object);
        let third = new_class(&mut heap, "Third", vec![first, second], object);
        assert_eq!(mro_of(&heap, third), vec![third, first, second, base, object]);
    }

    #[test]
    fn parent_order_preserved() {
        let mut heap = Heap::new(NoLimitTracker);
        let object = root(&mut heap);
        let a = new_class(&mut heap, "A", vec![], object);
        let b = new_class(&mut heap, "B", vec![], object);
        let c = new_class(&mut heap, "C", vec![a, b], object);
        assert_eq!(mro_of(&heap, c), vec![c, a, b, object]);
    }

    #[test]
    fn inconsistent_order_rejected() {
        let mut heap = Heap::new(NoLimitTracker);
        let object = root(&mut heap);
        let a = new_class(&mut heap, "A", vec![], object);
        let b = new_class(&mut heap, "B", vec![a], object);
        // class C(A, B) is not linearizable: A precedes B but B's MRO
        // requires B before A
        let class = ClassObject::new("C".to_owned(), IndexMap::default(), vec![a, b]);
        let id = heap.allocate(HeapData::Class(class)).unwrap();
        assert!(compute_c3_mro(id, &[a, b], object, &heap).is_err());
    }

    #[test]
    fn self_inheritance_rejected() {
        let mut heap = Heap::new(NoLimitTracker);
        let object = root(&mut heap);
        let class = ClassObject::new("C".to_owned(), IndexMap::default(), Vec::new());
        let id = heap.allocate(HeapData::Class(class)).unwrap();
        assert!(compute_c3_mro(id, &[id], object, &heap).is_err());
    }
}
