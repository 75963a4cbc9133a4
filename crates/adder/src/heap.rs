//! The arena heap: every mutable or structured value lives here.
//!
//! Values hold [`HeapId`]s into one `Heap` owned by the run. Reclamation is
//! mark-sweep from the root set (active scopes, evaluator temp roots, the
//! pending result), run only at statement boundaries where no unrooted
//! temporaries exist. This collects reference cycles (`a.b = a`,
//! `lst.append(lst)`) that refcounting alone would leak.

use num_bigint::BigInt;

use crate::{
    exception::RunResult,
    namespace::Scope,
    resource::ResourceTracker,
    types::{
        BoundMethod, ClassObject, Dict, ExcInstance, Function, Instance, Iter, List, Property, Range, Set, Slice,
        SuperProxy, Tuple, Type,
    },
    value::Value,
};

/// Number of allocations between garbage collection checks.
const GC_ALLOCATION_INTERVAL: usize = 10_000;

/// Index of a value in the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct HeapId(u32);

impl HeapId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The raw id, used for identity-keyed hashing.
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Payload of one heap slot.
#[derive(Debug)]
pub(crate) enum HeapData {
    Str(String),
    /// Integer outside the i64 range.
    LongInt(BigInt),
    List(List),
    Tuple(Tuple),
    Dict(Dict),
    Set(Set),
    Range(Range),
    Slice(Slice),
    Iter(Iter),
    Function(Function),
    BoundMethod(BoundMethod),
    Class(ClassObject),
    Instance(Instance),
    Super(SuperProxy),
    Property(Property),
    ClassMethod(Value),
    StaticMethod(Value),
    /// Closure cell for the `__class__` capture backing zero-arg `super()`.
    Cell(Value),
    Scope(Scope),
    /// A built-in exception instance (e.g. the value bound by `except ... as e`).
    Exception(ExcInstance),
}

impl HeapData {
    /// The built-in type tag of this data.
    pub fn type_of(&self) -> Type {
        match self {
            Self::Str(_) => Type::Str,
            Self::LongInt(_) => Type::Int,
            Self::List(_) => Type::List,
            Self::Tuple(_) => Type::Tuple,
            Self::Dict(_) => Type::Dict,
            Self::Set(_) => Type::Set,
            Self::Range(_) => Type::Range,
            Self::Slice(_) => Type::Slice,
            Self::Iter(_) => Type::Iterator,
            Self::Function(_) => Type::Function,
            Self::BoundMethod(_) => Type::Method,
            Self::Class(_) => Type::Type,
            // instances answer with their class name at higher levels
            Self::Instance(_) | Self::Exception(_) => Type::Object,
            Self::Super(_) => Type::Super,
            Self::Property(_) => Type::Property,
            Self::ClassMethod(_) => Type::ClassMethod,
            Self::StaticMethod(_) => Type::StaticMethod,
            Self::Cell(_) => Type::Cell,
            Self::Scope(_) => Type::Scope,
        }
    }

    /// Pushes the heap ids directly referenced by this data.
    fn trace(&self, out: &mut Vec<HeapId>) {
        match self {
            Self::Str(_) | Self::LongInt(_) | Self::Range(_) => {}
            Self::List(list) => list.trace(out),
            Self::Tuple(tuple) => tuple.trace(out),
            Self::Dict(dict) => dict.trace(out),
            Self::Set(set) => set.trace(out),
            Self::Slice(slice) => slice.trace(out),
            Self::Iter(iter) => iter.trace(out),
            Self::Function(function) => function.trace(out),
            Self::BoundMethod(method) => method.trace(out),
            Self::Class(class) => class.trace(out),
            Self::Instance(instance) => instance.trace(out),
            Self::Super(proxy) => proxy.trace(out),
            Self::Property(property) => property.trace(out),
            Self::ClassMethod(value) | Self::StaticMethod(value) | Self::Cell(value) => value.trace(out),
            Self::Scope(scope) => scope.trace(out),
            Self::Exception(exc) => exc.trace(out),
        }
    }
}

/// The arena of heap-allocated values, generic over the resource tracker so
/// limit checks compile away for unlimited runs.
#[derive(Debug)]
pub(crate) struct Heap<T: ResourceTracker> {
    slots: Vec<Option<HeapData>>,
    free: Vec<u32>,
    allocated_since_gc: usize,
    pub tracker: T,
}

impl<T: ResourceTracker> Heap<T> {
    pub fn new(tracker: T) -> Self {
        Self {
            slots: Vec::with_capacity(64),
            free: Vec::new(),
            allocated_since_gc: 0,
            tracker,
        }
    }

    pub fn allocate(&mut self, data: HeapData) -> RunResult<HeapId> {
        self.tracker.on_alloc()?;
        self.allocated_since_gc += 1;
        if let Some(index) = self.free.pop() {
            self.slots[index as usize] = Some(data);
            return Ok(HeapId(index));
        }
        let index = u32::try_from(self.slots.len()).expect("heap index fits u32");
        self.slots.push(Some(data));
        Ok(HeapId(index))
    }

    pub fn get(&self, id: HeapId) -> &HeapData {
        self.slots[id.index()].as_ref().expect("use of freed heap slot")
    }

    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        self.slots[id.index()].as_mut().expect("use of freed heap slot")
    }

    // --- allocation helpers ---

    pub fn new_str(&mut self, text: impl Into<String>) -> RunResult<Value> {
        Ok(Value::Ref(self.allocate(HeapData::Str(text.into()))?))
    }

    pub fn new_list(&mut self, items: Vec<Value>) -> RunResult<Value> {
        Ok(Value::Ref(self.allocate(HeapData::List(List::new(items)))?))
    }

    pub fn new_tuple(&mut self, items: Vec<Value>) -> RunResult<Value> {
        Ok(Value::Ref(self.allocate(HeapData::Tuple(Tuple::new(items)))?))
    }

    pub fn new_dict(&mut self, dict: Dict) -> RunResult<Value> {
        Ok(Value::Ref(self.allocate(HeapData::Dict(dict))?))
    }

    pub fn new_set(&mut self, set: Set) -> RunResult<Value> {
        Ok(Value::Ref(self.allocate(HeapData::Set(set))?))
    }

    pub fn new_iter(&mut self, iter: Iter) -> RunResult<Value> {
        Ok(Value::Ref(self.allocate(HeapData::Iter(iter))?))
    }

    /// Allocates an integer, demoting to an immediate when it fits in i64.
    pub fn new_int(&mut self, value: BigInt) -> RunResult<Value> {
        match i64::try_from(&value) {
            Ok(small) => Ok(Value::Int(small)),
            Err(_) => Ok(Value::Ref(self.allocate(HeapData::LongInt(value))?)),
        }
    }

    /// The string content of a `Str` value, if it is one.
    pub fn str_value(&self, value: Value) -> Option<&str> {
        match value {
            Value::Ref(id) => match self.get(id) {
                HeapData::Str(text) => Some(text),
                _ => None,
            },
            _ => None,
        }
    }

    /// Number of live objects on the heap, used to observe collection.
    pub fn live_objects(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether enough allocation has happened to make a sweep worthwhile.
    pub fn should_collect(&self) -> bool {
        self.allocated_since_gc >= GC_ALLOCATION_INTERVAL
    }

    /// Mark-sweep collection from the given roots.
    ///
    /// Safety of reclamation relies on the caller: every live value must be
    /// reachable from the roots, which holds at statement boundaries where
    /// the evaluator stores loop iterators and pending exceptions in its
    /// explicit root stacks.
    pub fn collect_garbage(&mut self, root_values: &[Value], root_ids: &[HeapId]) {
        self.allocated_since_gc = 0;
        let mut marks = vec![false; self.slots.len()];
        let mut stack: Vec<HeapId> = Vec::with_capacity(root_ids.len() + root_values.len());
        stack.extend_from_slice(root_ids);
        for value in root_values {
            value.trace(&mut stack);
        }
        while let Some(id) = stack.pop() {
            let mark = &mut marks[id.index()];
            if *mark {
                continue;
            }
            *mark = true;
            if let Some(data) = &self.slots[id.index()] {
                data.trace(&mut stack);
            }
        }
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_some() && !marks[index] {
                *slot = None;
                self.free.push(u32::try_from(index).expect("heap index fits u32"));
            }
        }
    }
}
