//! The public value type returned to the embedder.
//!
//! Unlike the internal `Value`, an `Object` owns all its data and needs no
//! heap. Conversion is recursive: containers become host-native collections
//! (dict pairs in insertion order), and values with no natural host form
//! collapse to a `Repr` string. Conversion never runs user code.

use num_bigint::BigInt;

use crate::{
    heap::{Heap, HeapData},
    resource::{MAX_DATA_RECURSION_DEPTH, ResourceTracker},
    value::{Value, float_repr},
};

/// A value converted out of the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    None,
    Bool(bool),
    /// Integer within the i64 range.
    Int(i64),
    /// Arbitrary-precision integer beyond i64.
    BigInt(BigInt),
    Float(f64),
    String(String),
    List(Vec<Object>),
    Tuple(Vec<Object>),
    /// Key/value pairs in insertion order.
    Dict(Vec<(Object, Object)>),
    Set(Vec<Object>),
    Range {
        start: i64,
        stop: i64,
        step: i64,
    },
    /// Output-only: a value with no direct host mapping (functions, classes,
    /// instances, iterators), rendered as its type-level repr.
    Repr(String),
}

impl Object {
    /// The type tag name, matching the language-level type names.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::BigInt(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "str",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Dict(_) => "dict",
            Self::Set(_) => "set",
            Self::Range { .. } => "range",
            Self::Repr(_) => "object",
        }
    }

    /// Recursively converts an internal value.
    pub(crate) fn from_value(value: Value, heap: &Heap<impl ResourceTracker>) -> Self {
        Self::from_value_depth(value, heap, 0)
    }

    fn from_value_depth(value: Value, heap: &Heap<impl ResourceTracker>, depth: usize) -> Self {
        if depth > MAX_DATA_RECURSION_DEPTH {
            return Self::Repr("...".to_owned());
        }
        match value {
            Value::None => Self::None,
            Value::Bool(b) => Self::Bool(b),
            Value::Int(i) => Self::Int(i),
            Value::Float(f) => Self::Float(f),
            Value::NotImplemented => Self::Repr("NotImplemented".to_owned()),
            Value::Builtin(builtin) => Self::Repr(builtin.repr()),
            Value::Ref(id) => match heap.get(id) {
                HeapData::Str(text) => Self::String(text.clone()),
                HeapData::LongInt(big) => Self::BigInt(big.clone()),
                HeapData::List(list) => Self::List(
                    list.items()
                        .iter()
                        .map(|item| Self::from_value_depth(*item, heap, depth + 1))
                        .collect(),
                ),
                HeapData::Tuple(tuple) => Self::Tuple(
                    tuple
                        .items()
                        .iter()
                        .map(|item| Self::from_value_depth(*item, heap, depth + 1))
                        .collect(),
                ),
                HeapData::Dict(dict) => Self::Dict(
                    dict.iter()
                        .map(|(key, value)| {
                            (
                                Self::from_value_depth(key, heap, depth + 1),
                                Self::from_value_depth(value, heap, depth + 1),
                            )
                        })
                        .collect(),
                ),
                HeapData::Set(set) => Self::Set(
                    set.iter()
                        .map(|(_, value)| Self::from_value_depth(value, heap, depth + 1))
                        .collect(),
                ),
                HeapData::Range(range) => Self::Range {
                    start: range.start,
                    stop: range.stop,
                    step: range.step,
                },
                HeapData::Function(function) => Self::Repr(format!("<function {}>", function.name)),
                HeapData::Class(class) => Self::Repr(format!("<class '{}'>", class.name())),
                HeapData::Instance(instance) => {
                    let name = match heap.get(instance.class()) {
                        HeapData::Class(class) => class.name().to_owned(),
                        _ => "object".to_owned(),
                    };
                    Self::Repr(format!("<{name} object>"))
                }
                HeapData::Exception(exc) => {
                    Self::Repr(format!("<{} exception>", exc.class_name(heap)))
                }
                data => Self::Repr(format!("<{} object>", data.type_of())),
            },
        }
    }
}

impl TryFrom<&Object> for i64 {
    type Error = String;

    fn try_from(object: &Object) -> Result<Self, Self::Error> {
        match object {
            Object::Int(i) => Ok(*i),
            Object::Bool(b) => Ok(Self::from(*b)),
            other => Err(format!("expected int, found {}", other.type_name())),
        }
    }
}

impl TryFrom<&Object> for f64 {
    type Error = String;

    fn try_from(object: &Object) -> Result<Self, Self::Error> {
        match object {
            Object::Float(f) => Ok(*f),
            Object::Int(i) => Ok(*i as Self),
            other => Err(format!("expected float, found {}", other.type_name())),
        }
    }
}

impl TryFrom<&Object> for bool {
    type Error = String;

    fn try_from(object: &Object) -> Result<Self, Self::Error> {
        match object {
            Object::Bool(b) => Ok(*b),
            other => Err(format!("expected bool, found {}", other.type_name())),
        }
    }
}

impl TryFrom<&Object> for String {
    type Error = String;

    fn try_from(object: &Object) -> Result<Self, Self::Error> {
        match object {
            Object::String(text) => Ok(text.clone()),
            other => Err(format!("expected str, found {}", other.type_name())),
        }
    }
}

impl std::fmt::Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::BigInt(big) => write!(f, "{big}"),
            Self::Float(value) => write!(f, "{}", float_repr(*value)),
            Self::String(text) => write!(f, "{text}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Tuple(items) => {
                write!(f, "(")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Self::Dict(pairs) => {
                write!(f, "{{")?;
                for (index, (key, value)) in pairs.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Self::Set(items) => {
                if items.is_empty() {
                    return write!(f, "set()");
                }
                write!(f, "{{")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
            Self::Range { start, stop, step } => {
                if *step == 1 {
                    write!(f, "range({start}, {stop})")
                } else {
                    write!(f, "range({start}, {stop}, {step})")
                }
            }
            Self::Repr(text) => write!(f, "{text}"),
        }
    }
}
