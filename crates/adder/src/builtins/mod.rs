//! Builtin functions, type constructors, and exception constructors.
//!
//! Each non-trivial builtin has its own submodule; the `Builtins` enum is
//! the value-level representation, so builtins stay immediate values and the
//! evaluator dispatches every call through [`Builtins::call`].

mod abs;
mod enumerate;
mod filter;
pub(crate) mod isinstance;
mod map;
mod min_max;
mod print;
mod sorted;
mod sum;
pub(crate) mod type_;
mod zip;

use std::str::FromStr;

use strum::{Display, EnumString};

use crate::{
    args::ArgValues,
    evaluate::Evaluator,
    exception::{ExcType, RunResult},
    heap::HeapData,
    resource::ResourceTracker,
    types::{
        ExcInstance, Type,
        dict::DICT_METHODS,
        list::LIST_METHODS,
        set::SET_METHODS,
        str::STR_METHODS,
        tuple::TUPLE_METHODS,
    },
    value::Value,
};

/// Enumerates every interpreter-native builtin callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Builtins {
    /// A builtin free function like `print`, `len`, `sorted`.
    Function(BuiltinFunction),
    /// A type constructor like `list`, `dict`, `int`.
    Type(Type),
    /// An exception type constructor like `ValueError`.
    ExcType(ExcType),
    /// An unbound method of a builtin type (e.g. `list.append` looked up as
    /// an attribute); when called, the receiver is the first argument.
    TypeMethod { ty: Type, method: &'static str },
}

/// Builtin free functions. The string form is the binding name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum BuiltinFunction {
    Print,
    Len,
    Repr,
    Iter,
    Next,
    Enumerate,
    Zip,
    Map,
    Filter,
    Sorted,
    Reversed,
    Sum,
    Min,
    Max,
    All,
    Any,
    IsInstance,
    Abs,
    Super,
    /// The implicit root class's no-op initializer, reached by cooperative
    /// `super().__init__()` chains. Not bindable by name.
    #[strum(serialize = "object.__init__")]
    ObjectInit,
}

/// Resolves a free name against the builtin namespace.
pub(crate) fn lookup_builtin(name: &str) -> Option<Value> {
    if name == "NotImplemented" {
        return Some(Value::NotImplemented);
    }
    if let Ok(function) = BuiltinFunction::from_str(name) {
        return Some(Value::Builtin(Builtins::Function(function)));
    }
    let ty = match name {
        "bool" => Type::Bool,
        "int" => Type::Int,
        "float" => Type::Float,
        "str" => Type::Str,
        "list" => Type::List,
        "tuple" => Type::Tuple,
        "dict" => Type::Dict,
        "set" => Type::Set,
        "range" => Type::Range,
        "object" => Type::Object,
        "type" => Type::Type,
        "property" => Type::Property,
        "classmethod" => Type::ClassMethod,
        "staticmethod" => Type::StaticMethod,
        _ => {
            return ExcType::from_str(name)
                .ok()
                .map(|exc| Value::Builtin(Builtins::ExcType(exc)));
        }
    };
    Some(Value::Builtin(Builtins::Type(ty)))
}

/// Looks up a native method on a builtin type's method table.
pub(crate) fn type_method(ty: Type, name: &str) -> Option<&'static str> {
    let table: &[&str] = match ty {
        Type::List => LIST_METHODS,
        Type::Tuple => TUPLE_METHODS,
        Type::Dict => DICT_METHODS,
        Type::Set => SET_METHODS,
        Type::Str => STR_METHODS,
        _ => &[],
    };
    table.iter().find(|method| **method == name).copied()
}

impl Builtins {
    /// The type tag of the builtin value itself.
    pub fn type_of(self) -> Type {
        match self {
            Self::Function(_) | Self::TypeMethod { .. } => Type::BuiltinFunction,
            Self::Type(_) | Self::ExcType(_) => Type::Type,
        }
    }

    /// The repr of this builtin.
    pub fn repr(self) -> String {
        match self {
            Self::Function(function) => format!("<built-in function {function}>"),
            Self::Type(ty) => format!("<class '{ty}'>"),
            Self::ExcType(exc) => format!("<class '{exc}'>"),
            Self::TypeMethod { ty, method } => format!("<method '{method}' of '{ty}' objects>"),
        }
    }

    /// Calls this builtin with the given arguments.
    pub fn call<T: ResourceTracker>(self, ev: &mut Evaluator<'_, T>, args: ArgValues) -> RunResult<Value> {
        match self {
            Self::Function(function) => function.call(ev, args),
            Self::Type(ty) => type_::call_type_constructor(ev, ty, args),
            Self::ExcType(exc) => call_exc_constructor(ev, exc, args),
            Self::TypeMethod { ty, method } => {
                let mut args = args;
                if args.args.is_empty() {
                    return Err(ExcType::type_error(format!(
                        "descriptor '{method}' of '{ty}' object needs an argument"
                    )));
                }
                let receiver = args.args.remove(0);
                ev.call_builtin_method(receiver, ty, method, args)
            }
        }
    }
}

impl BuiltinFunction {
    fn call<T: ResourceTracker>(self, ev: &mut Evaluator<'_, T>, args: ArgValues) -> RunResult<Value> {
        match self {
            Self::Print => print::builtin_print(ev, args),
            Self::Len => {
                let value = args.get_one_arg("len")?;
                let len = ev.py_len(value)?;
                Ok(Value::Int(len as i64))
            }
            Self::Repr => {
                let value = args.get_one_arg("repr")?;
                let repr = ev.py_repr(value)?;
                ev.heap.new_str(repr)
            }
            Self::Iter => {
                let value = args.get_one_arg("iter")?;
                ev.get_iter(value)
            }
            Self::Next => {
                let (iter, default) = args.get_one_two_args("next")?;
                match ev.iter_next(iter)? {
                    Some(value) => Ok(value),
                    None => default.ok_or_else(ExcType::stop_iteration),
                }
            }
            Self::Enumerate => enumerate::builtin_enumerate(ev, args),
            Self::Zip => zip::builtin_zip(ev, args),
            Self::Map => map::builtin_map(ev, args),
            Self::Filter => filter::builtin_filter(ev, args),
            Self::Sorted => sorted::builtin_sorted(ev, args),
            Self::Reversed => sorted::builtin_reversed(ev, args),
            Self::Sum => sum::builtin_sum(ev, args),
            Self::Min => min_max::builtin_min_max(ev, args, true),
            Self::Max => min_max::builtin_min_max(ev, args, false),
            Self::All => sum::builtin_all(ev, args),
            Self::Any => sum::builtin_any(ev, args),
            Self::IsInstance => isinstance::builtin_isinstance(ev, args),
            Self::Abs => abs::builtin_abs(ev, args),
            Self::Super => ev.call_zero_arg_super(args),
            Self::ObjectInit => {
                if args.args.len() != 1 || !args.kwargs.is_empty() {
                    return Err(ExcType::type_error(
                        "object.__init__() takes exactly one argument (the instance to initialize)",
                    ));
                }
                Ok(Value::None)
            }
        }
    }
}

/// Constructs a builtin exception instance, e.g. `ValueError("boom")`.
fn call_exc_constructor<T: ResourceTracker>(
    ev: &mut Evaluator<'_, T>,
    exc: ExcType,
    args: ArgValues,
) -> RunResult<Value> {
    args.check_no_kwargs(exc.into())?;
    let instance = ExcInstance::new(exc, None, args.args.into_vec());
    Ok(Value::Ref(ev.heap.allocate(HeapData::Exception(instance))?))
}

