//! Built-in type tags.
//!
//! Every runtime value answers to one of these tags; user class instances
//! additionally carry their class. The tag is what `type(x)` reports for
//! built-ins and what native method tables are keyed on.

use strum::{Display, EnumString, IntoStaticStr};

/// Built-in value types.
///
/// The string form matches the user-visible type name (e.g. `Str` -> "str").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Type {
    /// The implicit root of every class hierarchy.
    Object,
    #[strum(serialize = "NoneType")]
    NoneType,
    Bool,
    Int,
    Float,
    Str,
    List,
    Tuple,
    Dict,
    Set,
    Range,
    Slice,
    Iterator,
    Function,
    /// A bound method (user function plus receiver).
    Method,
    #[strum(serialize = "builtin_function_or_method")]
    BuiltinFunction,
    Super,
    Property,
    ClassMethod,
    StaticMethod,
    /// The type of classes themselves.
    Type,
    #[strum(serialize = "NotImplementedType")]
    NotImplementedType,
    /// Closure cell, internal only.
    Cell,
    /// Lexical scope object, internal only.
    Scope,
}
