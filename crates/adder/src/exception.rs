//! Error kinds and the raise channel.
//!
//! Runtime failures travel as [`RunError`] values until a `try` statement
//! catches them or they reach the embedder as a public [`Exception`].

use std::{
    borrow::Cow,
    fmt::{self, Display},
};

use strum::{Display, EnumString, IntoStaticStr};

use crate::{lex::CodeRange, value::Value};

/// Result type alias for operations that can produce a runtime error.
pub(crate) type RunResult<T> = Result<T, RunError>;

/// Exception types supported by the interpreter.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>`
/// implementations. The string representation matches the variant name exactly
/// (e.g., `ValueError` -> "ValueError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum ExcType {
    /// Primary exception class - matches any catchable exception in `except` checks.
    Exception,

    // --- ArithmeticError hierarchy ---
    /// Intermediate class for arithmetic errors.
    ArithmeticError,
    /// Subclass of ArithmeticError.
    OverflowError,
    /// Subclass of ArithmeticError.
    ZeroDivisionError,

    // --- LookupError hierarchy ---
    /// Intermediate class for lookup errors.
    LookupError,
    /// Subclass of LookupError.
    IndexError,
    /// Subclass of LookupError.
    KeyError,

    // --- RuntimeError hierarchy ---
    RuntimeError,
    /// Subclass of RuntimeError.
    NotImplementedError,
    /// Subclass of RuntimeError.
    RecursionError,

    // --- NameError hierarchy ---
    NameError,
    /// Subclass of NameError - for accessing a local variable before assignment.
    UnboundLocalError,

    // --- Standalone exception types ---
    AssertionError,
    AttributeError,
    ImportError,
    MemoryError,
    StopIteration,
    /// Base class for lexer/parser syntax failures.
    SyntaxError,
    /// Subclass of SyntaxError for invalid block indentation.
    IndentationError,
    TypeError,
    ValueError,
}

impl ExcType {
    /// Checks if this exception type is a subclass of another exception type.
    ///
    /// Implements the exception hierarchy for try/except matching:
    /// - `Exception` is the base class for all standard exceptions
    /// - `LookupError` is the base for `KeyError` and `IndexError`
    /// - `ArithmeticError` is the base for `ZeroDivisionError` and `OverflowError`
    /// - `RuntimeError` is the base for `RecursionError` and `NotImplementedError`
    /// - `NameError` is the base for `UnboundLocalError`
    /// - `SyntaxError` is the base for `IndentationError`
    ///
    /// Returns true if `self` would be caught by `except handler_type:`.
    #[must_use]
    pub fn is_subclass_of(self, handler_type: Self) -> bool {
        if self == handler_type {
            return true;
        }
        match handler_type {
            Self::Exception => true,
            Self::LookupError => matches!(self, Self::KeyError | Self::IndexError),
            Self::ArithmeticError => matches!(self, Self::ZeroDivisionError | Self::OverflowError),
            Self::RuntimeError => matches!(self, Self::RecursionError | Self::NotImplementedError),
            Self::NameError => matches!(self, Self::UnboundLocalError),
            Self::SyntaxError => matches!(self, Self::IndentationError),
            _ => false,
        }
    }

    pub(crate) fn type_error(msg: impl Into<String>) -> RunError {
        SimpleException::new_msg(Self::TypeError, msg.into()).into()
    }

    pub(crate) fn type_error_arg_count(name: &str, expected: usize, actual: usize) -> RunError {
        Self::type_error(format!(
            "{name}() takes {expected} argument{} ({actual} given)",
            if expected == 1 { "" } else { "s" }
        ))
    }

    pub(crate) fn type_error_at_least(name: &str, expected: usize, actual: usize) -> RunError {
        Self::type_error(format!(
            "{name}() takes at least {expected} argument{} ({actual} given)",
            if expected == 1 { "" } else { "s" }
        ))
    }

    pub(crate) fn type_error_at_most(name: &str, expected: usize, actual: usize) -> RunError {
        Self::type_error(format!(
            "{name}() takes at most {expected} argument{} ({actual} given)",
            if expected == 1 { "" } else { "s" }
        ))
    }

    pub(crate) fn type_error_no_kwargs(name: &str) -> RunError {
        Self::type_error(format!("{name}() takes no keyword arguments"))
    }

    pub(crate) fn type_error_unhashable(type_name: impl Display) -> RunError {
        Self::type_error(format!("unhashable type: '{type_name}'"))
    }

    pub(crate) fn type_error_not_callable(type_name: impl Display) -> RunError {
        Self::type_error(format!("'{type_name}' object is not callable"))
    }

    pub(crate) fn type_error_not_iterable(type_name: impl Display) -> RunError {
        Self::type_error(format!("'{type_name}' object is not iterable"))
    }

    pub(crate) fn value_error(msg: impl Into<String>) -> RunError {
        SimpleException::new_msg(Self::ValueError, msg.into()).into()
    }

    pub(crate) fn name_error(name: &str) -> RunError {
        SimpleException::new_msg(Self::NameError, format!("name '{name}' is not defined")).into()
    }

    pub(crate) fn attribute_error(type_name: impl Display, attr: &str) -> RunError {
        SimpleException::new_msg(
            Self::AttributeError,
            format!("'{type_name}' object has no attribute '{attr}'"),
        )
        .into()
    }

    pub(crate) fn index_error(type_name: impl Display) -> RunError {
        SimpleException::new_msg(Self::IndexError, format!("{type_name} index out of range")).into()
    }

    pub(crate) fn index_error_msg(msg: &'static str) -> RunError {
        SimpleException::new_msg(Self::IndexError, msg).into()
    }

    pub(crate) fn key_error(key_repr: String) -> RunError {
        SimpleException::new_msg(Self::KeyError, key_repr).into()
    }

    pub(crate) fn zero_division(msg: &'static str) -> RunError {
        SimpleException::new_msg(Self::ZeroDivisionError, msg).into()
    }

    pub(crate) fn overflow_error(msg: &'static str) -> RunError {
        SimpleException::new_msg(Self::OverflowError, msg).into()
    }

    pub(crate) fn stop_iteration() -> RunError {
        SimpleException::new(Self::StopIteration).into()
    }
}

/// A raised exception: the type, an optional message, and (for user raises)
/// the exception value itself.
///
/// Most interpreter-raised errors only carry a type and message. When user
/// code raises an exception *instance* (built-in or a user class deriving
/// from one), `value` preserves that instance so `except ... as e` binds the
/// original object.
#[derive(Debug, Clone)]
pub(crate) struct SimpleException {
    exc_type: ExcType,
    message: Option<String>,
    /// The raised exception object, if user code raised a concrete instance.
    value: Option<Value>,
    /// User exception class name (class deriving from a built-in error type).
    custom_class_name: Option<String>,
    /// Source position of the raise site, attached by the evaluator.
    position: Option<CodeRange>,
}

impl SimpleException {
    pub fn new(exc_type: ExcType) -> Self {
        Self {
            exc_type,
            message: None,
            value: None,
            custom_class_name: None,
            position: None,
        }
    }

    pub fn new_msg(exc_type: ExcType, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(exc_type)
        }
    }

    pub fn with_value(exc_type: ExcType, message: Option<String>, value: Value) -> Self {
        Self {
            message,
            value: Some(value),
            ..Self::new(exc_type)
        }
    }

    pub fn set_custom_class_name(&mut self, name: String) {
        self.custom_class_name = Some(name);
    }

    pub fn exc_type(&self) -> ExcType {
        self.exc_type
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn value(&self) -> Option<Value> {
        self.value
    }

    pub fn position(&self) -> Option<CodeRange> {
        self.position
    }

    pub fn set_position(&mut self, position: CodeRange) {
        if self.position.is_none() {
            self.position = Some(position);
        }
    }

    /// The class name shown to the user: the custom class name for user
    /// exception classes, otherwise the built-in type name.
    pub fn class_name(&self) -> &str {
        self.custom_class_name
            .as_deref()
            .unwrap_or_else(|| self.exc_type.into())
    }
}

/// Runtime error types that can occur during execution.
///
/// Three variants:
/// - `Internal`: bug in the interpreter implementation, not user code
/// - `Exc`: exception that can be caught by try/except
/// - `UncatchableExc`: exception from resource limits that CANNOT be caught,
///   so untrusted code cannot suppress limit violations
#[derive(Debug)]
pub(crate) enum RunError {
    Internal(Cow<'static, str>),
    Exc(Box<SimpleException>),
    UncatchableExc(Box<SimpleException>),
}

impl From<SimpleException> for RunError {
    fn from(exc: SimpleException) -> Self {
        Self::Exc(Box::new(exc))
    }
}

impl RunError {
    pub fn internal(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if this error is a StopIteration exception.
    pub fn is_stop_iteration(&self) -> bool {
        matches!(self, Self::Exc(exc) if exc.exc_type == ExcType::StopIteration)
    }

    /// Attaches a source position to the exception if it has none yet.
    pub fn with_position(mut self, position: CodeRange) -> Self {
        if let Self::Exc(exc) | Self::UncatchableExc(exc) = &mut self {
            exc.set_position(position);
        }
        self
    }

    /// Converts this runtime error to an [`Exception`] for the public API.
    ///
    /// Internal errors are converted to `RuntimeError` exceptions.
    #[must_use]
    pub fn into_exception(self, message_override: Option<String>) -> Exception {
        match self {
            Self::Exc(exc) | Self::UncatchableExc(exc) => {
                let message = message_override
                    .or_else(|| exc.message.clone())
                    .unwrap_or_default();
                Exception {
                    exc_type: exc.exc_type,
                    class_name: exc.class_name().to_owned(),
                    message,
                    loc: exc.position.map(|p| CodeLoc {
                        line: p.line,
                        column: p.column,
                    }),
                }
            }
            Self::Internal(err) => Exception {
                exc_type: ExcType::RuntimeError,
                class_name: "RuntimeError".to_owned(),
                message: format!("internal interpreter error: {err}"),
                loc: None,
            },
        }
    }
}

/// A line/column pair in the original source, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLoc {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A failure surfaced to the embedder: parse errors and uncaught raises.
#[derive(Debug, Clone)]
pub struct Exception {
    exc_type: ExcType,
    class_name: String,
    message: String,
    loc: Option<CodeLoc>,
}

impl Exception {
    pub(crate) fn syntax_error(message: impl Into<String>, loc: CodeLoc) -> Self {
        Self {
            exc_type: ExcType::SyntaxError,
            class_name: "SyntaxError".to_owned(),
            message: message.into(),
            loc: Some(loc),
        }
    }

    pub(crate) fn indentation_error(message: impl Into<String>, loc: CodeLoc) -> Self {
        Self {
            exc_type: ExcType::IndentationError,
            class_name: "IndentationError".to_owned(),
            message: message.into(),
            loc: Some(loc),
        }
    }

    /// The built-in error kind.
    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        self.exc_type
    }

    /// The exception class name as shown to the user (a user exception class
    /// name where applicable, otherwise the built-in kind name).
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The human-readable message, possibly empty.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Where the failure was detected, if known.
    #[must_use]
    pub fn loc(&self) -> Option<CodeLoc> {
        self.loc
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.class_name)?;
        } else {
            write!(f, "{}: {}", self.class_name, self.message)?;
        }
        if let Some(loc) = self.loc {
            write!(f, " ({loc})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Exception {}
