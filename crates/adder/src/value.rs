//! Primary value type and built-in operator semantics.
//!
//! `Value` uses a hybrid design: small immediate values (`Int`, `Bool`,
//! `None`, `Float`) are stored inline, while structured values live in the
//! arena and are referenced via `Ref(HeapId)`. The evaluator owns dunder
//! dispatch; this module supplies the native behavior of the built-in types
//! that dispatch falls back to.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::{
    builtins::Builtins,
    exception::{ExcType, RunResult},
    expressions::Operator,
    heap::{Heap, HeapData, HeapId},
    resource::ResourceTracker,
    types::Type,
};

/// A runtime value.
///
/// `Copy` is cheap and safe: heap payloads are owned by the arena, and
/// reclamation is by tracing rather than reference counting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Returned by binary dunder methods to signal "not supported for these
    /// operand types"; the evaluator then tries the reflected operation.
    NotImplemented,
    /// A builtin function, type constructor, exception type, or unbound
    /// builtin method.
    Builtin(Builtins),
    /// Reference to an arena-allocated value.
    Ref(HeapId),
}

impl Value {
    pub fn trace(&self, out: &mut Vec<HeapId>) {
        if let Self::Ref(id) = self {
            out.push(*id);
        }
    }

    /// The built-in type tag. Instances of user classes report `Object`;
    /// callers that need the class name use `type_name`.
    pub fn type_of(&self, heap: &Heap<impl ResourceTracker>) -> Type {
        match self {
            Self::None => Type::NoneType,
            Self::Bool(_) => Type::Bool,
            Self::Int(_) => Type::Int,
            Self::Float(_) => Type::Float,
            Self::NotImplemented => Type::NotImplementedType,
            Self::Builtin(b) => b.type_of(),
            Self::Ref(id) => heap.get(*id).type_of(),
        }
    }

    /// The user-visible type name, resolving instances to their class name.
    pub fn type_name(&self, heap: &Heap<impl ResourceTracker>) -> String {
        match self {
            Self::Ref(id) => match heap.get(*id) {
                HeapData::Instance(instance) => match heap.get(instance.class()) {
                    HeapData::Class(class) => class.name().to_owned(),
                    _ => Type::Object.to_string(),
                },
                HeapData::Exception(exc) => exc.class_name(heap).into_owned(),
                data => data.type_of().to_string(),
            },
            _ => self.type_of(heap).to_string(),
        }
    }

    /// Identity comparison (the `is` operator).
    ///
    /// Heap values compare by slot; immediates compare by value, which keeps
    /// `None`/`True`/`False` canonical and is unobservable for the other
    /// immutable immediates.
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Ref(a), Self::Ref(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }

    /// Truthiness of built-in values; `None` for instances, which dispatch
    /// through `__bool__`/`__len__` in the evaluator.
    pub fn builtin_truthy(&self, heap: &Heap<impl ResourceTracker>) -> Option<bool> {
        match self {
            Self::None => Some(false),
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::Float(f) => Some(*f != 0.0),
            Self::NotImplemented | Self::Builtin(_) => Some(true),
            Self::Ref(id) => match heap.get(*id) {
                HeapData::Str(s) => Some(!s.is_empty()),
                HeapData::LongInt(i) => Some(!i.is_zero()),
                HeapData::List(list) => Some(!list.is_empty()),
                HeapData::Tuple(tuple) => Some(!tuple.is_empty()),
                HeapData::Dict(dict) => Some(!dict.is_empty()),
                HeapData::Set(set) => Some(!set.is_empty()),
                HeapData::Range(range) => Some(range.len() != 0),
                HeapData::Instance(_) => None,
                _ => Some(true),
            },
        }
    }

    /// Converts to an index for sequence subscription.
    pub fn as_index(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<i64> {
        match self {
            Self::Bool(b) => Ok(i64::from(*b)),
            Self::Int(i) => Ok(*i),
            Self::Ref(id) => match heap.get(*id) {
                HeapData::LongInt(_) => Err(crate::exception::SimpleException::new_msg(
                    ExcType::IndexError,
                    "cannot fit 'int' into an index-sized integer",
                )
                .into()),
                data => Err(ExcType::type_error(format!(
                    "sequence indices must be integers, not '{}'",
                    data.type_of()
                ))),
            },
            other => Err(ExcType::type_error(format!(
                "sequence indices must be integers, not '{}'",
                other.type_of(heap)
            ))),
        }
    }
}

/// A number extracted from a value for arithmetic: the i64 fast path, the
/// promoted big integer, or a float.
#[derive(Debug, Clone)]
pub(crate) enum PyNum {
    Int(i64),
    Big(BigInt),
    Float(f64),
}

impl PyNum {
    fn as_f64(&self) -> f64 {
        match self {
            Self::Int(i) => *i as f64,
            Self::Big(b) => b.to_f64().unwrap_or(f64::INFINITY),
            Self::Float(f) => *f,
        }
    }

    fn to_big(&self) -> BigInt {
        match self {
            Self::Int(i) => BigInt::from(*i),
            Self::Big(b) => b.clone(),
            Self::Float(_) => unreachable!("to_big on float"),
        }
    }

    fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }
}

/// Extracts a number from a value. Bools count as ints.
pub(crate) fn numeric_of(heap: &Heap<impl ResourceTracker>, value: Value) -> Option<PyNum> {
    match value {
        Value::Bool(b) => Some(PyNum::Int(i64::from(b))),
        Value::Int(i) => Some(PyNum::Int(i)),
        Value::Float(f) => Some(PyNum::Float(f)),
        Value::Ref(id) => match heap.get(id) {
            HeapData::LongInt(b) => Some(PyNum::Big(b.clone())),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn num_to_value(heap: &mut Heap<impl ResourceTracker>, num: PyNum) -> RunResult<Value> {
    match num {
        PyNum::Int(i) => Ok(Value::Int(i)),
        PyNum::Big(b) => heap.new_int(b),
        PyNum::Float(f) => Ok(Value::Float(f)),
    }
}

/// Numeric comparison across int/bigint/float.
pub(crate) fn compare_numbers(left: &PyNum, right: &PyNum) -> Option<Ordering> {
    match (left, right) {
        (PyNum::Int(a), PyNum::Int(b)) => Some(a.cmp(b)),
        (PyNum::Float(_), _) | (_, PyNum::Float(_)) => left.as_f64().partial_cmp(&right.as_f64()),
        _ => Some(left.to_big().cmp(&right.to_big())),
    }
}

/// Applies a binary arithmetic/bitwise operator to two numbers.
pub(crate) fn binary_number_op(op: Operator, left: &PyNum, right: &PyNum) -> RunResult<PyNum> {
    if left.is_float() || right.is_float() {
        return float_binary_op(op, left.as_f64(), right.as_f64());
    }
    // integer fast path with promotion on overflow
    if let (PyNum::Int(a), PyNum::Int(b)) = (left, right) {
        let (a, b) = (*a, *b);
        let small = match op {
            Operator::Add => a.checked_add(b),
            Operator::Sub => a.checked_sub(b),
            Operator::Mult => a.checked_mul(b),
            Operator::FloorDiv => {
                if b == 0 {
                    return Err(ExcType::zero_division("integer division or modulo by zero"));
                }
                a.checked_div_euclid(b).map(|_| a.div_floor(&b))
            }
            Operator::Mod => {
                if b == 0 {
                    return Err(ExcType::zero_division("integer division or modulo by zero"));
                }
                Some(a.mod_floor(&b))
            }
            Operator::BitAnd => Some(a & b),
            Operator::BitOr => Some(a | b),
            Operator::BitXor => Some(a ^ b),
            _ => None,
        };
        if let Some(result) = small {
            return Ok(PyNum::Int(result));
        }
    }
    big_binary_op(op, &left.to_big(), &right.to_big())
}

fn big_binary_op(op: Operator, a: &BigInt, b: &BigInt) -> RunResult<PyNum> {
    let result = match op {
        Operator::Add => a + b,
        Operator::Sub => a - b,
        Operator::Mult => a * b,
        Operator::Div => {
            if b.is_zero() {
                return Err(ExcType::zero_division("division by zero"));
            }
            let quotient = a.to_f64().unwrap_or(f64::INFINITY) / b.to_f64().unwrap_or(f64::INFINITY);
            return Ok(PyNum::Float(quotient));
        }
        Operator::FloorDiv => {
            if b.is_zero() {
                return Err(ExcType::zero_division("integer division or modulo by zero"));
            }
            a.div_floor(b)
        }
        Operator::Mod => {
            if b.is_zero() {
                return Err(ExcType::zero_division("integer division or modulo by zero"));
            }
            a.mod_floor(b)
        }
        Operator::Pow => return big_pow(a, b),
        Operator::LShift => {
            let shift = shift_amount(b)?;
            a << shift
        }
        Operator::RShift => {
            let shift = shift_amount(b)?;
            a >> shift
        }
        Operator::BitAnd => a & b,
        Operator::BitOr => a | b,
        Operator::BitXor => a ^ b,
        Operator::And | Operator::Or => unreachable!("boolean operators are short-circuited"),
    };
    Ok(PyNum::Big(result))
}

fn shift_amount(b: &BigInt) -> RunResult<u64> {
    if b.is_negative() {
        return Err(ExcType::value_error("negative shift count"));
    }
    b.to_u64()
        .filter(|shift| *shift <= 1 << 20)
        .ok_or_else(|| ExcType::overflow_error("shift count too large"))
}

fn big_pow(base: &BigInt, exponent: &BigInt) -> RunResult<PyNum> {
    if exponent.is_negative() {
        let result = base
            .to_f64()
            .unwrap_or(f64::INFINITY)
            .powf(exponent.to_f64().unwrap_or(f64::NEG_INFINITY));
        return Ok(PyNum::Float(result));
    }
    let exponent = exponent
        .to_u32()
        .filter(|e| *e <= 1 << 20)
        .ok_or_else(|| ExcType::overflow_error("exponent too large"))?;
    Ok(PyNum::Big(base.pow(exponent)))
}

fn float_binary_op(op: Operator, a: f64, b: f64) -> RunResult<PyNum> {
    let result = match op {
        Operator::Add => a + b,
        Operator::Sub => a - b,
        Operator::Mult => a * b,
        Operator::Div => {
            if b == 0.0 {
                return Err(ExcType::zero_division("float division by zero"));
            }
            a / b
        }
        Operator::FloorDiv => {
            if b == 0.0 {
                return Err(ExcType::zero_division("float floor division by zero"));
            }
            (a / b).floor()
        }
        Operator::Mod => {
            if b == 0.0 {
                return Err(ExcType::zero_division("float modulo"));
            }
            a - b * (a / b).floor()
        }
        Operator::Pow => a.powf(b),
        Operator::LShift | Operator::RShift | Operator::BitAnd | Operator::BitOr | Operator::BitXor => {
            return Err(ExcType::type_error(format!(
                "unsupported operand type(s) for {}: 'float'",
                op.symbol()
            )));
        }
        Operator::And | Operator::Or => unreachable!("boolean operators are short-circuited"),
    };
    Ok(PyNum::Float(result))
}

/// Integer division semantics for `/` (always produces a float).
pub(crate) fn true_divide(left: &PyNum, right: &PyNum) -> RunResult<PyNum> {
    match (left, right) {
        (PyNum::Int(a), PyNum::Int(b)) => {
            if *b == 0 {
                return Err(ExcType::zero_division("division by zero"));
            }
            Ok(PyNum::Float(*a as f64 / *b as f64))
        }
        _ if left.is_float() || right.is_float() => float_binary_op(Operator::Div, left.as_f64(), right.as_f64()),
        _ => big_binary_op(Operator::Div, &left.to_big(), &right.to_big()),
    }
}

// --- formatting of scalars ---

/// Formats a float the way `repr`/`str` shows it (shortest round-trip form,
/// always with a decimal point or exponent).
pub(crate) fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    let mut buf = ryu::Buffer::new();
    buf.format(value).to_owned()
}

/// Quotes and escapes a string the way `repr` shows it: single quotes
/// preferred, double quotes when the text contains a single quote only.
pub(crate) fn string_repr(text: &str) -> String {
    let has_single = text.contains('\'');
    let has_double = text.contains('"');
    let quote = if has_single && !has_double { '"' } else { '\'' };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::NoLimitTracker;

    fn heap() -> Heap<NoLimitTracker> {
        Heap::new(NoLimitTracker)
    }

    #[test]
    fn int_overflow_promotes() {
        let result = binary_number_op(Operator::Mult, &PyNum::Int(i64::MAX), &PyNum::Int(2)).unwrap();
        assert!(matches!(result, PyNum::Big(_)));
    }

    #[test]
    fn floor_div_rounds_toward_negative_infinity() {
        let result = binary_number_op(Operator::FloorDiv, &PyNum::Int(-7), &PyNum::Int(2)).unwrap();
        assert!(matches!(result, PyNum::Int(-4)));
    }

    #[test]
    fn modulo_takes_sign_of_divisor() {
        let result = binary_number_op(Operator::Mod, &PyNum::Int(-7), &PyNum::Int(3)).unwrap();
        assert!(matches!(result, PyNum::Int(2)));
    }

    #[test]
    fn division_by_zero_raises() {
        assert!(true_divide(&PyNum::Int(1), &PyNum::Int(0)).is_err());
    }

    #[test]
    fn big_int_demotes_when_it_fits() {
        let mut heap = heap();
        let value = heap.new_int(BigInt::from(42)).unwrap();
        assert_eq!(value, Value::Int(42));
    }

    #[test]
    fn string_repr_quote_choice() {
        assert_eq!(string_repr("plain"), "'plain'");
        assert_eq!(string_repr("it's"), "\"it's\"");
        assert_eq!(string_repr("a\nb"), "'a\\nb'");
    }

    #[test]
    fn float_repr_keeps_decimal_point() {
        assert_eq!(float_repr(3.0), "3.0");
        assert_eq!(float_repr(2.5), "2.5");
    }
}
