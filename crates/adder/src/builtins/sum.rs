//! The `sum`, `all`, and `any` builtins.

use crate::{
    args::ArgValues,
    evaluate::Evaluator,
    exception::{ExcType, RunResult},
    expressions::Operator,
    resource::ResourceTracker,
    value::{Value, binary_number_op, num_to_value, numeric_of},
};

/// `sum(iterable, start=0)`; summing an empty iterable yields the start.
pub(crate) fn builtin_sum<T: ResourceTracker>(ev: &mut Evaluator<'_, T>, mut args: ArgValues) -> RunResult<Value> {
    let start_kwarg = args.pop_kwarg("start");
    let (iterable, positional_start) = args.get_one_two_args("sum")?;
    let start = start_kwarg.or(positional_start).unwrap_or(Value::Int(0));
    if ev.heap.str_value(start).is_some() {
        return Err(ExcType::type_error("sum() can't sum strings (use ''.join(seq) instead)"));
    }

    let items = ev.iterate_to_vec(iterable)?;
    let mut total = numeric_of(&ev.heap, start)
        .ok_or_else(|| ExcType::type_error(format!("unsupported start value for sum(): '{}'", start.type_name(&ev.heap))))?;
    for item in items {
        let Some(num) = numeric_of(&ev.heap, item) else {
            return Err(ExcType::type_error(format!(
                "unsupported operand type(s) for +: 'int' and '{}'",
                item.type_name(&ev.heap)
            )));
        };
        total = binary_number_op(Operator::Add, &total, &num)?;
    }
    num_to_value(&mut ev.heap, total)
}

/// `all(iterable)` - true when every element is truthy (vacuously true).
pub(crate) fn builtin_all<T: ResourceTracker>(ev: &mut Evaluator<'_, T>, args: ArgValues) -> RunResult<Value> {
    let iterable = args.get_one_arg("all")?;
    let iter = ev.get_iter(iterable)?;
    while let Some(item) = ev.iter_next(iter)? {
        if !ev.py_bool(item)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

/// `any(iterable)` - true when some element is truthy.
pub(crate) fn builtin_any<T: ResourceTracker>(ev: &mut Evaluator<'_, T>, args: ArgValues) -> RunResult<Value> {
    let iterable = args.get_one_arg("any")?;
    let iter = ev.get_iter(iterable)?;
    while let Some(item) = ev.iter_next(iter)? {
        if ev.py_bool(item)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}
