//! The `min` and `max` builtins, sharing one implementation.

use crate::{
    args::ArgValues,
    evaluate::Evaluator,
    exception::{ExcType, RunResult},
    resource::ResourceTracker,
    value::Value,
};

/// `min(iterable)`, `min(a, b, ...)` and the `max` counterparts, with an
/// optional `key` function and `default` for empty iterables.
pub(crate) fn builtin_min_max<T: ResourceTracker>(
    ev: &mut Evaluator<'_, T>,
    mut args: ArgValues,
    is_min: bool,
) -> RunResult<Value> {
    let name = if is_min { "min" } else { "max" };
    let key = match args.pop_kwarg("key") {
        None | Some(Value::None) => None,
        Some(value) => Some(value),
    };
    let default = args.pop_kwarg("default");
    args.check_no_kwargs(name)?;

    let candidates: Vec<Value> = match args.args.len() {
        0 => return Err(ExcType::type_error_at_least(name, 1, 0)),
        1 => ev.iterate_to_vec(args.args[0])?,
        _ => args.args.into_vec(),
    };
    if candidates.is_empty() {
        return default.ok_or_else(|| ExcType::value_error(format!("{name}() arg is an empty sequence")));
    }

    let mut best = candidates[0];
    let mut best_key = match key {
        Some(func) => ev.call_value(func, crate::args::ArgValues::one(best))?,
        None => best,
    };
    for candidate in &candidates[1..] {
        let candidate_key = match key {
            Some(func) => ev.call_value(func, crate::args::ArgValues::one(*candidate))?,
            None => *candidate,
        };
        let better = if is_min {
            ev.py_lt(candidate_key, best_key)?
        } else {
            ev.py_lt(best_key, candidate_key)?
        };
        if better {
            best = *candidate;
            best_key = candidate_key;
        }
    }
    Ok(best)
}
