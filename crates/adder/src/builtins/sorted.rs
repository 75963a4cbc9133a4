//! The `sorted` and `reversed` builtins.

use crate::{
    args::ArgValues,
    evaluate::Evaluator,
    exception::{ExcType, RunResult},
    heap::HeapData,
    resource::ResourceTracker,
    types::Iter,
    value::Value,
};

/// `sorted(iterable, key=None, reverse=False)` - materializes, stable-sorts,
/// and returns a new list.
pub(crate) fn builtin_sorted<T: ResourceTracker>(ev: &mut Evaluator<'_, T>, mut args: ArgValues) -> RunResult<Value> {
    let key = match args.pop_kwarg("key") {
        None | Some(Value::None) => None,
        Some(value) => Some(value),
    };
    let reverse = match args.pop_kwarg("reverse") {
        None => false,
        Some(value) => ev.py_bool(value)?,
    };
    let iterable = args.get_one_arg("sorted")?;
    let mut items = ev.iterate_to_vec(iterable)?;
    ev.stable_sort(&mut items, key, reverse)?;
    ev.heap.new_list(items)
}

/// `reversed(x)` - an iterator over the reverse of a sequence.
pub(crate) fn builtin_reversed<T: ResourceTracker>(ev: &mut Evaluator<'_, T>, args: ArgValues) -> RunResult<Value> {
    let value = args.get_one_arg("reversed")?;
    // sequences only: iterating a dict or set backwards is a separate
    // protocol the corpus does not use
    let reversible = matches!(
        value,
        Value::Ref(id) if matches!(
            ev.heap.get(id),
            HeapData::List(_) | HeapData::Tuple(_) | HeapData::Str(_) | HeapData::Range(_)
        )
    );
    if !reversible {
        return Err(ExcType::type_error(format!(
            "'{}' object is not reversible",
            value.type_name(&ev.heap)
        )));
    }
    let mut items = ev.iterate_to_vec(value)?;
    items.reverse();
    let iter = Iter::Elems { items, index: 0 };
    Ok(Value::Ref(ev.heap.allocate(HeapData::Iter(iter))?))
}
