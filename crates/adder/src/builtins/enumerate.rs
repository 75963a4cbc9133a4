//! The `enumerate` builtin.

use crate::{
    args::ArgValues,
    evaluate::Evaluator,
    exception::RunResult,
    heap::HeapData,
    resource::ResourceTracker,
    types::Iter,
    value::Value,
};

/// `enumerate(iterable, start=0)` - a lazy iterator of `(index, item)` pairs.
pub(crate) fn builtin_enumerate<T: ResourceTracker>(
    ev: &mut Evaluator<'_, T>,
    mut args: ArgValues,
) -> RunResult<Value> {
    let start = args.pop_kwarg("start");
    let (iterable, positional_start) = args.get_one_two_args("enumerate")?;
    let count = match start.or(positional_start) {
        Some(value) => value.as_index(&ev.heap)?,
        None => 0,
    };
    let inner = ev.get_iter_id(iterable)?;
    let iter = Iter::Enumerate { inner, count };
    Ok(Value::Ref(ev.heap.allocate(HeapData::Iter(iter))?))
}
