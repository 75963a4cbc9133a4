//! The `filter` builtin.

use crate::{
    args::ArgValues,
    evaluate::Evaluator,
    exception::RunResult,
    heap::HeapData,
    resource::ResourceTracker,
    types::Iter,
    value::Value,
};

/// `filter(func, iterable)` - a lazy iterator keeping items where
/// `func(item)` is truthy (or the item itself is truthy when `func` is
/// `None`).
pub(crate) fn builtin_filter<T: ResourceTracker>(ev: &mut Evaluator<'_, T>, args: ArgValues) -> RunResult<Value> {
    let (func, iterable) = args.get_two_args("filter")?;
    let inner = ev.get_iter_id(iterable)?;
    let iter = Iter::Filter { func, inner };
    Ok(Value::Ref(ev.heap.allocate(HeapData::Iter(iter))?))
}
