//! The `map` builtin.

use crate::{
    args::ArgValues,
    evaluate::Evaluator,
    exception::{ExcType, RunResult},
    heap::HeapData,
    resource::ResourceTracker,
    types::Iter,
    value::Value,
};

/// `map(func, *iterables)` - a lazy iterator applying `func` to items drawn
/// from each iterable in parallel.
pub(crate) fn builtin_map<T: ResourceTracker>(ev: &mut Evaluator<'_, T>, args: ArgValues) -> RunResult<Value> {
    args.check_no_kwargs("map")?;
    let mut values = args.args.into_iter();
    let Some(func) = values.next() else {
        return Err(ExcType::type_error_at_least("map", 2, 0));
    };
    let mut inners = Vec::new();
    for iterable in values {
        inners.push(ev.get_iter_id(iterable)?);
    }
    if inners.is_empty() {
        return Err(ExcType::type_error_at_least("map", 2, 1));
    }
    let iter = Iter::Map { func, inners };
    Ok(Value::Ref(ev.heap.allocate(HeapData::Iter(iter))?))
}
