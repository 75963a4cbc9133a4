//! The `zip` builtin.

use crate::{
    args::ArgValues,
    evaluate::Evaluator,
    exception::RunResult,
    heap::HeapData,
    resource::ResourceTracker,
    types::Iter,
    value::Value,
};

/// `zip(*iterables)` - a lazy iterator of tuples, stopping at the shortest
/// input.
pub(crate) fn builtin_zip<T: ResourceTracker>(ev: &mut Evaluator<'_, T>, args: ArgValues) -> RunResult<Value> {
    args.check_no_kwargs("zip")?;
    let mut inners = Vec::with_capacity(args.args.len());
    for iterable in args.args {
        inners.push(ev.get_iter_id(iterable)?);
    }
    let iter = Iter::Zip { inners };
    Ok(Value::Ref(ev.heap.allocate(HeapData::Iter(iter))?))
}
