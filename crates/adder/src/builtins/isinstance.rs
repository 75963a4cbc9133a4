//! The `isinstance` builtin and class-membership checks.

use crate::{
    args::ArgValues,
    evaluate::Evaluator,
    exception::{ExcType, RunResult},
    heap::HeapData,
    resource::ResourceTracker,
    types::Type,
    value::Value,
};

pub(crate) fn builtin_isinstance<T: ResourceTracker>(ev: &mut Evaluator<'_, T>, args: ArgValues) -> RunResult<Value> {
    let (value, classinfo) = args.get_two_args("isinstance")?;
    Ok(Value::Bool(check_isinstance(ev, value, classinfo)?))
}

/// `isinstance(x, C)`: true iff `C` appears in the MRO of `type(x)`, with
/// built-in types matched by tag and the exception hierarchy honored.
pub(crate) fn check_isinstance<T: ResourceTracker>(
    ev: &mut Evaluator<'_, T>,
    value: Value,
    classinfo: Value,
) -> RunResult<bool> {
    match classinfo {
        Value::Builtin(crate::builtins::Builtins::Type(ty)) => Ok(matches_builtin_type(ev, value, ty)),
        Value::Builtin(crate::builtins::Builtins::ExcType(handler)) => Ok(matches_exc_type(ev, value, handler)),
        Value::Ref(id) => match ev.heap.get(id) {
            HeapData::Class(_) => Ok(class_in_mro(ev, value, id)),
            HeapData::Tuple(tuple) => {
                let entries: Vec<Value> = tuple.items().to_vec();
                for entry in entries {
                    if check_isinstance(ev, value, entry)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            _ => Err(ExcType::type_error(
                "isinstance() arg 2 must be a type or tuple of types",
            )),
        },
        _ => Err(ExcType::type_error(
            "isinstance() arg 2 must be a type or tuple of types",
        )),
    }
}

fn matches_builtin_type<T: ResourceTracker>(ev: &Evaluator<'_, T>, value: Value, ty: Type) -> bool {
    if ty == Type::Object {
        return true;
    }
    let value_type = value.type_of(&ev.heap);
    if value_type == ty {
        // instances of user classes answer to Object only via the branch above
        return !matches!(value, Value::Ref(id) if matches!(ev.heap.get(id), HeapData::Instance(_) | HeapData::Exception(_)));
    }
    // bool is a subtype of int
    ty == Type::Int && value_type == Type::Bool
}

fn matches_exc_type<T: ResourceTracker>(ev: &Evaluator<'_, T>, value: Value, handler: ExcType) -> bool {
    match value {
        Value::Ref(id) => match ev.heap.get(id) {
            HeapData::Exception(exc) => exc.exc_type().is_subclass_of(handler),
            HeapData::Instance(instance) => ev
                .builtin_base_of_class(instance.class())
                .is_some_and(|base| base.is_subclass_of(handler)),
            _ => false,
        },
        _ => false,
    }
}

/// Whether `class_id` appears in the MRO of `type(value)`.
fn class_in_mro<T: ResourceTracker>(ev: &Evaluator<'_, T>, value: Value, class_id: crate::heap::HeapId) -> bool {
    let value_class = match value {
        Value::Ref(id) => match ev.heap.get(id) {
            HeapData::Instance(instance) => Some(instance.class()),
            HeapData::Exception(exc) => exc.class(),
            _ => None,
        },
        _ => None,
    };
    let Some(value_class) = value_class else {
        return false;
    };
    match ev.heap.get(value_class) {
        HeapData::Class(class) => class.mro().contains(&class_id),
        _ => false,
    }
}
