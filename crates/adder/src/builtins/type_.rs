//! The `type` builtin and the builtin type constructors.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::{
    args::ArgValues,
    evaluate::Evaluator,
    exception::{ExcType, RunResult},
    heap::HeapData,
    resource::ResourceTracker,
    types::{Dict, Instance, Key, Property, Range, Set, Type},
    value::Value,
};

/// Calls a builtin type as a constructor (`int("5")`, `list(x)`, ...).
pub(crate) fn call_type_constructor<T: ResourceTracker>(
    ev: &mut Evaluator<'_, T>,
    ty: Type,
    args: ArgValues,
) -> RunResult<Value> {
    match ty {
        Type::Type => {
            let value = args.get_one_arg("type")?;
            Ok(ev.type_value_of(value))
        }
        Type::Bool => match args.get_zero_one_args("bool")? {
            None => Ok(Value::Bool(false)),
            Some(value) => Ok(Value::Bool(ev.py_bool(value)?)),
        },
        Type::Int => construct_int(ev, args),
        Type::Float => construct_float(ev, args),
        Type::Str => match args.get_zero_one_args("str")? {
            None => ev.heap.new_str(String::new()),
            Some(value) => {
                let text = ev.py_str(value)?;
                ev.heap.new_str(text)
            }
        },
        Type::List => match args.get_zero_one_args("list")? {
            None => ev.heap.new_list(Vec::new()),
            Some(value) => {
                let items = ev.iterate_to_vec(value)?;
                ev.heap.new_list(items)
            }
        },
        Type::Tuple => match args.get_zero_one_args("tuple")? {
            None => ev.heap.new_tuple(Vec::new()),
            Some(value) => {
                let items = ev.iterate_to_vec(value)?;
                ev.heap.new_tuple(items)
            }
        },
        Type::Set => match args.get_zero_one_args("set")? {
            None => ev.heap.new_set(Set::new()),
            Some(value) => {
                let items = ev.iterate_to_vec(value)?;
                let mut set = Set::new();
                for item in items {
                    let key = Key::from_value(&ev.heap, item)?;
                    set.add(key, item);
                }
                ev.heap.new_set(set)
            }
        },
        Type::Dict => construct_dict(ev, args),
        Type::Range => {
            let (first, second, third) = args.get_up_to_three("range")?;
            let first = first.as_index(&ev.heap)?;
            let range = match (second, third) {
                (None, _) => Range::new(0, first, 1)?,
                (Some(stop), None) => Range::new(first, stop.as_index(&ev.heap)?, 1)?,
                (Some(stop), Some(step)) => {
                    Range::new(first, stop.as_index(&ev.heap)?, step.as_index(&ev.heap)?)?
                }
            };
            Ok(Value::Ref(ev.heap.allocate(HeapData::Range(range))?))
        }
        Type::Object => {
            args.check_zero_args("object")?;
            let instance = Instance::new(ev.object_class());
            Ok(Value::Ref(ev.heap.allocate(HeapData::Instance(instance))?))
        }
        Type::Property => construct_property(ev, args),
        Type::ClassMethod => {
            let func = args.get_one_arg("classmethod")?;
            Ok(Value::Ref(ev.heap.allocate(HeapData::ClassMethod(func))?))
        }
        Type::StaticMethod => {
            let func = args.get_one_arg("staticmethod")?;
            Ok(Value::Ref(ev.heap.allocate(HeapData::StaticMethod(func))?))
        }
        other => Err(ExcType::type_error(format!("cannot create '{other}' instances"))),
    }
}

fn construct_int<T: ResourceTracker>(ev: &mut Evaluator<'_, T>, args: ArgValues) -> RunResult<Value> {
    match args.get_zero_one_args("int")? {
        None => Ok(Value::Int(0)),
        Some(value) => match value {
            Value::Bool(b) => Ok(Value::Int(i64::from(b))),
            Value::Int(_) => Ok(value),
            Value::Float(f) => {
                if !f.is_finite() {
                    return Err(ExcType::overflow_error("cannot convert float infinity to integer"));
                }
                let truncated = f.trunc();
                if (i64::MIN as f64..=i64::MAX as f64).contains(&truncated) {
                    Ok(Value::Int(truncated as i64))
                } else {
                    ev.heap.new_int(BigInt::from(truncated as i128))
                }
            }
            Value::Ref(id) => match ev.heap.get(id) {
                HeapData::LongInt(_) => Ok(value),
                HeapData::Str(text) => {
                    let trimmed = text.trim().to_owned();
                    match trimmed.parse::<BigInt>() {
                        Ok(parsed) => ev.heap.new_int(parsed),
                        Err(_) => Err(ExcType::value_error(format!(
                            "invalid literal for int() with base 10: {}",
                            crate::value::string_repr(&trimmed)
                        ))),
                    }
                }
                data => Err(ExcType::type_error(format!(
                    "int() argument must be a string or a number, not '{}'",
                    data.type_of()
                ))),
            },
            other => Err(ExcType::type_error(format!(
                "int() argument must be a string or a number, not '{}'",
                other.type_name(&ev.heap)
            ))),
        },
    }
}

fn construct_float<T: ResourceTracker>(ev: &mut Evaluator<'_, T>, args: ArgValues) -> RunResult<Value> {
    match args.get_zero_one_args("float")? {
        None => Ok(Value::Float(0.0)),
        Some(value) => match value {
            Value::Bool(b) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
            Value::Int(i) => Ok(Value::Float(i as f64)),
            Value::Float(_) => Ok(value),
            Value::Ref(id) => match ev.heap.get(id) {
                HeapData::LongInt(big) => Ok(Value::Float(big.to_f64().unwrap_or(f64::INFINITY))),
                HeapData::Str(text) => match text.trim().parse::<f64>() {
                    Ok(parsed) => Ok(Value::Float(parsed)),
                    Err(_) => Err(ExcType::value_error(format!(
                        "could not convert string to float: {}",
                        crate::value::string_repr(text.trim())
                    ))),
                },
                data => Err(ExcType::type_error(format!(
                    "float() argument must be a string or a number, not '{}'",
                    data.type_of()
                ))),
            },
            other => Err(ExcType::type_error(format!(
                "float() argument must be a string or a number, not '{}'",
                other.type_name(&ev.heap)
            ))),
        },
    }
}

fn construct_dict<T: ResourceTracker>(ev: &mut Evaluator<'_, T>, args: ArgValues) -> RunResult<Value> {
    let kwargs = args.kwargs;
    let mut positional = args.args;
    if positional.len() > 1 {
        return Err(ExcType::type_error_at_most("dict", 1, positional.len()));
    }
    let mut dict = Dict::new();
    if let Some(source) = positional.pop() {
        match source {
            Value::Ref(id) if matches!(ev.heap.get(id), HeapData::Dict(_)) => {
                let entries: Vec<(Value, Value)> = match ev.heap.get(id) {
                    HeapData::Dict(existing) => existing.iter().collect(),
                    _ => unreachable!(),
                };
                for (key_value, value) in entries {
                    let key = Key::from_value(&ev.heap, key_value)?;
                    dict.set(key, key_value, value);
                }
            }
            _ => {
                // an iterable of key/value pairs
                let pairs = ev.iterate_to_vec(source)?;
                for pair in pairs {
                    let unpacked = ev.iterate_to_vec(pair)?;
                    if unpacked.len() != 2 {
                        return Err(ExcType::value_error(format!(
                            "dictionary update sequence element has length {}; 2 is required",
                            unpacked.len()
                        )));
                    }
                    let key = Key::from_value(&ev.heap, unpacked[0])?;
                    dict.set(key, unpacked[0], unpacked[1]);
                }
            }
        }
    }
    for (name, value) in kwargs {
        let key_value = ev.heap.new_str(name.clone())?;
        dict.set(Key::Str(name), key_value, value);
    }
    ev.heap.new_dict(dict)
}

fn construct_property<T: ResourceTracker>(ev: &mut Evaluator<'_, T>, mut args: ArgValues) -> RunResult<Value> {
    let mut property = Property::default();
    property.fget = args.pop_kwarg("fget");
    property.fset = args.pop_kwarg("fset");
    property.fdel = args.pop_kwarg("fdel");
    args.check_no_kwargs("property")?;
    let mut positional = args.args.into_iter();
    if property.fget.is_none() {
        property.fget = positional.next();
    }
    if property.fset.is_none() {
        property.fset = positional.next();
    }
    if property.fdel.is_none() {
        property.fdel = positional.next();
    }
    if positional.next().is_some() {
        return Err(ExcType::type_error_at_most("property", 3, 4));
    }
    // property(None) behaves like no getter at all
    for slot in [&mut property.fget, &mut property.fset, &mut property.fdel] {
        if *slot == Some(Value::None) {
            *slot = None;
        }
    }
    Ok(Value::Ref(ev.heap.allocate(HeapData::Property(property))?))
}
