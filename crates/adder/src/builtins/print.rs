//! The `print` builtin.

use crate::{
    args::ArgValues,
    evaluate::Evaluator,
    exception::{ExcType, RunResult},
    resource::ResourceTracker,
    value::Value,
};

/// `print(*values, sep=' ', end='\n')`, writing through the run's
/// `PrintWriter`.
pub(crate) fn builtin_print<T: ResourceTracker>(ev: &mut Evaluator<'_, T>, mut args: ArgValues) -> RunResult<Value> {
    let sep = match args.pop_kwarg("sep") {
        None | Some(Value::None) => " ".to_owned(),
        Some(value) => match ev.heap.str_value(value) {
            Some(text) => text.to_owned(),
            None => {
                return Err(ExcType::type_error(format!(
                    "sep must be None or a string, not {}",
                    value.type_name(&ev.heap)
                )));
            }
        },
    };
    let end = match args.pop_kwarg("end") {
        None | Some(Value::None) => "\n".to_owned(),
        Some(value) => match ev.heap.str_value(value) {
            Some(text) => text.to_owned(),
            None => {
                return Err(ExcType::type_error(format!(
                    "end must be None or a string, not {}",
                    value.type_name(&ev.heap)
                )));
            }
        },
    };
    args.check_no_kwargs("print")?;

    let mut line = String::new();
    for (index, value) in args.args.iter().enumerate() {
        if index > 0 {
            line.push_str(&sep);
        }
        line.push_str(&ev.py_str(*value)?);
    }
    line.push_str(&end);
    ev.write_output(&line);
    Ok(Value::None)
}
