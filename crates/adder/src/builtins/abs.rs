//! The `abs` builtin.

use num_traits::Signed;

use crate::{
    args::ArgValues,
    evaluate::Evaluator,
    exception::{ExcType, RunResult},
    resource::ResourceTracker,
    value::{PyNum, num_to_value, numeric_of},
    value::Value,
};

pub(crate) fn builtin_abs<T: ResourceTracker>(ev: &mut Evaluator<'_, T>, args: ArgValues) -> RunResult<Value> {
    let value = args.get_one_arg("abs")?;
    let Some(num) = numeric_of(&ev.heap, value) else {
        return Err(ExcType::type_error(format!(
            "bad operand type for abs(): '{}'",
            value.type_name(&ev.heap)
        )));
    };
    let result = match num {
        PyNum::Int(i) => match i.checked_abs() {
            Some(abs) => PyNum::Int(abs),
            None => PyNum::Big(num_bigint::BigInt::from(i).abs()),
        },
        PyNum::Big(b) => PyNum::Big(b.abs()),
        PyNum::Float(f) => PyNum::Float(f.abs()),
    };
    num_to_value(&mut ev.heap, result)
}
