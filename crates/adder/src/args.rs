//! Argument values for builtin and native method calls.
//!
//! User-function calls bind through `Signature`; builtins take an
//! [`ArgValues`] and use the arity helpers, which produce the standard
//! `TypeError` messages on mismatch.

use smallvec::SmallVec;

use crate::{
    exception::{ExcType, RunResult},
    value::Value,
};

#[derive(Debug, Default)]
pub(crate) struct ArgValues {
    pub args: SmallVec<[Value; 4]>,
    pub kwargs: Vec<(String, Value)>,
}

impl ArgValues {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn positional(args: impl IntoIterator<Item = Value>) -> Self {
        Self {
            args: args.into_iter().collect(),
            kwargs: Vec::new(),
        }
    }

    pub fn one(value: Value) -> Self {
        Self::positional([value])
    }

    pub fn two(first: Value, second: Value) -> Self {
        Self::positional([first, second])
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Removes and returns the named keyword argument, if present.
    pub fn pop_kwarg(&mut self, name: &str) -> Option<Value> {
        let index = self.kwargs.iter().position(|(key, _)| key == name)?;
        Some(self.kwargs.remove(index).1)
    }

    pub fn check_no_kwargs(&self, name: &str) -> RunResult<()> {
        if self.kwargs.is_empty() {
            Ok(())
        } else {
            Err(ExcType::type_error_no_kwargs(name))
        }
    }

    pub fn check_zero_args(self, name: &str) -> RunResult<()> {
        self.check_no_kwargs(name)?;
        if self.args.is_empty() {
            Ok(())
        } else {
            Err(ExcType::type_error_arg_count(name, 0, self.args.len()))
        }
    }

    pub fn get_one_arg(self, name: &str) -> RunResult<Value> {
        self.check_no_kwargs(name)?;
        let mut args = self.args;
        if args.len() == 1 {
            Ok(args.remove(0))
        } else {
            Err(ExcType::type_error_arg_count(name, 1, args.len()))
        }
    }

    pub fn get_two_args(self, name: &str) -> RunResult<(Value, Value)> {
        self.check_no_kwargs(name)?;
        let mut args = self.args;
        if args.len() == 2 {
            let second = args.remove(1);
            let first = args.remove(0);
            Ok((first, second))
        } else {
            Err(ExcType::type_error_arg_count(name, 2, args.len()))
        }
    }

    pub fn get_one_two_args(self, name: &str) -> RunResult<(Value, Option<Value>)> {
        self.check_no_kwargs(name)?;
        let mut args = self.args;
        match args.len() {
            1 => Ok((args.remove(0), None)),
            2 => {
                let second = args.remove(1);
                Ok((args.remove(0), Some(second)))
            }
            0 => Err(ExcType::type_error_at_least(name, 1, 0)),
            n => Err(ExcType::type_error_at_most(name, 2, n)),
        }
    }

    pub fn get_zero_one_args(self, name: &str) -> RunResult<Option<Value>> {
        self.check_no_kwargs(name)?;
        let mut args = self.args;
        match args.len() {
            0 => Ok(None),
            1 => Ok(Some(args.remove(0))),
            n => Err(ExcType::type_error_at_most(name, 1, n)),
        }
    }

    /// One to three positional arguments, as used by `range`.
    pub fn get_up_to_three(self, name: &str) -> RunResult<(Value, Option<Value>, Option<Value>)> {
        self.check_no_kwargs(name)?;
        let total = self.args.len();
        if total == 0 {
            return Err(ExcType::type_error_at_least(name, 1, 0));
        }
        if total > 3 {
            return Err(ExcType::type_error_at_most(name, 3, total));
        }
        let mut args = self.args.into_iter();
        Ok((args.next().expect("checked non-empty"), args.next(), args.next()))
    }
}
