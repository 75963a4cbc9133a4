//! Function signatures and the argument binding algorithm.
//!
//! A signature can include positional-only parameters (before `/`),
//! positional-or-keyword parameters, `*args`, keyword-only parameters and
//! `**kwargs`. Default values are evaluated at definition time and stored on
//! the function in signature layout order:
//! `[pos_only defaults][args defaults][kw_only defaults]`, each group holding
//! only the parameters that have defaults, in declaration order.

use crate::{
    exception::{ExcType, RunResult},
    expressions::ParsedSignature,
    heap::{Heap, HeapData},
    resource::ResourceTracker,
    types::{Dict, Key, Tuple},
    value::Value,
};

#[derive(Debug, Clone, Default)]
pub(crate) struct Signature {
    pos_only: Vec<String>,
    /// Number of trailing positional-only parameters with defaults.
    pos_defaults_count: usize,
    args: Vec<String>,
    /// Number of trailing positional-or-keyword parameters with defaults.
    arg_defaults_count: usize,
    var_args: Option<String>,
    kw_only: Vec<String>,
    /// Per keyword-only parameter: whether it has a default.
    kw_has_default: Vec<bool>,
    var_kwargs: Option<String>,
}

impl Signature {
    pub fn from_parsed(parsed: &ParsedSignature) -> Self {
        Self {
            pos_only: parsed.pos_only.iter().map(|p| p.name.name.clone()).collect(),
            pos_defaults_count: parsed.pos_only.iter().filter(|p| p.default.is_some()).count(),
            args: parsed.args.iter().map(|p| p.name.name.clone()).collect(),
            arg_defaults_count: parsed.args.iter().filter(|p| p.default.is_some()).count(),
            var_args: parsed.var_args.as_ref().map(|id| id.name.clone()),
            kw_only: parsed.kw_only.iter().map(|p| p.name.name.clone()).collect(),
            kw_has_default: parsed.kw_only.iter().map(|p| p.default.is_some()).collect(),
            var_kwargs: parsed.var_kwargs.as_ref().map(|id| id.name.clone()),
        }
    }

    /// Number of positional parameter slots (excluding `*args`).
    fn positional_count(&self) -> usize {
        self.pos_only.len() + self.args.len()
    }

    fn positional_name(&self, index: usize) -> &str {
        if index < self.pos_only.len() {
            &self.pos_only[index]
        } else {
            &self.args[index - self.pos_only.len()]
        }
    }

    /// The default value for positional slot `index`, if it has one.
    fn positional_default<'v>(&self, index: usize, defaults: &'v [Value]) -> Option<&'v Value> {
        if index < self.pos_only.len() {
            let without_default = self.pos_only.len() - self.pos_defaults_count;
            index.checked_sub(without_default).map(|i| &defaults[i])
        } else {
            let arg_index = index - self.pos_only.len();
            let without_default = self.args.len() - self.arg_defaults_count;
            arg_index
                .checked_sub(without_default)
                .map(|i| &defaults[self.pos_defaults_count + i])
        }
    }

    fn kw_only_default<'v>(&self, index: usize, defaults: &'v [Value]) -> Option<&'v Value> {
        if !self.kw_has_default[index] {
            return None;
        }
        let offset = self.pos_defaults_count + self.arg_defaults_count;
        let among = self.kw_has_default[..index].iter().filter(|has| **has).count();
        Some(&defaults[offset + among])
    }

    /// Binds call arguments to parameters, producing the (name, value) pairs
    /// for the new function scope.
    ///
    /// Implements the standard algorithm: positional by position until
    /// `*args`, keywords matched by name, `**kwargs` absorbing the
    /// remainder, defaults filling what's missing.
    pub fn bind(
        &self,
        func_name: &str,
        defaults: &[Value],
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        heap: &mut Heap<impl ResourceTracker>,
    ) -> RunResult<Vec<(String, Value)>> {
        let positional_count = self.positional_count();
        let mut bound: Vec<Option<Value>> = vec![None; positional_count + self.kw_only.len()];

        // positional arguments fill positional slots; extras spill into *args
        let mut extra_positional = Vec::new();
        for (index, value) in args.into_iter().enumerate() {
            if index < positional_count {
                bound[index] = Some(value);
            } else {
                extra_positional.push(value);
            }
        }
        if !extra_positional.is_empty() && self.var_args.is_none() {
            return Err(ExcType::type_error(format!(
                "{func_name}() takes {positional_count} positional argument{} but {} were given",
                if positional_count == 1 { "" } else { "s" },
                positional_count + extra_positional.len(),
            )));
        }

        // keywords match positional-or-keyword and keyword-only names
        let mut extra_kwargs: Vec<(String, Value)> = Vec::new();
        for (key, value) in kwargs {
            let slot = self
                .args
                .iter()
                .position(|name| *name == key)
                .map(|i| self.pos_only.len() + i)
                .or_else(|| {
                    self.kw_only
                        .iter()
                        .position(|name| *name == key)
                        .map(|i| positional_count + i)
                });
            match slot {
                Some(slot) => {
                    if bound[slot].is_some() {
                        return Err(ExcType::type_error(format!(
                            "{func_name}() got multiple values for argument '{key}'"
                        )));
                    }
                    bound[slot] = Some(value);
                }
                None => {
                    if self.pos_only.contains(&key) && self.var_kwargs.is_none() {
                        return Err(ExcType::type_error(format!(
                            "{func_name}() got some positional-only arguments passed as keyword arguments: '{key}'"
                        )));
                    }
                    if self.var_kwargs.is_none() {
                        return Err(ExcType::type_error(format!(
                            "{func_name}() got an unexpected keyword argument '{key}'"
                        )));
                    }
                    if extra_kwargs.iter().any(|(existing, _)| *existing == key) {
                        return Err(ExcType::type_error(format!(
                            "{func_name}() got multiple values for keyword argument '{key}'"
                        )));
                    }
                    extra_kwargs.push((key, value));
                }
            }
        }

        // defaults fill the remaining slots
        let mut result = Vec::with_capacity(bound.len() + 2);
        for index in 0..positional_count {
            let value = match bound[index] {
                Some(value) => value,
                None => match self.positional_default(index, defaults) {
                    Some(value) => *value,
                    None => {
                        return Err(ExcType::type_error(format!(
                            "{func_name}() missing 1 required positional argument: '{}'",
                            self.positional_name(index)
                        )));
                    }
                },
            };
            result.push((self.positional_name(index).to_owned(), value));
        }
        if let Some(var_args) = &self.var_args {
            let tuple = Value::Ref(heap.allocate(HeapData::Tuple(Tuple::new(extra_positional)))?);
            result.push((var_args.clone(), tuple));
        }
        for (index, name) in self.kw_only.iter().enumerate() {
            let value = match bound[positional_count + index] {
                Some(value) => value,
                None => match self.kw_only_default(index, defaults) {
                    Some(value) => *value,
                    None => {
                        return Err(ExcType::type_error(format!(
                            "{func_name}() missing 1 required keyword-only argument: '{name}'"
                        )));
                    }
                },
            };
            result.push((name.clone(), value));
        }
        if let Some(var_kwargs) = &self.var_kwargs {
            let mut dict = Dict::new();
            for (key, value) in extra_kwargs {
                let key_value = heap.new_str(key.clone())?;
                dict.set(Key::Str(key), key_value, value);
            }
            let dict_value = heap.new_dict(dict)?;
            result.push((var_kwargs.clone(), dict_value));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expressions::{Identifier, Param, ParsedSignature},
        lex::CodeRange,
        resource::NoLimitTracker,
    };

    fn ident(name: &str) -> Identifier {
        Identifier {
            name: name.to_owned(),
            position: CodeRange { line: 1, column: 1 },
        }
    }

    fn param(name: &str, has_default: bool) -> Param {
        Param {
            name: ident(name),
            default: has_default.then(|| crate::expressions::ExprLoc {
                position: CodeRange { line: 1, column: 1 },
                expr: crate::expressions::Expr::Literal(crate::expressions::Literal::None),
            }),
        }
    }

    fn heap() -> Heap<NoLimitTracker> {
        Heap::new(NoLimitTracker)
    }

    #[test]
    fn positional_binding() {
        let sig = Signature::from_parsed(&ParsedSignature {
            args: vec![param("a", false), param("b", false)],
            ..ParsedSignature::default()
        });
        let mut heap = heap();
        let bound = sig
            .bind("f", &[], vec![Value::Int(1), Value::Int(2)], vec![], &mut heap)
            .unwrap();
        assert_eq!(bound[0], ("a".to_owned(), Value::Int(1)));
        assert_eq!(bound[1], ("b".to_owned(), Value::Int(2)));
    }

    #[test]
    fn defaults_fill_missing() {
        let sig = Signature::from_parsed(&ParsedSignature {
            args: vec![param("a", false), param("b", true)],
            ..ParsedSignature::default()
        });
        let mut heap = heap();
        let bound = sig
            .bind("f", &[Value::Int(9)], vec![Value::Int(1)], vec![], &mut heap)
            .unwrap();
        assert_eq!(bound[1], ("b".to_owned(), Value::Int(9)));
    }

    #[test]
    fn keyword_overrides_position() {
        let sig = Signature::from_parsed(&ParsedSignature {
            args: vec![param("a", false), param("b", false)],
            ..ParsedSignature::default()
        });
        let mut heap = heap();
        let bound = sig
            .bind(
                "f",
                &[],
                vec![Value::Int(1)],
                vec![("b".to_owned(), Value::Int(2))],
                &mut heap,
            )
            .unwrap();
        assert_eq!(bound[1], ("b".to_owned(), Value::Int(2)));
    }

    #[test]
    fn duplicate_argument_rejected() {
        let sig = Signature::from_parsed(&ParsedSignature {
            args: vec![param("a", false)],
            ..ParsedSignature::default()
        });
        let mut heap = heap();
        let err = sig.bind(
            "f",
            &[],
            vec![Value::Int(1)],
            vec![("a".to_owned(), Value::Int(2))],
            &mut heap,
        );
        assert!(err.is_err());
    }

    #[test]
    fn var_args_collects_extras() {
        let sig = Signature::from_parsed(&ParsedSignature {
            args: vec![param("a", false)],
            var_args: Some(ident("rest")),
            ..ParsedSignature::default()
        });
        let mut heap = heap();
        let bound = sig
            .bind(
                "f",
                &[],
                vec![Value::Int(1), Value::Int(2), Value::Int(3)],
                vec![],
                &mut heap,
            )
            .unwrap();
        assert_eq!(bound.len(), 2);
        let Value::Ref(id) = bound[1].1 else {
            panic!("expected tuple");
        };
        let HeapData::Tuple(tuple) = heap.get(id) else {
            panic!("expected tuple");
        };
        assert_eq!(tuple.len(), 2);
    }

    #[test]
    fn missing_required_rejected() {
        let sig = Signature::from_parsed(&ParsedSignature {
            args: vec![param("a", false)],
            ..ParsedSignature::default()
        });
        let mut heap = heap();
        assert!(sig.bind("f", &[], vec![], vec![], &mut heap).is_err());
    }

    #[test]
    fn keyword_only_requires_name() {
        let sig = Signature::from_parsed(&ParsedSignature {
            kw_only: vec![param("flag", false)],
            ..ParsedSignature::default()
        });
        let mut heap = heap();
        // positional attempt leaves the kw-only slot unfilled
        assert!(sig.bind("f", &[], vec![Value::Int(1)], vec![], &mut heap).is_err());
        let ok = sig.bind("f", &[], vec![], vec![("flag".to_owned(), Value::Bool(true))], &mut heap);
        assert!(ok.is_ok());
    }
}
