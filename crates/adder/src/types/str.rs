//! Native string methods.
//!
//! Strings are immutable; every method allocates its result. Methods that
//! call back into user code (`join`, `format`) are driven by the evaluator;
//! everything else is implemented here against the borrowed text.

use crate::{
    args::ArgValues,
    exception::{ExcType, RunResult},
    heap::Heap,
    resource::ResourceTracker,
    value::Value,
};

/// Method names exposed on strings.
pub(crate) const STR_METHODS: &[&str] = &[
    "split",
    "join",
    "upper",
    "lower",
    "strip",
    "lstrip",
    "rstrip",
    "startswith",
    "endswith",
    "replace",
    "find",
    "count",
    "format",
];

pub(crate) fn char_count(text: &str) -> usize {
    text.chars().count()
}

pub(crate) fn char_at(text: &str, index: i64) -> Option<char> {
    let resolved = super::list::resolve_index(index, char_count(text))?;
    text.chars().nth(resolved)
}

/// Calls a string method that does not re-enter user code.
///
/// `join` and `format` are intercepted by the evaluator before this is
/// reached; an unknown name raises `AttributeError`.
pub(crate) fn call_str_method(
    heap: &mut Heap<impl ResourceTracker>,
    text: &str,
    method: &str,
    args: ArgValues,
) -> RunResult<Value> {
    match method {
        "upper" => {
            args.check_zero_args("upper")?;
            heap.new_str(text.to_uppercase())
        }
        "lower" => {
            args.check_zero_args("lower")?;
            heap.new_str(text.to_lowercase())
        }
        "strip" | "lstrip" | "rstrip" => {
            let chars = strip_chars(heap, args, method)?;
            let stripped = match method {
                "strip" => strip_with(text, &chars, true, true),
                "lstrip" => strip_with(text, &chars, true, false),
                _ => strip_with(text, &chars, false, true),
            };
            heap.new_str(stripped.to_owned())
        }
        "split" => {
            let sep = args.get_zero_one_args("split")?;
            let parts: Vec<String> = match sep {
                None | Some(Value::None) => text.split_whitespace().map(str::to_owned).collect(),
                Some(value) => {
                    let Some(sep) = heap.str_value(value) else {
                        return Err(ExcType::type_error(format!(
                            "must be str or None, not {}",
                            value.type_name(heap)
                        )));
                    };
                    if sep.is_empty() {
                        return Err(ExcType::value_error("empty separator"));
                    }
                    text.split(sep).map(str::to_owned).collect()
                }
            };
            let mut items = Vec::with_capacity(parts.len());
            for part in parts {
                items.push(heap.new_str(part)?);
            }
            heap.new_list(items)
        }
        "startswith" | "endswith" => {
            let prefix_value = args.get_one_arg(method)?;
            let Some(affix) = heap.str_value(prefix_value) else {
                return Err(ExcType::type_error(format!(
                    "{method} first arg must be str, not {}",
                    prefix_value.type_name(heap)
                )));
            };
            let result = if method == "startswith" {
                text.starts_with(affix)
            } else {
                text.ends_with(affix)
            };
            Ok(Value::Bool(result))
        }
        "replace" => {
            let (old_value, new_value) = args.get_two_args("replace")?;
            let (Some(old), Some(new)) = (heap.str_value(old_value), heap.str_value(new_value)) else {
                return Err(ExcType::type_error("replace arguments must be str"));
            };
            let replaced = if old.is_empty() {
                text.to_owned()
            } else {
                text.replace(old, new)
            };
            heap.new_str(replaced)
        }
        "find" => {
            let needle_value = args.get_one_arg("find")?;
            let Some(needle) = heap.str_value(needle_value) else {
                return Err(ExcType::type_error("find argument must be str"));
            };
            // result is a character offset, not a byte offset
            match text.find(needle) {
                Some(byte) => Ok(Value::Int(text[..byte].chars().count() as i64)),
                None => Ok(Value::Int(-1)),
            }
        }
        "count" => {
            let needle_value = args.get_one_arg("count")?;
            let Some(needle) = heap.str_value(needle_value) else {
                return Err(ExcType::type_error("count argument must be str"));
            };
            if needle.is_empty() {
                return Ok(Value::Int(char_count(text) as i64 + 1));
            }
            Ok(Value::Int(text.matches(needle).count() as i64))
        }
        _ => Err(ExcType::attribute_error("str", method)),
    }
}

fn strip_chars(
    heap: &Heap<impl ResourceTracker>,
    args: ArgValues,
    method: &str,
) -> RunResult<Option<Vec<char>>> {
    match args.get_zero_one_args(method)? {
        None | Some(Value::None) => Ok(None),
        Some(value) => match heap.str_value(value) {
            Some(chars) => Ok(Some(chars.chars().collect())),
            None => Err(ExcType::type_error(format!(
                "{method} arg must be None or str, not {}",
                value.type_name(heap)
            ))),
        },
    }
}

fn strip_with<'a>(text: &'a str, chars: &Option<Vec<char>>, left: bool, right: bool) -> &'a str {
    let matches = |c: char| match chars {
        None => c.is_whitespace(),
        Some(set) => set.contains(&c),
    };
    let mut out = text;
    if left {
        out = out.trim_start_matches(matches);
    }
    if right {
        out = out.trim_end_matches(matches);
    }
    out
}

/// One piece of a `str.format` template.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FormatPiece {
    Literal(String),
    Field {
        /// Explicit positional index (`{0}`), if given.
        index: Option<usize>,
        /// Keyword field name (`{name}`), if given.
        name: Option<String>,
        /// Raw format spec after `:`.
        spec: Option<String>,
    },
}

/// Parses a `str.format` template into pieces; auto-numbering is resolved by
/// the caller.
pub(crate) fn parse_format_template(template: &str) -> RunResult<Vec<FormatPiece>> {
    let chars: Vec<char> = template.chars().collect();
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => {
                literal.push('{');
                i += 2;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                literal.push('}');
                i += 2;
            }
            '}' => return Err(ExcType::value_error("Single '}' encountered in format string")),
            '{' => {
                if !literal.is_empty() {
                    pieces.push(FormatPiece::Literal(std::mem::take(&mut literal)));
                }
                i += 1;
                let mut field = String::new();
                while i < chars.len() && chars[i] != '}' {
                    field.push(chars[i]);
                    i += 1;
                }
                if i == chars.len() {
                    return Err(ExcType::value_error("Single '{' encountered in format string"));
                }
                i += 1;
                let (target, spec) = match field.split_once(':') {
                    Some((target, spec)) => (target.to_owned(), Some(spec.to_owned())),
                    None => (field, None),
                };
                let piece = if target.is_empty() {
                    FormatPiece::Field {
                        index: None,
                        name: None,
                        spec,
                    }
                } else if let Ok(index) = target.parse::<usize>() {
                    FormatPiece::Field {
                        index: Some(index),
                        name: None,
                        spec,
                    }
                } else {
                    FormatPiece::Field {
                        index: None,
                        name: Some(target),
                        spec,
                    }
                };
                pieces.push(piece);
            }
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }
    if !literal.is_empty() {
        pieces.push(FormatPiece::Literal(literal));
    }
    Ok(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_with_auto_fields() {
        let pieces = parse_format_template("a{}b{}c").unwrap();
        assert_eq!(pieces.len(), 5);
        assert!(matches!(
            pieces[1],
            FormatPiece::Field {
                index: None,
                name: None,
                ..
            }
        ));
    }

    #[test]
    fn template_with_named_and_spec() {
        let pieces = parse_format_template("{name:>8}").unwrap();
        assert_eq!(
            pieces[0],
            FormatPiece::Field {
                index: None,
                name: Some("name".to_owned()),
                spec: Some(">8".to_owned()),
            }
        );
    }

    #[test]
    fn unbalanced_brace_rejected() {
        assert!(parse_format_template("{oops").is_err());
        assert!(parse_format_template("oops}").is_err());
    }
}
