//! F-string parts and format-spec application.
//!
//! The same spec grammar backs f-string interpolations (`{x:>8}`) and
//! `str.format`: `[[fill]align][sign][0][width][.precision][type]`.

use crate::exception::{ExcType, RunError};

/// One piece of an f-string after parsing.
#[derive(Debug, Clone)]
pub(crate) enum FStringPart {
    Literal(String),
    Interpolation {
        expr: crate::expressions::ExprLoc,
        conversion: Option<ConversionFlag>,
        format_spec: Option<String>,
    },
}

/// `!r` / `!s` conversion flag on an interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConversionFlag {
    Str,
    Repr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Right,
    Center,
}

/// A parsed format spec.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedFormatSpec {
    pub fill: Option<char>,
    pub align: Option<Align>,
    pub sign_plus: bool,
    pub zero_pad: bool,
    pub width: Option<usize>,
    pub precision: Option<usize>,
    /// Presentation type: one of `d`, `f`, `s`, `e`, `g`, `%`, `x`, `b`.
    pub kind: Option<char>,
}

impl ParsedFormatSpec {
    pub fn parse(spec: &str) -> Result<Self, RunError> {
        let chars: Vec<char> = spec.chars().collect();
        let mut out = Self::default();
        let mut i = 0;

        // fill is only a fill when followed by an alignment character
        if chars.len() >= 2 {
            if let Some(align) = align_of(chars[1]) {
                out.fill = Some(chars[0]);
                out.align = Some(align);
                i = 2;
            }
        }
        if i == 0 {
            if let Some(align) = chars.first().copied().and_then(align_of) {
                out.align = Some(align);
                i = 1;
            }
        }
        if chars.get(i) == Some(&'+') {
            out.sign_plus = true;
            i += 1;
        } else if chars.get(i) == Some(&'-') {
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            out.zero_pad = true;
            i += 1;
        }
        let mut width = String::new();
        while chars.get(i).is_some_and(char::is_ascii_digit) {
            width.push(chars[i]);
            i += 1;
        }
        if !width.is_empty() {
            out.width = Some(width.parse().expect("digits only"));
        }
        if chars.get(i) == Some(&'.') {
            i += 1;
            let mut precision = String::new();
            while chars.get(i).is_some_and(char::is_ascii_digit) {
                precision.push(chars[i]);
                i += 1;
            }
            if precision.is_empty() {
                return Err(ExcType::value_error("Format specifier missing precision"));
            }
            out.precision = Some(precision.parse().expect("digits only"));
        }
        if let Some(&kind) = chars.get(i) {
            if !matches!(kind, 'd' | 'f' | 's' | 'e' | 'g' | '%' | 'x' | 'b') {
                return Err(ExcType::value_error(format!(
                    "Unknown format code '{kind}'"
                )));
            }
            out.kind = Some(kind);
            i += 1;
        }
        if i != chars.len() {
            return Err(ExcType::value_error(format!("Invalid format specifier '{spec}'")));
        }
        Ok(out)
    }

    /// Pads an already-rendered value to the requested width.
    pub fn pad(&self, rendered: &str, numeric: bool) -> String {
        let Some(width) = self.width else {
            return rendered.to_owned();
        };
        let len = rendered.chars().count();
        if len >= width {
            return rendered.to_owned();
        }
        let missing = width - len;
        if self.zero_pad && numeric && self.align.is_none() {
            // zero padding goes between the sign and the digits
            let (sign, digits) = match rendered.strip_prefix('-') {
                Some(rest) => ("-", rest),
                None => ("", rendered),
            };
            return format!("{sign}{}{digits}", "0".repeat(missing));
        }
        let fill = self.fill.unwrap_or(' ');
        let default_align = if numeric { Align::Right } else { Align::Left };
        match self.align.unwrap_or(default_align) {
            Align::Left => format!("{rendered}{}", fill.to_string().repeat(missing)),
            Align::Right => format!("{}{rendered}", fill.to_string().repeat(missing)),
            Align::Center => {
                let before = missing / 2;
                let after = missing - before;
                format!(
                    "{}{rendered}{}",
                    fill.to_string().repeat(before),
                    fill.to_string().repeat(after)
                )
            }
        }
    }

    /// Renders a float body (before padding) according to the spec.
    pub fn render_float(&self, value: f64) -> Result<String, RunError> {
        let rendered = match self.kind {
            Some('f') => format!("{:.*}", self.precision.unwrap_or(6), value),
            Some('e') => format_exponential(value, self.precision.unwrap_or(6)),
            Some('%') => format!("{:.*}%", self.precision.unwrap_or(6), value * 100.0),
            None if self.precision.is_some() => {
                format!("{:.*}", self.precision.expect("checked"), value)
            }
            Some('g') | None => {
                let mut buf = ryu::Buffer::new();
                buf.format(value).to_owned()
            }
            Some(other) => {
                return Err(ExcType::value_error(format!(
                    "Unknown format code '{other}' for object of type 'float'"
                )));
            }
        };
        let rendered = if self.sign_plus && !rendered.starts_with('-') {
            format!("+{rendered}")
        } else {
            rendered
        };
        Ok(rendered)
    }

    /// Renders an int body (before padding) from its decimal string form.
    pub fn render_int(&self, decimal: &str) -> Result<String, RunError> {
        let rendered = match self.kind {
            None | Some('d') => decimal.to_owned(),
            Some('f' | 'e' | 'g' | '%') => {
                let value: f64 = decimal.parse().map_err(|_| {
                    ExcType::value_error("int too large to format as float")
                })?;
                return self.render_float(value);
            }
            Some('x') => {
                let value: i128 = decimal
                    .parse()
                    .map_err(|_| ExcType::value_error("int too large for 'x' format"))?;
                format!("{value:x}")
            }
            Some('b') => {
                let value: i128 = decimal
                    .parse()
                    .map_err(|_| ExcType::value_error("int too large for 'b' format"))?;
                format!("{value:b}")
            }
            Some(other) => {
                return Err(ExcType::value_error(format!(
                    "Unknown format code '{other}' for object of type 'int'"
                )));
            }
        };
        let rendered = if self.sign_plus && !rendered.starts_with('-') {
            format!("+{rendered}")
        } else {
            rendered
        };
        Ok(rendered)
    }

    /// Renders a string body (before padding), honoring precision truncation.
    pub fn render_str(&self, value: &str) -> Result<String, RunError> {
        if matches!(self.kind, Some(k) if k != 's') {
            return Err(ExcType::value_error(format!(
                "Unknown format code '{}' for object of type 'str'",
                self.kind.expect("checked")
            )));
        }
        match self.precision {
            Some(precision) => Ok(value.chars().take(precision).collect()),
            None => Ok(value.to_owned()),
        }
    }
}

/// Exponential notation with a signed two-digit exponent (`1.50e+03`).
fn format_exponential(value: f64, precision: usize) -> String {
    let rendered = format!("{value:.precision$e}");
    match rendered.split_once('e') {
        Some((mantissa, exponent)) => {
            let exp: i32 = exponent.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => rendered,
    }
}

fn align_of(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_right_align() {
        let spec = ParsedFormatSpec::parse(">8").unwrap();
        assert_eq!(spec.pad("abc", false), "     abc");
    }

    #[test]
    fn fill_and_center() {
        let spec = ParsedFormatSpec::parse("*^7").unwrap();
        assert_eq!(spec.pad("ab", false), "**ab***");
    }

    #[test]
    fn float_precision() {
        let spec = ParsedFormatSpec::parse(".2f").unwrap();
        assert_eq!(spec.render_float(3.14159).unwrap(), "3.14");
    }

    #[test]
    fn zero_padded_int() {
        let spec = ParsedFormatSpec::parse("05d").unwrap();
        let body = spec.render_int("-42").unwrap();
        assert_eq!(spec.pad(&body, true), "-0042");
    }

    #[test]
    fn invalid_spec_rejected() {
        assert!(ParsedFormatSpec::parse("8q").is_err());
    }
}
