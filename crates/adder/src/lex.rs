//! Lexer: source text to a token stream with synthetic indentation tokens.
//!
//! Logical lines are delimited by `Newline` tokens; block structure is
//! delivered as `Indent`/`Dedent` pairs computed from a stack of indentation
//! prefixes. A trailing backslash or any open bracket suppresses the newline,
//! so expressions can span physical lines.
//!
//! Indentation prefixes are compared as strings, not widths: a deeper block
//! must extend the enclosing block's exact prefix. This makes tabs consistent
//! within a block and rejects ambiguous space/tab mixing.

use num_bigint::BigInt;
use num_traits::Num;
use strum::EnumString;

use crate::exception::{CodeLoc, Exception};

/// A point in the source, 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CodeRange {
    pub line: u32,
    pub column: u32,
}

impl CodeRange {
    pub fn loc(self) -> CodeLoc {
        CodeLoc {
            line: self.line,
            column: self.column,
        }
    }
}

/// Reserved words. `None`/`True`/`False` keep their canonical capitalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Keyword {
    Def,
    Class,
    Return,
    If,
    Elif,
    Else,
    For,
    While,
    Break,
    Continue,
    Pass,
    In,
    Not,
    And,
    Or,
    Is,
    #[strum(serialize = "None")]
    None,
    #[strum(serialize = "True")]
    True,
    #[strum(serialize = "False")]
    False,
    Import,
    From,
    As,
    With,
    Try,
    Except,
    Finally,
    Raise,
    Lambda,
    Yield,
    Global,
    Nonlocal,
    Del,
    Assert,
}

/// A raw f-string segment produced by the lexer.
///
/// Interpolation expression sources are re-parsed by the parser; the lexer
/// only brackets them and peels off the conversion and format spec.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FStringSegment {
    Literal(String),
    Interpolation {
        source: String,
        position: CodeRange,
        /// `!r` or `!s` conversion flag.
        conversion: Option<char>,
        /// Raw format spec text after `:`, if any.
        format_spec: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Kw(Keyword),
    Int(i64),
    LongInt(BigInt),
    Float(f64),
    Str(String),
    FString(Vec<FStringSegment>),

    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,

    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    Ne,

    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    DoubleSlashEq,
    PercentEq,
    DoubleStarEq,
    AmpEq,
    PipeEq,
    CaretEq,
    ShlEq,
    ShrEq,

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Arrow,
    At,

    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub position: CodeRange,
}

/// Tokenizes `source`, normalizing line endings to `\n`.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, Exception> {
    let normalized = source.replace("\r\n", "\n").replace('\r', "\n");
    Lexer::new(&normalized).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    /// Stack of indentation prefixes; the bottom entry is the empty prefix.
    indents: Vec<String>,
    /// Open bracket depth; newlines inside brackets are suppressed.
    bracket_depth: usize,
    /// Whether any token has been emitted on the current logical line.
    line_has_tokens: bool,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            indents: vec![String::new()],
            bracket_depth: 0,
            line_has_tokens: false,
            tokens: Vec::new(),
        }
    }

    fn here(&self) -> CodeRange {
        CodeRange {
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied();
        if let Some(c) = c {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        c
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn push(&mut self, kind: TokenKind, position: CodeRange) {
        if !matches!(kind, TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent) {
            self.line_has_tokens = true;
        }
        self.tokens.push(Token { kind, position });
    }

    fn syntax_error(&self, msg: impl Into<String>) -> Exception {
        Exception::syntax_error(msg, self.here().loc())
    }

    fn run(mut self) -> Result<Vec<Token>, Exception> {
        self.handle_line_start()?;
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' => {
                    self.advance();
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                '\n' => {
                    let position = self.here();
                    self.advance();
                    if self.bracket_depth == 0 {
                        if self.line_has_tokens {
                            self.push(TokenKind::Newline, position);
                            self.line_has_tokens = false;
                        }
                        self.handle_line_start()?;
                    }
                }
                '\\' if self.peek2() == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                _ => self.lex_token()?,
            }
        }
        // drain the indent stack at end of input
        let position = self.here();
        if self.line_has_tokens {
            self.push(TokenKind::Newline, position);
            self.line_has_tokens = false;
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, position);
        }
        self.push(TokenKind::Eof, position);
        Ok(self.tokens)
    }

    /// Consumes indentation at the start of a logical line and emits
    /// `Indent`/`Dedent` tokens. Blank and comment-only lines are skipped.
    fn handle_line_start(&mut self) -> Result<(), Exception> {
        loop {
            let mut ws = String::new();
            while let Some(c) = self.peek() {
                if c == ' ' || c == '\t' {
                    ws.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            match self.peek() {
                // blank or comment-only lines carry no block structure
                Some('\n') => {
                    self.advance();
                    continue;
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                    continue;
                }
                None => return Ok(()),
                Some(_) => {}
            }
            let position = self.here();
            let top = self.indents.last().expect("indent stack is never empty");
            if ws == *top {
                return Ok(());
            }
            if ws.starts_with(top.as_str()) {
                self.indents.push(ws);
                self.push(TokenKind::Indent, position);
                return Ok(());
            }
            // dedent: the new prefix must match some outer level exactly
            while self.indents.len() > 1 && *self.indents.last().expect("non-empty") != ws {
                let top = self.indents.last().expect("non-empty");
                if !top.starts_with(ws.as_str()) {
                    return Err(Exception::indentation_error(
                        "inconsistent use of tabs and spaces in indentation",
                        position.loc(),
                    ));
                }
                self.indents.pop();
                self.push(TokenKind::Dedent, position);
            }
            if *self.indents.last().expect("non-empty") != ws {
                return Err(Exception::indentation_error(
                    "unindent does not match any outer indentation level",
                    position.loc(),
                ));
            }
            return Ok(());
        }
    }

    fn lex_token(&mut self) -> Result<(), Exception> {
        let position = self.here();
        let c = self.peek().expect("caller checked a char is present");

        if c.is_ascii_digit() {
            return self.lex_number(position);
        }
        if c == '.' && self.peek2().is_some_and(|c| c.is_ascii_digit()) {
            return self.lex_number(position);
        }
        if c == '"' || c == '\'' {
            let text = self.lex_string_literal(false)?;
            self.push(TokenKind::Str(text), position);
            return Ok(());
        }
        if c.is_alphabetic() || c == '_' {
            // string prefixes: r"", f"", rf""/fr""
            let prefix: String = self
                .chars
                .iter()
                .skip(self.pos)
                .take(2)
                .collect::<String>()
                .to_lowercase();
            let next_is_quote = |offset: usize| {
                matches!(self.chars.get(self.pos + offset), Some('"' | '\''))
            };
            if (prefix.starts_with('r') || prefix.starts_with('f')) && next_is_quote(1) {
                let is_f = prefix.starts_with('f');
                self.advance();
                return self.lex_prefixed_string(position, is_f, !is_f);
            }
            if (prefix == "rf" || prefix == "fr") && next_is_quote(2) {
                self.advance();
                self.advance();
                return self.lex_prefixed_string(position, true, true);
            }
            let mut ident = String::new();
            while let Some(c) = self.peek() {
                if c.is_alphanumeric() || c == '_' {
                    ident.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            let kind = match ident.parse::<Keyword>() {
                Ok(kw) => TokenKind::Kw(kw),
                Err(_) => TokenKind::Ident(ident),
            };
            self.push(kind, position);
            return Ok(());
        }

        self.advance();
        let kind = match c {
            '+' => self.with_eq(TokenKind::Plus, TokenKind::PlusEq),
            '-' => {
                if self.eat('>') {
                    TokenKind::Arrow
                } else {
                    self.with_eq(TokenKind::Minus, TokenKind::MinusEq)
                }
            }
            '*' => {
                if self.eat('*') {
                    self.with_eq(TokenKind::DoubleStar, TokenKind::DoubleStarEq)
                } else {
                    self.with_eq(TokenKind::Star, TokenKind::StarEq)
                }
            }
            '/' => {
                if self.eat('/') {
                    self.with_eq(TokenKind::DoubleSlash, TokenKind::DoubleSlashEq)
                } else {
                    self.with_eq(TokenKind::Slash, TokenKind::SlashEq)
                }
            }
            '%' => self.with_eq(TokenKind::Percent, TokenKind::PercentEq),
            '&' => self.with_eq(TokenKind::Amp, TokenKind::AmpEq),
            '|' => self.with_eq(TokenKind::Pipe, TokenKind::PipeEq),
            '^' => self.with_eq(TokenKind::Caret, TokenKind::CaretEq),
            '~' => TokenKind::Tilde,
            '<' => {
                if self.eat('<') {
                    self.with_eq(TokenKind::Shl, TokenKind::ShlEq)
                } else if self.eat('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('>') {
                    self.with_eq(TokenKind::Shr, TokenKind::ShrEq)
                } else if self.eat('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '=' => {
                if self.eat('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.eat('=') {
                    TokenKind::Ne
                } else {
                    return Err(self.syntax_error("unexpected character '!'"));
                }
            }
            '(' => {
                self.bracket_depth += 1;
                TokenKind::LParen
            }
            ')' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                TokenKind::RParen
            }
            '[' => {
                self.bracket_depth += 1;
                TokenKind::LBracket
            }
            ']' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                TokenKind::RBracket
            }
            '{' => {
                self.bracket_depth += 1;
                TokenKind::LBrace
            }
            '}' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                TokenKind::RBrace
            }
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '@' => TokenKind::At,
            other => {
                return Err(self.syntax_error(format!("unexpected character {other:?}")));
            }
        };
        self.push(kind, position);
        Ok(())
    }

    fn with_eq(&mut self, plain: TokenKind, augmented: TokenKind) -> TokenKind {
        if self.eat('=') {
            augmented
        } else {
            plain
        }
    }

    fn lex_number(&mut self, position: CodeRange) -> Result<(), Exception> {
        let mut text = String::new();
        if self.peek() == Some('0') && matches!(self.peek2(), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B')) {
            self.advance();
            let radix_char = self.advance().expect("peeked");
            let radix = match radix_char {
                'x' | 'X' => 16,
                'o' | 'O' => 8,
                _ => 2,
            };
            while let Some(c) = self.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            let digits = text.replace('_', "");
            let value = BigInt::from_str_radix(&digits, radix)
                .map_err(|_| self.syntax_error(format!("invalid integer literal '0{radix_char}{text}'")))?;
            self.push(int_token(value), position);
            return Ok(());
        }

        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {
                    text.push(c);
                    self.advance();
                }
                '.' if !is_float && self.peek2() != Some('.') => {
                    is_float = true;
                    text.push(c);
                    self.advance();
                }
                'e' | 'E' => {
                    is_float = true;
                    text.push(c);
                    self.advance();
                    if matches!(self.peek(), Some('+' | '-')) {
                        text.push(self.advance().expect("peeked"));
                    }
                }
                _ => break,
            }
        }
        let digits = text.replace('_', "");
        if is_float {
            let value: f64 = digits
                .parse()
                .map_err(|_| self.syntax_error(format!("invalid float literal '{text}'")))?;
            self.push(TokenKind::Float(value), position);
        } else {
            let value: BigInt = digits
                .parse()
                .map_err(|_| self.syntax_error(format!("invalid integer literal '{text}'")))?;
            self.push(int_token(value), position);
        }
        Ok(())
    }

    fn lex_prefixed_string(&mut self, position: CodeRange, is_f: bool, is_raw: bool) -> Result<(), Exception> {
        if is_f {
            let segments = self.lex_fstring(is_raw)?;
            self.push(TokenKind::FString(segments), position);
        } else {
            let text = self.lex_string_literal(is_raw)?;
            self.push(TokenKind::Str(text), position);
        }
        Ok(())
    }

    /// Lexes a (possibly triple-quoted) string body, the opening quote not
    /// yet consumed.
    fn lex_string_literal(&mut self, raw: bool) -> Result<String, Exception> {
        let (quote, triple) = self.open_quote()?;
        let mut out = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.syntax_error("unterminated string literal"));
            };
            if self.close_quote(quote, triple) {
                return Ok(out);
            }
            if c == '\n' && !triple {
                return Err(self.syntax_error("unterminated string literal"));
            }
            if c == '\\' && !raw {
                self.advance();
                out.push_str(&self.escape_char()?);
            } else {
                out.push(c);
                self.advance();
            }
        }
    }

    fn open_quote(&mut self) -> Result<(char, bool), Exception> {
        let quote = self
            .advance()
            .ok_or_else(|| self.syntax_error("expected string quote"))?;
        if self.peek() == Some(quote) && self.peek2() == Some(quote) {
            self.advance();
            self.advance();
            Ok((quote, true))
        } else {
            Ok((quote, false))
        }
    }

    fn close_quote(&mut self, quote: char, triple: bool) -> bool {
        if self.peek() != Some(quote) {
            return false;
        }
        if triple {
            if self.peek2() == Some(quote) && self.chars.get(self.pos + 2) == Some(&quote) {
                self.advance();
                self.advance();
                self.advance();
                true
            } else {
                false
            }
        } else {
            self.advance();
            true
        }
    }

    fn escape_char(&mut self) -> Result<String, Exception> {
        let Some(c) = self.advance() else {
            return Err(self.syntax_error("unterminated string literal"));
        };
        let s = match c {
            'n' => "\n".to_owned(),
            't' => "\t".to_owned(),
            'r' => "\r".to_owned(),
            '0' => "\0".to_owned(),
            '\\' => "\\".to_owned(),
            '\'' => "'".to_owned(),
            '"' => "\"".to_owned(),
            '\n' => String::new(),
            'x' => {
                let hi = self.advance();
                let lo = self.advance();
                let (Some(hi), Some(lo)) = (hi, lo) else {
                    return Err(self.syntax_error("truncated \\x escape"));
                };
                let code = u32::from_str_radix(&format!("{hi}{lo}"), 16)
                    .map_err(|_| self.syntax_error("invalid \\x escape"))?;
                char::from_u32(code)
                    .map(String::from)
                    .ok_or_else(|| self.syntax_error("invalid \\x escape"))?
            }
            'u' => {
                let mut digits = String::new();
                for _ in 0..4 {
                    let Some(d) = self.advance() else {
                        return Err(self.syntax_error("truncated \\u escape"));
                    };
                    digits.push(d);
                }
                let code =
                    u32::from_str_radix(&digits, 16).map_err(|_| self.syntax_error("invalid \\u escape"))?;
                char::from_u32(code)
                    .map(String::from)
                    .ok_or_else(|| self.syntax_error("invalid \\u escape"))?
            }
            // unknown escapes keep the backslash, matching lenient string semantics
            other => format!("\\{other}"),
        };
        Ok(s)
    }

    /// Lexes an f-string into literal and interpolation segments.
    fn lex_fstring(&mut self, raw: bool) -> Result<Vec<FStringSegment>, Exception> {
        let (quote, triple) = self.open_quote()?;
        let mut segments = Vec::new();
        let mut literal = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.syntax_error("unterminated f-string literal"));
            };
            if self.close_quote(quote, triple) {
                if !literal.is_empty() {
                    segments.push(FStringSegment::Literal(literal));
                }
                return Ok(segments);
            }
            match c {
                '{' if self.peek2() == Some('{') => {
                    self.advance();
                    self.advance();
                    literal.push('{');
                }
                '}' if self.peek2() == Some('}') => {
                    self.advance();
                    self.advance();
                    literal.push('}');
                }
                '}' => return Err(self.syntax_error("f-string: single '}' is not allowed")),
                '{' => {
                    if !literal.is_empty() {
                        segments.push(FStringSegment::Literal(std::mem::take(&mut literal)));
                    }
                    self.advance();
                    segments.push(self.lex_fstring_interpolation(quote)?);
                }
                '\n' if !triple => return Err(self.syntax_error("unterminated f-string literal")),
                '\\' if !raw => {
                    self.advance();
                    literal.push_str(&self.escape_char()?);
                }
                other => {
                    literal.push(other);
                    self.advance();
                }
            }
        }
    }

    fn lex_fstring_interpolation(&mut self, quote: char) -> Result<FStringSegment, Exception> {
        let position = self.here();
        let mut source = String::new();
        let mut depth = 0usize;
        let mut conversion = None;
        let mut format_spec = None;
        loop {
            let Some(c) = self.peek() else {
                return Err(self.syntax_error("f-string: expecting '}'"));
            };
            match c {
                '}' if depth == 0 => {
                    self.advance();
                    break;
                }
                '!' if depth == 0 && matches!(self.peek2(), Some('r' | 's')) => {
                    // only a conversion when followed by `}` or `:` (otherwise it is `!=`)
                    if matches!(self.chars.get(self.pos + 2), Some('}' | ':')) {
                        self.advance();
                        conversion = self.advance();
                        continue;
                    }
                    source.push(c);
                    self.advance();
                }
                ':' if depth == 0 => {
                    self.advance();
                    let mut spec = String::new();
                    loop {
                        let Some(c) = self.peek() else {
                            return Err(self.syntax_error("f-string: expecting '}'"));
                        };
                        if c == '}' {
                            self.advance();
                            break;
                        }
                        if c == quote || c == '\n' {
                            return Err(self.syntax_error("f-string: expecting '}'"));
                        }
                        spec.push(c);
                        self.advance();
                    }
                    format_spec = Some(spec);
                    break;
                }
                '(' | '[' | '{' => {
                    depth += 1;
                    source.push(c);
                    self.advance();
                }
                ')' | ']' | '}' => {
                    depth = depth.saturating_sub(1);
                    source.push(c);
                    self.advance();
                }
                '\'' | '"' => {
                    // nested string inside the expression; copy it verbatim
                    let inner_quote = c;
                    source.push(c);
                    self.advance();
                    loop {
                        let Some(c) = self.advance() else {
                            return Err(self.syntax_error("unterminated string in f-string expression"));
                        };
                        source.push(c);
                        if c == inner_quote {
                            break;
                        }
                        if c == '\\' {
                            if let Some(escaped) = self.advance() {
                                source.push(escaped);
                            }
                        }
                    }
                }
                '\n' => return Err(self.syntax_error("f-string: expecting '}'")),
                other => {
                    source.push(other);
                    self.advance();
                }
            }
        }
        if source.trim().is_empty() {
            return Err(self.syntax_error("f-string: empty expression not allowed"));
        }
        Ok(FStringSegment::Interpolation {
            source,
            position,
            conversion,
            format_spec,
        })
    }
}

/// Builds an `Int` token when the literal fits in i64, `LongInt` otherwise.
fn int_token(value: BigInt) -> TokenKind {
    match i64::try_from(&value) {
        Ok(small) => TokenKind::Int(small),
        Err(_) => TokenKind::LongInt(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::ExcType;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn simple_expression() {
        assert_eq!(
            kinds("1 + 2"),
            vec![
                TokenKind::Int(1),
                TokenKind::Plus,
                TokenKind::Int(2),
                TokenKind::Newline,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn indent_dedent_pairs() {
        let toks = kinds("if x:\n    y = 1\nz = 2");
        assert!(toks.contains(&TokenKind::Indent));
        assert_eq!(toks.iter().filter(|t| **t == TokenKind::Dedent).count(), 1);
    }

    #[test]
    fn nested_blocks_drain_at_eof() {
        let toks = kinds("if x:\n  if y:\n    z = 1");
        assert_eq!(toks.iter().filter(|t| **t == TokenKind::Indent).count(), 2);
        assert_eq!(toks.iter().filter(|t| **t == TokenKind::Dedent).count(), 2);
    }

    #[test]
    fn blank_and_comment_lines_ignored() {
        let toks = kinds("a = 1\n\n# comment\n   \nb = 2");
        assert!(!toks.contains(&TokenKind::Indent));
    }

    #[test]
    fn brackets_suppress_newline() {
        let toks = kinds("x = [1,\n     2]");
        assert_eq!(toks.iter().filter(|t| **t == TokenKind::Newline).count(), 1);
    }

    #[test]
    fn backslash_continuation() {
        let toks = kinds("x = 1 + \\\n    2");
        assert_eq!(toks.iter().filter(|t| **t == TokenKind::Newline).count(), 1);
    }

    #[test]
    fn bad_dedent_is_indentation_error() {
        let err = tokenize("if x:\n    y = 1\n  z = 2").unwrap_err();
        assert_eq!(err.exc_type(), ExcType::IndentationError);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#"'a\nb'"#)[0],
            TokenKind::Str("a\nb".to_owned())
        );
        assert_eq!(kinds(r#"r'a\nb'"#)[0], TokenKind::Str("a\\nb".to_owned()));
    }

    #[test]
    fn big_int_literal_promotes() {
        let toks = kinds("99999999999999999999999999");
        assert!(matches!(toks[0], TokenKind::LongInt(_)));
    }

    #[test]
    fn fstring_segments() {
        let toks = kinds("f'hi {name}!'");
        let TokenKind::FString(segments) = &toks[0] else {
            panic!("expected f-string, got {:?}", toks[0]);
        };
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], FStringSegment::Literal("hi ".to_owned()));
        assert!(matches!(
            &segments[1],
            FStringSegment::Interpolation { source, .. } if source == "name"
        ));
    }

    #[test]
    fn fstring_format_spec() {
        let toks = kinds("f'{x:>8}'");
        let TokenKind::FString(segments) = &toks[0] else {
            panic!("expected f-string");
        };
        assert!(matches!(
            &segments[0],
            FStringSegment::Interpolation { format_spec: Some(spec), .. } if spec == ">8"
        ));
    }
}
