//! Recursive-descent parser: token stream to AST.
//!
//! Statements are parsed by dispatch on the leading token; expressions use
//! one function per precedence level, lowest binding first. Assignment
//! targets are parsed as expressions and then converted, so the same grammar
//! serves `=`, `for`, comprehension clauses and `del`.

use std::rc::Rc;

use crate::{
    exception::Exception,
    expressions::{
        ArgExprs, ClassDef, CmpOperator, Comprehension, DictItem, ExceptHandler, Expr, ExprLoc, FunctionDef,
        Identifier, Kwarg, Literal, Node, Operator, Param, ParsedSignature, Try, UnpackTarget, WithItem,
    },
    fstring::{ConversionFlag, FStringPart},
    lex::{CodeRange, FStringSegment, Keyword, Token, TokenKind, tokenize},
};

/// Maximum nesting depth for expressions during parsing, preventing stack
/// overflow from pathological inputs like `((((((x))))))`.
const MAX_NESTING_DEPTH: u16 = 200;

/// Parses a complete module.
pub(crate) fn parse(source: &str) -> Result<Vec<Node>, Exception> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_module()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: u16,
}

type PResult<T> = Result<T, Exception>;

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek2(&self) -> &TokenKind {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].kind
    }

    fn here(&self) -> CodeRange {
        self.tokens[self.pos.min(self.tokens.len() - 1)].position
    }

    fn next(&mut self) -> Token {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.next();
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, kw: Keyword) -> bool {
        self.eat(&TokenKind::Kw(kw))
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> PResult<Token> {
        if self.peek() == kind {
            Ok(self.next())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn expect_kw(&mut self, kw: Keyword, what: &str) -> PResult<()> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> PResult<Identifier> {
        let position = self.here();
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.next();
                Ok(Identifier { name, position })
            }
            _ => Err(self.error(format!("expected {what}"))),
        }
    }

    fn error(&self, msg: impl Into<String>) -> Exception {
        Exception::syntax_error(msg, self.here().loc())
    }

    fn enter(&mut self) -> PResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.error("too many nested expressions"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // --- statements ---

    fn parse_module(mut self) -> PResult<Vec<Node>> {
        let mut nodes = Vec::new();
        loop {
            while self.eat(&TokenKind::Newline) {}
            if matches!(self.peek(), TokenKind::Eof) {
                return Ok(nodes);
            }
            self.parse_statement(&mut nodes)?;
        }
    }

    fn parse_statement(&mut self, out: &mut Vec<Node>) -> PResult<()> {
        match self.peek() {
            TokenKind::Kw(Keyword::If) => {
                let node = self.parse_if()?;
                out.push(node);
            }
            TokenKind::Kw(Keyword::While) => {
                self.next();
                let test = self.parse_expression()?;
                let body = self.parse_suite()?;
                let or_else = self.parse_optional_else()?;
                out.push(Node::While { test, body, or_else });
            }
            TokenKind::Kw(Keyword::For) => {
                self.next();
                let target = self.parse_target_list()?;
                self.expect_kw(Keyword::In, "'in'")?;
                let iter = self.parse_testlist()?;
                let body = self.parse_suite()?;
                let or_else = self.parse_optional_else()?;
                out.push(Node::For {
                    target,
                    iter,
                    body,
                    or_else,
                });
            }
            TokenKind::Kw(Keyword::Def) => {
                let def = self.parse_function_def(Vec::new())?;
                out.push(def);
            }
            TokenKind::Kw(Keyword::Class) => {
                let def = self.parse_class_def(Vec::new())?;
                out.push(def);
            }
            TokenKind::At => {
                let decorators = self.parse_decorators()?;
                let node = match self.peek() {
                    TokenKind::Kw(Keyword::Def) => self.parse_function_def(decorators)?,
                    TokenKind::Kw(Keyword::Class) => self.parse_class_def(decorators)?,
                    _ => return Err(self.error("expected 'def' or 'class' after decorators")),
                };
                out.push(node);
            }
            TokenKind::Kw(Keyword::With) => {
                self.next();
                let mut items = Vec::new();
                loop {
                    let context = self.parse_expression()?;
                    let var = if self.eat_kw(Keyword::As) {
                        Some(self.parse_target_list()?)
                    } else {
                        None
                    };
                    items.push(WithItem { context, var });
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                let body = self.parse_suite()?;
                out.push(Node::With { items, body });
            }
            TokenKind::Kw(Keyword::Try) => {
                let node = self.parse_try()?;
                out.push(node);
            }
            _ => {
                self.parse_simple_statement_line(out)?;
            }
        }
        Ok(())
    }

    /// One or more `;`-separated simple statements, terminated by a newline.
    fn parse_simple_statement_line(&mut self, out: &mut Vec<Node>) -> PResult<()> {
        loop {
            out.push(self.parse_simple_statement()?);
            if self.eat(&TokenKind::Semicolon) {
                if matches!(self.peek(), TokenKind::Newline | TokenKind::Eof) {
                    break;
                }
                continue;
            }
            break;
        }
        if !self.eat(&TokenKind::Newline) && !matches!(self.peek(), TokenKind::Eof | TokenKind::Dedent) {
            return Err(self.error("invalid syntax"));
        }
        Ok(())
    }

    fn parse_simple_statement(&mut self) -> PResult<Node> {
        let position = self.here();
        match self.peek().clone() {
            TokenKind::Kw(Keyword::Pass) => {
                self.next();
                Ok(Node::Pass)
            }
            TokenKind::Kw(Keyword::Break) => {
                self.next();
                Ok(Node::Break(position))
            }
            TokenKind::Kw(Keyword::Continue) => {
                self.next();
                Ok(Node::Continue(position))
            }
            TokenKind::Kw(Keyword::Return) => {
                self.next();
                let value = if self.at_line_end() {
                    None
                } else {
                    Some(self.parse_testlist()?)
                };
                Ok(Node::Return(value, position))
            }
            TokenKind::Kw(Keyword::Raise) => {
                self.next();
                let (exc, cause) = if self.at_line_end() {
                    (None, None)
                } else {
                    let exc = self.parse_expression()?;
                    let cause = if self.eat_kw(Keyword::From) {
                        Some(self.parse_expression()?)
                    } else {
                        None
                    };
                    (Some(exc), cause)
                };
                Ok(Node::Raise { exc, cause, position })
            }
            TokenKind::Kw(Keyword::Assert) => {
                self.next();
                let test = self.parse_expression()?;
                let msg = if self.eat(&TokenKind::Comma) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                Ok(Node::Assert { test, msg })
            }
            TokenKind::Kw(Keyword::Global) => {
                self.next();
                Ok(Node::Global {
                    names: self.parse_name_list()?,
                })
            }
            TokenKind::Kw(Keyword::Nonlocal) => {
                self.next();
                Ok(Node::Nonlocal {
                    names: self.parse_name_list()?,
                })
            }
            TokenKind::Kw(Keyword::Del) => {
                self.next();
                let mut targets = Vec::new();
                loop {
                    let expr = self.parse_expression()?;
                    targets.push(self.expr_to_target(expr, false)?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                Ok(Node::Delete(targets))
            }
            TokenKind::Kw(Keyword::Import) => {
                self.next();
                let module_name = self.parse_dotted_name()?;
                if self.eat_kw(Keyword::As) {
                    self.expect_ident("name after 'as'")?;
                }
                while self.eat(&TokenKind::Comma) {
                    self.parse_dotted_name()?;
                    if self.eat_kw(Keyword::As) {
                        self.expect_ident("name after 'as'")?;
                    }
                }
                Ok(Node::Import { module_name, position })
            }
            TokenKind::Kw(Keyword::From) => {
                self.next();
                let module_name = self.parse_dotted_name()?;
                self.expect_kw(Keyword::Import, "'import'")?;
                if !self.eat(&TokenKind::Star) {
                    loop {
                        self.expect_ident("imported name")?;
                        if self.eat_kw(Keyword::As) {
                            self.expect_ident("name after 'as'")?;
                        }
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                Ok(Node::Import { module_name, position })
            }
            TokenKind::Kw(Keyword::Yield) => Err(self.error("yield is not supported")),
            _ => self.parse_expr_statement(),
        }
    }

    fn at_line_end(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof | TokenKind::Dedent
        )
    }

    fn parse_name_list(&mut self) -> PResult<Vec<Identifier>> {
        let mut names = vec![self.expect_ident("name")?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.expect_ident("name")?);
        }
        Ok(names)
    }

    fn parse_dotted_name(&mut self) -> PResult<String> {
        let mut name = self.expect_ident("module name")?.name;
        while self.eat(&TokenKind::Dot) {
            let part = self.expect_ident("name after '.'")?;
            name.push('.');
            name.push_str(&part.name);
        }
        Ok(name)
    }

    /// Expression statement, assignment chain, or augmented assignment.
    fn parse_expr_statement(&mut self) -> PResult<Node> {
        let first = self.parse_testlist_star()?;
        if let Some(op) = aug_op(self.peek()) {
            self.next();
            let target = self.expr_to_target(first, false)?;
            if matches!(target, UnpackTarget::Tuple { .. } | UnpackTarget::Starred(_)) {
                return Err(self.error("illegal target for augmented assignment"));
            }
            let value = self.parse_testlist()?;
            return Ok(Node::AugAssign { target, op, value });
        }
        if !matches!(self.peek(), TokenKind::Eq) {
            return Ok(Node::Expr(first));
        }
        let mut parts = vec![first];
        while self.eat(&TokenKind::Eq) {
            parts.push(self.parse_testlist_star()?);
        }
        let value = parts.pop().expect("at least two parts");
        let targets = parts
            .into_iter()
            .map(|expr| self.expr_to_target(expr, true))
            .collect::<PResult<Vec<_>>>()?;
        Ok(Node::Assign { targets, value })
    }

    fn parse_if(&mut self) -> PResult<Node> {
        self.expect_kw(Keyword::If, "'if'")?;
        let test = self.parse_expression()?;
        let body = self.parse_suite()?;
        let or_else = if matches!(self.peek(), TokenKind::Kw(Keyword::Elif)) {
            // rewrite `elif` into a nested `if` in the else branch
            self.tokens[self.pos].kind = TokenKind::Kw(Keyword::If);
            vec![self.parse_if()?]
        } else {
            self.parse_optional_else()?
        };
        Ok(Node::If { test, body, or_else })
    }

    fn parse_optional_else(&mut self) -> PResult<Vec<Node>> {
        if self.eat_kw(Keyword::Else) {
            self.parse_suite()
        } else {
            Ok(Vec::new())
        }
    }

    fn parse_try(&mut self) -> PResult<Node> {
        self.expect_kw(Keyword::Try, "'try'")?;
        let body = self.parse_suite()?;
        let mut handlers = Vec::new();
        while matches!(self.peek(), TokenKind::Kw(Keyword::Except)) {
            self.next();
            let (exc_type, name) = if matches!(self.peek(), TokenKind::Colon) {
                (None, None)
            } else {
                let exc_type = self.parse_expression()?;
                let name = if self.eat_kw(Keyword::As) {
                    Some(self.expect_ident("name after 'as'")?)
                } else {
                    None
                };
                (Some(exc_type), name)
            };
            let handler_body = self.parse_suite()?;
            handlers.push(ExceptHandler {
                exc_type,
                name,
                body: handler_body,
            });
        }
        let or_else = if !handlers.is_empty() && self.eat_kw(Keyword::Else) {
            self.parse_suite()?
        } else {
            Vec::new()
        };
        let finally = if self.eat_kw(Keyword::Finally) {
            self.parse_suite()?
        } else {
            Vec::new()
        };
        if handlers.is_empty() && finally.is_empty() {
            return Err(self.error("expected 'except' or 'finally' block"));
        }
        Ok(Node::Try(Box::new(Try {
            body,
            handlers,
            or_else,
            finally,
        })))
    }

    fn parse_decorators(&mut self) -> PResult<Vec<ExprLoc>> {
        let mut decorators = Vec::new();
        while self.eat(&TokenKind::At) {
            decorators.push(self.parse_expression()?);
            self.expect(&TokenKind::Newline, "newline after decorator")?;
            while self.eat(&TokenKind::Newline) {}
        }
        Ok(decorators)
    }

    fn parse_function_def(&mut self, decorators: Vec<ExprLoc>) -> PResult<Node> {
        let position = self.here();
        self.expect_kw(Keyword::Def, "'def'")?;
        let name = self.expect_ident("function name")?;
        self.expect(&TokenKind::LParen, "'('")?;
        let signature = self.parse_params(true)?;
        self.expect(&TokenKind::RParen, "')'")?;
        if self.eat(&TokenKind::Arrow) {
            // return annotation: parsed and discarded
            self.parse_expression()?;
        }
        let body = self.parse_suite()?;
        Ok(Node::FunctionDef(Rc::new(FunctionDef {
            name: name.name,
            signature,
            body,
            decorators,
            position,
        })))
    }

    /// Parses a parameter list, up to but not including the closing token.
    fn parse_params(&mut self, allow_annotations: bool) -> PResult<ParsedSignature> {
        let mut sig = ParsedSignature::default();
        let mut seen_star = false;
        let mut seen_default = false;
        loop {
            match self.peek().clone() {
                TokenKind::RParen | TokenKind::Colon => break,
                TokenKind::Slash => {
                    self.next();
                    if seen_star || !sig.pos_only.is_empty() {
                        return Err(self.error("invalid '/' in parameter list"));
                    }
                    sig.pos_only = std::mem::take(&mut sig.args);
                }
                TokenKind::Star => {
                    self.next();
                    if seen_star {
                        return Err(self.error("invalid '*' in parameter list"));
                    }
                    seen_star = true;
                    if let TokenKind::Ident(_) = self.peek() {
                        let name = self.expect_ident("parameter name")?;
                        self.skip_annotation(allow_annotations)?;
                        sig.var_args = Some(name);
                    }
                }
                TokenKind::DoubleStar => {
                    self.next();
                    let name = self.expect_ident("parameter name")?;
                    self.skip_annotation(allow_annotations)?;
                    sig.var_kwargs = Some(name);
                }
                TokenKind::Ident(_) => {
                    let name = self.expect_ident("parameter name")?;
                    self.skip_annotation(allow_annotations)?;
                    let default = if self.eat(&TokenKind::Eq) {
                        seen_default = true;
                        Some(self.parse_expression()?)
                    } else {
                        if seen_default && !seen_star {
                            return Err(self.error("parameter without a default follows parameter with a default"));
                        }
                        None
                    };
                    let param = Param { name, default };
                    if seen_star {
                        sig.kw_only.push(param);
                    } else {
                        sig.args.push(param);
                    }
                }
                _ => return Err(self.error("invalid parameter list")),
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(sig)
    }

    fn skip_annotation(&mut self, allow: bool) -> PResult<()> {
        if allow && self.eat(&TokenKind::Colon) {
            self.parse_expression()?;
        }
        Ok(())
    }

    fn parse_class_def(&mut self, decorators: Vec<ExprLoc>) -> PResult<Node> {
        self.expect_kw(Keyword::Class, "'class'")?;
        let name = self.expect_ident("class name")?;
        let mut bases = Vec::new();
        if self.eat(&TokenKind::LParen) {
            while !matches!(self.peek(), TokenKind::RParen) {
                bases.push(self.parse_expression()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RParen, "')'")?;
        }
        let body = self.parse_suite()?;
        Ok(Node::ClassDef(Rc::new(ClassDef {
            name,
            bases,
            body,
            decorators,
        })))
    }

    /// A suite: `: NEWLINE INDENT stmts DEDENT`, or inline statements on the
    /// same line (`if x: y = 1`).
    fn parse_suite(&mut self) -> PResult<Vec<Node>> {
        self.expect(&TokenKind::Colon, "':'")?;
        let mut body = Vec::new();
        if self.eat(&TokenKind::Newline) {
            self.expect(&TokenKind::Indent, "an indented block")?;
            loop {
                while self.eat(&TokenKind::Newline) {}
                if self.eat(&TokenKind::Dedent) {
                    break;
                }
                if matches!(self.peek(), TokenKind::Eof) {
                    return Err(self.error("unexpected end of input in block"));
                }
                self.parse_statement(&mut body)?;
            }
        } else {
            self.parse_simple_statement_line(&mut body)?;
        }
        if body.is_empty() {
            return Err(self.error("expected a statement"));
        }
        Ok(body)
    }

    // --- assignment targets ---

    /// Parses a `for`-style target list: `a`, `a, b`, `(a, b), c`, `a, *rest`.
    ///
    /// Targets are postfix expressions only, so the `in` keyword of a `for`
    /// statement terminates the list instead of parsing as a comparison.
    fn parse_target_list(&mut self) -> PResult<UnpackTarget> {
        let expr = self.parse_testlist_star_no_in()?;
        self.expr_to_target(expr, true)
    }

    /// Converts an expression to an assignment target.
    fn expr_to_target(&mut self, expr: ExprLoc, allow_star: bool) -> PResult<UnpackTarget> {
        let position = expr.position;
        match expr.expr {
            Expr::Name(identifier) => Ok(UnpackTarget::Name(identifier)),
            Expr::AttrGet { object, attr } => Ok(UnpackTarget::Attr {
                object,
                attr,
                position,
            }),
            Expr::Subscript { object, index } => Ok(UnpackTarget::Subscript {
                object,
                index,
                position,
            }),
            Expr::Starred(inner) if allow_star => {
                Ok(UnpackTarget::Starred(Box::new(self.expr_to_target(*inner, false)?)))
            }
            Expr::Tuple(elts) | Expr::List(elts) if allow_star => {
                let targets = elts
                    .into_iter()
                    .map(|e| self.expr_to_target(e, true))
                    .collect::<PResult<Vec<_>>>()?;
                let starred = targets
                    .iter()
                    .filter(|t| matches!(t, UnpackTarget::Starred(_)))
                    .count();
                if starred > 1 {
                    return Err(Exception::syntax_error(
                        "multiple starred expressions in assignment",
                        position.loc(),
                    ));
                }
                Ok(UnpackTarget::Tuple { targets, position })
            }
            _ => Err(Exception::syntax_error("cannot assign to expression", position.loc())),
        }
    }

    // --- expressions ---

    /// A comma-separated expression list; two or more entries make a tuple.
    fn parse_testlist(&mut self) -> PResult<ExprLoc> {
        self.parse_testlist_impl(false)
    }

    /// Like `parse_testlist` but entries may be starred (`a, *rest`).
    fn parse_testlist_star(&mut self) -> PResult<ExprLoc> {
        self.parse_testlist_impl(true)
    }

    fn parse_testlist_impl(&mut self, allow_star: bool) -> PResult<ExprLoc> {
        let position = self.here();
        let first = self.parse_maybe_starred(allow_star)?;
        if !matches!(self.peek(), TokenKind::Comma) {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat(&TokenKind::Comma) {
            if !token_starts_expr(self.peek()) {
                break;
            }
            elts.push(self.parse_maybe_starred(allow_star)?);
        }
        Ok(ExprLoc::new(position, Expr::Tuple(elts)))
    }

    fn parse_maybe_starred(&mut self, allow_star: bool) -> PResult<ExprLoc> {
        if allow_star && matches!(self.peek(), TokenKind::Star) {
            let position = self.here();
            self.next();
            let inner = self.parse_expression()?;
            return Ok(ExprLoc::new(position, Expr::Starred(Box::new(inner))));
        }
        self.parse_expression()
    }

    /// Lowest precedence: lambda, then the conditional expression.
    fn parse_expression(&mut self) -> PResult<ExprLoc> {
        self.enter()?;
        let result = self.parse_expression_inner();
        self.leave();
        result
    }

    fn parse_expression_inner(&mut self) -> PResult<ExprLoc> {
        let position = self.here();
        if self.eat_kw(Keyword::Lambda) {
            let signature = self.parse_params(false)?;
            self.expect(&TokenKind::Colon, "':'")?;
            let body = self.parse_expression()?;
            let return_position = body.position;
            let def = FunctionDef {
                name: "<lambda>".to_owned(),
                signature,
                body: vec![Node::Return(Some(body), return_position)],
                decorators: Vec::new(),
                position,
            };
            return Ok(ExprLoc::new(position, Expr::Lambda(Rc::new(def))));
        }
        let body = self.parse_or()?;
        if !matches!(self.peek(), TokenKind::Kw(Keyword::If)) {
            return Ok(body);
        }
        self.next();
        let test = self.parse_or()?;
        self.expect_kw(Keyword::Else, "'else'")?;
        let orelse = self.parse_expression()?;
        Ok(ExprLoc::new(
            position,
            Expr::IfElse {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            },
        ))
    }

    fn parse_or(&mut self) -> PResult<ExprLoc> {
        let mut left = self.parse_and()?;
        while self.eat_kw(Keyword::Or) {
            let right = self.parse_and()?;
            let position = left.position;
            left = ExprLoc::new(
                position,
                Expr::Op {
                    left: Box::new(left),
                    op: Operator::Or,
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> PResult<ExprLoc> {
        let mut left = self.parse_not()?;
        while self.eat_kw(Keyword::And) {
            let right = self.parse_not()?;
            let position = left.position;
            left = ExprLoc::new(
                position,
                Expr::Op {
                    left: Box::new(left),
                    op: Operator::And,
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> PResult<ExprLoc> {
        let position = self.here();
        if self.eat_kw(Keyword::Not) {
            let operand = self.parse_not()?;
            return Ok(ExprLoc::new(position, Expr::Not(Box::new(operand))));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<ExprLoc> {
        let left = self.parse_bit_or()?;
        let mut comparisons = Vec::new();
        while let Some(op) = self.eat_cmp_op() {
            let right = self.parse_bit_or()?;
            comparisons.push((op, right));
        }
        match comparisons.len() {
            0 => Ok(left),
            1 => {
                let (op, right) = comparisons.pop().expect("length checked");
                let position = left.position;
                Ok(ExprLoc::new(
                    position,
                    Expr::CmpOp {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    },
                ))
            }
            _ => {
                let position = left.position;
                Ok(ExprLoc::new(
                    position,
                    Expr::ChainCmp {
                        left: Box::new(left),
                        comparisons,
                    },
                ))
            }
        }
    }

    fn eat_cmp_op(&mut self) -> Option<CmpOperator> {
        let op = match self.peek() {
            TokenKind::Lt => CmpOperator::Lt,
            TokenKind::Le => CmpOperator::LtE,
            TokenKind::Gt => CmpOperator::Gt,
            TokenKind::Ge => CmpOperator::GtE,
            TokenKind::EqEq => CmpOperator::Eq,
            TokenKind::Ne => CmpOperator::NotEq,
            TokenKind::Kw(Keyword::In) => CmpOperator::In,
            TokenKind::Kw(Keyword::Is) => {
                self.next();
                if self.eat_kw(Keyword::Not) {
                    return Some(CmpOperator::IsNot);
                }
                return Some(CmpOperator::Is);
            }
            TokenKind::Kw(Keyword::Not) if matches!(self.peek2(), TokenKind::Kw(Keyword::In)) => {
                self.next();
                self.next();
                return Some(CmpOperator::NotIn);
            }
            _ => return None,
        };
        self.next();
        Some(op)
    }

    fn parse_bit_or(&mut self) -> PResult<ExprLoc> {
        let mut left = self.parse_bit_xor()?;
        while self.eat(&TokenKind::Pipe) {
            let right = self.parse_bit_xor()?;
            left = binop(left, Operator::BitOr, right);
        }
        Ok(left)
    }

    fn parse_bit_xor(&mut self) -> PResult<ExprLoc> {
        let mut left = self.parse_bit_and()?;
        while self.eat(&TokenKind::Caret) {
            let right = self.parse_bit_and()?;
            left = binop(left, Operator::BitXor, right);
        }
        Ok(left)
    }

    fn parse_bit_and(&mut self) -> PResult<ExprLoc> {
        let mut left = self.parse_shift()?;
        while self.eat(&TokenKind::Amp) {
            let right = self.parse_shift()?;
            left = binop(left, Operator::BitAnd, right);
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> PResult<ExprLoc> {
        let mut left = self.parse_arith()?;
        loop {
            let op = match self.peek() {
                TokenKind::Shl => Operator::LShift,
                TokenKind::Shr => Operator::RShift,
                _ => break,
            };
            self.next();
            let right = self.parse_arith()?;
            left = binop(left, op, right);
        }
        Ok(left)
    }

    fn parse_arith(&mut self) -> PResult<ExprLoc> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => Operator::Add,
                TokenKind::Minus => Operator::Sub,
                _ => break,
            };
            self.next();
            let right = self.parse_term()?;
            left = binop(left, op, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> PResult<ExprLoc> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => Operator::Mult,
                TokenKind::Slash => Operator::Div,
                TokenKind::DoubleSlash => Operator::FloorDiv,
                TokenKind::Percent => Operator::Mod,
                _ => break,
            };
            self.next();
            let right = self.parse_factor()?;
            left = binop(left, op, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> PResult<ExprLoc> {
        let position = self.here();
        let expr = match self.peek() {
            TokenKind::Minus => {
                self.next();
                Expr::UnaryMinus(Box::new(self.parse_factor()?))
            }
            TokenKind::Plus => {
                self.next();
                Expr::UnaryPlus(Box::new(self.parse_factor()?))
            }
            TokenKind::Tilde => {
                self.next();
                Expr::UnaryInvert(Box::new(self.parse_factor()?))
            }
            _ => return self.parse_power(),
        };
        Ok(ExprLoc::new(position, expr))
    }

    fn parse_power(&mut self) -> PResult<ExprLoc> {
        let base = self.parse_postfix()?;
        if self.eat(&TokenKind::DoubleStar) {
            // right-associative; the exponent may itself be unary or a power
            let exponent = self.parse_factor()?;
            return Ok(binop(base, Operator::Pow, exponent));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> PResult<ExprLoc> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek() {
                TokenKind::LParen => {
                    self.next();
                    let args = self.parse_call_args()?;
                    let position = expr.position;
                    expr = match expr.expr {
                        Expr::AttrGet { object, attr } => ExprLoc::new(
                            position,
                            Expr::AttrCall {
                                object,
                                attr,
                                args: Box::new(args),
                            },
                        ),
                        _ => ExprLoc::new(
                            position,
                            Expr::Call {
                                callable: Box::new(expr),
                                args: Box::new(args),
                            },
                        ),
                    };
                }
                TokenKind::LBracket => {
                    self.next();
                    let index = self.parse_subscript_index()?;
                    self.expect(&TokenKind::RBracket, "']'")?;
                    let position = expr.position;
                    expr = ExprLoc::new(
                        position,
                        Expr::Subscript {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                    );
                }
                TokenKind::Dot => {
                    self.next();
                    let attr = self.expect_ident("attribute name")?;
                    let position = expr.position;
                    expr = ExprLoc::new(
                        position,
                        Expr::AttrGet {
                            object: Box::new(expr),
                            attr: attr.name,
                        },
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Call arguments after the opening paren, consuming the closing paren.
    fn parse_call_args(&mut self) -> PResult<ArgExprs> {
        let mut out = ArgExprs::default();
        if self.eat(&TokenKind::RParen) {
            return Ok(out);
        }
        loop {
            let position = self.here();
            match self.peek().clone() {
                TokenKind::Star => {
                    self.next();
                    let value = self.parse_expression()?;
                    out.args.push(ExprLoc::new(position, Expr::Starred(Box::new(value))));
                }
                TokenKind::DoubleStar => {
                    self.next();
                    let value = self.parse_expression()?;
                    out.kwargs.push(Kwarg { name: None, value });
                }
                TokenKind::Ident(name) if matches!(self.peek2(), TokenKind::Eq) => {
                    self.next();
                    self.next();
                    let value = self.parse_expression()?;
                    out.kwargs.push(Kwarg {
                        name: Some(Identifier { name, position }),
                        value,
                    });
                }
                _ => {
                    let value = self.parse_expression()?;
                    // bare generator expression argument: `sum(x for x in y)`
                    if matches!(self.peek(), TokenKind::Kw(Keyword::For)) && out.args.is_empty() && out.kwargs.is_empty()
                    {
                        let generators = self.parse_comprehension_clauses()?;
                        out.args.push(ExprLoc::new(
                            position,
                            Expr::GeneratorExp {
                                elt: Box::new(value),
                                generators,
                            },
                        ));
                        self.expect(&TokenKind::RParen, "')'")?;
                        return Ok(out);
                    }
                    if !out.kwargs.is_empty() {
                        return Err(self.error("positional argument follows keyword argument"));
                    }
                    out.args.push(value);
                }
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            if matches!(self.peek(), TokenKind::RParen) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(out)
    }

    /// The index expression of a subscript: a plain expression, a tuple of
    /// them, or a slice with optional components.
    fn parse_subscript_index(&mut self) -> PResult<ExprLoc> {
        let position = self.here();
        let lower = if matches!(self.peek(), TokenKind::Colon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        if !matches!(self.peek(), TokenKind::Colon) {
            let first = lower.ok_or_else(|| self.error("expected subscript expression"))?;
            if !matches!(self.peek(), TokenKind::Comma) {
                return Ok(first);
            }
            let mut elts = vec![first];
            while self.eat(&TokenKind::Comma) {
                if matches!(self.peek(), TokenKind::RBracket) {
                    break;
                }
                elts.push(self.parse_expression()?);
            }
            return Ok(ExprLoc::new(position, Expr::Tuple(elts)));
        }
        self.next();
        let upper = if matches!(self.peek(), TokenKind::Colon | TokenKind::RBracket) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let step = if self.eat(&TokenKind::Colon) {
            if matches!(self.peek(), TokenKind::RBracket) {
                None
            } else {
                Some(self.parse_expression()?)
            }
        } else {
            None
        };
        Ok(ExprLoc::new(
            position,
            Expr::Slice {
                lower: lower.map(Box::new),
                upper: upper.map(Box::new),
                step: step.map(Box::new),
            },
        ))
    }

    fn parse_atom(&mut self) -> PResult<ExprLoc> {
        let position = self.here();
        let kind = self.peek().clone();
        match kind {
            TokenKind::Int(value) => {
                self.next();
                Ok(ExprLoc::new(position, Expr::Literal(Literal::Int(value))))
            }
            TokenKind::LongInt(value) => {
                self.next();
                Ok(ExprLoc::new(position, Expr::Literal(Literal::LongInt(value))))
            }
            TokenKind::Float(value) => {
                self.next();
                Ok(ExprLoc::new(position, Expr::Literal(Literal::Float(value))))
            }
            TokenKind::Str(first) => {
                self.next();
                // adjacent string literals concatenate
                let mut text = first;
                while let TokenKind::Str(more) = self.peek() {
                    text.push_str(more);
                    self.next();
                }
                Ok(ExprLoc::new(position, Expr::Literal(Literal::Str(text))))
            }
            TokenKind::FString(segments) => {
                self.next();
                let parts = self.parse_fstring_parts(&segments)?;
                Ok(ExprLoc::new(position, Expr::FString(parts)))
            }
            TokenKind::Kw(Keyword::None) => {
                self.next();
                Ok(ExprLoc::new(position, Expr::Literal(Literal::None)))
            }
            TokenKind::Kw(Keyword::True) => {
                self.next();
                Ok(ExprLoc::new(position, Expr::Literal(Literal::Bool(true))))
            }
            TokenKind::Kw(Keyword::False) => {
                self.next();
                Ok(ExprLoc::new(position, Expr::Literal(Literal::Bool(false))))
            }
            TokenKind::Kw(Keyword::Lambda) => self.parse_expression(),
            TokenKind::Ident(name) => {
                self.next();
                Ok(ExprLoc::new(position, Expr::Name(Identifier { name, position })))
            }
            TokenKind::LParen => {
                self.next();
                if self.eat(&TokenKind::RParen) {
                    return Ok(ExprLoc::new(position, Expr::Tuple(Vec::new())));
                }
                let first = self.parse_maybe_starred(true)?;
                if matches!(self.peek(), TokenKind::Kw(Keyword::For)) {
                    let generators = self.parse_comprehension_clauses()?;
                    self.expect(&TokenKind::RParen, "')'")?;
                    return Ok(ExprLoc::new(
                        position,
                        Expr::GeneratorExp {
                            elt: Box::new(first),
                            generators,
                        },
                    ));
                }
                if matches!(self.peek(), TokenKind::Comma) {
                    let mut elts = vec![first];
                    while self.eat(&TokenKind::Comma) {
                        if matches!(self.peek(), TokenKind::RParen) {
                            break;
                        }
                        elts.push(self.parse_maybe_starred(true)?);
                    }
                    self.expect(&TokenKind::RParen, "')'")?;
                    return Ok(ExprLoc::new(position, Expr::Tuple(elts)));
                }
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(first)
            }
            TokenKind::LBracket => {
                self.next();
                if self.eat(&TokenKind::RBracket) {
                    return Ok(ExprLoc::new(position, Expr::List(Vec::new())));
                }
                let first = self.parse_maybe_starred(true)?;
                if matches!(self.peek(), TokenKind::Kw(Keyword::For)) {
                    let generators = self.parse_comprehension_clauses()?;
                    self.expect(&TokenKind::RBracket, "']'")?;
                    return Ok(ExprLoc::new(
                        position,
                        Expr::ListComp {
                            elt: Box::new(first),
                            generators,
                        },
                    ));
                }
                let mut elts = vec![first];
                while self.eat(&TokenKind::Comma) {
                    if matches!(self.peek(), TokenKind::RBracket) {
                        break;
                    }
                    elts.push(self.parse_maybe_starred(true)?);
                }
                self.expect(&TokenKind::RBracket, "']'")?;
                Ok(ExprLoc::new(position, Expr::List(elts)))
            }
            TokenKind::LBrace => self.parse_brace_display(position),
            _ => Err(self.error("invalid syntax")),
        }
    }

    /// `{}` displays: dict literal, set literal, dict/set comprehension.
    fn parse_brace_display(&mut self, position: CodeRange) -> PResult<ExprLoc> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        if self.eat(&TokenKind::RBrace) {
            return Ok(ExprLoc::new(position, Expr::Dict(Vec::new())));
        }
        if self.eat(&TokenKind::DoubleStar) {
            let mapping = self.parse_expression()?;
            let mut items = vec![DictItem::Unpack { mapping }];
            while self.eat(&TokenKind::Comma) {
                if matches!(self.peek(), TokenKind::RBrace) {
                    break;
                }
                items.push(self.parse_dict_item()?);
            }
            self.expect(&TokenKind::RBrace, "'}'")?;
            return Ok(ExprLoc::new(position, Expr::Dict(items)));
        }
        let first = self.parse_expression()?;
        if self.eat(&TokenKind::Colon) {
            let value = self.parse_expression()?;
            if matches!(self.peek(), TokenKind::Kw(Keyword::For)) {
                let generators = self.parse_comprehension_clauses()?;
                self.expect(&TokenKind::RBrace, "'}'")?;
                return Ok(ExprLoc::new(
                    position,
                    Expr::DictComp {
                        key: Box::new(first),
                        value: Box::new(value),
                        generators,
                    },
                ));
            }
            let mut items = vec![DictItem::Pair { key: first, value }];
            while self.eat(&TokenKind::Comma) {
                if matches!(self.peek(), TokenKind::RBrace) {
                    break;
                }
                items.push(self.parse_dict_item()?);
            }
            self.expect(&TokenKind::RBrace, "'}'")?;
            return Ok(ExprLoc::new(position, Expr::Dict(items)));
        }
        if matches!(self.peek(), TokenKind::Kw(Keyword::For)) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect(&TokenKind::RBrace, "'}'")?;
            return Ok(ExprLoc::new(
                position,
                Expr::SetComp {
                    elt: Box::new(first),
                    generators,
                },
            ));
        }
        let mut elts = vec![first];
        while self.eat(&TokenKind::Comma) {
            if matches!(self.peek(), TokenKind::RBrace) {
                break;
            }
            elts.push(self.parse_expression()?);
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(ExprLoc::new(position, Expr::Set(elts)))
    }

    fn parse_dict_item(&mut self) -> PResult<DictItem> {
        if self.eat(&TokenKind::DoubleStar) {
            let mapping = self.parse_expression()?;
            return Ok(DictItem::Unpack { mapping });
        }
        let key = self.parse_expression()?;
        self.expect(&TokenKind::Colon, "':'")?;
        let value = self.parse_expression()?;
        Ok(DictItem::Pair { key, value })
    }

    /// One or more `for target in iter [if cond]...` clauses.
    fn parse_comprehension_clauses(&mut self) -> PResult<Vec<Comprehension>> {
        let mut generators = Vec::new();
        while self.eat_kw(Keyword::For) {
            let target_expr = self.parse_testlist_star_no_in()?;
            let target = self.expr_to_target(target_expr, true)?;
            self.expect_kw(Keyword::In, "'in'")?;
            let iter = self.parse_or()?;
            let mut ifs = Vec::new();
            while self.eat_kw(Keyword::If) {
                ifs.push(self.parse_or()?);
            }
            generators.push(Comprehension { target, iter, ifs });
        }
        Ok(generators)
    }

    /// A comprehension target list: comma-separated postfix expressions, so
    /// the `in` keyword terminates the list rather than parsing as a
    /// comparison.
    fn parse_testlist_star_no_in(&mut self) -> PResult<ExprLoc> {
        let position = self.here();
        let mut elts = Vec::new();
        loop {
            if matches!(self.peek(), TokenKind::Star) {
                let star_position = self.here();
                self.next();
                let inner = self.parse_postfix()?;
                elts.push(ExprLoc::new(star_position, Expr::Starred(Box::new(inner))));
            } else {
                elts.push(self.parse_postfix()?);
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        if elts.len() == 1 {
            Ok(elts.pop().expect("length checked"))
        } else {
            Ok(ExprLoc::new(position, Expr::Tuple(elts)))
        }
    }

    /// Re-parses f-string interpolation sources into expressions.
    fn parse_fstring_parts(&mut self, segments: &[FStringSegment]) -> PResult<Vec<FStringPart>> {
        let mut parts = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment {
                FStringSegment::Literal(text) => parts.push(FStringPart::Literal(text.clone())),
                FStringSegment::Interpolation {
                    source,
                    position,
                    conversion,
                    format_spec,
                } => {
                    let expr = parse_embedded_expression(source, *position)?;
                    let conversion = match conversion {
                        Some('r') => Some(ConversionFlag::Repr),
                        Some('s') => Some(ConversionFlag::Str),
                        Some(other) => {
                            return Err(Exception::syntax_error(
                                format!("f-string: invalid conversion character {other:?}"),
                                position.loc(),
                            ));
                        }
                        None => None,
                    };
                    parts.push(FStringPart::Interpolation {
                        expr,
                        conversion,
                        format_spec: format_spec.clone(),
                    });
                }
            }
        }
        Ok(parts)
    }
}

/// Parses an expression snippet (an f-string interpolation source).
fn parse_embedded_expression(source: &str, position: CodeRange) -> Result<ExprLoc, Exception> {
    let tokens = tokenize(source)
        .map_err(|_| Exception::syntax_error("f-string: invalid expression", position.loc()))?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_testlist()?;
    if !matches!(parser.peek(), TokenKind::Newline | TokenKind::Eof) {
        return Err(Exception::syntax_error("f-string: invalid expression", position.loc()));
    }
    Ok(expr)
}

fn binop(left: ExprLoc, op: Operator, right: ExprLoc) -> ExprLoc {
    let position = left.position;
    ExprLoc::new(
        position,
        Expr::Op {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
    )
}

fn aug_op(kind: &TokenKind) -> Option<Operator> {
    match kind {
        TokenKind::PlusEq => Some(Operator::Add),
        TokenKind::MinusEq => Some(Operator::Sub),
        TokenKind::StarEq => Some(Operator::Mult),
        TokenKind::SlashEq => Some(Operator::Div),
        TokenKind::DoubleSlashEq => Some(Operator::FloorDiv),
        TokenKind::PercentEq => Some(Operator::Mod),
        TokenKind::DoubleStarEq => Some(Operator::Pow),
        TokenKind::AmpEq => Some(Operator::BitAnd),
        TokenKind::PipeEq => Some(Operator::BitOr),
        TokenKind::CaretEq => Some(Operator::BitXor),
        TokenKind::ShlEq => Some(Operator::LShift),
        TokenKind::ShrEq => Some(Operator::RShift),
        _ => None,
    }
}

fn token_starts_expr(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident(_)
            | TokenKind::Int(_)
            | TokenKind::LongInt(_)
            | TokenKind::Float(_)
            | TokenKind::Str(_)
            | TokenKind::FString(_)
            | TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::LBrace
            | TokenKind::Minus
            | TokenKind::Plus
            | TokenKind::Tilde
            | TokenKind::Star
            | TokenKind::Kw(
                Keyword::None
                    | Keyword::True
                    | Keyword::False
                    | Keyword::Not
                    | Keyword::Lambda
            )
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Vec<Node> {
        parse(source).unwrap()
    }

    #[test]
    fn expression_statement() {
        let nodes = parse_ok("1 + 2 * 3");
        assert_eq!(nodes.len(), 1);
        let Node::Expr(ExprLoc {
            expr: Expr::Op { op, right, .. },
            ..
        }) = &nodes[0]
        else {
            panic!("expected binary op, got {:?}", nodes[0]);
        };
        assert_eq!(*op, Operator::Add);
        // precedence: the multiplication binds tighter
        assert!(matches!(
            &right.expr,
            Expr::Op {
                op: Operator::Mult,
                ..
            }
        ));
    }

    #[test]
    fn chained_comparison() {
        let nodes = parse_ok("a < b < c");
        assert!(matches!(
            &nodes[0],
            Node::Expr(ExprLoc {
                expr: Expr::ChainCmp { comparisons, .. },
                ..
            }) if comparisons.len() == 2
        ));
    }

    #[test]
    fn power_is_right_associative() {
        let nodes = parse_ok("2 ** 3 ** 2");
        let Node::Expr(ExprLoc {
            expr: Expr::Op { op, right, .. },
            ..
        }) = &nodes[0]
        else {
            panic!("expected power");
        };
        assert_eq!(*op, Operator::Pow);
        assert!(matches!(&right.expr, Expr::Op { op: Operator::Pow, .. }));
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        // -2 ** 2 parses as -(2 ** 2)
        let nodes = parse_ok("-2 ** 2");
        assert!(matches!(
            &nodes[0],
            Node::Expr(ExprLoc {
                expr: Expr::UnaryMinus(_),
                ..
            })
        ));
    }

    #[test]
    fn starred_assignment_target() {
        let nodes = parse_ok("first, *middle, last = values");
        let Node::Assign { targets, .. } = &nodes[0] else {
            panic!("expected assignment");
        };
        let UnpackTarget::Tuple { targets: inner, .. } = &targets[0] else {
            panic!("expected tuple target");
        };
        assert_eq!(inner.len(), 3);
        assert!(matches!(inner[1], UnpackTarget::Starred(_)));
    }

    #[test]
    fn double_star_rejected_in_targets() {
        assert!(parse("a, *b, *c = x").is_err());
    }

    #[test]
    fn inline_suite() {
        let nodes = parse_ok("def f(x): return x\n");
        let Node::FunctionDef(def) = &nodes[0] else {
            panic!("expected def");
        };
        assert_eq!(def.name, "f");
        assert_eq!(def.body.len(), 1);
    }

    #[test]
    fn full_signature() {
        let nodes = parse_ok("def f(a, b=1, *args, c, d=2, **kwargs): pass");
        let Node::FunctionDef(def) = &nodes[0] else {
            panic!("expected def");
        };
        assert_eq!(def.signature.args.len(), 2);
        assert!(def.signature.var_args.is_some());
        assert_eq!(def.signature.kw_only.len(), 2);
        assert!(def.signature.var_kwargs.is_some());
    }

    #[test]
    fn class_with_bases_and_decorator() {
        let nodes = parse_ok("@register\nclass C(A, B):\n    x = 1\n");
        let Node::ClassDef(def) = &nodes[0] else {
            panic!("expected class");
        };
        assert_eq!(def.bases.len(), 2);
        assert_eq!(def.decorators.len(), 1);
    }

    #[test]
    fn comprehension_with_filter() {
        let nodes = parse_ok("[x * 2 for x in items if x > 0]");
        let Node::Expr(ExprLoc {
            expr: Expr::ListComp { generators, .. },
            ..
        }) = &nodes[0]
        else {
            panic!("expected list comp");
        };
        assert_eq!(generators.len(), 1);
        assert_eq!(generators[0].ifs.len(), 1);
    }

    #[test]
    fn slice_components() {
        let nodes = parse_ok("x[1:10:2]");
        let Node::Expr(ExprLoc {
            expr: Expr::Subscript { index, .. },
            ..
        }) = &nodes[0]
        else {
            panic!("expected subscript");
        };
        assert!(matches!(
            &index.expr,
            Expr::Slice {
                lower: Some(_),
                upper: Some(_),
                step: Some(_)
            }
        ));
    }

    #[test]
    fn try_without_handlers_rejected() {
        assert!(parse("try:\n    pass\n").is_err());
    }

    #[test]
    fn yield_rejected() {
        assert!(parse("def f():\n    yield 1\n").is_err());
    }

    #[test]
    fn keyword_after_positional_ok_but_not_reverse() {
        assert!(parse("f(1, x=2)").is_ok());
        assert!(parse("f(x=2, 1)").is_err());
    }
}
