//! The AST produced by the parser and walked by the evaluator.
//!
//! Statements are [`Node`]s, expressions are [`Expr`]s wrapped in [`ExprLoc`]
//! with their source position. Function bodies are shared via `Rc` so
//! closures created at runtime can hold their body without copying the tree.

use std::rc::Rc;

use num_bigint::BigInt;

use crate::{fstring::FStringPart, lex::CodeRange};

/// An identifier with its source position.
#[derive(Debug, Clone)]
pub(crate) struct Identifier {
    pub name: String,
    pub position: CodeRange,
}

/// A literal constant, detached from the runtime heap until evaluated.
#[derive(Debug, Clone)]
pub(crate) enum Literal {
    None,
    Bool(bool),
    Int(i64),
    /// An integer literal exceeding the i64 range.
    LongInt(BigInt),
    Float(f64),
    Str(String),
}

/// Binary operators for arithmetic, bitwise, and boolean operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operator {
    Add,
    Sub,
    Mult,
    Div,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
    FloorDiv,
    // boolean operators; short-circuit in the evaluator
    And,
    Or,
}

impl Operator {
    /// The operator symbol for error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mult => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::LShift => "<<",
            Self::RShift => ">>",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitAnd => "&",
            Self::FloorDiv => "//",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// The in-place dunder name tried first by augmented assignment.
    pub fn inplace_dunder(self) -> Option<&'static str> {
        match self {
            Self::Add => Some("__iadd__"),
            Self::Sub => Some("__isub__"),
            Self::Mult => Some("__imul__"),
            _ => None,
        }
    }

    /// The left-hand and reflected dunder names for this operator.
    pub fn dunders(self) -> (&'static str, &'static str) {
        match self {
            Self::Add => ("__add__", "__radd__"),
            Self::Sub => ("__sub__", "__rsub__"),
            Self::Mult => ("__mul__", "__rmul__"),
            Self::Div => ("__truediv__", "__rtruediv__"),
            Self::Mod => ("__mod__", "__rmod__"),
            Self::Pow => ("__pow__", "__rpow__"),
            Self::LShift => ("__lshift__", "__rlshift__"),
            Self::RShift => ("__rshift__", "__rrshift__"),
            Self::BitOr => ("__or__", "__ror__"),
            Self::BitXor => ("__xor__", "__rxor__"),
            Self::BitAnd => ("__and__", "__rand__"),
            Self::FloorDiv => ("__floordiv__", "__rfloordiv__"),
            Self::And | Self::Or => ("", ""),
        }
    }
}

/// Comparison operators; these always produce a bool (or dispatch to a
/// rich-comparison dunder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl CmpOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtE => "<=",
            Self::Gt => ">",
            Self::GtE => ">=",
            Self::Is => "is",
            Self::IsNot => "is not",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

/// Target of an assignment, `for` loop, comprehension clause, or `del`.
///
/// One recursive grammar serves every binding site: a name, an attribute, a
/// subscript, a starred element, or a nested tuple/list pattern.
#[derive(Debug, Clone)]
pub(crate) enum UnpackTarget {
    Name(Identifier),
    Attr {
        object: Box<ExprLoc>,
        attr: String,
        position: CodeRange,
    },
    Subscript {
        object: Box<ExprLoc>,
        index: Box<ExprLoc>,
        position: CodeRange,
    },
    /// `*rest` - captures remaining values into a list. Only valid directly
    /// inside a `Tuple` pattern; the parser enforces at most one per level.
    Starred(Box<UnpackTarget>),
    Tuple {
        targets: Vec<UnpackTarget>,
        position: CodeRange,
    },
}

/// One keyword argument in a call: `name=value`, or `**mapping` when `name`
/// is absent.
#[derive(Debug, Clone)]
pub(crate) struct Kwarg {
    pub name: Option<Identifier>,
    pub value: ExprLoc,
}

/// Arguments at a call site. Positional entries may be `Expr::Starred` to
/// spread an iterable; keyword entries follow the positional ones.
#[derive(Debug, Clone, Default)]
pub(crate) struct ArgExprs {
    pub args: Vec<ExprLoc>,
    pub kwargs: Vec<Kwarg>,
}

/// One entry in a dict literal, preserving source order so later entries
/// overwrite earlier ones across `**mapping` unpacks.
#[derive(Debug, Clone)]
pub(crate) enum DictItem {
    Pair { key: ExprLoc, value: ExprLoc },
    Unpack { mapping: ExprLoc },
}

/// A generator clause in a comprehension: `for target in iter [if cond]...`
#[derive(Debug, Clone)]
pub(crate) struct Comprehension {
    pub target: UnpackTarget,
    pub iter: ExprLoc,
    pub ifs: Vec<ExprLoc>,
}

/// An expression in the AST.
#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Literal(Literal),
    Name(Identifier),
    Tuple(Vec<ExprLoc>),
    List(Vec<ExprLoc>),
    Set(Vec<ExprLoc>),
    Dict(Vec<DictItem>),
    /// `*expr` - only valid inside call arguments, tuple/list displays and
    /// assignment targets; the parser rejects it elsewhere.
    Starred(Box<ExprLoc>),
    Op {
        left: Box<ExprLoc>,
        op: Operator,
        right: Box<ExprLoc>,
    },
    CmpOp {
        left: Box<ExprLoc>,
        op: CmpOperator,
        right: Box<ExprLoc>,
    },
    /// Chained comparison `a < b < c`: intermediate operands evaluate once
    /// and the chain short-circuits on the first false link.
    ChainCmp {
        left: Box<ExprLoc>,
        comparisons: Vec<(CmpOperator, ExprLoc)>,
    },
    Not(Box<ExprLoc>),
    UnaryMinus(Box<ExprLoc>),
    UnaryPlus(Box<ExprLoc>),
    UnaryInvert(Box<ExprLoc>),
    /// Call of an arbitrary callable expression.
    Call {
        callable: Box<ExprLoc>,
        args: Box<ArgExprs>,
    },
    /// Method call on an object: `obj.method(args)`. Kept distinct from
    /// `AttrGet` + `Call` so built-in method tables dispatch without
    /// materializing a bound method.
    AttrCall {
        object: Box<ExprLoc>,
        attr: String,
        args: Box<ArgExprs>,
    },
    AttrGet {
        object: Box<ExprLoc>,
        attr: String,
    },
    Subscript {
        object: Box<ExprLoc>,
        index: Box<ExprLoc>,
    },
    /// Slice display from `x[start:stop:step]`; evaluates to a slice object.
    Slice {
        lower: Option<Box<ExprLoc>>,
        upper: Option<Box<ExprLoc>>,
        step: Option<Box<ExprLoc>>,
    },
    /// Conditional expression: `body if test else orelse`.
    IfElse {
        test: Box<ExprLoc>,
        body: Box<ExprLoc>,
        orelse: Box<ExprLoc>,
    },
    Lambda(Rc<FunctionDef>),
    ListComp {
        elt: Box<ExprLoc>,
        generators: Vec<Comprehension>,
    },
    SetComp {
        elt: Box<ExprLoc>,
        generators: Vec<Comprehension>,
    },
    DictComp {
        key: Box<ExprLoc>,
        value: Box<ExprLoc>,
        generators: Vec<Comprehension>,
    },
    /// Generator expression; evaluated to an iterator over the eagerly
    /// computed elements (no suspended frames in a tree walker).
    GeneratorExp {
        elt: Box<ExprLoc>,
        generators: Vec<Comprehension>,
    },
    FString(Vec<FStringPart>),
}

/// An expression with its source location.
#[derive(Debug, Clone)]
pub(crate) struct ExprLoc {
    pub position: CodeRange,
    pub expr: Expr,
}

impl ExprLoc {
    pub fn new(position: CodeRange, expr: Expr) -> Self {
        Self { position, expr }
    }
}

/// A function parameter with an optional default expression (evaluated at
/// definition time).
#[derive(Debug, Clone)]
pub(crate) struct Param {
    pub name: Identifier,
    pub default: Option<ExprLoc>,
}

/// A parsed function signature with all parameter groups.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedSignature {
    /// Positional-only parameters (before `/`).
    pub pos_only: Vec<Param>,
    /// Positional-or-keyword parameters.
    pub args: Vec<Param>,
    /// Variable positional parameter (`*args`).
    pub var_args: Option<Identifier>,
    /// Keyword-only parameters (after `*` or `*args`).
    pub kw_only: Vec<Param>,
    /// Variable keyword parameter (`**kwargs`).
    pub var_kwargs: Option<Identifier>,
}

/// A function (or lambda) definition.
///
/// The body is behind `Rc`: runtime function values share it with the AST.
#[derive(Debug)]
pub(crate) struct FunctionDef {
    pub name: String,
    pub signature: ParsedSignature,
    pub body: Vec<Node>,
    /// Decorator expressions, outermost first; applied bottom-up.
    pub decorators: Vec<ExprLoc>,
    pub position: CodeRange,
}

/// A class definition. The body runs in a dedicated class-body scope whose
/// bindings become the class namespace.
#[derive(Debug)]
pub(crate) struct ClassDef {
    pub name: Identifier,
    pub bases: Vec<ExprLoc>,
    pub body: Vec<Node>,
    pub decorators: Vec<ExprLoc>,
}

/// One `except` clause.
#[derive(Debug, Clone)]
pub(crate) struct ExceptHandler {
    /// The exception class expression; `None` for a bare `except:`.
    pub exc_type: Option<ExprLoc>,
    /// The `as name` binding, if present.
    pub name: Option<Identifier>,
    pub body: Vec<Node>,
}

/// Try/except/else/finally block.
#[derive(Debug, Clone)]
pub(crate) struct Try {
    pub body: Vec<Node>,
    pub handlers: Vec<ExceptHandler>,
    pub or_else: Vec<Node>,
    pub finally: Vec<Node>,
}

/// One `with` item: `context_expr [as target]`.
#[derive(Debug, Clone)]
pub(crate) struct WithItem {
    pub context: ExprLoc,
    pub var: Option<UnpackTarget>,
}

/// A statement in the AST.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Pass,
    Expr(ExprLoc),
    /// Assignment, possibly chained: `t1 = t2 = value`.
    Assign {
        targets: Vec<UnpackTarget>,
        value: ExprLoc,
    },
    /// Augmented assignment: `target op= value`. The target is a name,
    /// attribute, or subscript (never a pattern).
    AugAssign {
        target: UnpackTarget,
        op: Operator,
        value: ExprLoc,
    },
    Delete(Vec<UnpackTarget>),
    Return(Option<ExprLoc>, CodeRange),
    Raise {
        exc: Option<ExprLoc>,
        cause: Option<ExprLoc>,
        position: CodeRange,
    },
    Assert {
        test: ExprLoc,
        msg: Option<ExprLoc>,
    },
    If {
        test: ExprLoc,
        body: Vec<Node>,
        or_else: Vec<Node>,
    },
    While {
        test: ExprLoc,
        body: Vec<Node>,
        or_else: Vec<Node>,
    },
    For {
        target: UnpackTarget,
        iter: ExprLoc,
        body: Vec<Node>,
        or_else: Vec<Node>,
    },
    Break(CodeRange),
    Continue(CodeRange),
    FunctionDef(Rc<FunctionDef>),
    ClassDef(Rc<ClassDef>),
    With {
        items: Vec<WithItem>,
        body: Vec<Node>,
    },
    Try(Box<Try>),
    Global {
        names: Vec<Identifier>,
    },
    Nonlocal {
        names: Vec<Identifier>,
    },
    /// `import`/`from ... import`: parsed for grammar completeness; raises
    /// ImportError when evaluated since there is no module system.
    Import {
        module_name: String,
        position: CodeRange,
    },
}
