use std::fmt;

use enum_display::EnumDisplay;

use crate::diag::Span;
use crate::tree::{NodeId, ProcId, ProgId};

// -- Stages ---

/// The stage a quote defers its body into, fixed by the quote's syntax:
/// `<...>`, `vertex<...>` or `fragment<...>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumDisplay)]
pub enum StageAnnotation {
    #[display("ordinary")]
    Ordinary,
    #[display("vertex")]
    Vertex,
    #[display("fragment")]
    Fragment,
}

impl StageAnnotation {
    pub fn is_shader(&self) -> bool {
        matches!(self, StageAnnotation::Vertex | StageAnnotation::Fragment)
    }

    /// Prefix used when printing a quote or code type (`<`, `vertex<`, ...).
    pub fn opener(&self) -> &'static str {
        match self {
            StageAnnotation::Ordinary => "<",
            StageAnnotation::Vertex => "vertex<",
            StageAnnotation::Fragment => "fragment<",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumDisplay)]
pub enum EscapeKind {
    /// `[e]`: evaluate `e` to code and splice it in place.
    #[display("splice")]
    Splice,
    /// `%[e]`: evaluate `e` in the outer stage and carry the value inward.
    #[display("persist")]
    Persist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumDisplay)]
pub enum IntrinsicKind {
    #[display("vtx")]
    Vtx,
    #[display("frag")]
    Frag,
    #[display("render")]
    Render,
}

impl IntrinsicKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "vtx" => Some(IntrinsicKind::Vtx),
            "frag" => Some(IntrinsicKind::Frag),
            "render" => Some(IntrinsicKind::Render),
            _ => None,
        }
    }
}

// -- Operators ---

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumDisplay)]
pub enum BinaryOp {
    #[display("+")]
    Add,
    #[display("-")]
    Sub,
    #[display("*")]
    Mul,
    #[display("/")]
    Div,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumDisplay)]
pub enum UnaryOp {
    #[display("-")]
    Neg,
}

// -- Type expressions ---

#[derive(Clone, Debug, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeExprKind {
    Named(String),
    Array(Box<TypeExpr>),
    Code {
        annotation: StageAnnotation,
        body: Box<TypeExpr>,
    },
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeExprKind::Named(name) => write!(f, "{name}"),
            TypeExprKind::Array(elem) => write!(f, "{elem} Array"),
            TypeExprKind::Code { annotation, body } => {
                write!(f, "{}{}>", annotation.opener(), body)
            }
        }
    }
}

// -- Expressions ---

/// A function parameter. Its id is the binding id references resolve to.
#[derive(Clone, Debug)]
pub struct Param {
    pub id: NodeId,
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    IntLit(i64),
    FloatLit(f64),
    StringLit(String),

    Var(String),

    /// `var name = value`; the node id is the binding id.
    Let {
        name: String,
        value: Box<Expr>,
    },

    /// `name = value`; the node is recorded as a use of the target binding.
    Assign {
        name: String,
        value: Box<Expr>,
    },

    /// `target op= value` (sugar). `target` is always a `Var`.
    CompoundAssign {
        op: BinaryOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },

    Seq(Vec<Expr>),

    /// Parenthesized expression (sugar).
    Paren(Box<Expr>),

    /// Prefix operator (sugar).
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },

    Fun {
        params: Vec<Param>,
        body: Box<Expr>,
    },

    /// `extern name: ty`; the node id is the binding id.
    Extern {
        name: String,
        ty: TypeExpr,
    },

    Quote {
        annotation: StageAnnotation,
        body: Box<Expr>,
    },

    Escape {
        kind: EscapeKind,
        body: Box<Expr>,
    },

    /// `!e`: run ordinary code.
    Run(Box<Expr>),

    Intrinsic {
        kind: IntrinsicKind,
        arg: Box<Expr>,
    },

    /// A quote replaced by the quote lifter. Keeps the quote's node id.
    ProgRef(ProgId),

    /// A function literal replaced by the lambda lifter. Keeps the literal's
    /// node id.
    ProcRef(ProcId),
}

impl Expr {
    pub fn new(id: NodeId, kind: ExprKind, span: Span) -> Self {
        Self { id, kind, span }
    }

    /// Short tag used in dumps and diagnostics.
    pub fn tag(&self) -> &'static str {
        match &self.kind {
            ExprKind::IntLit(_) => "IntLit",
            ExprKind::FloatLit(_) => "FloatLit",
            ExprKind::StringLit(_) => "StringLit",
            ExprKind::Var(_) => "Var",
            ExprKind::Let { .. } => "Let",
            ExprKind::Assign { .. } => "Assign",
            ExprKind::CompoundAssign { .. } => "CompoundAssign",
            ExprKind::Seq(_) => "Seq",
            ExprKind::Paren(_) => "Paren",
            ExprKind::Unary { .. } => "Unary",
            ExprKind::Binary { .. } => "Binary",
            ExprKind::Call { .. } => "Call",
            ExprKind::Fun { .. } => "Fun",
            ExprKind::Extern { .. } => "Extern",
            ExprKind::Quote { .. } => "Quote",
            ExprKind::Escape { .. } => "Escape",
            ExprKind::Run(_) => "Run",
            ExprKind::Intrinsic { .. } => "Intrinsic",
            ExprKind::ProgRef(_) => "ProgRef",
            ExprKind::ProcRef(_) => "ProcRef",
        }
    }
}
