use thiserror::Error;

use crate::diag::Span;
use crate::tree::{NodeId, StageAnnotation};
use crate::types::Type;

#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct TypeCheckError {
    kind: TypeCheckErrorKind,
    node: NodeId,
    span: Span,
}

impl TypeCheckError {
    pub fn kind(&self) -> &TypeCheckErrorKind {
        &self.kind
    }

    /// The offending node.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

#[derive(Debug, Clone, Error)]
pub enum TypeCheckErrorKind {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Undefined variable: {0}")]
    VarUndefined(String),

    #[error("Builtin `{0}` is not available in a {1} stage")]
    BuiltinWrongStage(String, StageAnnotation),

    #[error("Builtin function `{0}` must be called")]
    BuiltinNotCalled(String),

    #[error("No overload of `{0}` accepts ({1})")]
    BuiltinArgMismatch(String, String),

    #[error("Invalid types for arithmetic operation `{0}`: {1}, {2}")]
    ArithTypeMismatch(String, Type, Type),

    #[error("Cannot negate a value of type {0}")]
    NegationOperand(Type),

    #[error("Type mismatch in assignment: variable type {0} != value type {1}")]
    AssignTypeMismatch(Type, Type),

    #[error("Cannot assign to `{0}` across a stage boundary")]
    AssignAcrossStages(String),

    #[error("Cannot assign to builtin `{0}`")]
    AssignToBuiltin(String),

    #[error("Called value is not a function: {0}")]
    NotCallable(Type),

    #[error("Invalid argument count: expected {0}, found {1}")]
    ArgCountMismatch(usize, usize),

    #[error("Type mismatch in arg {0}: expected {1}, found {2}")]
    ArgTypeMismatch(usize, Type, Type),

    #[error("`extern` is only allowed in an ordinary stage")]
    ExternInShader,

    #[error("A {0} quote cannot appear in a {1} stage")]
    QuoteWrongStage(StageAnnotation, StageAnnotation),

    #[error("Escape outside of any quote")]
    EscapeOutsideQuote,

    #[error("Splice expects {0} code, found {1}")]
    SpliceTypeMismatch(StageAnnotation, Type),

    #[error("Run expects ordinary code, found {0}")]
    RunTypeMismatch(Type),

    #[error("`{0}` is not allowed in a {1} stage")]
    IntrinsicWrongStage(String, StageAnnotation),

    #[error("`{0}` expects {1} code, found {2}")]
    IntrinsicTypeMismatch(String, StageAnnotation, Type),

    #[error("Unexpected {0} node")]
    UnexpectedNode(&'static str),
}

impl TypeCheckErrorKind {
    pub fn at(self, node: NodeId, span: Span) -> TypeCheckError {
        TypeCheckError {
            kind: self,
            node,
            span,
        }
    }
}
