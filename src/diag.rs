use std::fmt::{Display, Formatter, Result};
use std::path::PathBuf;

use thiserror::Error;

use crate::backend::CodegenError;
use crate::backend::glue::GlueError;
use crate::defuse::DefUseError;
use crate::desugar::DesugarError;
use crate::elaborate::TypeCheckError;
use crate::interp::RuntimeError;
use crate::lambda_lift::LambdaLiftError;
use crate::lexer::LexError;
use crate::parse::ParseError;
use crate::quote_lift::LiftError;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    TypeCheck(#[from] TypeCheckError),

    #[error(transparent)]
    Desugar(#[from] DesugarError),

    #[error(transparent)]
    DefUse(#[from] DefUseError),

    #[error(transparent)]
    QuoteLift(#[from] LiftError),

    #[error(transparent)]
    LambdaLift(#[from] LambdaLiftError),

    #[error(transparent)]
    Glue(#[from] GlueError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("IO error: {0}: {1}")]
    Io(PathBuf, std::io::Error),
}

/// Coarse classification used by front ends when reporting a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Syntax,
    Type,
    Structural,
    Unimplemented,
    Runtime,
    Io,
}

impl CompileError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CompileError::Lex(_) | CompileError::Parse(_) => ErrorClass::Syntax,
            CompileError::TypeCheck(_) => ErrorClass::Type,
            CompileError::Desugar(_) => ErrorClass::Unimplemented,
            CompileError::DefUse(_) | CompileError::QuoteLift(_) => ErrorClass::Structural,
            CompileError::LambdaLift(_) => ErrorClass::Unimplemented,
            CompileError::Glue(_) => ErrorClass::Structural,
            CompileError::Codegen(e) if e.is_unimplemented() => ErrorClass::Unimplemented,
            CompileError::Codegen(_) => ErrorClass::Structural,
            CompileError::Runtime(_) => ErrorClass::Runtime,
            CompileError::Io(..) => ErrorClass::Io,
        }
    }

    /// Source location of the failure, when the failing stage tracks one.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Lex(e) => Some(e.span()),
            CompileError::Parse(e) => Some(e.span()),
            CompileError::TypeCheck(e) => Some(e.span()),
            CompileError::Desugar(e) => Some(e.span()),
            CompileError::DefUse(e) => Some(e.span()),
            CompileError::Runtime(e) => Some(e.span()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Span {
    fn default() -> Self {
        let origin = Position {
            offset: 0,
            line: 1,
            column: 1,
        };
        Self {
            start: origin,
            end: origin,
        }
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// An error kind paired with the source span it was raised at.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct SpannedError<K: std::error::Error> {
    kind: K,
    span: Span,
}

impl<K: std::error::Error> SpannedError<K> {
    pub fn new(kind: K, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

fn build_marker(len: usize) -> String {
    if len <= 1 {
        "^".to_string()
    } else {
        "-".repeat(len)
    }
}

/// Formats an error message with the offending source line and a marker line
/// pointing at the span.
///
/// ```text
/// (2:9) Unexpected character: @
/// │ 2 │ var a = @;
/// │   │         ^
/// ```
pub fn format_error(source: &str, span: Span, error: impl Display) -> String {
    let line_no = span.start.line.max(1);
    let content = source.lines().nth(line_no - 1).unwrap_or("");
    let number_width = line_no.to_string().len();

    let mut out = format!("({}:{}) {}\n", span.start.line, span.start.column, error);
    out.push_str(&format!(
        "│ {:>number_width$} │ {}\n",
        line_no,
        content,
        number_width = number_width
    ));

    let start_col = span.start.column.max(1);
    let len = if span.end.line == span.start.line {
        span.end.column.saturating_sub(start_col)
    } else {
        content.chars().count().saturating_sub(start_col - 1)
    };
    let marker = " ".repeat(start_col - 1) + &build_marker(len);
    out.push_str(&format!(
        "│ {:>number_width$} │ {}\n",
        "",
        marker,
        number_width = number_width
    ));
    out
}
