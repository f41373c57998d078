use thiserror::Error;

use crate::diag::{Span, SpannedError};
use crate::lexer::{Token, TokenKind};

#[derive(Debug, Clone, Error)]
#[allow(clippy::enum_variant_names)]
pub enum ParseErrorKind {
    #[error("Expected {0}, found: {1}")]
    ExpectedToken(TokenKind, Token),

    #[error("Expected identifier, found: {0}")]
    ExpectedIdent(Token),

    #[error("Expected type, found: {0}")]
    ExpectedType(Token),

    #[error("Expected primary expression, found: {0}")]
    ExpectedPrimary(Token),

    #[error("Expected end of input, found: {0}")]
    ExpectedEof(Token),
}

pub type ParseError = SpannedError<ParseErrorKind>;

impl ParseErrorKind {
    pub fn at(self, span: Span) -> ParseError {
        ParseError::new(self, span)
    }
}
