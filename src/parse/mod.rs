use crate::diag::{Position, Span};
use crate::lexer::{Token, TokenKind, TokenKind as TK};
use crate::tree::*;

mod errors;
mod expr;
mod type_expr;

pub use errors::{ParseError, ParseErrorKind};

#[derive(Debug, Clone, Copy)]
struct Marker {
    pos: Position,
    token_index: usize,
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    curr_token: &'a Token,
    id_gen: NodeIdGen,
}

impl<'a> Parser<'a> {
    /// `tokens` must end with an `Eof` token (as produced by `Lexer::tokenize`).
    pub fn new(tokens: &'a [Token]) -> Self {
        Self::new_with_id_gen(tokens, NodeIdGen::new())
    }

    pub fn new_with_id_gen(tokens: &'a [Token], id_gen: NodeIdGen) -> Self {
        Parser {
            tokens,
            pos: 0,
            curr_token: &tokens[0],
            id_gen,
        }
    }

    pub fn into_id_gen(self) -> NodeIdGen {
        self.id_gen
    }

    /// Parse a whole program: a sequence of expressions followed by EOF.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let program = self.parse_seq()?;
        if self.curr_token.kind != TK::Eof {
            return Err(ParseErrorKind::ExpectedEof(self.curr_token.clone())
                .at(self.curr_token.span));
        }
        Ok(program)
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
            self.curr_token = &self.tokens[self.pos];
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    fn mark(&self) -> Marker {
        Marker {
            pos: self.curr_token.span.start,
            token_index: self.pos,
        }
    }

    fn close(&self, marker: Marker) -> Span {
        let end = if self.pos == marker.token_index {
            self.curr_token.span.end
        } else {
            self.tokens[self.pos - 1].span.end
        };
        Span::new(marker.pos, end)
    }

    fn consume(&mut self, expected: &TokenKind) -> Result<(), ParseError> {
        if self.curr_token.kind == *expected {
            self.advance();
            Ok(())
        } else {
            Err(
                ParseErrorKind::ExpectedToken(expected.clone(), self.curr_token.clone())
                    .at(self.curr_token.span),
            )
        }
    }

    fn parse_list<T>(
        &mut self,
        sep_token: TokenKind,
        end_token: TokenKind,
        mut parse_item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let mut items = vec![];
        while self.curr_token.kind != end_token {
            items.push(parse_item(self)?);
            if self.curr_token.kind == sep_token {
                self.advance();
            } else {
                break;
            }
        }
        Ok(items)
    }

    fn parse_ident(&mut self) -> Result<String, ParseError> {
        if let TK::Ident(name) = &self.curr_token.kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(ParseErrorKind::ExpectedIdent(self.curr_token.clone()).at(self.curr_token.span))
        }
    }

    fn new_expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        Expr {
            id: self.id_gen.new_id(),
            kind,
            span,
        }
    }
}

#[cfg(test)]
#[path = "../tests/t_parser.rs"]
mod tests;
