use super::*;

/// Tokens that end a sequence: the closer of whatever encloses it.
fn ends_seq(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TK::Eof | TK::QuoteClose | TK::RBracket | TK::RParen
    )
}

impl<'a> Parser<'a> {
    /// `seq := expr (';' expr)* ';'?`
    ///
    /// A sequence of one expression is that expression.
    pub(super) fn parse_seq(&mut self) -> Result<Expr, ParseError> {
        let marker = self.mark();
        let mut items = vec![self.parse_expr()?];

        while self.curr_token.kind == TK::Semicolon {
            self.advance();
            if ends_seq(&self.curr_token.kind) {
                break;
            }
            items.push(self.parse_expr()?);
        }

        if items.len() == 1 {
            return Ok(items.remove(0));
        }
        let span = self.close(marker);
        Ok(self.new_expr(ExprKind::Seq(items), span))
    }

    /// Binding forms, assignments, function literals, or a binary expression.
    pub(super) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        match &self.curr_token.kind {
            TK::KwVar => self.parse_let(),
            TK::KwExtern => self.parse_extern(),
            TK::KwFun => self.parse_fun(),
            TK::Ident(_) if self.peek().is_some_and(|t| assign_op(&t.kind).is_some()) => {
                self.parse_assign()
            }
            _ => self.parse_binary(0),
        }
    }

    fn parse_let(&mut self) -> Result<Expr, ParseError> {
        let marker = self.mark();
        self.consume(&TK::KwVar)?;
        let name = self.parse_ident()?;
        self.consume(&TK::Equals)?;
        let value = self.parse_expr()?;
        let span = self.close(marker);
        Ok(self.new_expr(
            ExprKind::Let {
                name,
                value: Box::new(value),
            },
            span,
        ))
    }

    fn parse_extern(&mut self) -> Result<Expr, ParseError> {
        let marker = self.mark();
        self.consume(&TK::KwExtern)?;
        let name = self.parse_ident()?;
        self.consume(&TK::Colon)?;
        let ty = self.parse_type_expr()?;
        let span = self.close(marker);
        Ok(self.new_expr(ExprKind::Extern { name, ty }, span))
    }

    /// `fun (IDENT ':' type)* '->' expr`
    fn parse_fun(&mut self) -> Result<Expr, ParseError> {
        let marker = self.mark();
        self.consume(&TK::KwFun)?;

        let mut params = Vec::new();
        while self.curr_token.kind != TK::Arrow {
            let param_marker = self.mark();
            let name = self.parse_ident()?;
            self.consume(&TK::Colon)?;
            let ty = self.parse_type_expr()?;
            params.push(Param {
                id: self.id_gen.new_id(),
                name,
                ty,
                span: self.close(param_marker),
            });
        }
        self.consume(&TK::Arrow)?;

        let body = self.parse_expr()?;
        let span = self.close(marker);
        Ok(self.new_expr(
            ExprKind::Fun {
                params,
                body: Box::new(body),
            },
            span,
        ))
    }

    fn parse_assign(&mut self) -> Result<Expr, ParseError> {
        let marker = self.mark();
        let target_span = self.curr_token.span;
        let name = self.parse_ident()?;

        let op = assign_op(&self.curr_token.kind).flatten();
        self.advance();
        let value = Box::new(self.parse_expr()?);

        let kind = match op {
            None => ExprKind::Assign { name, value },
            Some(op) => {
                let target = self.new_expr(ExprKind::Var(name), target_span);
                ExprKind::CompoundAssign {
                    op,
                    target: Box::new(target),
                    value,
                }
            }
        };
        let span = self.close(marker);
        Ok(self.new_expr(kind, span))
    }

    /// Binary expressions by precedence climbing.
    fn parse_binary(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let marker = self.mark();
        let mut lhs = self.parse_unary()?;

        while let Some((op, bp)) = Self::token_to_binary_op(&self.curr_token.kind) {
            if bp < min_bp {
                break;
            }
            self.advance();

            let rhs = self.parse_binary(bp + 1)?;
            let span = self.close(marker);
            lhs = self.new_expr(
                ExprKind::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
                span,
            );
        }

        Ok(lhs)
    }

    /// Maps a token to a binary operator and its precedence
    fn token_to_binary_op(token: &TokenKind) -> Option<(BinaryOp, u8)> {
        match token {
            TK::Plus => Some((BinaryOp::Add, 1)),
            TK::Minus => Some((BinaryOp::Sub, 1)),
            TK::Star => Some((BinaryOp::Mul, 2)),
            TK::Slash => Some((BinaryOp::Div, 2)),
            _ => None,
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let marker = self.mark();
        match self.curr_token.kind {
            TK::Minus => {
                // -<expr>
                self.advance();
                let operand = self.parse_unary()?;
                let span = self.close(marker);
                Ok(self.new_expr(
                    ExprKind::Unary {
                        op: UnaryOp::Neg,
                        expr: Box::new(operand),
                    },
                    span,
                ))
            }
            TK::Bang => {
                // !<expr>
                self.advance();
                let operand = self.parse_unary()?;
                let span = self.close(marker);
                Ok(self.new_expr(ExprKind::Run(Box::new(operand)), span))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let marker = self.mark();
        let mut expr = self.parse_primary()?;

        while self.curr_token.kind == TK::LParen {
            self.advance();
            let args = self.parse_list(TK::Comma, TK::RParen, |parser| parser.parse_expr())?;
            self.consume(&TK::RParen)?;
            let span = self.close(marker);
            expr = self.new_expr(
                ExprKind::Call {
                    callee: Box::new(expr),
                    args,
                },
                span,
            );
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let marker = self.mark();

        let kind = match &self.curr_token.kind {
            TK::IntLit(value) => {
                let value = *value;
                self.advance();
                ExprKind::IntLit(value)
            }
            TK::FloatLit(value) => {
                let value = *value;
                self.advance();
                ExprKind::FloatLit(value)
            }
            TK::StringLit(value) => {
                let value = value.clone();
                self.advance();
                ExprKind::StringLit(value)
            }
            TK::Ident(name) => {
                let name = name.clone();
                self.advance();
                match IntrinsicKind::from_name(&name) {
                    Some(kind) if self.curr_token.kind == TK::LParen => {
                        self.advance();
                        let arg = self.parse_expr()?;
                        self.consume(&TK::RParen)?;
                        ExprKind::Intrinsic {
                            kind,
                            arg: Box::new(arg),
                        }
                    }
                    _ => ExprKind::Var(name),
                }
            }
            TK::LParen => {
                self.advance();
                let inner = self.parse_seq()?;
                self.consume(&TK::RParen)?;
                ExprKind::Paren(Box::new(inner))
            }
            TK::QuoteOpen | TK::VertexQuoteOpen | TK::FragmentQuoteOpen => {
                let annotation = match self.curr_token.kind {
                    TK::VertexQuoteOpen => StageAnnotation::Vertex,
                    TK::FragmentQuoteOpen => StageAnnotation::Fragment,
                    _ => StageAnnotation::Ordinary,
                };
                self.advance();
                let body = self.parse_seq()?;
                self.consume(&TK::QuoteClose)?;
                ExprKind::Quote {
                    annotation,
                    body: Box::new(body),
                }
            }
            TK::LBracket | TK::PersistOpen => {
                let kind = if self.curr_token.kind == TK::PersistOpen {
                    EscapeKind::Persist
                } else {
                    EscapeKind::Splice
                };
                self.advance();
                let body = self.parse_seq()?;
                self.consume(&TK::RBracket)?;
                ExprKind::Escape {
                    kind,
                    body: Box::new(body),
                }
            }
            _ => {
                return Err(
                    ParseErrorKind::ExpectedPrimary(self.curr_token.clone())
                        .at(self.curr_token.span),
                );
            }
        };

        let span = self.close(marker);
        Ok(self.new_expr(kind, span))
    }
}

/// `Some(None)` for plain `=`, `Some(Some(op))` for `op=`.
fn assign_op(kind: &TokenKind) -> Option<Option<BinaryOp>> {
    match kind {
        TK::Equals => Some(None),
        TK::PlusEquals => Some(Some(BinaryOp::Add)),
        TK::MinusEquals => Some(Some(BinaryOp::Sub)),
        TK::StarEquals => Some(Some(BinaryOp::Mul)),
        TK::SlashEquals => Some(Some(BinaryOp::Div)),
        _ => None,
    }
}
