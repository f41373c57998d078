use super::*;

impl<'a> Parser<'a> {
    /// `type := atom ('Array')*`
    pub(super) fn parse_type_expr(&mut self) -> Result<TypeExpr, ParseError> {
        let marker = self.mark();
        let mut ty = self.parse_type_atom()?;

        while matches!(&self.curr_token.kind, TK::Ident(name) if name == "Array") {
            self.advance();
            ty = TypeExpr {
                kind: TypeExprKind::Array(Box::new(ty)),
                span: self.close(marker),
            };
        }

        Ok(ty)
    }

    fn parse_type_atom(&mut self) -> Result<TypeExpr, ParseError> {
        let marker = self.mark();

        let annotation = match &self.curr_token.kind {
            TK::Ident(_) => {
                let name = self.parse_ident()?;
                return Ok(TypeExpr {
                    kind: TypeExprKind::Named(name),
                    span: self.close(marker),
                });
            }
            TK::QuoteOpen => StageAnnotation::Ordinary,
            TK::VertexQuoteOpen => StageAnnotation::Vertex,
            TK::FragmentQuoteOpen => StageAnnotation::Fragment,
            _ => {
                return Err(
                    ParseErrorKind::ExpectedType(self.curr_token.clone()).at(self.curr_token.span)
                );
            }
        };

        self.advance();
        let body = self.parse_type_expr()?;
        self.consume(&TK::QuoteClose)?;

        Ok(TypeExpr {
            kind: TypeExprKind::Code {
                annotation,
                body: Box::new(body),
            },
            span: self.close(marker),
        })
    }
}
