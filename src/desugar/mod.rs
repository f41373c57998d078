//! Desugaring: rewrite convenience forms into the core tree.
//!
//! - `(e)` becomes `e`; the paren id is retired.
//! - `x op= e` becomes `x = x op e` with a fresh `Binary` node.
//! - `-e` on a scalar becomes `0 - e` (or `0.0 - e`) with a fresh literal.
//!
//! New nodes are registered in a `TypeTableOverlay`, so later passes see a
//! complete table without the elaborated one being mutated.

use thiserror::Error;

use crate::context::{DesugaredContext, ElaboratedContext};
use crate::diag::{Span, SpannedError};
use crate::elaborate::{Stage, TypeTableOverlay};
use crate::tree::*;
use crate::types::{ScalarKind, Type};

#[derive(Debug, Clone, Error)]
pub enum DesugarErrorKind {
    #[error("Negation of {0} values is not yet supported")]
    UnsupportedNegation(Type),

    #[error("Node {0} has no type")]
    MissingType(NodeId),
}

pub type DesugarError = SpannedError<DesugarErrorKind>;

impl DesugarErrorKind {
    pub fn at(self, span: Span) -> DesugarError {
        DesugarError::new(self, span)
    }
}

pub fn desugar(ctx: ElaboratedContext) -> Result<DesugaredContext, DesugarError> {
    let mut id_gen = ctx.id_gen.clone();
    let mut desugarer = Desugarer {
        overlay: TypeTableOverlay::new(&ctx.type_table),
        id_gen: &mut id_gen,
    };
    let expr = desugarer.desugar_expr(ctx.expr.clone())?;
    let (type_table, retired) = desugarer.overlay.finish();

    Ok(ctx.with_desugared(expr, type_table, retired, id_gen))
}

struct Desugarer<'a> {
    overlay: TypeTableOverlay,
    id_gen: &'a mut NodeIdGen,
}

impl Desugarer<'_> {
    fn entry(&self, id: NodeId, span: Span) -> Result<(Type, Stage), DesugarError> {
        self.overlay
            .get(id)
            .map(|entry| (entry.ty.clone(), entry.stage))
            .ok_or_else(|| DesugarErrorKind::MissingType(id).at(span))
    }

    fn synthesize(&mut self, kind: ExprKind, ty: Type, stage: Stage, span: Span) -> Expr {
        let id = self.id_gen.new_id();
        self.overlay.insert_synthetic(id, ty, stage);
        Expr::new(id, kind, span)
    }

    fn desugar_boxed(&mut self, expr: Box<Expr>) -> Result<Box<Expr>, DesugarError> {
        Ok(Box::new(self.desugar_expr(*expr)?))
    }

    fn desugar_expr(&mut self, expr: Expr) -> Result<Expr, DesugarError> {
        let Expr { id, kind, span } = expr;

        let kind = match kind {
            ExprKind::Paren(inner) => {
                self.overlay.retire(id);
                return self.desugar_expr(*inner);
            }

            ExprKind::CompoundAssign { op, target, value } => {
                let ExprKind::Var(name) = &target.kind else {
                    return Err(DesugarErrorKind::MissingType(target.id).at(target.span));
                };
                let name = name.clone();
                let (target_ty, _) = self.entry(target.id, target.span)?;
                let (_, stage) = self.entry(id, span)?;
                let value = self.desugar_expr(*value)?;
                let binary = self.synthesize(
                    ExprKind::Binary {
                        op,
                        left: target,
                        right: Box::new(value),
                    },
                    target_ty,
                    stage,
                    span,
                );
                ExprKind::Assign {
                    name,
                    value: Box::new(binary),
                }
            }

            ExprKind::Unary {
                op: UnaryOp::Neg,
                expr: inner,
            } => {
                let (ty, stage) = self.entry(id, span)?;
                let zero = match ty {
                    Type::Scalar(ScalarKind::Int) => ExprKind::IntLit(0),
                    Type::Scalar(ScalarKind::Float) => ExprKind::FloatLit(0.0),
                    other => return Err(DesugarErrorKind::UnsupportedNegation(other).at(span)),
                };
                let zero = self.synthesize(zero, ty, stage, span);
                let inner = self.desugar_expr(*inner)?;
                ExprKind::Binary {
                    op: BinaryOp::Sub,
                    left: Box::new(zero),
                    right: Box::new(inner),
                }
            }

            ExprKind::Let { name, value } => ExprKind::Let {
                name,
                value: self.desugar_boxed(value)?,
            },
            ExprKind::Assign { name, value } => ExprKind::Assign {
                name,
                value: self.desugar_boxed(value)?,
            },
            ExprKind::Seq(items) => ExprKind::Seq(
                items
                    .into_iter()
                    .map(|item| self.desugar_expr(item))
                    .collect::<Result<_, _>>()?,
            ),
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op,
                left: self.desugar_boxed(left)?,
                right: self.desugar_boxed(right)?,
            },
            ExprKind::Call { callee, args } => ExprKind::Call {
                callee: self.desugar_boxed(callee)?,
                args: args
                    .into_iter()
                    .map(|arg| self.desugar_expr(arg))
                    .collect::<Result<_, _>>()?,
            },
            ExprKind::Fun { params, body } => ExprKind::Fun {
                params,
                body: self.desugar_boxed(body)?,
            },
            ExprKind::Quote { annotation, body } => ExprKind::Quote {
                annotation,
                body: self.desugar_boxed(body)?,
            },
            ExprKind::Escape { kind, body } => ExprKind::Escape {
                kind,
                body: self.desugar_boxed(body)?,
            },
            ExprKind::Run(inner) => ExprKind::Run(self.desugar_boxed(inner)?),
            ExprKind::Intrinsic { kind, arg } => ExprKind::Intrinsic {
                kind,
                arg: self.desugar_boxed(arg)?,
            },

            kind @ (ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::StringLit(_)
            | ExprKind::Var(_)
            | ExprKind::Extern { .. }
            | ExprKind::ProgRef(_)
            | ExprKind::ProcRef(_)) => kind,
        };

        Ok(Expr::new(id, kind, span))
    }
}

#[cfg(test)]
#[path = "../tests/t_desugar.rs"]
mod tests;
