//! Elaboration: compute a type and a stage for every node.
//!
//! A single bottom-up pass over the parsed tree. Names are resolved through a
//! stack of stage frames (see `scope`); builtins are consulted last and are
//! restricted to the stages that provide them. This is the only pass that
//! reports type or stage errors.

mod builtins;
mod errors;
mod type_table;

pub use builtins::{BUILTINS, Builtin};
pub use errors::{TypeCheckError, TypeCheckErrorKind};
pub use type_table::{Stage, TypeEntry, TypeTable, TypeTableOverlay};

use crate::context::{ElaboratedContext, ParsedContext};
use crate::diag::Span;
use crate::scope::ScopeStack;
use crate::tree::*;
use crate::types::{Type, arith_result, type_assignable};

use TypeCheckErrorKind as TEK;

pub fn elaborate(ctx: ParsedContext) -> Result<ElaboratedContext, TypeCheckError> {
    let type_table = elaborate_tree(&ctx.expr)?;
    Ok(ctx.with_type_table(type_table))
}

/// Elaborate a tree into a fresh table. Pure: elaborating the same tree twice
/// yields equal tables.
pub fn elaborate_tree(expr: &Expr) -> Result<TypeTable, TypeCheckError> {
    let mut elaborator = Elaborator::new();
    elaborator.elaborate_expr(expr)?;
    Ok(elaborator.table)
}

/// Resolve a surface type expression.
pub fn resolve_type_expr(ty: &TypeExpr) -> Result<Type, TEK> {
    match &ty.kind {
        TypeExprKind::Named(name) => {
            Type::from_name(name).ok_or_else(|| TEK::UnknownType(name.clone()))
        }
        TypeExprKind::Array(elem) => Ok(Type::array(resolve_type_expr(elem)?)),
        TypeExprKind::Code { annotation, body } => {
            Ok(Type::code(*annotation, resolve_type_expr(body)?))
        }
    }
}

#[derive(Debug, Clone)]
struct VarInfo {
    ty: Type,
}

struct Elaborator {
    scopes: ScopeStack<VarInfo>,
    table: TypeTable,
}

impl Elaborator {
    fn new() -> Self {
        Self {
            scopes: ScopeStack::new(),
            table: TypeTable::new(),
        }
    }

    fn stage(&self) -> Stage {
        Stage {
            annotation: self.scopes.annotation(),
            level: self.scopes.level() as u32,
        }
    }

    fn record(&mut self, id: NodeId, ty: Type) -> Type {
        let stage = self.stage();
        self.table.insert(id, ty.clone(), stage);
        ty
    }

    fn elaborate_expr(&mut self, expr: &Expr) -> Result<Type, TypeCheckError> {
        let id = expr.id;
        let span = expr.span;

        let ty = match &expr.kind {
            ExprKind::IntLit(_) => Type::INT,
            ExprKind::FloatLit(_) => Type::FLOAT,
            ExprKind::StringLit(_) => Type::String,

            ExprKind::Var(name) => self.type_of_var(name, id, span)?,

            ExprKind::Let { name, value } => {
                let ty = self.elaborate_expr(value)?;
                self.scopes.bind(name, VarInfo { ty: ty.clone() });
                ty
            }

            ExprKind::Assign { name, value } => {
                let value_ty = self.elaborate_expr(value)?;
                let var_ty = self.assign_target(name, id, span)?;
                if !type_assignable(&value_ty, &var_ty).is_ok() {
                    return Err(TEK::AssignTypeMismatch(var_ty, value_ty).at(id, span));
                }
                Type::Void
            }

            ExprKind::CompoundAssign { op, target, value } => {
                let ExprKind::Var(name) = &target.kind else {
                    return Err(TEK::UnexpectedNode(target.tag()).at(target.id, target.span));
                };
                let var_ty = self.elaborate_expr(target)?;
                let value_ty = self.elaborate_expr(value)?;
                self.assign_target(name, id, span)?;
                let result = arith_result(*op, &var_ty, &value_ty).ok_or_else(|| {
                    TEK::ArithTypeMismatch(op.to_string(), var_ty.clone(), value_ty.clone())
                        .at(id, span)
                })?;
                if !type_assignable(&result, &var_ty).is_ok() {
                    return Err(TEK::AssignTypeMismatch(var_ty, result).at(id, span));
                }
                Type::Void
            }

            ExprKind::Seq(items) => {
                let mut last = Type::Void;
                for item in items {
                    last = self.elaborate_expr(item)?;
                }
                last
            }

            ExprKind::Paren(inner) => self.elaborate_expr(inner)?,

            ExprKind::Unary { expr: inner, .. } => {
                let ty = self.elaborate_expr(inner)?;
                if !ty.is_primitive() {
                    return Err(TEK::NegationOperand(ty).at(id, span));
                }
                ty
            }

            ExprKind::Binary { op, left, right } => {
                let left_ty = self.elaborate_expr(left)?;
                let right_ty = self.elaborate_expr(right)?;
                arith_result(*op, &left_ty, &right_ty).ok_or_else(|| {
                    TEK::ArithTypeMismatch(op.to_string(), left_ty.clone(), right_ty.clone())
                        .at(id, span)
                })?
            }

            ExprKind::Call { callee, args } => self.elaborate_call(id, span, callee, args)?,

            ExprKind::Fun { params, body } => {
                self.scopes.enter_scope(Some(id));
                let result = self.elaborate_fun(params, body);
                self.scopes.exit_scope();
                result?
            }

            ExprKind::Extern { name, ty } => {
                if self.scopes.annotation() != StageAnnotation::Ordinary {
                    return Err(TEK::ExternInShader.at(id, span));
                }
                let ty = resolve_type_expr(ty).map_err(|kind| kind.at(id, span))?;
                self.scopes.bind(name, VarInfo { ty: ty.clone() });
                ty
            }

            ExprKind::Quote { annotation, body } => {
                let outer = self.scopes.annotation();
                let allowed = match annotation {
                    StageAnnotation::Ordinary => true,
                    StageAnnotation::Vertex => outer == StageAnnotation::Ordinary,
                    StageAnnotation::Fragment => outer == StageAnnotation::Vertex,
                };
                if !allowed {
                    return Err(TEK::QuoteWrongStage(*annotation, outer).at(id, span));
                }

                self.scopes.enter_quote(id, *annotation);
                let body_ty = self.elaborate_expr(body);
                self.scopes.exit_quote();
                Type::code(*annotation, body_ty?)
            }

            ExprKind::Escape { kind, body } => {
                let quote_annotation = self.scopes.annotation();
                if !self.scopes.enter_escape() {
                    return Err(TEK::EscapeOutsideQuote.at(id, span));
                }
                let body_ty = self.elaborate_expr(body);
                self.scopes.exit_escape();
                let body_ty = body_ty?;

                match kind {
                    EscapeKind::Splice => match body_ty {
                        Type::Code { annotation, body } if annotation == quote_annotation => *body,
                        other => {
                            return Err(TEK::SpliceTypeMismatch(quote_annotation, other).at(id, span));
                        }
                    },
                    EscapeKind::Persist => match body_ty {
                        Type::Array { elem } if quote_annotation == StageAnnotation::Vertex => *elem,
                        other => other,
                    },
                }
            }

            ExprKind::Run(inner) => match self.elaborate_expr(inner)? {
                Type::Code {
                    annotation: StageAnnotation::Ordinary,
                    body,
                } => *body,
                other => return Err(TEK::RunTypeMismatch(other).at(id, span)),
            },

            ExprKind::Intrinsic { kind, arg } => {
                let (stage, expects) = match kind {
                    IntrinsicKind::Vtx => (StageAnnotation::Ordinary, StageAnnotation::Vertex),
                    IntrinsicKind::Frag => (StageAnnotation::Vertex, StageAnnotation::Fragment),
                    IntrinsicKind::Render => (StageAnnotation::Ordinary, StageAnnotation::Ordinary),
                };
                let current = self.scopes.annotation();
                if current != stage {
                    return Err(TEK::IntrinsicWrongStage(kind.to_string(), current).at(id, span));
                }
                let arg_ty = self.elaborate_expr(arg)?;
                match &arg_ty {
                    Type::Code { annotation, .. } if *annotation == expects => {}
                    _ => {
                        return Err(
                            TEK::IntrinsicTypeMismatch(kind.to_string(), expects, arg_ty).at(id, span)
                        );
                    }
                }
                match kind {
                    IntrinsicKind::Render => arg_ty,
                    IntrinsicKind::Vtx | IntrinsicKind::Frag => Type::Void,
                }
            }

            ExprKind::ProgRef(_) | ExprKind::ProcRef(_) => {
                return Err(TEK::UnexpectedNode(expr.tag()).at(id, span));
            }
        };

        Ok(self.record(id, ty))
    }

    fn type_of_var(&self, name: &str, id: NodeId, span: Span) -> Result<Type, TypeCheckError> {
        let current = self.scopes.annotation();

        if let Some(found) = self.scopes.lookup(name) {
            // A host buffer seen from a vertex stage is one element per vertex.
            if current == StageAnnotation::Vertex
                && found.annotation == StageAnnotation::Ordinary
                && let Type::Array { elem } = &found.value.ty
            {
                return Ok((**elem).clone());
            }
            return Ok(found.value.ty.clone());
        }

        match Builtin::from_name(name) {
            Some(builtin) if !builtin.available_in(current) => {
                Err(TEK::BuiltinWrongStage(name.to_string(), current).at(id, span))
            }
            Some(builtin) => builtin
                .var_type()
                .ok_or_else(|| TEK::BuiltinNotCalled(name.to_string()).at(id, span)),
            None => Err(TEK::VarUndefined(name.to_string()).at(id, span)),
        }
    }

    /// Type of an assignment target, checking it may be assigned from here.
    fn assign_target(&self, name: &str, id: NodeId, span: Span) -> Result<Type, TypeCheckError> {
        if let Some(found) = self.scopes.lookup(name) {
            if found.level != self.scopes.level() {
                return Err(TEK::AssignAcrossStages(name.to_string()).at(id, span));
            }
            return Ok(found.value.ty.clone());
        }

        match Builtin::from_name(name) {
            Some(builtin) if builtin.is_function() => {
                Err(TEK::AssignToBuiltin(name.to_string()).at(id, span))
            }
            Some(_) => self.type_of_var(name, id, span),
            None => Err(TEK::VarUndefined(name.to_string()).at(id, span)),
        }
    }

    fn elaborate_fun(&mut self, params: &[Param], body: &Expr) -> Result<Type, TypeCheckError> {
        let mut param_tys = Vec::with_capacity(params.len());
        for param in params {
            let ty = resolve_type_expr(&param.ty).map_err(|kind| kind.at(param.id, param.span))?;
            self.scopes.bind(&param.name, VarInfo { ty: ty.clone() });
            self.record(param.id, ty.clone());
            param_tys.push(ty);
        }
        let ret = self.elaborate_expr(body)?;
        Ok(Type::func(param_tys, ret))
    }

    fn elaborate_call(
        &mut self,
        id: NodeId,
        span: Span,
        callee: &Expr,
        args: &[Expr],
    ) -> Result<Type, TypeCheckError> {
        let arg_tys = args
            .iter()
            .map(|arg| self.elaborate_expr(arg))
            .collect::<Result<Vec<_>, _>>()?;

        // Builtin functions are overloaded, so they are typed at the call.
        if let ExprKind::Var(name) = &callee.kind
            && self.scopes.lookup(name).is_none()
            && let Some(builtin) = Builtin::from_name(name)
            && builtin.is_function()
        {
            let current = self.scopes.annotation();
            if !builtin.available_in(current) {
                return Err(TEK::BuiltinWrongStage(name.clone(), current).at(callee.id, callee.span));
            }
            let sig = builtin.resolve_overload(&arg_tys).ok_or_else(|| {
                let found = arg_tys
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                TEK::BuiltinArgMismatch(name.clone(), found).at(id, span)
            })?;
            let Type::Fn { ret, .. } = self.record(callee.id, sig) else {
                return Err(TEK::NotCallable(Type::Void).at(id, span));
            };
            return Ok(*ret);
        }

        match self.elaborate_expr(callee)? {
            Type::Fn { params, ret } => {
                if params.len() != arg_tys.len() {
                    return Err(TEK::ArgCountMismatch(params.len(), arg_tys.len()).at(id, span));
                }
                for (i, (param, arg)) in params.iter().zip(&arg_tys).enumerate() {
                    if !type_assignable(arg, param).is_ok() {
                        return Err(
                            TEK::ArgTypeMismatch(i, param.clone(), arg.clone()).at(args[i].id, args[i].span)
                        );
                    }
                }
                Ok(*ret)
            }
            other => Err(TEK::NotCallable(other).at(callee.id, callee.span)),
        }
    }
}

#[cfg(test)]
#[path = "../tests/t_elaborate.rs"]
mod tests;
