use crate::tree::*;

/// Tree visitor with default traversal helpers.
///
/// Implement the methods you care about and call the corresponding `walk_*`
/// function to recurse into children.
/// Example:
/// ```rust
/// use strata::tree::Expr;
/// use strata::tree::visit::{walk_expr, Visitor};
///
/// struct MyVisitor;
/// impl Visitor for MyVisitor {
///     fn visit_expr(&mut self, expr: &Expr) {
///         // pre-visit logic here
///         walk_expr(self, expr);
///         // post-visit logic here
///     }
/// }
/// ```
pub trait Visitor {
    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr)
    }

    fn visit_param(&mut self, _param: &Param) {}
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::IntLit(_)
        | ExprKind::FloatLit(_)
        | ExprKind::StringLit(_)
        | ExprKind::Var(_)
        | ExprKind::Extern { .. }
        | ExprKind::ProgRef(_)
        | ExprKind::ProcRef(_) => {}

        ExprKind::Let { value, .. } | ExprKind::Assign { value, .. } => v.visit_expr(value),

        ExprKind::CompoundAssign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }

        ExprKind::Seq(items) => {
            for item in items {
                v.visit_expr(item);
            }
        }

        ExprKind::Paren(inner)
        | ExprKind::Unary { expr: inner, .. }
        | ExprKind::Run(inner)
        | ExprKind::Quote { body: inner, .. }
        | ExprKind::Escape { body: inner, .. }
        | ExprKind::Intrinsic { arg: inner, .. } => v.visit_expr(inner),

        ExprKind::Binary { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }

        ExprKind::Call { callee, args } => {
            v.visit_expr(callee);
            for arg in args {
                v.visit_expr(arg);
            }
        }

        ExprKind::Fun { params, body } => {
            for param in params {
                v.visit_param(param);
            }
            v.visit_expr(body);
        }
    }
}
