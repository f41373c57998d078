use crate::tree::*;

use std::fmt;

fn indent(level: usize) -> String {
    "  ".repeat(level)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with_indent(f, 0)
    }
}

impl Param {
    fn fmt_with_indent(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        writeln!(f, "{}{}: {} [{}]", indent(level), self.name, self.ty, self.id)
    }
}

impl Expr {
    fn fmt_with_indent(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        let pad = indent(level);
        let pad1 = indent(level + 1);
        match &self.kind {
            ExprKind::IntLit(value) => writeln!(f, "{}IntLit({}) [{}]", pad, value, self.id)?,
            ExprKind::FloatLit(value) => {
                writeln!(f, "{}FloatLit({:?}) [{}]", pad, value, self.id)?
            }
            ExprKind::StringLit(value) => {
                writeln!(f, "{}StringLit({:?}) [{}]", pad, value, self.id)?
            }
            ExprKind::Var(name) => writeln!(f, "{}Var({}) [{}]", pad, name, self.id)?,
            ExprKind::Let { name, value } => {
                writeln!(f, "{}Let [{}]", pad, self.id)?;
                writeln!(f, "{}Name: {}", pad1, name)?;
                writeln!(f, "{}Value:", pad1)?;
                value.fmt_with_indent(f, level + 2)?;
            }
            ExprKind::Assign { name, value } => {
                writeln!(f, "{}Assign [{}]", pad, self.id)?;
                writeln!(f, "{}Target: {}", pad1, name)?;
                writeln!(f, "{}Value:", pad1)?;
                value.fmt_with_indent(f, level + 2)?;
            }
            ExprKind::CompoundAssign { op, target, value } => {
                writeln!(f, "{}CompoundAssign({}=) [{}]", pad, op, self.id)?;
                writeln!(f, "{}Target:", pad1)?;
                target.fmt_with_indent(f, level + 2)?;
                writeln!(f, "{}Value:", pad1)?;
                value.fmt_with_indent(f, level + 2)?;
            }
            ExprKind::Seq(items) => {
                writeln!(f, "{}Seq [{}]", pad, self.id)?;
                for item in items {
                    item.fmt_with_indent(f, level + 1)?;
                }
            }
            ExprKind::Paren(inner) => {
                writeln!(f, "{}Paren [{}]", pad, self.id)?;
                inner.fmt_with_indent(f, level + 1)?;
            }
            ExprKind::Unary { op, expr } => {
                writeln!(f, "{}Unary({}) [{}]", pad, op, self.id)?;
                expr.fmt_with_indent(f, level + 1)?;
            }
            ExprKind::Binary { op, left, right } => {
                writeln!(f, "{}Binary({}) [{}]", pad, op, self.id)?;
                left.fmt_with_indent(f, level + 1)?;
                right.fmt_with_indent(f, level + 1)?;
            }
            ExprKind::Call { callee, args } => {
                writeln!(f, "{}Call [{}]", pad, self.id)?;
                writeln!(f, "{}Callee:", pad1)?;
                callee.fmt_with_indent(f, level + 2)?;
                if !args.is_empty() {
                    writeln!(f, "{}Args:", pad1)?;
                    for arg in args {
                        arg.fmt_with_indent(f, level + 2)?;
                    }
                }
            }
            ExprKind::Fun { params, body } => {
                writeln!(f, "{}Fun [{}]", pad, self.id)?;
                if !params.is_empty() {
                    writeln!(f, "{}Params:", pad1)?;
                    for param in params {
                        param.fmt_with_indent(f, level + 2)?;
                    }
                }
                writeln!(f, "{}Body:", pad1)?;
                body.fmt_with_indent(f, level + 2)?;
            }
            ExprKind::Extern { name, ty } => {
                writeln!(f, "{}Extern({}: {}) [{}]", pad, name, ty, self.id)?
            }
            ExprKind::Quote { annotation, body } => {
                writeln!(f, "{}Quote({}) [{}]", pad, annotation, self.id)?;
                body.fmt_with_indent(f, level + 1)?;
            }
            ExprKind::Escape { kind, body } => {
                writeln!(f, "{}Escape({}) [{}]", pad, kind, self.id)?;
                body.fmt_with_indent(f, level + 1)?;
            }
            ExprKind::Run(inner) => {
                writeln!(f, "{}Run [{}]", pad, self.id)?;
                inner.fmt_with_indent(f, level + 1)?;
            }
            ExprKind::Intrinsic { kind, arg } => {
                writeln!(f, "{}Intrinsic({}) [{}]", pad, kind, self.id)?;
                arg.fmt_with_indent(f, level + 1)?;
            }
            ExprKind::ProgRef(prog) => writeln!(f, "{}ProgRef(q{}) [{}]", pad, prog, self.id)?,
            ExprKind::ProcRef(proc) => writeln!(f, "{}ProcRef(p{}) [{}]", pad, proc, self.id)?,
        }
        Ok(())
    }
}
