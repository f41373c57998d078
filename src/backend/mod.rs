//! Code generation for compiled programs.
//!
//! Host code is JavaScript; shader programs are GLSL ES 1.00 sources that the
//! host code compiles and links through WebGL. `glue` decides how values
//! travel between the two.

pub mod glsl;
pub mod glue;
pub mod js;
mod runtime;
mod webgl;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::context::CompilerIr;
use crate::tree::{Expr, ExprKind, NodeId, ProcId, ProgId, StageAnnotation};
use crate::types::Type;

#[derive(Debug, Clone, Error)]
pub enum CodegenError {
    #[error("Shader program q{0} contains the ordinary program q{1}")]
    NestedOrdinaryProg(ProgId, ProgId),

    #[error("`{0}` expects a literal {1} quote")]
    DynamicInvocation(&'static str, StageAnnotation),

    #[error("Unexpected {0} node [{1}] during code generation")]
    UnexpectedNode(&'static str, NodeId),

    #[error("Unknown program q{0}")]
    UnknownProg(ProgId),

    #[error("Unknown procedure p{0}")]
    UnknownProc(ProcId),

    #[error("Node {0} has no type")]
    MissingType(NodeId),

    #[error("Reference [{0}] is not resolved")]
    Unresolved(NodeId),

    #[error("Type {0} cannot be bound as a uniform")]
    UnsupportedUniform(Type),

    #[error("{0} is not implemented")]
    Unimplemented(String),
}

impl CodegenError {
    pub fn is_unimplemented(&self) -> bool {
        matches!(self, CodegenError::Unimplemented(_))
    }
}

/// Output of the code generators.
#[derive(Debug, Clone, Default)]
pub struct GeneratedCode {
    /// The complete host program.
    pub js: String,
    /// GLSL source of every shader program, embedded in `js` as well.
    pub shaders: BTreeMap<ProgId, String>,
}

pub fn generate(ir: &CompilerIr) -> Result<GeneratedCode, CodegenError> {
    let mut shaders = BTreeMap::new();
    for prog in ir.progs.iter().filter(|prog| prog.is_shader()) {
        shaders.insert(prog.id, glsl::emit_glsl(ir, prog)?);
    }
    let js = js::emit_js(ir, &shaders)?;
    Ok(GeneratedCode { js, shaders })
}

/// Bodies of every escape in `exprs`, keyed by escape id.
pub(crate) fn escape_bodies<'a>(
    exprs: impl IntoIterator<Item = &'a Expr>,
) -> BTreeMap<NodeId, &'a Expr> {
    struct Collector<'a> {
        bodies: BTreeMap<NodeId, &'a Expr>,
    }

    impl<'a> Collector<'a> {
        fn collect(&mut self, expr: &'a Expr) {
            if let ExprKind::Escape { body, .. } = &expr.kind {
                self.bodies.insert(expr.id, body);
            }
            walk_children(self, expr);
        }
    }

    fn walk_children<'a>(c: &mut Collector<'a>, expr: &'a Expr) {
        match &expr.kind {
            ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::StringLit(_)
            | ExprKind::Var(_)
            | ExprKind::Extern { .. }
            | ExprKind::ProgRef(_)
            | ExprKind::ProcRef(_) => {}
            ExprKind::Let { value, .. } | ExprKind::Assign { value, .. } => c.collect(value),
            ExprKind::CompoundAssign { target, value, .. } => {
                c.collect(target);
                c.collect(value);
            }
            ExprKind::Seq(items) => items.iter().for_each(|item| c.collect(item)),
            ExprKind::Paren(inner)
            | ExprKind::Unary { expr: inner, .. }
            | ExprKind::Run(inner)
            | ExprKind::Quote { body: inner, .. }
            | ExprKind::Escape { body: inner, .. }
            | ExprKind::Intrinsic { arg: inner, .. } => c.collect(inner),
            ExprKind::Binary { left, right, .. } => {
                c.collect(left);
                c.collect(right);
            }
            ExprKind::Call { callee, args } => {
                c.collect(callee);
                args.iter().for_each(|arg| c.collect(arg));
            }
            ExprKind::Fun { body, .. } => c.collect(body),
        }
    }

    let mut collector = Collector {
        bodies: BTreeMap::new(),
    };
    for expr in exprs {
        collector.collect(expr);
    }
    collector.bodies
}
