//! JavaScript generation for host code.
//!
//! The whole program becomes one immediately invoked function: the runtime
//! prelude, one function per ordinary program (`q{id}`), the setup of every
//! vertex/fragment pair, one function per lifted procedure (`p{id}`), then the
//! main body. Every expression compiles to a JavaScript expression; locals
//! are hoisted into `var` declarations at the top of their function.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::backend::glue::{GlueEntry, GlueSource};
use crate::backend::runtime::RUNTIME;
use crate::backend::webgl::{emit_shader_binding, emit_shader_setup, js_string, shader_sym};
use crate::backend::{CodegenError, escape_bodies};
use crate::context::CompilerIr;
use crate::defuse::DefSite;
use crate::lambda_lift::Proc;
use crate::quote_lift::Prog;
use crate::tree::visit::{Visitor, walk_expr};
use crate::tree::*;
use crate::types::{ScalarKind, Type};

pub fn emit_js(ir: &CompilerIr, shaders: &BTreeMap<ProgId, String>) -> Result<String, CodegenError> {
    let mut emitter = JsEmitter {
        ir,
        escapes: escape_bodies(ir.progs.iter().map(|prog| &prog.body)),
        output: String::new(),
    };
    emitter.emit_program(shaders)?;
    Ok(emitter.finish())
}

struct JsEmitter<'a> {
    ir: &'a CompilerIr,
    escapes: BTreeMap<NodeId, &'a Expr>,
    output: String,
}

impl<'a> JsEmitter<'a> {
    fn finish(self) -> String {
        self.output
    }

    fn emit_program(&mut self, shaders: &BTreeMap<ProgId, String>) -> Result<(), CodegenError> {
        let mut body = String::new();
        let _ = writeln!(body, "{}", RUNTIME);

        for prog in self.ir.progs.iter() {
            match prog.annotation {
                StageAnnotation::Ordinary => {
                    let _ = writeln!(body);
                    body.push_str(&self.emit_prog(prog)?);
                }
                StageAnnotation::Vertex => {
                    let _ = writeln!(body);
                    emit_shader_setup(&mut body, self.ir, prog, shaders)?;
                }
                StageAnnotation::Fragment => {}
            }
        }

        for proc in self.ir.procs.iter() {
            let _ = writeln!(body);
            body.push_str(&self.emit_proc(proc)?);
        }

        let _ = writeln!(body);
        body.push_str(&self.emit_function_body(&self.ir.main)?);

        let _ = writeln!(self.output, "(function () {{");
        let _ = write!(self.output, "{}", textwrap::indent(&body, "  "));
        let _ = writeln!(self.output, "}})()");
        Ok(())
    }

    fn emit_prog(&self, prog: &'a Prog) -> Result<String, CodegenError> {
        let mut params = prog
            .escapes
            .iter()
            .map(|escape| escape_param(escape.id))
            .collect::<Vec<_>>();
        params.extend(self.prog_free(prog).map(|binding| self.binding_name(binding)));

        self.emit_function(&format!("q{}", prog.id), &params, &prog.body)
    }

    fn emit_proc(&self, proc: &Proc) -> Result<String, CodegenError> {
        let mut params = proc
            .captures
            .iter()
            .map(|binding| self.binding_name(*binding))
            .collect::<Vec<_>>();
        params.extend(proc.params.iter().map(|p| local_name(&p.name, p.id)));

        self.emit_function(&format!("p{}", proc.id), &params, &proc.body)
    }

    fn emit_function(
        &self,
        name: &str,
        params: &[String],
        body: &Expr,
    ) -> Result<String, CodegenError> {
        let mut out = String::new();
        let _ = writeln!(out, "function {}({}) {{", name, params.join(", "));
        let _ = write!(
            out,
            "{}",
            textwrap::indent(&self.emit_function_body(body)?, "  ")
        );
        let _ = writeln!(out, "}}");
        Ok(out)
    }

    fn emit_function_body(&self, body: &Expr) -> Result<String, CodegenError> {
        let mut collector = LocalCollector {
            emitter: self,
            locals: BTreeMap::new(),
        };
        collector.visit_expr(body);

        let mut out = String::new();
        if !collector.locals.is_empty() {
            let locals = collector.locals.into_values().collect::<Vec<_>>();
            let _ = writeln!(out, "var {};", locals.join(", "));
        }
        let _ = writeln!(out, "return {};", self.compile(body)?);
        Ok(out)
    }

    /// Free bindings passed to a program function. Externs stay global.
    fn prog_free(&self, prog: &'a Prog) -> impl Iterator<Item = NodeId> + 'a {
        let def_use = &self.ir.def_use;
        prog.free.iter().copied().filter(move |binding| {
            !def_use
                .binding(*binding)
                .is_some_and(|binding| binding.is_extern())
        })
    }

    fn binding_name(&self, binding: NodeId) -> String {
        match self.ir.def_use.binding(binding) {
            Some(b) if b.is_extern() => b.name.clone(),
            Some(b) => local_name(&b.name, binding),
            None => format!("v_{}", binding),
        }
    }

    fn type_of(&self, id: NodeId) -> Result<&'a Type, CodegenError> {
        self.ir
            .type_table
            .type_of(id)
            .ok_or(CodegenError::MissingType(id))
    }

    fn resolve(&self, id: NodeId) -> Result<DefSite, CodegenError> {
        self.ir
            .def_use
            .resolution(id)
            .map(|res| res.def)
            .ok_or(CodegenError::Unresolved(id))
    }

    fn escape_body(&self, escape: NodeId) -> Result<&'a Expr, CodegenError> {
        self.escapes
            .get(&escape)
            .copied()
            .ok_or(CodegenError::UnexpectedNode("Escape", escape))
    }

    fn compile(&self, expr: &Expr) -> Result<String, CodegenError> {
        let code = match &expr.kind {
            ExprKind::IntLit(value) => value.to_string(),
            ExprKind::FloatLit(value) => format!("{:?}", value),
            ExprKind::StringLit(value) => js_string(value),

            ExprKind::Var(_) => match self.resolve(expr.id)? {
                DefSite::Builtin(builtin) => builtin.to_string(),
                DefSite::Binding(binding) => self.binding_name(binding),
            },

            ExprKind::Let { name, value } => {
                format!("({} = {})", local_name(name, expr.id), self.compile(value)?)
            }

            ExprKind::Assign { value, .. } => {
                let target = match self.resolve(expr.id)? {
                    DefSite::Binding(binding) => self.binding_name(binding),
                    DefSite::Builtin(builtin) => builtin.to_string(),
                };
                format!("({} = {})", target, self.compile(value)?)
            }

            ExprKind::Seq(items) if items.is_empty() => "void 0".to_string(),
            ExprKind::Seq(items) => {
                let items = items
                    .iter()
                    .map(|item| self.compile(item))
                    .collect::<Result<Vec<_>, _>>()?;
                format!("({})", items.join(", "))
            }

            ExprKind::Binary { op, left, right } => self.compile_binary(expr, *op, left, right)?,

            ExprKind::Call { callee, args } => {
                let callee = match &callee.kind {
                    ExprKind::ProcRef(id) => format!("p{}", id),
                    ExprKind::Var(_) => self.compile(callee)?,
                    _ => format!("({})", self.compile(callee)?),
                };
                let args = args
                    .iter()
                    .map(|arg| self.compile(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                format!("{}({})", callee, args.join(", "))
            }

            ExprKind::Extern { name, .. } => name.clone(),

            ExprKind::Escape { kind, .. } => match kind {
                EscapeKind::Persist => escape_param(expr.id),
                EscapeKind::Splice => format!("run({})", escape_param(expr.id)),
            },

            ExprKind::Run(inner) => format!("run({})", self.compile(inner)?),

            ExprKind::Intrinsic { kind, arg } => match kind {
                IntrinsicKind::Render => self.compile(arg)?,
                IntrinsicKind::Vtx => self.compile_vtx(arg)?,
                IntrinsicKind::Frag => {
                    return Err(CodegenError::UnexpectedNode(expr.tag(), expr.id));
                }
            },

            ExprKind::ProgRef(id) => self.compile_prog_ref(expr, *id)?,
            ExprKind::ProcRef(id) => format!("p{}", id),

            ExprKind::Fun { .. }
            | ExprKind::Quote { .. }
            | ExprKind::Paren(_)
            | ExprKind::Unary { .. }
            | ExprKind::CompoundAssign { .. } => {
                return Err(CodegenError::UnexpectedNode(expr.tag(), expr.id));
            }
        };
        Ok(code)
    }

    fn compile_binary(
        &self,
        expr: &Expr,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<String, CodegenError> {
        let left_ty = self.type_of(left.id)?;
        let right_ty = self.type_of(right.id)?;
        let lhs = self.compile(left)?;
        let rhs = self.compile(right)?;

        match (left_ty, right_ty) {
            (Type::Matrix { dim: a }, Type::Matrix { dim: b }) if op == BinaryOp::Mul && a == b => {
                Ok(format!("mat{}mult({}, {})", a, lhs, rhs))
            }
            (Type::Scalar(ScalarKind::Int), Type::Scalar(ScalarKind::Int))
                if op == BinaryOp::Div =>
            {
                Ok(format!("Math.trunc({} / {})", lhs, rhs))
            }
            (Type::Scalar(_), Type::Scalar(_)) => Ok(format!("({} {} {})", lhs, op, rhs)),
            _ => Err(CodegenError::Unimplemented(format!(
                "`{}` on {} in host code",
                op,
                self.type_of(expr.id)?
            ))),
        }
    }

    fn compile_prog_ref(&self, expr: &Expr, id: ProgId) -> Result<String, CodegenError> {
        let prog = self.ir.progs.get(id).ok_or(CodegenError::UnknownProg(id))?;
        match prog.annotation {
            StageAnnotation::Ordinary => {
                let mut args = Vec::new();
                for escape in &prog.escapes {
                    args.push(self.compile(self.escape_body(escape.id)?)?);
                }
                args.extend(self.prog_free(prog).map(|binding| self.binding_name(binding)));
                Ok(format!("code(q{}, [{}])", id, args.join(", ")))
            }
            StageAnnotation::Vertex => Ok(shader_sym(id)),
            StageAnnotation::Fragment => Err(CodegenError::UnexpectedNode(expr.tag(), expr.id)),
        }
    }

    fn compile_vtx(&self, arg: &Expr) -> Result<String, CodegenError> {
        let vertex = match arg.kind {
            ExprKind::ProgRef(id) => self.ir.progs.get(id).ok_or(CodegenError::UnknownProg(id))?,
            _ => return Err(CodegenError::DynamicInvocation("vtx", StageAnnotation::Vertex)),
        };
        emit_shader_binding(self.ir, vertex, |entry| self.glue_value(entry))
    }

    fn glue_value(&self, entry: &GlueEntry) -> Result<String, CodegenError> {
        match &entry.source {
            GlueSource::Binding { binding, .. } => Ok(self.binding_name(*binding)),
            GlueSource::Expr(_) => self.compile(self.escape_body(entry.id)?),
        }
    }
}

/// Collects the `var` declarations of one function body. Escaped code is
/// hoisted into the function that evaluates it: the escapes of an ordinary
/// program where the program is referenced, the persists of a shader where it
/// is invoked.
struct LocalCollector<'e, 'a> {
    emitter: &'e JsEmitter<'a>,
    locals: BTreeMap<NodeId, String>,
}

impl Visitor for LocalCollector<'_, '_> {
    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Let { name, .. } => {
                self.locals.insert(expr.id, local_name(name, expr.id));
                walk_expr(self, expr);
            }
            ExprKind::Escape { .. } | ExprKind::Fun { .. } => {}
            ExprKind::ProgRef(id) => {
                let ir = self.emitter.ir;
                if let Some(prog) = ir.progs.get(*id)
                    && prog.annotation == StageAnnotation::Ordinary
                {
                    self.visit_escapes(prog);
                }
            }
            ExprKind::Intrinsic {
                kind: IntrinsicKind::Vtx,
                arg,
            } => {
                let ir = self.emitter.ir;
                match arg.kind {
                    ExprKind::ProgRef(id) => {
                        if let Some(prog) = ir.progs.get(id) {
                            self.visit_escapes(prog);
                        }
                    }
                    _ => walk_expr(self, expr),
                }
            }
            _ => walk_expr(self, expr),
        }
    }
}

impl LocalCollector<'_, '_> {
    fn visit_escapes(&mut self, prog: &Prog) {
        let emitter = self.emitter;
        for escape in &prog.escapes {
            if let Some(body) = emitter.escapes.get(&escape.id) {
                self.visit_expr(body);
            }
        }
    }
}

fn local_name(name: &str, id: NodeId) -> String {
    format!("{}_{}", name, id)
}

fn escape_param(id: NodeId) -> String {
    format!("e{}", id)
}

#[cfg(test)]
#[path = "../tests/backend/t_js.rs"]
mod tests;
