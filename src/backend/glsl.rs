//! GLSL ES 1.00 generation for shader programs.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::backend::glue::{GlueEntry, GlueSource, Transfer};
use crate::backend::{CodegenError, escape_bodies};
use crate::context::CompilerIr;
use crate::defuse::DefSite;
use crate::quote_lift::Prog;
use crate::tree::*;
use crate::types::{ScalarKind, Type, TypeAssignability, type_assignable};

pub fn emit_glsl(ir: &CompilerIr, prog: &Prog) -> Result<String, CodegenError> {
    let fragment = match prog.annotation {
        StageAnnotation::Vertex => ir.progs.fragment_of(prog),
        _ => None,
    };
    let mut emitter = GlslEmitter {
        ir,
        prog,
        fragment,
        escapes: escape_bodies(ir.progs.iter().map(|p| &p.body)),
        output: String::new(),
    };
    emitter.emit_prog()?;
    Ok(emitter.finish())
}

pub fn glsl_type(ty: &Type) -> Result<&'static str, CodegenError> {
    let name = match ty {
        Type::Scalar(ScalarKind::Int) => "int",
        Type::Scalar(ScalarKind::Float) => "float",
        Type::Vector {
            scalar: ScalarKind::Int,
            len: 3,
        } => "ivec3",
        Type::Vector {
            scalar: ScalarKind::Int,
            len: 4,
        } => "ivec4",
        Type::Vector {
            scalar: ScalarKind::Float,
            len: 3,
        } => "vec3",
        Type::Vector {
            scalar: ScalarKind::Float,
            len: 4,
        } => "vec4",
        Type::Matrix { dim: 3 } => "mat3",
        Type::Matrix { dim: 4 } => "mat4",
        other => {
            return Err(CodegenError::Unimplemented(format!(
                "{} values in shaders",
                other
            )));
        }
    };
    Ok(name)
}

struct GlslEmitter<'a> {
    ir: &'a CompilerIr,
    prog: &'a Prog,
    /// The fragment program fed by this vertex program.
    fragment: Option<&'a Prog>,
    escapes: BTreeMap<NodeId, &'a Expr>,
    output: String,
}

impl<'a> GlslEmitter<'a> {
    fn finish(self) -> String {
        self.output
    }

    fn emit_line(&mut self, line: &str) {
        let _ = writeln!(self.output, "{}", line);
    }

    fn emit_prog(&mut self) -> Result<(), CodegenError> {
        self.emit_line("precision mediump float;");

        for entry in self.ir.glue.get(self.prog.id) {
            self.emit_decl(entry)?;
        }
        if let Some(fragment) = self.fragment {
            for entry in self.ir.glue.get(fragment.id) {
                if entry.transfer == Transfer::Varying {
                    self.emit_decl(entry)?;
                }
            }
        }

        let mut body = String::new();
        for stmt in flatten(&self.prog.body) {
            self.emit_stmt(&mut body, stmt)?;
        }

        self.emit_line("void main() {");
        let _ = write!(self.output, "{}", textwrap::indent(&body, "  "));
        self.emit_line("}");
        Ok(())
    }

    fn emit_decl(&mut self, entry: &GlueEntry) -> Result<(), CodegenError> {
        let line = format!("{} {} {};", entry.transfer, glsl_type(&entry.ty)?, entry.name);
        self.emit_line(&line);
        Ok(())
    }

    fn type_of(&self, id: NodeId) -> Result<&'a Type, CodegenError> {
        self.ir
            .type_table
            .type_of(id)
            .ok_or(CodegenError::MissingType(id))
    }

    fn emit_stmt(&mut self, out: &mut String, expr: &Expr) -> Result<(), CodegenError> {
        match &expr.kind {
            ExprKind::Let { name, value } => {
                if matches!(value.kind, ExprKind::Fun { .. }) {
                    return Err(CodegenError::Unimplemented(
                        "function literals in shaders".to_string(),
                    ));
                }
                let ty = self.type_of(expr.id)?;
                let value = self.compile_coerced(value, ty)?;
                let _ = writeln!(
                    out,
                    "{} {} = {};",
                    glsl_type(ty)?,
                    local_name(name, expr.id),
                    value
                );
            }

            ExprKind::Intrinsic {
                kind: IntrinsicKind::Frag,
                arg,
            } => {
                let ExprKind::ProgRef(id) = arg.kind else {
                    return Err(CodegenError::DynamicInvocation(
                        "frag",
                        StageAnnotation::Fragment,
                    ));
                };
                for entry in self.ir.glue.get(id) {
                    if entry.transfer != Transfer::Varying {
                        continue;
                    }
                    let value = match &entry.source {
                        GlueSource::Binding { binding, name } => {
                            self.binding_name(*binding, name)
                        }
                        GlueSource::Expr(body) => {
                            let body = self.escape_body(entry.id, *body)?;
                            self.compile_coerced(body, &entry.ty)?
                        }
                    };
                    let _ = writeln!(out, "{} = {};", entry.name, value);
                }
            }

            _ => {
                let code = self.compile(expr)?;
                let _ = writeln!(out, "{};", code);
            }
        }
        Ok(())
    }

    fn escape_body(&self, escape: NodeId, body: NodeId) -> Result<&'a Expr, CodegenError> {
        self.escapes
            .get(&escape)
            .copied()
            .filter(|expr| expr.id == body)
            .ok_or(CodegenError::UnexpectedNode("Escape", escape))
    }

    /// Name of a variable as seen from this program: its glue entry, or a
    /// local of this stage.
    fn binding_name(&self, binding: NodeId, name: &str) -> String {
        match self.ir.glue.find(self.prog.id, binding) {
            Some(entry) => entry.name.clone(),
            None => local_name(name, binding),
        }
    }

    fn compile_coerced(&self, expr: &Expr, to: &Type) -> Result<String, CodegenError> {
        let from = self.type_of(expr.id)?;
        let code = self.compile(expr)?;
        if type_assignable(from, to) != TypeAssignability::IntToFloat {
            return Ok(code);
        }
        if let ExprKind::IntLit(value) = expr.kind {
            return Ok(format!("{}.0", value));
        }
        Ok(format!("{}({})", glsl_type(to)?, code))
    }

    fn compile(&self, expr: &Expr) -> Result<String, CodegenError> {
        let code = match &expr.kind {
            ExprKind::IntLit(value) => value.to_string(),
            ExprKind::FloatLit(value) => float_lit(*value),

            ExprKind::Var(name) => {
                let res = self
                    .ir
                    .def_use
                    .resolution(expr.id)
                    .ok_or(CodegenError::Unresolved(expr.id))?;
                match res.def {
                    DefSite::Builtin(builtin) => builtin.to_string(),
                    DefSite::Binding(binding) => self.binding_name(binding, name),
                }
            }

            ExprKind::Assign { name, value } => {
                let res = self
                    .ir
                    .def_use
                    .resolution(expr.id)
                    .ok_or(CodegenError::Unresolved(expr.id))?;
                let (target, ty) = match res.def {
                    DefSite::Builtin(builtin) => (
                        builtin.to_string(),
                        builtin
                            .var_type()
                            .ok_or(CodegenError::UnexpectedNode("Assign", expr.id))?,
                    ),
                    DefSite::Binding(binding) => (
                        self.binding_name(binding, name),
                        self.type_of(binding)?.clone(),
                    ),
                };
                format!("{} = {}", target, self.compile_coerced(value, &ty)?)
            }

            ExprKind::Seq(items) => {
                let items = items
                    .iter()
                    .map(|item| self.compile(item))
                    .collect::<Result<Vec<_>, _>>()?;
                format!("({})", items.join(", "))
            }

            ExprKind::Binary { op, left, right } => {
                let result = self.type_of(expr.id)?;
                let left = self.compile_operand(left, result)?;
                let right = self.compile_operand(right, result)?;
                format!("({} {} {})", left, op, right)
            }

            ExprKind::Call { callee, args } => self.compile_call(callee, args)?,

            ExprKind::Escape {
                kind: EscapeKind::Persist,
                ..
            } => match self.ir.glue.find(self.prog.id, expr.id) {
                Some(entry) => entry.name.clone(),
                None => return Err(CodegenError::UnexpectedNode("Escape", expr.id)),
            },

            ExprKind::ProgRef(id) => {
                let child = self
                    .ir
                    .progs
                    .get(*id)
                    .ok_or(CodegenError::UnknownProg(*id))?;
                if !child.is_shader() {
                    return Err(CodegenError::NestedOrdinaryProg(self.prog.id, *id));
                }
                return Err(CodegenError::Unimplemented(
                    "shader quotes as values".to_string(),
                ));
            }

            ExprKind::Let { .. } => {
                return Err(CodegenError::Unimplemented(
                    "nested bindings in shaders".to_string(),
                ));
            }
            ExprKind::Fun { .. } => {
                return Err(CodegenError::Unimplemented(
                    "function literals in shaders".to_string(),
                ));
            }
            ExprKind::StringLit(_) => {
                return Err(CodegenError::Unimplemented("strings in shaders".to_string()));
            }
            ExprKind::Escape {
                kind: EscapeKind::Splice,
                ..
            } => {
                return Err(CodegenError::Unimplemented("splices in shaders".to_string()));
            }
            ExprKind::Run(_) => {
                return Err(CodegenError::Unimplemented(
                    "running code in shaders".to_string(),
                ));
            }
            ExprKind::Intrinsic { kind, .. } => {
                return Err(CodegenError::Unimplemented(format!(
                    "`{}` in expression position",
                    kind
                )));
            }
            ExprKind::Extern { .. } | ExprKind::ProcRef(_) => {
                return Err(CodegenError::Unimplemented(format!(
                    "{} nodes in shaders",
                    expr.tag()
                )));
            }

            ExprKind::Paren(_)
            | ExprKind::Unary { .. }
            | ExprKind::CompoundAssign { .. }
            | ExprKind::Quote { .. } => {
                return Err(CodegenError::UnexpectedNode(expr.tag(), expr.id));
            }
        };
        Ok(code)
    }

    /// Widen an integer operand of a float-valued arithmetic expression.
    fn compile_operand(&self, expr: &Expr, result: &Type) -> Result<String, CodegenError> {
        let ty = self.type_of(expr.id)?;
        if result.scalar_kind() == Some(ScalarKind::Float)
            && ty.scalar_kind() == Some(ScalarKind::Int)
        {
            self.compile_coerced(expr, &ty.to_float())
        } else {
            self.compile(expr)
        }
    }

    fn compile_call(&self, callee: &Expr, args: &[Expr]) -> Result<String, CodegenError> {
        let res = self
            .ir
            .def_use
            .resolution(callee.id)
            .ok_or(CodegenError::Unresolved(callee.id))?;
        let DefSite::Builtin(builtin) = res.def else {
            return Err(CodegenError::Unimplemented(
                "function calls in shaders".to_string(),
            ));
        };
        let Type::Fn { params, .. } = self.type_of(callee.id)? else {
            return Err(CodegenError::UnexpectedNode(callee.tag(), callee.id));
        };
        let args = args
            .iter()
            .zip(params)
            .map(|(arg, param)| self.compile_coerced(arg, param))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("{}({})", builtin, args.join(", ")))
    }
}

/// Statements of a shader body: nested sequences are flattened.
fn flatten(expr: &Expr) -> Vec<&Expr> {
    match &expr.kind {
        ExprKind::Seq(items) => items.iter().flat_map(flatten).collect(),
        _ => vec![expr],
    }
}

fn local_name(name: &str, id: NodeId) -> String {
    format!("{}_{}", name, id)
}

fn float_lit(value: f64) -> String {
    let text = format!("{:?}", value);
    if text.contains(|c| matches!(c, '.' | 'e' | 'E')) || !value.is_finite() {
        text
    } else {
        format!("{}.0", text)
    }
}

#[cfg(test)]
#[path = "../tests/backend/t_glsl.rs"]
mod tests;
