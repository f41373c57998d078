//! WebGL driver code: shader setup declarations and per-draw bindings.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::backend::CodegenError;
use crate::backend::glue::GlueEntry;
use crate::context::CompilerIr;
use crate::quote_lift::Prog;
use crate::tree::{NodeId, ProgId};
use crate::types::{ScalarKind, Type};

/// Host variable holding the linked program of a vertex/fragment pair.
pub fn shader_sym(vertex: ProgId) -> String {
    format!("s{}", vertex)
}

/// Host variable holding the location of one glue entry.
pub fn loc_sym(prog: ProgId, id: NodeId) -> String {
    format!("loc{}_{}", prog, id)
}

fn source_sym(prog: ProgId) -> String {
    format!("q{}", prog)
}

pub fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSetter {
    pub func: &'static str,
    pub matrix: bool,
}

/// The `gl.uniform*` function binding a value of type `ty`.
pub fn uniform_setter(ty: &Type) -> Result<UniformSetter, CodegenError> {
    let (func, matrix) = match ty {
        Type::Scalar(ScalarKind::Int) => ("uniform1i", false),
        Type::Scalar(ScalarKind::Float) => ("uniform1f", false),
        Type::Vector {
            scalar: ScalarKind::Int,
            len: 3,
        } => ("uniform3iv", false),
        Type::Vector {
            scalar: ScalarKind::Int,
            len: 4,
        } => ("uniform4iv", false),
        Type::Vector {
            scalar: ScalarKind::Float,
            len: 3,
        } => ("uniform3fv", false),
        Type::Vector {
            scalar: ScalarKind::Float,
            len: 4,
        } => ("uniform4fv", false),
        Type::Matrix { dim: 3 } => ("uniformMatrix3fv", true),
        Type::Matrix { dim: 4 } => ("uniformMatrix4fv", true),
        Type::Vector { .. }
        | Type::Matrix { .. }
        | Type::Void
        | Type::String
        | Type::Array { .. }
        | Type::Fn { .. }
        | Type::Code { .. } => return Err(CodegenError::UnsupportedUniform(ty.clone())),
    };
    Ok(UniformSetter { func, matrix })
}

fn vertex_and_fragment<'a>(
    ir: &'a CompilerIr,
    vertex: &'a Prog,
) -> Result<[&'a Prog; 2], CodegenError> {
    let fragment = ir
        .progs
        .fragment_of(vertex)
        .ok_or(CodegenError::UnknownProg(vertex.id))?;
    Ok([vertex, fragment])
}

/// Emit the sources, link call and location lookups of a vertex program and
/// its fragment program.
pub fn emit_shader_setup(
    out: &mut String,
    ir: &CompilerIr,
    vertex: &Prog,
    shaders: &BTreeMap<ProgId, String>,
) -> Result<(), CodegenError> {
    let pair = vertex_and_fragment(ir, vertex)?;

    for prog in pair {
        let source = shaders
            .get(&prog.id)
            .ok_or(CodegenError::UnknownProg(prog.id))?;
        let _ = writeln!(out, "var {} = {};", source_sym(prog.id), js_string(source));
    }

    let shader = shader_sym(vertex.id);
    let _ = writeln!(
        out,
        "var {} = get_shader(gl, {}, {});",
        shader,
        source_sym(pair[0].id),
        source_sym(pair[1].id)
    );

    for prog in pair {
        for entry in ir.glue.get(prog.id).iter().filter(|e| e.is_host_bound()) {
            let func = if entry.is_attribute() {
                "getAttribLocation"
            } else {
                "getUniformLocation"
            };
            let _ = writeln!(
                out,
                "var {} = gl.{}({}, {});",
                loc_sym(prog.id, entry.id),
                func,
                shader,
                js_string(&entry.name)
            );
        }
    }
    Ok(())
}

/// Activate a shader program and bind every host-bound glue entry.
///
/// `value_of` compiles the host value of an entry to a JavaScript expression.
pub fn emit_shader_binding<F>(
    ir: &CompilerIr,
    vertex: &Prog,
    mut value_of: F,
) -> Result<String, CodegenError>
where
    F: FnMut(&GlueEntry) -> Result<String, CodegenError>,
{
    let mut calls = vec![format!("gl.useProgram({})", shader_sym(vertex.id))];

    for prog in vertex_and_fragment(ir, vertex)? {
        for entry in ir.glue.get(prog.id).iter().filter(|e| e.is_host_bound()) {
            let value = value_of(entry)?;
            let loc = loc_sym(prog.id, entry.id);
            let call = if entry.is_attribute() {
                let size = entry
                    .ty
                    .component_count()
                    .ok_or_else(|| CodegenError::UnsupportedUniform(entry.ty.clone()))?;
                format!("bind_attribute(gl, {}, ({}), {})", loc, value, size)
            } else {
                let setter = uniform_setter(&entry.ty)?;
                if setter.matrix {
                    format!("gl.{}({}, false, ({}))", setter.func, loc, value)
                } else {
                    format!("gl.{}({}, ({}))", setter.func, loc, value)
                }
            };
            calls.push(call);
        }
    }

    Ok(format!("({})", calls.join(", ")))
}
