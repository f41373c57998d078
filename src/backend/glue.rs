//! Glue analysis: every value that crosses into a shader program becomes a
//! named uniform, attribute or varying.
//!
//! Entries of a program are ordered persists first (ascending escape id), then
//! free variables referenced directly from the program (ascending binding id).
//! Host code declares locations and binds values in this order.

use std::collections::BTreeSet;
use std::fmt;

use enum_display::EnumDisplay;
use indexmap::IndexMap;
use thiserror::Error;

use crate::context::{CompilerIr, LambdaLiftedContext};
use crate::defuse::DefUseTable;
use crate::elaborate::TypeTable;
use crate::quote_lift::Prog;
use crate::tree::{NodeId, ProgId, StageAnnotation};
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumDisplay)]
pub enum Transfer {
    /// Host value, constant for a draw call.
    #[display("uniform")]
    Uniform,
    /// Host buffer, one element per vertex.
    #[display("attribute")]
    Attribute,
    /// Vertex-stage value interpolated into the fragment stage.
    #[display("varying")]
    Varying,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlueSource {
    /// A variable of the sending stage.
    Binding { binding: NodeId, name: String },
    /// The body of a persist escape (by node id), evaluated in the sending
    /// stage.
    Expr(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlueEntry {
    /// Escape id for persists, binding id for free variables.
    pub id: NodeId,
    pub name: String,
    /// Type seen by the shader (the element type for attributes).
    pub ty: Type,
    pub transfer: Transfer,
    pub source: GlueSource,
}

impl GlueEntry {
    pub fn is_attribute(&self) -> bool {
        self.transfer == Transfer::Attribute
    }

    /// Uniforms and attributes are bound by host code.
    pub fn is_host_bound(&self) -> bool {
        self.transfer != Transfer::Varying
    }
}

#[derive(Debug, Clone, Default)]
pub struct GlueTable {
    entries: IndexMap<ProgId, Vec<GlueEntry>>,
}

impl GlueTable {
    pub fn get(&self, prog: ProgId) -> &[GlueEntry] {
        self.entries.get(&prog).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The entry of `prog` carrying the escape or binding `id`.
    pub fn find(&self, prog: ProgId, id: NodeId) -> Option<&GlueEntry> {
        self.get(prog).iter().find(|entry| entry.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProgId, &[GlueEntry])> {
        self.entries
            .iter()
            .map(|(prog, entries)| (*prog, entries.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for GlueTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (prog, entries) in &self.entries {
            writeln!(f, "Glue q{}", prog)?;
            for entry in entries {
                let source = match &entry.source {
                    GlueSource::Binding { binding, name } => format!("{} [{}]", name, binding),
                    GlueSource::Expr(escape) => format!("persist [{}]", escape),
                };
                writeln!(
                    f,
                    "  {}: {} {} <- {}",
                    entry.name, entry.ty, entry.transfer, source
                )?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum GlueError {
    #[error("Values of type {ty} cannot cross into shader program q{prog} (reference [{id}])")]
    UnsupportedType { prog: ProgId, id: NodeId, ty: Type },

    #[error("Host array [{id}] cannot reach fragment program q{prog}")]
    ArrayInFragment { prog: ProgId, id: NodeId },

    #[error("Node {0} has no type")]
    MissingType(NodeId),
}

pub fn analyze_glue(ctx: LambdaLiftedContext) -> Result<CompilerIr, GlueError> {
    let mut glue = GlueTable::default();
    for prog in ctx.progs.iter().filter(|prog| prog.is_shader()) {
        let entries = glue_for_prog(prog, &ctx.type_table, &ctx.def_use)?;
        glue.entries.insert(prog.id, entries);
    }
    Ok(ctx.with_glue(glue))
}

/// Classify and name the values crossing into one shader program.
pub fn glue_for_prog(
    prog: &Prog,
    type_table: &TypeTable,
    def_use: &DefUseTable,
) -> Result<Vec<GlueEntry>, GlueError> {
    let mut entries = Vec::new();

    for escape in prog.persists() {
        let ty = type_table
            .type_of(escape.body)
            .ok_or(GlueError::MissingType(escape.body))?;
        let sender = match prog.annotation {
            StageAnnotation::Fragment => StageAnnotation::Vertex,
            _ => StageAnnotation::Ordinary,
        };
        entries.push(classify(
            prog,
            escape.id,
            ty,
            sender,
            GlueSource::Expr(escape.body),
        )?);
    }

    // Free variables referenced from this stage itself. References from a
    // nested stage are glued there.
    let mut direct = BTreeSet::new();
    for (_, res) in def_use.uses() {
        if let Some(binding) = res.binding()
            && res.innermost_quote() == Some(prog.quote)
        {
            direct.insert(binding);
        }
    }

    for binding in direct {
        let entry = type_table
            .get(binding)
            .ok_or(GlueError::MissingType(binding))?;
        let name = def_use
            .binding(binding)
            .map(|b| b.name.clone())
            .unwrap_or_default();
        entries.push(classify(
            prog,
            binding,
            &entry.ty,
            entry.stage.annotation,
            GlueSource::Binding { binding, name },
        )?);
    }

    Ok(entries)
}

fn classify(
    prog: &Prog,
    id: NodeId,
    ty: &Type,
    sender: StageAnnotation,
    source: GlueSource,
) -> Result<GlueEntry, GlueError> {
    let unsupported = || GlueError::UnsupportedType {
        prog: prog.id,
        id,
        ty: ty.clone(),
    };

    let (transfer, ty) = match (prog.annotation, sender) {
        (StageAnnotation::Fragment, StageAnnotation::Vertex) => (Transfer::Varying, ty.clone()),
        (StageAnnotation::Fragment, _) if ty.is_array() => {
            return Err(GlueError::ArrayInFragment { prog: prog.id, id });
        }
        (_, _) => match ty.array_elem() {
            Some(elem) => (Transfer::Attribute, elem.clone()),
            None => (Transfer::Uniform, ty.clone()),
        },
    };
    if !ty.is_primitive() {
        return Err(unsupported());
    }

    let prefix = match transfer {
        Transfer::Uniform => "u",
        Transfer::Attribute => "a",
        Transfer::Varying => "v",
    };
    Ok(GlueEntry {
        id,
        name: format!("{}{}_{}", prefix, prog.id, id),
        ty,
        transfer,
        source,
    })
}

#[cfg(test)]
#[path = "../tests/backend/t_glue.rs"]
mod tests;
