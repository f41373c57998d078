//! Def/use analysis: resolve every variable reference to its binding and the
//! boundaries (quotes and closures) crossed between the two.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

use enum_display::EnumDisplay;
use thiserror::Error;

use crate::context::{AnalyzedContext, DesugaredContext};
use crate::diag::{Span, SpannedError};
use crate::elaborate::Builtin;
use crate::scope::ScopeStack;
use crate::tree::*;

pub use crate::scope::Boundary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefSite {
    Binding(NodeId),
    Builtin(Builtin),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub def: DefSite,
    /// Boundaries crossed from the use to the binding, innermost first.
    pub crossings: Vec<Boundary>,
}

impl Resolution {
    pub fn binding(&self) -> Option<NodeId> {
        match self.def {
            DefSite::Binding(id) => Some(id),
            DefSite::Builtin(_) => None,
        }
    }

    /// The innermost quote the reference escapes, if any.
    pub fn innermost_quote(&self) -> Option<NodeId> {
        self.crossings.iter().find_map(|b| match b {
            Boundary::Quote(id) => Some(*id),
            Boundary::Closure(_) => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumDisplay)]
pub enum BindingKind {
    #[display("let")]
    Let,
    #[display("param")]
    Param,
    #[display("extern")]
    Extern,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
}

impl Binding {
    pub fn is_extern(&self) -> bool {
        self.kind == BindingKind::Extern
    }
}

#[derive(Debug, Clone, Default)]
pub struct DefUseTable {
    uses: BTreeMap<NodeId, Resolution>,
    bindings: BTreeMap<NodeId, Binding>,
}

impl DefUseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolution(&self, use_id: NodeId) -> Option<&Resolution> {
        self.uses.get(&use_id)
    }

    pub fn binding(&self, binding_id: NodeId) -> Option<&Binding> {
        self.bindings.get(&binding_id)
    }

    pub fn uses(&self) -> impl Iterator<Item = (NodeId, &Resolution)> {
        self.uses.iter().map(|(id, res)| (*id, res))
    }

    pub fn bindings(&self) -> impl Iterator<Item = (NodeId, &Binding)> {
        self.bindings.iter().map(|(id, b)| (*id, b))
    }

    fn record_use(&mut self, use_id: NodeId, resolution: Resolution) {
        self.uses.insert(use_id, resolution);
    }

    fn record_binding(&mut self, id: NodeId, name: &str, kind: BindingKind) {
        self.bindings.insert(
            id,
            Binding {
                name: name.to_string(),
                kind,
            },
        );
    }
}

impl fmt::Display for DefUseTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, binding) in &self.bindings {
            writeln!(f, "Binding [{}] {} ({})", id, binding.name, binding.kind)?;
        }
        for (id, res) in &self.uses {
            let def = match res.def {
                DefSite::Binding(def) => format!("[{}]", def),
                DefSite::Builtin(builtin) => format!("builtin {}", builtin),
            };
            if res.crossings.is_empty() {
                writeln!(f, "Use [{}] -> {}", id, def)?;
            } else {
                let crossings = res
                    .crossings
                    .iter()
                    .map(|b| b.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(f, "Use [{}] -> {} across {}", id, def, crossings)?;
            }
        }
        Ok(())
    }
}

/// Derived def/use table for passes that synthesize references.
#[derive(Debug, Clone)]
pub struct DefUseOverlay {
    working: DefUseTable,
}

impl DefUseOverlay {
    pub fn new(base: &DefUseTable) -> Self {
        Self {
            working: base.clone(),
        }
    }

    pub fn insert_synthetic_use(&mut self, use_id: NodeId, resolution: Resolution) {
        self.working.record_use(use_id, resolution);
    }

    pub fn finish(self) -> DefUseTable {
        self.working
    }
}

impl Deref for DefUseOverlay {
    type Target = DefUseTable;

    fn deref(&self) -> &DefUseTable {
        &self.working
    }
}

#[derive(Debug, Clone, Error)]
pub enum DefUseErrorKind {
    #[error("Unbound identifier: {0}")]
    Unbound(String),

    #[error("Escape outside of any quote")]
    EscapeOutsideQuote,
}

pub type DefUseError = SpannedError<DefUseErrorKind>;

impl DefUseErrorKind {
    pub fn at(self, span: Span) -> DefUseError {
        DefUseError::new(self, span)
    }
}

pub fn analyze(ctx: DesugaredContext) -> Result<AnalyzedContext, DefUseError> {
    let def_use = analyze_tree(&ctx.expr)?;
    Ok(ctx.with_def_use(def_use))
}

pub fn analyze_tree(expr: &Expr) -> Result<DefUseTable, DefUseError> {
    let mut analyzer = DefUseAnalyzer {
        scopes: ScopeStack::new(),
        table: DefUseTable::new(),
    };
    analyzer.visit(expr)?;
    Ok(analyzer.table)
}

struct DefUseAnalyzer {
    scopes: ScopeStack<NodeId>,
    table: DefUseTable,
}

impl DefUseAnalyzer {
    fn resolve(&mut self, use_id: NodeId, name: &str, span: Span) -> Result<(), DefUseError> {
        let resolution = match self.scopes.lookup(name) {
            Some(found) => Resolution {
                def: DefSite::Binding(*found.value),
                crossings: found.crossings,
            },
            None => match Builtin::from_name(name) {
                Some(builtin) => Resolution {
                    def: DefSite::Builtin(builtin),
                    crossings: Vec::new(),
                },
                None => return Err(DefUseErrorKind::Unbound(name.to_string()).at(span)),
            },
        };
        self.table.record_use(use_id, resolution);
        Ok(())
    }

    fn bind(&mut self, id: NodeId, name: &str, kind: BindingKind) {
        self.table.record_binding(id, name, kind);
        self.scopes.bind(name, id);
    }

    fn visit(&mut self, expr: &Expr) -> Result<(), DefUseError> {
        match &expr.kind {
            ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::StringLit(_)
            | ExprKind::ProgRef(_)
            | ExprKind::ProcRef(_) => {}

            ExprKind::Var(name) => self.resolve(expr.id, name, expr.span)?,

            ExprKind::Let { name, value } => {
                self.visit(value)?;
                self.bind(expr.id, name, BindingKind::Let);
            }

            ExprKind::Assign { name, value } => {
                self.visit(value)?;
                self.resolve(expr.id, name, expr.span)?;
            }

            ExprKind::CompoundAssign { target, value, .. } => {
                self.visit(target)?;
                self.visit(value)?;
                if let ExprKind::Var(name) = &target.kind {
                    self.resolve(expr.id, name, expr.span)?;
                }
            }

            ExprKind::Extern { name, .. } => self.bind(expr.id, name, BindingKind::Extern),

            ExprKind::Seq(items) => {
                for item in items {
                    self.visit(item)?;
                }
            }

            ExprKind::Paren(inner) | ExprKind::Unary { expr: inner, .. } | ExprKind::Run(inner) => {
                self.visit(inner)?
            }

            ExprKind::Intrinsic { arg, .. } => self.visit(arg)?,

            ExprKind::Binary { left, right, .. } => {
                self.visit(left)?;
                self.visit(right)?;
            }

            ExprKind::Call { callee, args } => {
                // Arguments first, matching evaluation order.
                for arg in args {
                    self.visit(arg)?;
                }
                self.visit(callee)?;
            }

            ExprKind::Fun { params, body } => {
                self.scopes.enter_scope(Some(expr.id));
                for param in params {
                    self.bind(param.id, &param.name, BindingKind::Param);
                }
                let result = self.visit(body);
                self.scopes.exit_scope();
                result?;
            }

            ExprKind::Quote { annotation, body } => {
                self.scopes.enter_quote(expr.id, *annotation);
                let result = self.visit(body);
                self.scopes.exit_quote();
                result?;
            }

            ExprKind::Escape { body, .. } => {
                if !self.scopes.enter_escape() {
                    return Err(DefUseErrorKind::EscapeOutsideQuote.at(expr.span));
                }
                let result = self.visit(body);
                self.scopes.exit_escape();
                result?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/t_defuse.rs"]
mod tests;
