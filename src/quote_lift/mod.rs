//! Quote lifting: extract every quote into a standalone `Prog`.
//!
//! Each quote is replaced in its enclosing body by a `ProgRef` carrying the
//! quote's node id. Escaped code stays where it is syntactically, but it runs
//! in the enclosing stage, so quotes found inside an escape become children
//! of the enclosing program.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use crate::context::{AnalyzedContext, QuoteLiftedContext};
use crate::defuse::{Boundary, DefUseTable};
use crate::tree::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgEscape {
    pub id: NodeId,
    pub kind: EscapeKind,
    /// Root of the escaped expression, evaluated in the enclosing stage.
    pub body: NodeId,
}

#[derive(Debug, Clone)]
pub struct Prog {
    pub id: ProgId,
    pub annotation: StageAnnotation,
    /// The quote node this program was lifted from.
    pub quote: NodeId,
    pub parent: Option<ProgId>,
    pub children: Vec<ProgId>,
    pub body: Expr,
    /// Escapes belonging to this program, ascending by id.
    pub escapes: Vec<ProgEscape>,
    /// Bindings referenced from inside across this program's quote,
    /// ascending by id.
    pub free: Vec<NodeId>,
}

impl Prog {
    pub fn is_shader(&self) -> bool {
        self.annotation.is_shader()
    }

    pub fn persists(&self) -> impl Iterator<Item = &ProgEscape> {
        self.escapes
            .iter()
            .filter(|escape| escape.kind == EscapeKind::Persist)
    }
}

/// All programs of a compilation, in ascending id order.
#[derive(Debug, Clone, Default)]
pub struct ProgTable {
    progs: IndexMap<ProgId, Prog>,
}

impl ProgTable {
    pub fn get(&self, id: ProgId) -> Option<&Prog> {
        self.progs.get(&id)
    }

    pub fn get_mut(&mut self, id: ProgId) -> Option<&mut Prog> {
        self.progs.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prog> {
        self.progs.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Prog> {
        self.progs.values_mut()
    }

    pub fn len(&self) -> usize {
        self.progs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.progs.is_empty()
    }

    /// The single fragment child of a vertex program.
    pub fn fragment_of(&self, vertex: &Prog) -> Option<&Prog> {
        vertex
            .children
            .iter()
            .filter_map(|id| self.get(*id))
            .find(|child| child.annotation == StageAnnotation::Fragment)
    }
}

impl fmt::Display for ProgTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, prog) in self.progs.values().enumerate() {
            if i > 0 {
                writeln!(f, "--------------------------------")?;
            }
            let parent = match prog.parent {
                Some(parent) => format!("q{}", parent),
                None => "-".to_string(),
            };
            writeln!(
                f,
                "Prog q{} ({}) quote [{}] parent {}",
                prog.id, prog.annotation, prog.quote, parent
            )?;
            let children = prog
                .children
                .iter()
                .map(|c| format!("q{}", c))
                .collect::<Vec<_>>();
            writeln!(f, "  Children: [{}]", children.join(", "))?;
            let escapes = prog
                .escapes
                .iter()
                .map(|e| format!("{} ({})", e.id, e.kind))
                .collect::<Vec<_>>();
            writeln!(f, "  Escapes: [{}]", escapes.join(", "))?;
            let free = prog.free.iter().map(|b| b.to_string()).collect::<Vec<_>>();
            writeln!(f, "  Free: [{}]", free.join(", "))?;
            writeln!(f, "  Body:")?;
            write!(f, "{}", textwrap::indent(&prog.body.to_string(), "    "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LiftError {
    #[error("Vertex program q{prog} must contain exactly one fragment program, found {count}")]
    FragmentPairing { prog: ProgId, count: usize },
}

pub fn lift_quotes(ctx: AnalyzedContext) -> Result<QuoteLiftedContext, LiftError> {
    let (main, progs) = lift_tree(ctx.expr.clone(), &ctx.def_use)?;
    Ok(ctx.with_progs(main, progs))
}

pub fn lift_tree(expr: Expr, def_use: &DefUseTable) -> Result<(Expr, ProgTable), LiftError> {
    let mut lifter = QuoteLifter {
        next_id: 0,
        path: Vec::new(),
        pending: BTreeMap::new(),
    };
    let main = lifter.lift_expr(expr);
    let progs = lifter.finish(def_use)?;
    Ok((main, progs))
}

struct PendingProg {
    annotation: StageAnnotation,
    quote: NodeId,
    parent: Option<ProgId>,
    children: Vec<ProgId>,
    escapes: Vec<ProgEscape>,
    body: Option<Expr>,
}

struct QuoteLifter {
    next_id: u32,
    /// Programs enclosing the code being lifted, outermost first.
    path: Vec<ProgId>,
    pending: BTreeMap<ProgId, PendingProg>,
}

impl QuoteLifter {
    fn alloc_id(&mut self) -> ProgId {
        let id = ProgId(self.next_id);
        self.next_id += 1;
        id
    }

    fn lift_boxed(&mut self, expr: Box<Expr>) -> Box<Expr> {
        Box::new(self.lift_expr(*expr))
    }

    fn lift_expr(&mut self, expr: Expr) -> Expr {
        let Expr { id, kind, span } = expr;

        let kind = match kind {
            ExprKind::Quote { annotation, body } => {
                let prog = self.alloc_id();
                let parent = self.path.last().copied();
                if let Some(parent) = parent
                    && let Some(pending) = self.pending.get_mut(&parent)
                {
                    pending.children.push(prog);
                }
                self.pending.insert(
                    prog,
                    PendingProg {
                        annotation,
                        quote: id,
                        parent,
                        children: Vec::new(),
                        escapes: Vec::new(),
                        body: None,
                    },
                );

                self.path.push(prog);
                let body = self.lift_expr(*body);
                self.path.pop();

                if let Some(pending) = self.pending.get_mut(&prog) {
                    pending.body = Some(body);
                }
                ExprKind::ProgRef(prog)
            }

            ExprKind::Escape { kind, body } => {
                // The escaped code belongs to the enclosing program.
                let owner = self.path.pop();
                if let Some(owner) = owner
                    && let Some(pending) = self.pending.get_mut(&owner)
                {
                    pending.escapes.push(ProgEscape {
                        id,
                        kind,
                        body: body.id,
                    });
                }
                let body = self.lift_boxed(body);
                if let Some(owner) = owner {
                    self.path.push(owner);
                }
                ExprKind::Escape { kind, body }
            }

            ExprKind::Let { name, value } => ExprKind::Let {
                name,
                value: self.lift_boxed(value),
            },
            ExprKind::Assign { name, value } => ExprKind::Assign {
                name,
                value: self.lift_boxed(value),
            },
            ExprKind::CompoundAssign { op, target, value } => ExprKind::CompoundAssign {
                op,
                target,
                value: self.lift_boxed(value),
            },
            ExprKind::Seq(items) => {
                ExprKind::Seq(items.into_iter().map(|e| self.lift_expr(e)).collect())
            }
            ExprKind::Paren(inner) => ExprKind::Paren(self.lift_boxed(inner)),
            ExprKind::Unary { op, expr } => ExprKind::Unary {
                op,
                expr: self.lift_boxed(expr),
            },
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op,
                left: self.lift_boxed(left),
                right: self.lift_boxed(right),
            },
            ExprKind::Call { callee, args } => ExprKind::Call {
                callee: self.lift_boxed(callee),
                args: args.into_iter().map(|e| self.lift_expr(e)).collect(),
            },
            ExprKind::Fun { params, body } => ExprKind::Fun {
                params,
                body: self.lift_boxed(body),
            },
            ExprKind::Run(inner) => ExprKind::Run(self.lift_boxed(inner)),
            ExprKind::Intrinsic { kind, arg } => ExprKind::Intrinsic {
                kind,
                arg: self.lift_boxed(arg),
            },

            kind @ (ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::StringLit(_)
            | ExprKind::Var(_)
            | ExprKind::Extern { .. }
            | ExprKind::ProgRef(_)
            | ExprKind::ProcRef(_)) => kind,
        };

        Expr::new(id, kind, span)
    }

    fn finish(self, def_use: &DefUseTable) -> Result<ProgTable, LiftError> {
        let by_quote: BTreeMap<NodeId, ProgId> = self
            .pending
            .iter()
            .map(|(id, pending)| (pending.quote, *id))
            .collect();

        // A binding is free in every program whose quote its reference crosses.
        let mut free: BTreeMap<ProgId, BTreeSet<NodeId>> = BTreeMap::new();
        for (_, res) in def_use.uses() {
            let Some(binding) = res.binding() else {
                continue;
            };
            for boundary in &res.crossings {
                if let Boundary::Quote(quote) = boundary
                    && let Some(prog) = by_quote.get(quote)
                {
                    free.entry(*prog).or_default().insert(binding);
                }
            }
        }

        let mut progs = ProgTable::default();
        for (id, pending) in self.pending {
            let Some(body) = pending.body else {
                continue;
            };
            let mut escapes = pending.escapes;
            escapes.sort_by_key(|escape| escape.id);
            progs.progs.insert(
                id,
                Prog {
                    id,
                    annotation: pending.annotation,
                    quote: pending.quote,
                    parent: pending.parent,
                    children: pending.children,
                    body,
                    escapes,
                    free: free
                        .remove(&id)
                        .map(|set| set.into_iter().collect())
                        .unwrap_or_default(),
                },
            );
        }

        for prog in progs.iter() {
            if prog.annotation != StageAnnotation::Vertex {
                continue;
            }
            let count = prog
                .children
                .iter()
                .filter_map(|child| progs.get(*child))
                .filter(|child| child.annotation == StageAnnotation::Fragment)
                .count();
            if count != 1 {
                return Err(LiftError::FragmentPairing {
                    prog: prog.id,
                    count,
                });
            }
        }

        Ok(progs)
    }
}

#[cfg(test)]
#[path = "../tests/t_quote_lift.rs"]
mod tests;
