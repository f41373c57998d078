//! Lambda lifting: hoist every host-stage function literal into a top-level
//! `Proc` that receives its captured variables as extra leading parameters.
//!
//! A function bound by `var f = fun ...` (and never reassigned) is a known
//! function. A direct call is a same-stage call `f(args)` to a known function,
//! or a call whose callee is the literal itself; it receives the current
//! values of the callee's captures as leading arguments. Captures are passed
//! by value at the call, so assigning to a captured variable inside a closure
//! is rejected, as is using a capturing function as a first-class value.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use crate::context::{LambdaLiftedContext, QuoteLiftedContext};
use crate::defuse::{Boundary, DefSite, DefUseOverlay, DefUseTable, Resolution};
use crate::diag::Span;
use crate::elaborate::{TypeTable, TypeTableOverlay};
use crate::quote_lift::ProgTable;
use crate::tree::visit::{Visitor, walk_expr};
use crate::tree::*;

#[derive(Debug, Clone)]
pub struct Proc {
    pub id: ProcId,
    /// The function literal this procedure was lifted from.
    pub fun: NodeId,
    pub params: Vec<Param>,
    /// Captured bindings, ascending by id. Passed before the declared params.
    pub captures: Vec<NodeId>,
    pub body: Expr,
}

#[derive(Debug, Clone, Default)]
pub struct ProcTable {
    procs: IndexMap<ProcId, Proc>,
}

impl ProcTable {
    pub fn get(&self, id: ProcId) -> Option<&Proc> {
        self.procs.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proc> {
        self.procs.values()
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }
}

impl fmt::Display for ProcTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, proc) in self.procs.values().enumerate() {
            if i > 0 {
                writeln!(f, "--------------------------------")?;
            }
            let params = proc
                .params
                .iter()
                .map(|p| format!("{} [{}]", p.name, p.id))
                .collect::<Vec<_>>();
            let captures = proc
                .captures
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>();
            writeln!(f, "Proc p{} fun [{}]", proc.id, proc.fun)?;
            writeln!(f, "  Params: [{}]", params.join(", "))?;
            writeln!(f, "  Captures: [{}]", captures.join(", "))?;
            writeln!(f, "  Body:")?;
            write!(f, "{}", textwrap::indent(&proc.body.to_string(), "    "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LambdaLiftError {
    #[error("Function [{fun}] captures variables and is used as a value; only direct calls are supported")]
    CapturingValue { fun: NodeId },

    #[error("Assignment to captured variable '{name}' inside a function is not supported")]
    CapturedAssign { name: String },

    #[error("Node {0} has no type")]
    MissingType(NodeId),
}

pub fn lift_lambdas(ctx: QuoteLiftedContext) -> Result<LambdaLiftedContext, LambdaLiftError> {
    let mut id_gen = ctx.id_gen.clone();
    let lifted = lift_all(&ctx, &mut id_gen)?;
    Ok(ctx.with_procs(
        lifted.main,
        lifted.progs,
        lifted.procs,
        lifted.type_table,
        lifted.def_use,
    ))
}

struct Lifted {
    main: Expr,
    progs: ProgTable,
    procs: ProcTable,
    type_table: TypeTable,
    def_use: DefUseTable,
}

fn lift_all(ctx: &QuoteLiftedContext, id_gen: &mut NodeIdGen) -> Result<Lifted, LambdaLiftError> {
    let mut collector = FunCollector {
        def_use: &ctx.def_use,
        type_table: &ctx.type_table,
        enclosing: Vec::new(),
        known: BTreeMap::new(),
        assigned: BTreeSet::new(),
        calls: Vec::new(),
        literal_calls: Vec::new(),
    };
    collector.visit_expr(&ctx.main);
    for prog in ctx.progs.iter() {
        collector.visit_expr(&prog.body);
    }
    let (known, sites) = collector.finish();
    let direct_funs = known
        .values()
        .copied()
        .chain(sites.values().map(|site| site.callee_fun))
        .collect();

    let mut lifter = LambdaLifter {
        analysis: CaptureAnalysis {
            def_use: &ctx.def_use,
            sites,
            captures: BTreeMap::new(),
            site_uses: BTreeMap::new(),
            active: BTreeSet::new(),
        },
        direct_funs,
        known,
        types: TypeTableOverlay::new(&ctx.type_table),
        def_use: DefUseOverlay::new(&ctx.def_use),
        id_gen,
        procs: ProcTable::default(),
        next_id: 0,
    };

    let main = lifter.lift_expr(ctx.main.clone())?;
    let mut progs = ctx.progs.clone();
    for prog in progs.iter_mut() {
        let body = prog.body.clone();
        prog.body = lifter.lift_expr(body)?;
    }

    let mut procs = lifter.procs;
    procs.procs.sort_keys();
    let (type_table, _) = lifter.types.finish();

    Ok(Lifted {
        main,
        progs,
        procs,
        type_table,
        def_use: lifter.def_use.finish(),
    })
}

/// A direct call to a known function.
#[derive(Debug, Clone)]
struct CallSite {
    callee_fun: NodeId,
    /// Function literals lexically enclosing the call, outermost first.
    enclosing: Vec<NodeId>,
}

type CaptureMap = BTreeMap<NodeId, Vec<Boundary>>;

struct FunCollector<'a> {
    def_use: &'a DefUseTable,
    type_table: &'a TypeTable,
    enclosing: Vec<NodeId>,
    /// Let binding -> function literal bound by it.
    known: BTreeMap<NodeId, NodeId>,
    assigned: BTreeSet<NodeId>,
    /// (callee use, callee binding, enclosing functions)
    calls: Vec<(NodeId, NodeId, Vec<NodeId>)>,
    /// (callee literal, enclosing functions)
    literal_calls: Vec<(NodeId, Vec<NodeId>)>,
}

impl FunCollector<'_> {
    fn is_host(&self, id: NodeId) -> bool {
        self.type_table
            .stage_of(id)
            .is_some_and(|stage| !stage.is_shader())
    }

    fn finish(self) -> (BTreeMap<NodeId, NodeId>, BTreeMap<NodeId, CallSite>) {
        let mut known = self.known;
        known.retain(|binding, _| !self.assigned.contains(binding));

        let mut sites = self
            .calls
            .into_iter()
            .filter_map(|(callee_use, binding, enclosing)| {
                known.get(&binding).map(|fun| {
                    (
                        callee_use,
                        CallSite {
                            callee_fun: *fun,
                            enclosing,
                        },
                    )
                })
            })
            .collect::<BTreeMap<_, _>>();
        for (fun, enclosing) in self.literal_calls {
            sites.insert(
                fun,
                CallSite {
                    callee_fun: fun,
                    enclosing,
                },
            );
        }
        (known, sites)
    }
}

impl Visitor for FunCollector<'_> {
    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Let { value, .. } if matches!(value.kind, ExprKind::Fun { .. }) => {
                self.known.insert(expr.id, value.id);
            }
            ExprKind::Assign { .. } => {
                if let Some(binding) = self.def_use.resolution(expr.id).and_then(|r| r.binding()) {
                    self.assigned.insert(binding);
                }
            }
            ExprKind::Call { callee, .. } if self.is_host(expr.id) => match &callee.kind {
                ExprKind::Fun { .. } => {
                    self.literal_calls.push((callee.id, self.enclosing.clone()));
                }
                ExprKind::Var(_) => {
                    if let Some(res) = self.def_use.resolution(callee.id)
                        && let Some(binding) = res.binding()
                        && res.innermost_quote().is_none()
                    {
                        self.calls.push((callee.id, binding, self.enclosing.clone()));
                    }
                }
                _ => {}
            },
            _ => {}
        }

        if let ExprKind::Fun { .. } = expr.kind {
            self.enclosing.push(expr.id);
            walk_expr(self, expr);
            self.enclosing.pop();
        } else {
            walk_expr(self, expr);
        }
    }
}

struct CaptureAnalysis<'a> {
    def_use: &'a DefUseTable,
    sites: BTreeMap<NodeId, CallSite>,
    captures: BTreeMap<NodeId, CaptureMap>,
    site_uses: BTreeMap<NodeId, Vec<(NodeId, Vec<Boundary>)>>,
    active: BTreeSet<NodeId>,
}

impl CaptureAnalysis<'_> {
    /// Bindings captured by `fun`, each with the boundaries between the
    /// function literal and the binding, innermost first.
    fn captures_of(&mut self, fun: NodeId) -> CaptureMap {
        if let Some(map) = self.captures.get(&fun) {
            return map.clone();
        }
        if !self.active.insert(fun) {
            return CaptureMap::new();
        }

        let closure = Boundary::Closure(fun);
        let mut map = CaptureMap::new();

        for (_, res) in self.def_use.uses() {
            let Some(binding) = res.binding() else {
                continue;
            };
            if self.def_use.binding(binding).is_some_and(|b| b.is_extern()) {
                continue;
            }
            if let Some(pos) = res.crossings.iter().position(|b| *b == closure) {
                map.entry(binding)
                    .or_insert_with(|| res.crossings[pos + 1..].to_vec());
            }
        }

        let inner_sites = self
            .sites
            .iter()
            .filter(|(_, site)| site.enclosing.contains(&fun))
            .map(|(callee_use, _)| *callee_use)
            .collect::<Vec<_>>();
        for callee_use in inner_sites {
            for (binding, crossings) in self.uses_at(callee_use) {
                if let Some(pos) = crossings.iter().position(|b| *b == closure) {
                    map.entry(binding)
                        .or_insert_with(|| crossings[pos + 1..].to_vec());
                }
            }
        }

        self.active.remove(&fun);
        self.captures.insert(fun, map.clone());
        map
    }

    /// The extra arguments of a direct call: each captured binding of the
    /// callee with the boundaries crossed from the call site to it.
    fn uses_at(&mut self, callee_use: NodeId) -> Vec<(NodeId, Vec<Boundary>)> {
        if let Some(uses) = self.site_uses.get(&callee_use) {
            return uses.clone();
        }
        let Some(site) = self.sites.get(&callee_use).cloned() else {
            return Vec::new();
        };
        let prefix = self
            .def_use
            .resolution(callee_use)
            .map(|res| res.crossings.clone())
            .unwrap_or_default();

        let uses = self
            .captures_of(site.callee_fun)
            .into_iter()
            .map(|(binding, suffix)| {
                let crossings = prefix.iter().chain(&suffix).copied().collect();
                (binding, crossings)
            })
            .collect::<Vec<_>>();
        self.site_uses.insert(callee_use, uses.clone());
        uses
    }
}

struct LambdaLifter<'a> {
    analysis: CaptureAnalysis<'a>,
    known: BTreeMap<NodeId, NodeId>,
    /// Function literals every call of which is direct.
    direct_funs: BTreeSet<NodeId>,
    types: TypeTableOverlay,
    def_use: DefUseOverlay,
    id_gen: &'a mut NodeIdGen,
    procs: ProcTable,
    next_id: u32,
}

impl LambdaLifter<'_> {
    fn alloc_id(&mut self) -> ProcId {
        let id = ProcId(self.next_id);
        self.next_id += 1;
        id
    }

    fn is_host(&self, id: NodeId) -> bool {
        self.types.stage_of(id).is_some_and(|stage| !stage.is_shader())
    }

    fn lift_boxed(&mut self, expr: Box<Expr>) -> Result<Box<Expr>, LambdaLiftError> {
        Ok(Box::new(self.lift_expr(*expr)?))
    }

    fn lift_expr(&mut self, expr: Expr) -> Result<Expr, LambdaLiftError> {
        let Expr { id, kind, span } = expr;

        let kind = match kind {
            ExprKind::Fun { params, body } if self.is_host(id) => {
                let captures = self.analysis.captures_of(id);
                if !captures.is_empty() && !self.direct_funs.contains(&id) {
                    return Err(LambdaLiftError::CapturingValue { fun: id });
                }

                let proc_id = self.alloc_id();
                let body = self.lift_expr(*body)?;
                self.procs.procs.insert(
                    proc_id,
                    Proc {
                        id: proc_id,
                        fun: id,
                        params,
                        captures: captures.into_keys().collect(),
                        body,
                    },
                );
                ExprKind::ProcRef(proc_id)
            }

            ExprKind::Call { callee, args } => {
                let args = args
                    .into_iter()
                    .map(|arg| self.lift_expr(arg))
                    .collect::<Result<Vec<_>, _>>()?;

                if self.analysis.sites.contains_key(&callee.id) {
                    let mut leading = Vec::new();
                    for (binding, crossings) in self.analysis.uses_at(callee.id) {
                        leading.push(self.synthesize_use(id, binding, crossings, span)?);
                    }
                    leading.extend(args);
                    // A named callee is not a value use; a literal is lifted.
                    let callee = match callee.kind {
                        ExprKind::Fun { .. } => self.lift_boxed(callee)?,
                        _ => callee,
                    };
                    ExprKind::Call {
                        callee,
                        args: leading,
                    }
                } else {
                    ExprKind::Call {
                        callee: self.lift_boxed(callee)?,
                        args,
                    }
                }
            }

            ExprKind::Var(name) => {
                self.check_value_use(id)?;
                ExprKind::Var(name)
            }

            ExprKind::Assign { name, value } => {
                if let Some(res) = self.def_use.resolution(id)
                    && res
                        .crossings
                        .iter()
                        .any(|b| matches!(b, Boundary::Closure(_)))
                {
                    return Err(LambdaLiftError::CapturedAssign { name });
                }
                ExprKind::Assign {
                    name,
                    value: self.lift_boxed(value)?,
                }
            }

            ExprKind::Let { name, value } => ExprKind::Let {
                name,
                value: self.lift_boxed(value)?,
            },
            ExprKind::CompoundAssign { op, target, value } => ExprKind::CompoundAssign {
                op,
                target,
                value: self.lift_boxed(value)?,
            },
            ExprKind::Seq(items) => ExprKind::Seq(
                items
                    .into_iter()
                    .map(|item| self.lift_expr(item))
                    .collect::<Result<_, _>>()?,
            ),
            ExprKind::Paren(inner) => ExprKind::Paren(self.lift_boxed(inner)?),
            ExprKind::Unary { op, expr } => ExprKind::Unary {
                op,
                expr: self.lift_boxed(expr)?,
            },
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op,
                left: self.lift_boxed(left)?,
                right: self.lift_boxed(right)?,
            },
            ExprKind::Fun { params, body } => ExprKind::Fun {
                params,
                body: self.lift_boxed(body)?,
            },
            ExprKind::Quote { annotation, body } => ExprKind::Quote {
                annotation,
                body: self.lift_boxed(body)?,
            },
            ExprKind::Escape { kind, body } => ExprKind::Escape {
                kind,
                body: self.lift_boxed(body)?,
            },
            ExprKind::Run(inner) => ExprKind::Run(self.lift_boxed(inner)?),
            ExprKind::Intrinsic { kind, arg } => ExprKind::Intrinsic {
                kind,
                arg: self.lift_boxed(arg)?,
            },

            kind @ (ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::StringLit(_)
            | ExprKind::Extern { .. }
            | ExprKind::ProgRef(_)
            | ExprKind::ProcRef(_)) => kind,
        };

        Ok(Expr::new(id, kind, span))
    }

    /// A capturing function may only be referenced as the callee of a
    /// direct call.
    fn check_value_use(&mut self, use_id: NodeId) -> Result<(), LambdaLiftError> {
        let Some(binding) = self.def_use.resolution(use_id).and_then(|r| r.binding()) else {
            return Ok(());
        };
        let Some(fun) = self.known.get(&binding).copied() else {
            return Ok(());
        };
        if !self.analysis.captures_of(fun).is_empty() {
            return Err(LambdaLiftError::CapturingValue { fun });
        }
        Ok(())
    }

    fn synthesize_use(
        &mut self,
        call: NodeId,
        binding: NodeId,
        crossings: Vec<Boundary>,
        span: Span,
    ) -> Result<Expr, LambdaLiftError> {
        let name = self
            .def_use
            .binding(binding)
            .map(|b| b.name.clone())
            .ok_or(LambdaLiftError::MissingType(binding))?;
        let ty = self
            .types
            .type_of(binding)
            .cloned()
            .ok_or(LambdaLiftError::MissingType(binding))?;
        let stage = self
            .types
            .stage_of(call)
            .ok_or(LambdaLiftError::MissingType(call))?;

        let id = self.id_gen.new_id();
        self.types.insert_synthetic(id, ty, stage);
        self.def_use.insert_synthetic_use(
            id,
            Resolution {
                def: DefSite::Binding(binding),
                crossings,
            },
        );
        Ok(Expr::new(id, ExprKind::Var(name), span))
    }
}

#[cfg(test)]
#[path = "../tests/t_lambda_lift.rs"]
mod tests;
