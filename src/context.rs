use std::collections::BTreeSet;

use crate::backend::glue::GlueTable;
use crate::defuse::DefUseTable;
use crate::elaborate::TypeTable;
use crate::lambda_lift::ProcTable;
use crate::quote_lift::ProgTable;
use crate::tree::{Expr, NodeId, NodeIdGen};

// -----------------------------------------------------------------------------
// Parsed Context
// -----------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct ParsedContext {
    pub expr: Expr,
    pub id_gen: NodeIdGen,
}

impl ParsedContext {
    pub fn new(expr: Expr, id_gen: NodeIdGen) -> Self {
        Self { expr, id_gen }
    }

    pub fn with_type_table(self, type_table: TypeTable) -> ElaboratedContext {
        ElaboratedContext {
            expr: self.expr,
            type_table,
            id_gen: self.id_gen,
        }
    }
}

// -----------------------------------------------------------------------------
// Elaborated Context
// -----------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct ElaboratedContext {
    pub expr: Expr,
    pub type_table: TypeTable,
    pub id_gen: NodeIdGen,
}

impl ElaboratedContext {
    pub fn with_desugared(
        self,
        expr: Expr,
        type_table: TypeTable,
        retired: BTreeSet<NodeId>,
        id_gen: NodeIdGen,
    ) -> DesugaredContext {
        DesugaredContext {
            expr,
            type_table,
            retired,
            id_gen,
        }
    }
}

// -----------------------------------------------------------------------------
// Desugared Context
// -----------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct DesugaredContext {
    pub expr: Expr,
    pub type_table: TypeTable,
    /// Ids of sugar nodes removed by the desugarer.
    pub retired: BTreeSet<NodeId>,
    pub id_gen: NodeIdGen,
}

impl DesugaredContext {
    pub fn with_def_use(self, def_use: DefUseTable) -> AnalyzedContext {
        AnalyzedContext {
            expr: self.expr,
            type_table: self.type_table,
            retired: self.retired,
            def_use,
            id_gen: self.id_gen,
        }
    }
}

// -----------------------------------------------------------------------------
// Analyzed Context
// -----------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct AnalyzedContext {
    pub expr: Expr,
    pub type_table: TypeTable,
    pub retired: BTreeSet<NodeId>,
    pub def_use: DefUseTable,
    pub id_gen: NodeIdGen,
}

impl AnalyzedContext {
    pub fn with_progs(self, main: Expr, progs: ProgTable) -> QuoteLiftedContext {
        QuoteLiftedContext {
            main,
            progs,
            type_table: self.type_table,
            retired: self.retired,
            def_use: self.def_use,
            id_gen: self.id_gen,
        }
    }
}

// -----------------------------------------------------------------------------
// Quote Lifted Context
// -----------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct QuoteLiftedContext {
    /// The host body with every top-level quote replaced by a `ProgRef`.
    pub main: Expr,
    pub progs: ProgTable,
    pub type_table: TypeTable,
    pub retired: BTreeSet<NodeId>,
    pub def_use: DefUseTable,
    pub id_gen: NodeIdGen,
}

impl QuoteLiftedContext {
    pub fn with_procs(
        self,
        main: Expr,
        progs: ProgTable,
        procs: ProcTable,
        type_table: TypeTable,
        def_use: DefUseTable,
    ) -> LambdaLiftedContext {
        LambdaLiftedContext {
            main,
            progs,
            procs,
            type_table,
            retired: self.retired,
            def_use,
        }
    }
}

// -----------------------------------------------------------------------------
// Lambda Lifted Context
// -----------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct LambdaLiftedContext {
    pub main: Expr,
    pub progs: ProgTable,
    pub procs: ProcTable,
    pub type_table: TypeTable,
    pub retired: BTreeSet<NodeId>,
    pub def_use: DefUseTable,
}

impl LambdaLiftedContext {
    pub fn with_glue(self, glue: GlueTable) -> CompilerIr {
        CompilerIr {
            main: self.main,
            progs: self.progs,
            procs: self.procs,
            glue,
            type_table: self.type_table,
            retired: self.retired,
            def_use: self.def_use,
        }
    }
}

// -----------------------------------------------------------------------------
// Compiler IR
// -----------------------------------------------------------------------------

/// Everything the code generators consume.
#[derive(Debug, Clone)]
pub struct CompilerIr {
    pub main: Expr,
    pub progs: ProgTable,
    pub procs: ProcTable,
    pub glue: GlueTable,
    pub type_table: TypeTable,
    pub retired: BTreeSet<NodeId>,
    pub def_use: DefUseTable,
}
