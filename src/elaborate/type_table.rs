use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Deref;

use crate::tree::{NodeId, StageAnnotation};
use crate::types::Type;

/// The stage a node executes in: the annotation of the innermost enclosing
/// quote and the quote nesting depth (0 = host).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stage {
    pub annotation: StageAnnotation,
    pub level: u32,
}

impl Stage {
    pub const HOST: Stage = Stage {
        annotation: StageAnnotation::Ordinary,
        level: 0,
    };

    pub fn is_shader(&self) -> bool {
        self.annotation.is_shader()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.annotation, self.level)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEntry {
    pub ty: Type,
    pub stage: Stage,
}

/// Type and stage of every node, keyed by node id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeTable {
    entries: BTreeMap<NodeId, TypeEntry>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, id: NodeId, ty: Type, stage: Stage) {
        self.entries.insert(id, TypeEntry { ty, stage });
    }

    pub fn get(&self, id: NodeId) -> Option<&TypeEntry> {
        self.entries.get(&id)
    }

    pub fn type_of(&self, id: NodeId) -> Option<&Type> {
        self.entries.get(&id).map(|entry| &entry.ty)
    }

    pub fn stage_of(&self, id: NodeId) -> Option<Stage> {
        self.entries.get(&id).map(|entry| entry.stage)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TypeEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }
}

impl fmt::Display for TypeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (node, entry) in &self.entries {
            writeln!(f, "Node [{}] -> Type [{}] Stage [{}]", node, entry.ty, entry.stage)?;
        }
        Ok(())
    }
}

/// A new table derived from an immutable base, for passes that synthesize or
/// retire nodes. Reads go through `Deref<Target = TypeTable>`.
#[derive(Debug, Clone)]
pub struct TypeTableOverlay {
    working: TypeTable,
    retired: BTreeSet<NodeId>,
}

impl TypeTableOverlay {
    pub fn new(base: &TypeTable) -> Self {
        Self {
            working: base.clone(),
            retired: BTreeSet::new(),
        }
    }

    pub fn insert_synthetic(&mut self, id: NodeId, ty: Type, stage: Stage) {
        self.working.insert(id, ty, stage);
    }

    pub fn retire(&mut self, id: NodeId) {
        self.working.entries.remove(&id);
        self.retired.insert(id);
    }

    /// Finish the overlay, returning the new table and the retired ids.
    pub fn finish(self) -> (TypeTable, BTreeSet<NodeId>) {
        (self.working, self.retired)
    }
}

impl Deref for TypeTableOverlay {
    type Target = TypeTable;

    fn deref(&self) -> &TypeTable {
        &self.working
    }
}
