//! Lexical scopes split into stage frames.
//!
//! Every quote opens a new frame; functions open a scope within the current
//! frame. An escape hides the innermost frame while its body is processed, so
//! names bound inside the quote are not visible to the escaped code.

use std::collections::HashMap;

use enum_display::EnumDisplay;

use crate::tree::{NodeId, StageAnnotation};

/// A boundary between a reference and its binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumDisplay)]
pub enum Boundary {
    /// The quote node whose stage separates the two.
    #[display("quote {0}")]
    Quote(NodeId),
    /// The function literal that closes over the binding.
    #[display("closure {0}")]
    Closure(NodeId),
}

#[derive(Debug, Clone)]
struct Scope<T> {
    closure: Option<NodeId>,
    defs: HashMap<String, T>,
}

#[derive(Debug, Clone)]
struct Frame<T> {
    quote: Option<NodeId>,
    annotation: StageAnnotation,
    scopes: Vec<Scope<T>>,
}

impl<T> Frame<T> {
    fn new(quote: Option<NodeId>, annotation: StageAnnotation) -> Self {
        Self {
            quote,
            annotation,
            scopes: vec![Scope {
                closure: None,
                defs: HashMap::new(),
            }],
        }
    }
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct Found<'a, T> {
    pub value: &'a T,
    /// Boundaries crossed, innermost first.
    pub crossings: Vec<Boundary>,
    /// Frame index of the binding (0 = host).
    pub level: usize,
    pub annotation: StageAnnotation,
}

#[derive(Debug, Clone)]
pub struct ScopeStack<T> {
    frames: Vec<Frame<T>>,
    hidden: Vec<Frame<T>>,
}

impl<T> Default for ScopeStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ScopeStack<T> {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new(None, StageAnnotation::Ordinary)],
            hidden: Vec::new(),
        }
    }

    /// Current stage level (0 = host).
    pub fn level(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn annotation(&self) -> StageAnnotation {
        self.frames
            .last()
            .map(|frame| frame.annotation)
            .unwrap_or(StageAnnotation::Ordinary)
    }

    /// The quote whose body is currently being processed, if any.
    pub fn current_quote(&self) -> Option<NodeId> {
        self.frames.last().and_then(|frame| frame.quote)
    }

    pub fn enter_quote(&mut self, quote: NodeId, annotation: StageAnnotation) {
        self.frames.push(Frame::new(Some(quote), annotation));
    }

    pub fn exit_quote(&mut self) {
        self.frames.pop();
    }

    pub fn enter_scope(&mut self, closure: Option<NodeId>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.scopes.push(Scope {
                closure,
                defs: HashMap::new(),
            });
        }
    }

    pub fn exit_scope(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.scopes.pop();
        }
    }

    /// Hide the innermost frame. Returns `false` when already at the host
    /// stage (an escape outside any quote).
    pub fn enter_escape(&mut self) -> bool {
        if self.frames.len() < 2 {
            return false;
        }
        if let Some(frame) = self.frames.pop() {
            self.hidden.push(frame);
        }
        // Escaped code gets its own scope in the outer stage.
        self.enter_scope(None);
        true
    }

    pub fn exit_escape(&mut self) {
        self.exit_scope();
        if let Some(frame) = self.hidden.pop() {
            self.frames.push(frame);
        }
    }

    pub fn bind(&mut self, name: &str, value: T) {
        if let Some(scope) = self.frames.last_mut().and_then(|f| f.scopes.last_mut()) {
            scope.defs.insert(name.to_string(), value);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Found<'_, T>> {
        let mut crossings = Vec::new();
        for (level, frame) in self.frames.iter().enumerate().rev() {
            for scope in frame.scopes.iter().rev() {
                if let Some(value) = scope.defs.get(name) {
                    return Some(Found {
                        value,
                        crossings,
                        level,
                        annotation: frame.annotation,
                    });
                }
                if let Some(fun) = scope.closure {
                    crossings.push(Boundary::Closure(fun));
                }
            }
            if let Some(quote) = frame.quote {
                crossings.push(Boundary::Quote(quote));
            }
        }
        None
    }
}

#[cfg(test)]
#[path = "tests/t_scope.rs"]
mod tests;
