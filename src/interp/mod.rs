//! Tree-walking interpreter over the desugared tree.
//!
//! Evaluating a quote produces a code value that closes over the current
//! environment. The escapes owned by the quote are evaluated at that point;
//! running the code later reads their values back.

mod value;

pub use value::{Closure, CodeValue, Env, Value, arith};

use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use crate::context::DesugaredContext;
use crate::diag::{Span, SpannedError};
use crate::elaborate::Builtin;
use crate::tree::visit::{Visitor, walk_expr};
use crate::tree::*;

#[derive(Debug, Clone, Error)]
pub enum RuntimeErrorKind {
    #[error("`{0}` is not available in the interpreter")]
    Unsupported(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Extern `{0}` has no value in the interpreter")]
    ExternValue(String),

    #[error("Unbound variable: {0}")]
    Unbound(String),

    #[error("Cannot apply `{op}` to {left} and {right}")]
    InvalidOperands {
        op: BinaryOp,
        left: String,
        right: String,
    },

    #[error("Value of type {0} is not callable")]
    NotCallable(String),

    #[error("Expected {expected} arguments, found {found}")]
    ArgCountMismatch { expected: usize, found: usize },

    #[error("Expected code, found {0}")]
    NotCode(String),

    #[error("Escape {0} has no value")]
    MissingEscape(NodeId),

    #[error("Unexpected {0} node")]
    UnexpectedNode(&'static str),
}

pub type RuntimeError = SpannedError<RuntimeErrorKind>;

impl RuntimeErrorKind {
    pub fn at(self, span: Span) -> RuntimeError {
        RuntimeError::new(self, span)
    }
}

pub fn interpret(ctx: &DesugaredContext) -> Result<Value, RuntimeError> {
    Interpreter.eval(&ctx.expr, &Env::new(), &HashMap::new())
}

/// Escape values of the code currently running, keyed by escape node id.
type Escapes = HashMap<NodeId, Value>;

struct Interpreter;

impl Interpreter {
    fn eval(&self, expr: &Expr, env: &Env, escapes: &Escapes) -> Result<Value, RuntimeError> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::IntLit(value) => Ok(Value::Int(*value)),
            ExprKind::FloatLit(value) => Ok(Value::Float(*value)),
            ExprKind::StringLit(value) => Ok(Value::String(value.clone())),

            ExprKind::Var(name) => self.lookup(name, env, span),

            ExprKind::Let { name, value } => {
                let value = self.eval(value, env, escapes)?;
                env.define(name, value.clone());
                Ok(value)
            }

            ExprKind::Assign { name, value } => {
                let value = self.eval(value, env, escapes)?;
                if env.assign(name, value.clone()) {
                    Ok(value)
                } else if Builtin::from_name(name).is_some() {
                    Err(RuntimeErrorKind::Unsupported(name.clone()).at(span))
                } else {
                    Err(RuntimeErrorKind::Unbound(name.clone()).at(span))
                }
            }

            ExprKind::Seq(items) => {
                // Each binding opens a frame covering the rest of the
                // sequence. Earlier closures keep seeing the shadowed binding.
                let mut scope = env.clone();
                let mut last = Value::Void;
                for item in items {
                    last = match &item.kind {
                        ExprKind::Let { name, value } => {
                            let value = self.eval(value, &scope, escapes)?;
                            scope = scope.child();
                            scope.define(name, value.clone());
                            value
                        }
                        ExprKind::Extern { .. } => {
                            scope = scope.child();
                            self.eval(item, &scope, escapes)?
                        }
                        _ => self.eval(item, &scope, escapes)?,
                    };
                }
                Ok(last)
            }

            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left, env, escapes)?;
                let right = self.eval(right, env, escapes)?;
                self.check_operand(&left, span)?;
                self.check_operand(&right, span)?;
                arith(*op, &left, &right).map_err(|kind| kind.at(span))
            }

            ExprKind::Call { callee, args } => {
                let callee = self.eval(callee, env, escapes)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, env, escapes))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(&callee, args, span)
            }

            ExprKind::Fun { params, body } => Ok(Value::Fun(Rc::new(Closure {
                params: params.clone(),
                body: (**body).clone(),
                env: env.clone(),
                escapes: escapes.clone(),
            }))),

            ExprKind::Extern { name, .. } => {
                let value = Value::Extern(name.clone());
                env.define(name, value.clone());
                Ok(value)
            }

            ExprKind::Quote { annotation, body } => {
                let mut owned = OwnedEscapes::default();
                owned.visit_expr(body);

                let mut values = HashMap::new();
                for (id, kind, escape_body) in owned.found {
                    let value = self.eval(&escape_body, env, escapes)?;
                    if kind == EscapeKind::Splice && !matches!(value, Value::Code(_)) {
                        return Err(RuntimeErrorKind::NotCode(value.kind_name()).at(escape_body.span));
                    }
                    values.insert(id, value);
                }

                Ok(Value::Code(Rc::new(CodeValue {
                    annotation: *annotation,
                    body: (**body).clone(),
                    env: env.clone(),
                    escapes: values,
                })))
            }

            ExprKind::Escape { kind, .. } => {
                let value = escapes
                    .get(&expr.id)
                    .ok_or_else(|| RuntimeErrorKind::MissingEscape(expr.id).at(span))?;
                match kind {
                    EscapeKind::Persist => Ok(value.clone()),
                    EscapeKind::Splice => self.run(value, span),
                }
            }

            ExprKind::Run(inner) => {
                let code = self.eval(inner, env, escapes)?;
                self.run(&code, span)
            }

            ExprKind::Intrinsic { kind, arg } => match kind {
                IntrinsicKind::Render => self.eval(arg, env, escapes),
                IntrinsicKind::Vtx | IntrinsicKind::Frag => {
                    Err(RuntimeErrorKind::Unsupported(kind.to_string()).at(span))
                }
            },

            ExprKind::Paren(_)
            | ExprKind::Unary { .. }
            | ExprKind::CompoundAssign { .. }
            | ExprKind::ProgRef(_)
            | ExprKind::ProcRef(_) => Err(RuntimeErrorKind::UnexpectedNode(expr.tag()).at(span)),
        }
    }

    fn lookup(&self, name: &str, env: &Env, span: Span) -> Result<Value, RuntimeError> {
        if let Some(value) = env.lookup(name) {
            return Ok(value);
        }
        match Builtin::from_name(name) {
            Some(builtin) if builtin.is_function() => Ok(Value::Builtin(builtin)),
            Some(_) => Err(RuntimeErrorKind::Unsupported(name.to_string()).at(span)),
            None => Err(RuntimeErrorKind::Unbound(name.to_string()).at(span)),
        }
    }

    fn check_operand(&self, value: &Value, span: Span) -> Result<(), RuntimeError> {
        match value {
            Value::Extern(name) => Err(RuntimeErrorKind::ExternValue(name.clone()).at(span)),
            _ => Ok(()),
        }
    }

    fn run(&self, code: &Value, span: Span) -> Result<Value, RuntimeError> {
        match code {
            Value::Code(code) if code.annotation == StageAnnotation::Ordinary => {
                self.eval(&code.body, &code.env.child(), &code.escapes)
            }
            Value::Code(code) => Err(RuntimeErrorKind::Unsupported(format!(
                "running {} code",
                code.annotation
            ))
            .at(span)),
            other => Err(RuntimeErrorKind::NotCode(other.kind_name()).at(span)),
        }
    }

    fn call(&self, callee: &Value, args: Vec<Value>, span: Span) -> Result<Value, RuntimeError> {
        match callee {
            Value::Fun(closure) => {
                if closure.params.len() != args.len() {
                    return Err(RuntimeErrorKind::ArgCountMismatch {
                        expected: closure.params.len(),
                        found: args.len(),
                    }
                    .at(span));
                }
                let env = closure.env.child();
                for (param, arg) in closure.params.iter().zip(args) {
                    env.define(&param.name, arg);
                }
                self.eval(&closure.body, &env, &closure.escapes)
            }
            Value::Builtin(builtin) => {
                for arg in &args {
                    self.check_operand(arg, span)?;
                }
                call_builtin(*builtin, &args).map_err(|kind| kind.at(span))
            }
            Value::Extern(name) => Err(RuntimeErrorKind::ExternValue(name.clone()).at(span)),
            other => Err(RuntimeErrorKind::NotCallable(other.kind_name()).at(span)),
        }
    }
}

fn call_builtin(builtin: Builtin, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    let floats = || args.iter().map(Value::as_float).collect::<Option<Vec<_>>>();
    let invalid = || RuntimeErrorKind::NotCallable(format!("{} with these arguments", builtin));

    match (builtin, args) {
        (Builtin::Vec3, [_, _, _]) | (Builtin::Vec4, [_, _, _, _]) => {
            floats().map(Value::Vector).ok_or_else(invalid)
        }
        (Builtin::Vec4, [Value::Vector(xyz), w]) if xyz.len() == 3 => {
            let w = w.as_float().ok_or_else(invalid)?;
            let mut items = xyz.clone();
            items.push(w);
            Ok(Value::Vector(items))
        }
        (Builtin::Normalize, [Value::Vector(items)]) => {
            let len = items.iter().map(|v| v * v).sum::<f64>().sqrt();
            Ok(Value::Vector(items.iter().map(|v| v / len).collect()))
        }
        (Builtin::Dot, [Value::Vector(a), Value::Vector(b)]) if a.len() == b.len() => {
            Ok(Value::Float(a.iter().zip(b).map(|(a, b)| a * b).sum()))
        }
        _ => Err(invalid()),
    }
}

/// Collects the escapes a quote owns: those that leave exactly this quote.
/// Escapes inside nested quotes belong to the nested quote unless they
/// escape past it.
#[derive(Default)]
struct OwnedEscapes {
    depth: usize,
    found: Vec<(NodeId, EscapeKind, Expr)>,
}

impl Visitor for OwnedEscapes {
    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Quote { body, .. } => {
                self.depth += 1;
                self.visit_expr(body);
                self.depth -= 1;
            }
            ExprKind::Escape { kind, body } => {
                if self.depth == 0 {
                    self.found.push((expr.id, *kind, (**body).clone()));
                } else {
                    self.depth -= 1;
                    self.visit_expr(body);
                    self.depth += 1;
                }
            }
            _ => walk_expr(self, expr),
        }
    }
}

#[cfg(test)]
#[path = "../tests/t_interp.rs"]
mod tests;
