use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::elaborate::Builtin;
use crate::tree::{BinaryOp, Expr, NodeId, Param, StageAnnotation};

use super::RuntimeErrorKind;

#[derive(Debug, Clone)]
pub enum Value {
    Void,
    Int(i64),
    Float(f64),
    String(String),
    Vector(Vec<f64>),
    /// Column-major `dim x dim` matrix.
    Matrix { dim: u8, elems: Vec<f64> },
    Fun(Rc<Closure>),
    Builtin(Builtin),
    Code(Rc<CodeValue>),
    Extern(String),
}

#[derive(Debug)]
pub struct Closure {
    pub params: Vec<Param>,
    pub body: Expr,
    pub env: Env,
    /// Escape values visible where the function literal was evaluated.
    pub escapes: HashMap<NodeId, Value>,
}

/// A quoted program: its body, the environment it was quoted in and the
/// values of the escapes it owns, keyed by escape node id.
#[derive(Debug)]
pub struct CodeValue {
    pub annotation: StageAnnotation,
    pub body: Expr,
    pub env: Env,
    pub escapes: HashMap<NodeId, Value>,
}

impl Value {
    /// Short name of the value's shape, used in error messages.
    pub fn kind_name(&self) -> String {
        match self {
            Value::Void => "Void".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Float(_) => "Float".to_string(),
            Value::String(_) => "String".to_string(),
            Value::Vector(items) => format!("Float{}", items.len()),
            Value::Matrix { dim, .. } => format!("Float{dim}x{dim}"),
            Value::Fun(_) | Value::Builtin(_) => "function".to_string(),
            Value::Code(code) => format!("{}code>", code.annotation.opener()),
            Value::Extern(name) => format!("extern `{}`", name),
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Int(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", value),
            Value::String(value) => write!(f, "{}", value),
            Value::Vector(items) => write_list(f, items),
            Value::Matrix { elems, .. } => write_list(f, elems),
            Value::Fun(_) => write!(f, "<fun>"),
            Value::Builtin(builtin) => write!(f, "<builtin {}>", builtin),
            Value::Code(code) => write!(f, "{}code>", code.annotation.opener()),
            Value::Extern(name) => write!(f, "<extern {}>", name),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[f64]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "]")
}

// -- Environments ---

#[derive(Default)]
struct Frame {
    vars: HashMap<String, Value>,
    parent: Option<Env>,
}

/// A shared, mutable chain of variable frames.
#[derive(Clone, Default)]
pub struct Env(Rc<RefCell<Frame>>);

// A function assigned into a frame it closes over makes an `Rc` cycle, and
// that frame is leaked. A `var` binding captures the frame before its own,
// so only assignment creates such cycles.
impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Env")
    }
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Env {
        Env(Rc::new(RefCell::new(Frame {
            vars: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    pub fn define(&self, name: &str, value: Value) {
        self.0.borrow_mut().vars.insert(name.to_string(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let frame = self.0.borrow();
        match frame.vars.get(name) {
            Some(value) => Some(value.clone()),
            None => frame.parent.as_ref()?.lookup(name),
        }
    }

    /// Update the nearest binding of `name`. Returns false when unbound.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        let mut frame = self.0.borrow_mut();
        if let Some(slot) = frame.vars.get_mut(name) {
            *slot = value;
            return true;
        }
        match &frame.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }
}

// -- Arithmetic ---

pub fn arith(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeErrorKind> {
    let invalid = || RuntimeErrorKind::InvalidOperands {
        op,
        left: left.kind_name(),
        right: right.kind_name(),
    };

    match (left, right) {
        (Value::Int(l), Value::Int(r)) => {
            let value = match op {
                BinaryOp::Add => l.wrapping_add(*r),
                BinaryOp::Sub => l.wrapping_sub(*r),
                BinaryOp::Mul => l.wrapping_mul(*r),
                BinaryOp::Div => {
                    if *r == 0 {
                        return Err(RuntimeErrorKind::DivisionByZero);
                    }
                    l.wrapping_div(*r)
                }
            };
            Ok(Value::Int(value))
        }

        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (l, r) = (left.as_float(), right.as_float());
            match (l, r) {
                (Some(l), Some(r)) => Ok(Value::Float(scalar_op(op, l, r))),
                _ => Err(invalid()),
            }
        }

        (Value::Vector(l), Value::Vector(r)) if l.len() == r.len() => {
            Ok(Value::Vector(zip_with(op, l, r)))
        }
        (Value::Matrix { dim, elems: l }, Value::Matrix { dim: rdim, elems: r }) if dim == rdim => {
            let elems = match op {
                BinaryOp::Mul => mat_mul(*dim as usize, l, r),
                _ => zip_with(op, l, r),
            };
            Ok(Value::Matrix { dim: *dim, elems })
        }
        (Value::Matrix { dim, elems }, Value::Vector(items))
            if op == BinaryOp::Mul && *dim as usize == items.len() =>
        {
            Ok(Value::Vector(mat_mul_vec(*dim as usize, elems, items)))
        }
        (Value::Matrix { dim, elems }, scalar) => match scalar.as_float() {
            Some(s) => Ok(Value::Matrix {
                dim: *dim,
                elems: elems.iter().map(|v| scalar_op(op, *v, s)).collect(),
            }),
            None => Err(invalid()),
        },
        (scalar, Value::Matrix { dim, elems }) => match scalar.as_float() {
            Some(s) => Ok(Value::Matrix {
                dim: *dim,
                elems: elems.iter().map(|v| scalar_op(op, s, *v)).collect(),
            }),
            None => Err(invalid()),
        },
        (Value::Vector(items), scalar) => match scalar.as_float() {
            Some(s) => Ok(Value::Vector(
                items.iter().map(|v| scalar_op(op, *v, s)).collect(),
            )),
            None => Err(invalid()),
        },
        (scalar, Value::Vector(items)) => match scalar.as_float() {
            Some(s) => Ok(Value::Vector(
                items.iter().map(|v| scalar_op(op, s, *v)).collect(),
            )),
            None => Err(invalid()),
        },

        _ => Err(invalid()),
    }
}

fn scalar_op(op: BinaryOp, l: f64, r: f64) -> f64 {
    match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div => l / r,
    }
}

fn zip_with(op: BinaryOp, l: &[f64], r: &[f64]) -> Vec<f64> {
    l.iter().zip(r).map(|(l, r)| scalar_op(op, *l, *r)).collect()
}

fn mat_mul(n: usize, a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; n * n];
    for col in 0..n {
        for row in 0..n {
            out[col * n + row] = (0..n).map(|k| a[k * n + row] * b[col * n + k]).sum();
        }
    }
    out
}

fn mat_mul_vec(n: usize, m: &[f64], v: &[f64]) -> Vec<f64> {
    (0..n)
        .map(|row| (0..n).map(|k| m[k * n + row] * v[k]).sum())
        .collect()
}
