//! Type compatibility rules.
//!
//! Exact matches are always assignable. The only implicit conversion is
//! widening of integer components to float (`Int -> Float`,
//! `Int3 -> Float3`, `Int4 -> Float4`). Arithmetic result types are the
//! widened join of the operands, plus broadcasting of a scalar over a vector
//! or matrix and the matrix-vector product.

use crate::tree::BinaryOp;
use crate::types::{ScalarKind, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeAssignability {
    Exact,
    IntToFloat,
    Incompatible,
}

impl TypeAssignability {
    pub fn is_ok(&self) -> bool {
        !matches!(self, TypeAssignability::Incompatible)
    }
}

pub fn type_assignable(from: &Type, to: &Type) -> TypeAssignability {
    if from == to {
        return TypeAssignability::Exact;
    }

    match (from, to) {
        (Type::Scalar(ScalarKind::Int), Type::Scalar(ScalarKind::Float)) => {
            TypeAssignability::IntToFloat
        }
        (
            Type::Vector {
                scalar: ScalarKind::Int,
                len: from_len,
            },
            Type::Vector {
                scalar: ScalarKind::Float,
                len: to_len,
            },
        ) if from_len == to_len => TypeAssignability::IntToFloat,
        _ => TypeAssignability::Incompatible,
    }
}

fn join_scalar(a: ScalarKind, b: ScalarKind) -> ScalarKind {
    if a == ScalarKind::Int && b == ScalarKind::Int {
        ScalarKind::Int
    } else {
        ScalarKind::Float
    }
}

/// Result type of `left op right`, or `None` when the operands don't combine.
pub fn arith_result(op: BinaryOp, left: &Type, right: &Type) -> Option<Type> {
    if !left.is_primitive() || !right.is_primitive() {
        return None;
    }

    match (left, right) {
        (Type::Scalar(a), Type::Scalar(b)) => Some(Type::Scalar(join_scalar(*a, *b))),

        (Type::Vector { scalar: a, len: la }, Type::Vector { scalar: b, len: lb }) if la == lb => {
            Some(Type::vec(join_scalar(*a, *b), *la))
        }

        (Type::Vector { scalar: a, len }, Type::Scalar(b))
        | (Type::Scalar(b), Type::Vector { scalar: a, len }) => {
            Some(Type::vec(join_scalar(*a, *b), *len))
        }

        (Type::Matrix { dim: a }, Type::Matrix { dim: b }) if a == b => {
            Some(Type::Matrix { dim: *a })
        }

        (Type::Matrix { dim }, Type::Scalar(_)) | (Type::Scalar(_), Type::Matrix { dim }) => {
            Some(Type::Matrix { dim: *dim })
        }

        (Type::Matrix { dim }, Type::Vector { len, .. }) if op == BinaryOp::Mul && dim == len => {
            Some(Type::vec(ScalarKind::Float, *len))
        }

        _ => None,
    }
}
