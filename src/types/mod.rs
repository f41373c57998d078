mod format;
mod relations;

pub use relations::{TypeAssignability, arith_result, type_assignable};

use enum_display::EnumDisplay;

use crate::tree::StageAnnotation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumDisplay)]
pub enum ScalarKind {
    #[display("Int")]
    Int,
    #[display("Float")]
    Float,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    String,

    // Primitive types
    Scalar(ScalarKind),
    Vector { scalar: ScalarKind, len: u8 },
    Matrix { dim: u8 },

    /// A per-vertex buffer. Seen as its element type inside a vertex stage.
    Array { elem: Box<Type> },

    Fn { params: Vec<Type>, ret: Box<Type> },

    /// A quoted program of the given stage producing `body`.
    Code {
        annotation: StageAnnotation,
        body: Box<Type>,
    },
}

impl Type {
    pub const INT: Type = Type::Scalar(ScalarKind::Int);
    pub const FLOAT: Type = Type::Scalar(ScalarKind::Float);

    pub fn vec(scalar: ScalarKind, len: u8) -> Type {
        Type::Vector { scalar, len }
    }

    pub fn array(elem: Type) -> Type {
        Type::Array {
            elem: Box::new(elem),
        }
    }

    pub fn func(params: Vec<Type>, ret: Type) -> Type {
        Type::Fn {
            params,
            ret: Box::new(ret),
        }
    }

    pub fn code(annotation: StageAnnotation, body: Type) -> Type {
        Type::Code {
            annotation,
            body: Box::new(body),
        }
    }

    /// Resolve a surface type name (`Int`, `Float3`, `Float4x4`, ...).
    pub fn from_name(name: &str) -> Option<Type> {
        let ty = match name {
            "Void" => Type::Void,
            "String" => Type::String,
            "Int" => Type::INT,
            "Float" => Type::FLOAT,
            "Int3" => Type::vec(ScalarKind::Int, 3),
            "Int4" => Type::vec(ScalarKind::Int, 4),
            "Float3" => Type::vec(ScalarKind::Float, 3),
            "Float4" => Type::vec(ScalarKind::Float, 4),
            "Float3x3" => Type::Matrix { dim: 3 },
            "Float4x4" => Type::Matrix { dim: 4 },
            _ => return None,
        };
        Some(ty)
    }

    /// Scalars, vectors and matrices: the only types that may cross into a
    /// shader stage.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Scalar(_) | Type::Vector { .. } | Type::Matrix { .. }
        )
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    pub fn array_elem(&self) -> Option<&Type> {
        match self {
            Type::Array { elem } => Some(elem),
            _ => None,
        }
    }

    /// Scalar kind of a scalar or vector. Matrices are always float.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Type::Scalar(kind) => Some(*kind),
            Type::Vector { scalar, .. } => Some(*scalar),
            Type::Matrix { .. } => Some(ScalarKind::Float),
            _ => None,
        }
    }

    /// Number of scalar components per value (used as attribute size).
    pub fn component_count(&self) -> Option<u8> {
        match self {
            Type::Scalar(_) => Some(1),
            Type::Vector { len, .. } => Some(*len),
            Type::Matrix { dim } => Some(dim * dim),
            _ => None,
        }
    }

    /// The same shape with float components.
    pub fn to_float(&self) -> Type {
        match self {
            Type::Scalar(_) => Type::FLOAT,
            Type::Vector { len, .. } => Type::vec(ScalarKind::Float, *len),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
#[path = "../tests/t_types.rs"]
mod tests;
