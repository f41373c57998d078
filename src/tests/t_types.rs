use super::*;
use crate::tree::{BinaryOp, StageAnnotation};

#[test]
fn test_type_display() {
    assert_eq!(Type::INT.to_string(), "Int");
    assert_eq!(Type::vec(ScalarKind::Float, 3).to_string(), "Float3");
    assert_eq!(Type::Matrix { dim: 4 }.to_string(), "Float4x4");
    assert_eq!(Type::array(Type::vec(ScalarKind::Float, 3)).to_string(), "Float3 Array");
    assert_eq!(
        Type::code(StageAnnotation::Vertex, Type::Void).to_string(),
        "vertex<Void>"
    );
    assert_eq!(
        Type::func(vec![Type::INT, Type::FLOAT], Type::FLOAT).to_string(),
        "Int Float -> Float"
    );
}

#[test]
fn test_type_from_name() {
    assert_eq!(Type::from_name("Int4"), Some(Type::vec(ScalarKind::Int, 4)));
    assert_eq!(Type::from_name("Float3x3"), Some(Type::Matrix { dim: 3 }));
    assert_eq!(Type::from_name("Double"), None);
}

#[test]
fn test_assignability_widens_ints() {
    assert_eq!(type_assignable(&Type::INT, &Type::INT), TypeAssignability::Exact);
    assert_eq!(
        type_assignable(&Type::INT, &Type::FLOAT),
        TypeAssignability::IntToFloat
    );
    assert_eq!(
        type_assignable(
            &Type::vec(ScalarKind::Int, 3),
            &Type::vec(ScalarKind::Float, 3)
        ),
        TypeAssignability::IntToFloat
    );
    assert_eq!(
        type_assignable(&Type::FLOAT, &Type::INT),
        TypeAssignability::Incompatible
    );
    assert_eq!(
        type_assignable(
            &Type::vec(ScalarKind::Int, 3),
            &Type::vec(ScalarKind::Float, 4)
        ),
        TypeAssignability::Incompatible
    );
}

#[test]
fn test_arith_result() {
    assert_eq!(
        arith_result(BinaryOp::Add, &Type::INT, &Type::INT),
        Some(Type::INT)
    );
    assert_eq!(
        arith_result(BinaryOp::Add, &Type::INT, &Type::FLOAT),
        Some(Type::FLOAT)
    );
    assert_eq!(
        arith_result(
            BinaryOp::Mul,
            &Type::Matrix { dim: 4 },
            &Type::vec(ScalarKind::Float, 4)
        ),
        Some(Type::vec(ScalarKind::Float, 4))
    );
    assert_eq!(
        arith_result(
            BinaryOp::Add,
            &Type::Matrix { dim: 4 },
            &Type::vec(ScalarKind::Float, 4)
        ),
        None
    );
    assert_eq!(arith_result(BinaryOp::Add, &Type::String, &Type::INT), None);
}
