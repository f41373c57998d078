use super::*;
use crate::driver::compile::parse_source;
use crate::types::ScalarKind;
use indoc::indoc;

fn elaborate_source(source: &str) -> Result<ElaboratedContext, TypeCheckError> {
    let parsed = parse_source(source).expect("Failed to parse");
    elaborate(parsed)
}

fn root_type(ctx: &ElaboratedContext) -> Type {
    ctx.type_table
        .type_of(ctx.expr.id)
        .cloned()
        .expect("root has no type")
}

#[test]
fn test_arith_widening() {
    let ctx = elaborate_source("1 + 2.5").expect("Failed to elaborate");
    assert_eq!(root_type(&ctx), Type::FLOAT);

    let ctx = elaborate_source("1 + 2").expect("Failed to elaborate");
    assert_eq!(root_type(&ctx), Type::INT);
}

#[test]
fn test_arith_cross_shape_rejected() {
    let err = elaborate_source("vec3(1, 2, 3) + vec4(1, 2, 3, 4)").unwrap_err();
    assert!(matches!(err.kind(), TypeCheckErrorKind::ArithTypeMismatch(..)));
}

#[test]
fn test_every_node_is_typed() {
    let ctx = elaborate_source(indoc! {"
        var x = 1.5;
        var f = fun a:Float -> a * x;
        var q = < %[x] + 1 >;
        f(2) + !q
    "})
    .expect("Failed to elaborate");

    use crate::tree::visit::{Visitor, walk_expr};
    struct Check<'a>(&'a TypeTable);
    impl Visitor for Check<'_> {
        fn visit_expr(&mut self, expr: &Expr) {
            assert!(self.0.contains(expr.id), "node {} has no type", expr.id);
            walk_expr(self, expr);
        }
        fn visit_param(&mut self, param: &Param) {
            assert!(self.0.contains(param.id), "param {} has no type", param.id);
        }
    }
    Check(&ctx.type_table).visit_expr(&ctx.expr);
    assert_eq!(root_type(&ctx), Type::FLOAT);
}

#[test]
fn test_quote_type_and_stage() {
    let ctx = elaborate_source("var x = 1; < x + 2 >").expect("Failed to elaborate");
    assert_eq!(
        root_type(&ctx),
        Type::code(StageAnnotation::Ordinary, Type::INT)
    );

    let ExprKind::Seq(items) = &ctx.expr.kind else {
        panic!("Expected Seq");
    };
    let ExprKind::Quote { body, .. } = &items[1].kind else {
        panic!("Expected Quote");
    };
    assert_eq!(ctx.type_table.stage_of(items[1].id), Some(Stage::HOST));
    assert_eq!(
        ctx.type_table.stage_of(body.id),
        Some(Stage {
            annotation: StageAnnotation::Ordinary,
            level: 1
        })
    );
}

#[test]
fn test_persist_body_is_outer_stage() {
    let ctx = elaborate_source("var x = 1.0; vertex< %[x] >").expect("Failed to elaborate");

    let ExprKind::Seq(items) = &ctx.expr.kind else {
        panic!("Expected Seq");
    };
    let ExprKind::Quote { body: escape, .. } = &items[1].kind else {
        panic!("Expected Quote");
    };
    let ExprKind::Escape { body, .. } = &escape.kind else {
        panic!("Expected Escape");
    };
    assert_eq!(ctx.type_table.stage_of(body.id), Some(Stage::HOST));
    let escape_entry = ctx.type_table.get(escape.id).unwrap();
    assert_eq!(escape_entry.ty, Type::FLOAT);
    assert_eq!(escape_entry.stage.annotation, StageAnnotation::Vertex);
}

#[test]
fn test_array_seen_as_element_in_vertex() {
    let ctx = elaborate_source(indoc! {"
        extern position: Float3 Array;
        vertex< var p = position; %[position] >
    "})
    .expect("Failed to elaborate");

    let ExprKind::Seq(items) = &ctx.expr.kind else {
        panic!("Expected Seq");
    };
    let ExprKind::Quote { body, .. } = &items[1].kind else {
        panic!("Expected Quote");
    };
    let ExprKind::Seq(body_items) = &body.kind else {
        panic!("Expected Seq");
    };
    let float3 = Type::vec(ScalarKind::Float, 3);
    assert_eq!(ctx.type_table.type_of(body_items[0].id), Some(&float3));
    assert_eq!(ctx.type_table.type_of(body_items[1].id), Some(&float3));
}

#[test]
fn test_splice_requires_code() {
    let err = elaborate_source("var x = 1; < [x] >").unwrap_err();
    assert!(matches!(
        err.kind(),
        TypeCheckErrorKind::SpliceTypeMismatch(StageAnnotation::Ordinary, _)
    ));

    let ctx = elaborate_source("var c = <1>; < [c] + 1 >").expect("Failed to elaborate");
    assert_eq!(
        root_type(&ctx),
        Type::code(StageAnnotation::Ordinary, Type::INT)
    );
}

#[test]
fn test_escape_outside_quote() {
    let err = elaborate_source("%[1]").unwrap_err();
    assert!(matches!(err.kind(), TypeCheckErrorKind::EscapeOutsideQuote));
}

#[test]
fn test_escape_cannot_see_quote_locals() {
    let err = elaborate_source("< var y = 1; %[y] >").unwrap_err();
    assert!(matches!(err.kind(), TypeCheckErrorKind::VarUndefined(name) if name == "y"));
}

#[test]
fn test_run_requires_ordinary_code() {
    let ctx = elaborate_source("!<1.5>").expect("Failed to elaborate");
    assert_eq!(root_type(&ctx), Type::FLOAT);

    let err = elaborate_source("!vertex< gl_Position = vec4(0, 0, 0, 1) >").unwrap_err();
    assert!(matches!(err.kind(), TypeCheckErrorKind::RunTypeMismatch(_)));
}

#[test]
fn test_quote_stage_rules() {
    let err = elaborate_source("fragment< 1 >").unwrap_err();
    assert!(matches!(
        err.kind(),
        TypeCheckErrorKind::QuoteWrongStage(StageAnnotation::Fragment, StageAnnotation::Ordinary)
    ));

    let err = elaborate_source("vertex< vertex< 1 > >").unwrap_err();
    assert!(matches!(
        err.kind(),
        TypeCheckErrorKind::QuoteWrongStage(StageAnnotation::Vertex, StageAnnotation::Vertex)
    ));
}

#[test]
fn test_builtin_stage_restriction() {
    let err = elaborate_source("gl_Position").unwrap_err();
    assert!(matches!(err.kind(), TypeCheckErrorKind::BuiltinWrongStage(..)));

    elaborate_source("vertex< gl_Position = vec4(1, 2, 3, 1); frag(fragment< gl_FragColor = vec4(1.0, 0.0, 0.0, 1.0) >) >")
        .expect("Failed to elaborate");
}

#[test]
fn test_builtin_overloads() {
    let ctx = elaborate_source("vec4(vec3(1, 2, 3), 1)").expect("Failed to elaborate");
    assert_eq!(root_type(&ctx), Type::vec(ScalarKind::Float, 4));

    let err = elaborate_source("dot(vec3(1, 2, 3), 2)").unwrap_err();
    assert!(matches!(err.kind(), TypeCheckErrorKind::BuiltinArgMismatch(..)));
}

#[test]
fn test_matrix_vector_product() {
    let ctx = elaborate_source("extern m: Float4x4; m * vec4(1, 2, 3, 1)").expect("Failed to elaborate");
    assert_eq!(root_type(&ctx), Type::vec(ScalarKind::Float, 4));
}

#[test]
fn test_call_checks() {
    let err = elaborate_source("var f = fun a:Int -> a; f(1, 2)").unwrap_err();
    assert!(matches!(err.kind(), TypeCheckErrorKind::ArgCountMismatch(1, 2)));

    let err = elaborate_source("var f = fun a:Int -> a; f(1.5)").unwrap_err();
    assert!(matches!(err.kind(), TypeCheckErrorKind::ArgTypeMismatch(0, ..)));

    let ctx = elaborate_source("var f = fun a:Float -> a; f(1)").expect("Failed to elaborate");
    assert_eq!(root_type(&ctx), Type::FLOAT);

    let err = elaborate_source("var x = 1; x(2)").unwrap_err();
    assert!(matches!(err.kind(), TypeCheckErrorKind::NotCallable(_)));
}

#[test]
fn test_assign_rules() {
    let ctx = elaborate_source("var x = 1.0; x = 2").expect("Failed to elaborate");
    assert_eq!(root_type(&ctx), Type::Void);

    let err = elaborate_source("var x = 1; x = 2.0").unwrap_err();
    assert!(matches!(err.kind(), TypeCheckErrorKind::AssignTypeMismatch(..)));

    let err = elaborate_source("var x = 1; < x = 2 >").unwrap_err();
    assert!(matches!(err.kind(), TypeCheckErrorKind::AssignAcrossStages(name) if name == "x"));

    let err = elaborate_source("var x = 1; x += 2.5").unwrap_err();
    assert!(matches!(err.kind(), TypeCheckErrorKind::AssignTypeMismatch(..)));
}

#[test]
fn test_intrinsic_rules() {
    let err = elaborate_source("vtx(<1>)").unwrap_err();
    assert!(matches!(err.kind(), TypeCheckErrorKind::IntrinsicTypeMismatch(..)));

    let err = elaborate_source("frag(fragment< 1 >)").unwrap_err();
    assert!(matches!(err.kind(), TypeCheckErrorKind::IntrinsicWrongStage(..)));

    let ctx = elaborate_source("render(< 1 >)").expect("Failed to elaborate");
    assert_eq!(
        root_type(&ctx),
        Type::code(StageAnnotation::Ordinary, Type::INT)
    );
}

#[test]
fn test_extern_only_in_ordinary_stage() {
    let err = elaborate_source("vertex< extern t: Float >").unwrap_err();
    assert!(matches!(err.kind(), TypeCheckErrorKind::ExternInShader));
}

#[test]
fn test_unknown_type_names_node() {
    let err = elaborate_source("extern t: Double").unwrap_err();
    assert!(matches!(err.kind(), TypeCheckErrorKind::UnknownType(name) if name == "Double"));
    assert_eq!(err.span().start.column, 1);
}

#[test]
fn test_elaboration_is_idempotent() {
    let ctx = elaborate_source(indoc! {"
        extern position: Float3 Array;
        extern projection: Float4x4;
        var scale = 2.0;
        render(<
            vtx(vertex<
                gl_Position = projection * vec4(position * %[scale], 1);
                frag(fragment< gl_FragColor = vec4(1, 0, 0, 1) >)
            >)
        >)
    "})
    .expect("Failed to elaborate");

    let again = elaborate_tree(&ctx.expr).expect("Failed to re-elaborate");
    assert_eq!(again, ctx.type_table);
}
