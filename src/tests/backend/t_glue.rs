use super::*;
use crate::defuse::analyze;
use crate::desugar::desugar;
use crate::driver::compile::parse_source;
use crate::elaborate::elaborate;
use crate::lambda_lift::lift_lambdas;
use crate::quote_lift::lift_quotes;
use crate::tree::{Expr, ExprKind};
use crate::types::ScalarKind;
use indoc::indoc;

fn glue_source(source: &str) -> Result<CompilerIr, GlueError> {
    let parsed = parse_source(source).expect("Failed to parse");
    let elaborated = elaborate(parsed).expect("Failed to elaborate");
    let desugared = desugar(elaborated).expect("Failed to desugar");
    let analyzed = analyze(desugared).expect("Failed to analyze");
    let lifted = lift_quotes(analyzed).expect("Failed to lift quotes");
    let lifted = lift_lambdas(lifted).expect("Failed to lift lambdas");
    analyze_glue(lifted)
}

fn seq_items(expr: &Expr) -> &[Expr] {
    match &expr.kind {
        ExprKind::Seq(items) => items,
        _ => panic!("Expected Seq"),
    }
}

#[test]
fn test_persisted_float_is_uniform() {
    let ir = glue_source(indoc! {"
        var t = 1.5;
        vertex<
          gl_Position = vec4(%[t], 0, 0, 1);
          frag(fragment< gl_FragColor = vec4(1, 1, 1, 1) >)
        >
    "})
    .expect("Failed to glue");

    let vertex = ir.progs.get(ProgId(0)).unwrap();
    let escape = vertex.escapes[0];
    let entries = ir.glue.get(ProgId(0));
    assert_eq!(entries.len(), 1);

    let entry = &entries[0];
    assert_eq!(entry.id, escape.id);
    assert_eq!(entry.name, format!("u0_{}", escape.id));
    assert_eq!(entry.ty, Type::FLOAT);
    assert_eq!(entry.transfer, Transfer::Uniform);
    assert_eq!(entry.source, GlueSource::Expr(escape.body));
    assert!(entry.is_host_bound());

    assert!(ir.glue.get(ProgId(1)).is_empty());
}

#[test]
fn test_host_array_is_attribute() {
    let ir = glue_source(indoc! {"
        extern position: Float3 Array;
        vertex<
          gl_Position = vec4(position, 1);
          frag(fragment< gl_FragColor = vec4(1, 1, 1, 1) >)
        >
    "})
    .expect("Failed to glue");

    let binding = seq_items(&ir.main)[0].id;
    let entries = ir.glue.get(ProgId(0));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, binding);
    assert_eq!(entries[0].name, format!("a0_{}", binding));
    assert_eq!(entries[0].ty, Type::vec(ScalarKind::Float, 3));
    assert!(entries[0].is_attribute());
    assert_eq!(
        entries[0].source,
        GlueSource::Binding {
            binding,
            name: "position".to_string()
        }
    );
}

#[test]
fn test_vertex_value_in_fragment_is_varying() {
    let ir = glue_source(indoc! {"
        vertex<
          var color = vec3(1, 0, 0);
          gl_Position = vec4(0, 0, 0, 1);
          frag(fragment< gl_FragColor = vec4(color, 1) >)
        >
    "})
    .expect("Failed to glue");

    assert!(ir.glue.get(ProgId(0)).is_empty());
    let entries = ir.glue.get(ProgId(1));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].transfer, Transfer::Varying);
    assert!(entries[0].name.starts_with("v1_"));
    assert!(!entries[0].is_host_bound());
}

#[test]
fn test_host_value_in_fragment_is_uniform() {
    let ir = glue_source(indoc! {"
        var tint = vec4(1, 0, 0, 1);
        vertex<
          gl_Position = vec4(0, 0, 0, 1);
          frag(fragment< gl_FragColor = tint >)
        >
    "})
    .expect("Failed to glue");

    let entries = ir.glue.get(ProgId(1));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].transfer, Transfer::Uniform);
    assert_eq!(entries[0].ty, Type::vec(ScalarKind::Float, 4));
}

#[test]
fn test_persists_precede_free_variables() {
    let ir = glue_source(indoc! {"
        var scale = 2.0;
        var offset = 0.5;
        vertex<
          gl_Position = vec4(scale, %[offset], 0, 1);
          frag(fragment< gl_FragColor = vec4(1, 1, 1, 1) >)
        >
    "})
    .expect("Failed to glue");

    let scale = seq_items(&ir.main)[0].id;
    let entries = ir.glue.get(ProgId(0));
    assert_eq!(entries.len(), 2);
    assert!(matches!(entries[0].source, GlueSource::Expr(_)));
    assert_eq!(entries[1].id, scale);
}

#[test]
fn test_host_array_in_fragment_rejected() {
    let err = glue_source(indoc! {"
        extern colors: Float4 Array;
        vertex<
          gl_Position = vec4(0, 0, 0, 1);
          frag(fragment< var c = colors; gl_FragColor = vec4(1, 1, 1, 1) >)
        >
    "})
    .unwrap_err();
    assert!(matches!(err, GlueError::ArrayInFragment { prog: ProgId(1), .. }));
}

#[test]
fn test_function_cannot_cross_into_shader() {
    let err = glue_source(indoc! {"
        var f = fun a:Float -> a;
        vertex<
          gl_Position = vec4(f(1.0), 0, 0, 1);
          frag(fragment< gl_FragColor = vec4(1, 1, 1, 1) >)
        >
    "})
    .unwrap_err();
    assert!(matches!(
        err,
        GlueError::UnsupportedType { prog: ProgId(0), .. }
    ));
}
