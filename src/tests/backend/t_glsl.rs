use super::*;
use crate::backend::glue::analyze_glue;
use crate::defuse::analyze;
use crate::desugar::desugar;
use crate::driver::compile::parse_source;
use crate::elaborate::elaborate;
use crate::lambda_lift::lift_lambdas;
use crate::quote_lift::lift_quotes;
use indoc::{formatdoc, indoc};

fn compile_ir(source: &str) -> CompilerIr {
    let parsed = parse_source(source).expect("Failed to parse");
    let elaborated = elaborate(parsed).expect("Failed to elaborate");
    let desugared = desugar(elaborated).expect("Failed to desugar");
    let analyzed = analyze(desugared).expect("Failed to analyze");
    let lifted = lift_quotes(analyzed).expect("Failed to lift quotes");
    let lifted = lift_lambdas(lifted).expect("Failed to lift lambdas");
    analyze_glue(lifted).expect("Failed to glue")
}

fn glsl_for(ir: &CompilerIr, id: ProgId) -> Result<String, CodegenError> {
    emit_glsl(ir, ir.progs.get(id).expect("Missing prog"))
}

fn seq_items(expr: &Expr) -> &[Expr] {
    match &expr.kind {
        ExprKind::Seq(items) => items,
        _ => panic!("Expected Seq"),
    }
}

#[test]
fn test_minimal_shader_pair() {
    let ir = compile_ir(indoc! {"
        vertex<
          gl_Position = vec4(0, 0, 0, 1);
          frag(fragment< gl_FragColor = vec4(1, 0, 0, 1) >)
        >
    "});

    let expected_vertex = indoc! {"
        precision mediump float;
        void main() {
          gl_Position = vec4(0.0, 0.0, 0.0, 1.0);
        }
    "};
    let expected_fragment = indoc! {"
        precision mediump float;
        void main() {
          gl_FragColor = vec4(1.0, 0.0, 0.0, 1.0);
        }
    "};
    assert_eq!(glsl_for(&ir, ProgId(0)).unwrap(), expected_vertex);
    assert_eq!(glsl_for(&ir, ProgId(1)).unwrap(), expected_fragment);
}

#[test]
fn test_persist_becomes_uniform() {
    let ir = compile_ir(indoc! {"
        var t = 1.5;
        vertex<
          gl_Position = vec4(%[t], 0, 0, 1);
          frag(fragment< gl_FragColor = vec4(1, 1, 1, 1) >)
        >
    "});
    let escape = ir.progs.get(ProgId(0)).unwrap().escapes[0].id;

    let expected = formatdoc! {"
        precision mediump float;
        uniform float u0_{escape};
        void main() {{
          gl_Position = vec4(u0_{escape}, 0.0, 0.0, 1.0);
        }}
    ", escape = escape};
    assert_eq!(glsl_for(&ir, ProgId(0)).unwrap(), expected);
}

#[test]
fn test_host_array_becomes_attribute() {
    let ir = compile_ir(indoc! {"
        extern position: Float3 Array;
        vertex<
          gl_Position = vec4(position, 1);
          frag(fragment< gl_FragColor = vec4(1, 1, 1, 1) >)
        >
    "});
    let binding = seq_items(&ir.main)[0].id;

    let glsl = glsl_for(&ir, ProgId(0)).unwrap();
    assert!(glsl.contains(&format!("attribute vec3 a0_{};", binding)));
    assert!(glsl.contains(&format!("gl_Position = vec4(a0_{}, 1.0);", binding)));
}

#[test]
fn test_vertex_value_passed_as_varying() {
    let ir = compile_ir(indoc! {"
        vertex<
          var color = vec3(1, 0, 0);
          gl_Position = vec4(0, 0, 0, 1);
          frag(fragment< gl_FragColor = vec4(color, 1) >)
        >
    "});
    let color = seq_items(&ir.progs.get(ProgId(0)).unwrap().body)[0].id;

    let expected_vertex = formatdoc! {"
        precision mediump float;
        varying vec3 v1_{color};
        void main() {{
          vec3 color_{color} = vec3(1.0, 0.0, 0.0);
          gl_Position = vec4(0.0, 0.0, 0.0, 1.0);
          v1_{color} = color_{color};
        }}
    ", color = color};
    let expected_fragment = formatdoc! {"
        precision mediump float;
        varying vec3 v1_{color};
        void main() {{
          gl_FragColor = vec4(v1_{color}, 1.0);
        }}
    ", color = color};
    assert_eq!(glsl_for(&ir, ProgId(0)).unwrap(), expected_vertex);
    assert_eq!(glsl_for(&ir, ProgId(1)).unwrap(), expected_fragment);
}

#[test]
fn test_int_operand_widened_in_float_arithmetic() {
    let ir = compile_ir(indoc! {"
        vertex<
          var s = 0.5 * 2;
          gl_Position = vec4(s, s, 0, 1);
          frag(fragment< gl_FragColor = vec4(1, 1, 1, 1) >)
        >
    "});
    let s = seq_items(&ir.progs.get(ProgId(0)).unwrap().body)[0].id;

    let glsl = glsl_for(&ir, ProgId(0)).unwrap();
    assert!(glsl.contains(&format!("float s_{} = (0.5 * 2.0);", s)));
}

#[test]
fn test_nested_ordinary_quote_rejected() {
    let ir = compile_ir(indoc! {"
        vertex<
          < 1 >;
          gl_Position = vec4(0, 0, 0, 1);
          frag(fragment< gl_FragColor = vec4(1, 1, 1, 1) >)
        >
    "});

    let err = glsl_for(&ir, ProgId(0)).unwrap_err();
    assert!(matches!(
        err,
        CodegenError::NestedOrdinaryProg(ProgId(0), ProgId(1))
    ));
    assert!(!err.is_unimplemented());
}

#[test]
fn test_function_literal_unimplemented() {
    let ir = compile_ir(indoc! {"
        vertex<
          var f = fun a:Float -> a;
          gl_Position = vec4(f(1.0), 0, 0, 1);
          frag(fragment< gl_FragColor = vec4(1, 1, 1, 1) >)
        >
    "});

    let err = glsl_for(&ir, ProgId(0)).unwrap_err();
    assert!(err.is_unimplemented());
}
