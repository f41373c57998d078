use crate::backend::glue::analyze_glue;
use crate::backend::{CodegenError, GeneratedCode, generate};
use crate::context::CompilerIr;
use crate::defuse::analyze;
use crate::desugar::desugar;
use crate::driver::compile::parse_source;
use crate::elaborate::elaborate;
use crate::lambda_lift::lift_lambdas;
use crate::quote_lift::lift_quotes;
use crate::tree::*;
use indoc::indoc;

fn compile_ir(source: &str) -> CompilerIr {
    let parsed = parse_source(source).expect("Failed to parse");
    let elaborated = elaborate(parsed).expect("Failed to elaborate");
    let desugared = desugar(elaborated).expect("Failed to desugar");
    let analyzed = analyze(desugared).expect("Failed to analyze");
    let lifted = lift_quotes(analyzed).expect("Failed to lift quotes");
    let lifted = lift_lambdas(lifted).expect("Failed to lift lambdas");
    analyze_glue(lifted).expect("Failed to glue")
}

fn generate_source(source: &str) -> Result<(CompilerIr, GeneratedCode), CodegenError> {
    let ir = compile_ir(source);
    let code = generate(&ir)?;
    Ok((ir, code))
}

fn seq_items(expr: &Expr) -> &[Expr] {
    match &expr.kind {
        ExprKind::Seq(items) => items,
        _ => panic!("Expected Seq"),
    }
}

#[test]
fn test_arithmetic_program() {
    let (_, code) = generate_source("1 + 2").expect("Failed to generate");

    assert!(code.js.starts_with("(function () {\n"));
    assert!(code.js.ends_with("})()\n"));
    assert!(code.js.contains("  return (1 + 2);\n"));
    assert!(!code.js.contains("= get_shader("));
    assert!(code.shaders.is_empty());
}

#[test]
fn test_integer_division_truncates() {
    let (_, code) = generate_source("7 / 2").expect("Failed to generate");
    assert!(code.js.contains("return Math.trunc(7 / 2);"));
}

#[test]
fn test_procedure_and_call() {
    let (ir, code) =
        generate_source("var f = fun a:Int -> a + 1; f(2)").expect("Failed to generate");
    let f = seq_items(&ir.main)[0].id;
    let a = ir.procs.get(ProcId(0)).unwrap().params[0].id;

    assert!(code.js.contains(&format!("function p0(a_{}) {{", a)));
    assert!(code.js.contains(&format!("return (a_{} + 1);", a)));
    assert!(code.js.contains(&format!("var f_{};", f)));
    assert!(
        code.js
            .contains(&format!("return ((f_{f} = p0), f_{f}(2));", f = f))
    );
}

#[test]
fn test_captures_passed_first() {
    let (ir, code) = generate_source("var x = 1; var f = fun a:Int -> a + x; f(2)")
        .expect("Failed to generate");
    let items = seq_items(&ir.main);
    let (x, f) = (items[0].id, items[1].id);
    let a = ir.procs.get(ProcId(0)).unwrap().params[0].id;

    assert!(code.js.contains(&format!("function p0(x_{}, a_{}) {{", x, a)));
    assert!(code.js.contains(&format!("f_{}(x_{}, 2)", f, x)));
}

#[test]
fn test_ordinary_quote_and_run() {
    let (ir, code) = generate_source("var x = 1; !< x + 1 >").expect("Failed to generate");
    let x = seq_items(&ir.main)[0].id;

    assert!(code.js.contains(&format!("function q0(x_{}) {{", x)));
    assert!(code.js.contains(&format!("return (x_{} + 1);", x)));
    assert!(code.js.contains(&format!("run(code(q0, [x_{}]))", x)));
}

#[test]
fn test_escapes_become_program_arguments() {
    let (ir, code) = generate_source("var c = < 2 >; !< [c] + %[3] >").expect("Failed to generate");
    let c = seq_items(&ir.main)[0].id;
    let outer = ir.progs.get(ProgId(1)).unwrap();
    assert_eq!(outer.escapes.len(), 2);

    let mut params = Vec::new();
    let mut args = Vec::new();
    let mut splice = None;
    let mut persist = None;
    for escape in &outer.escapes {
        params.push(format!("e{}", escape.id));
        match escape.kind {
            EscapeKind::Splice => {
                args.push(format!("c_{}", c));
                splice = Some(escape.id);
            }
            EscapeKind::Persist => {
                args.push("3".to_string());
                persist = Some(escape.id);
            }
        }
    }

    assert!(code.js.contains(&format!("function q1({}) {{", params.join(", "))));
    assert!(code.js.contains(&format!(
        "return (run(e{}) + e{});",
        splice.unwrap(),
        persist.unwrap()
    )));
    assert!(code.js.contains(&format!("code(q1, [{}])", args.join(", "))));
}

#[test]
fn test_matrix_product_uses_runtime_helper() {
    let (_, code) = generate_source("extern m: Float4x4; m * m").expect("Failed to generate");
    assert!(code.js.contains("mat4mult(m, m)"));
}

#[test]
fn test_vector_arithmetic_unimplemented() {
    let err = generate_source("vec3(1, 2, 3) + vec3(1, 1, 1)").unwrap_err();
    assert!(err.is_unimplemented());
}

#[test]
fn test_persisted_float_bound_as_uniform() {
    let (ir, code) = generate_source(indoc! {"
        var t = 1.5;
        vtx(vertex<
          gl_Position = vec4(%[t], 0, 0, 1);
          frag(fragment< gl_FragColor = vec4(1, 1, 1, 1) >)
        >)
    "})
    .expect("Failed to generate");
    let t = seq_items(&ir.main)[0].id;
    let e = ir.progs.get(ProgId(0)).unwrap().escapes[0].id;

    assert!(code.js.contains("var s0 = get_shader(gl, q0, q1);"));
    assert!(code.js.contains(&format!(
        "var loc0_{e} = gl.getUniformLocation(s0, \"u0_{e}\");",
        e = e
    )));
    assert!(code.js.contains(&format!(
        "(gl.useProgram(s0), gl.uniform1f(loc0_{}, (t_{})))",
        e, t
    )));
    assert_eq!(code.js.matches("gl.uniform1f(").count(), 1);
    assert_eq!(code.shaders.len(), 2);
}

#[test]
fn test_attribute_and_matrix_uniform_bindings() {
    let (ir, code) = generate_source(indoc! {"
        extern position: Float3 Array;
        extern mvp: Float4x4;
        vtx(vertex<
          gl_Position = mvp * vec4(position, 1);
          frag(fragment< gl_FragColor = vec4(1, 1, 1, 1) >)
        >)
    "})
    .expect("Failed to generate");
    let items = seq_items(&ir.main);
    let (position, mvp) = (items[0].id, items[1].id);

    assert!(code.js.contains(&format!(
        "var loc0_{p} = gl.getAttribLocation(s0, \"a0_{p}\");",
        p = position
    )));
    assert!(
        code.js
            .contains(&format!("bind_attribute(gl, loc0_{}, (position), 3)", position))
    );
    assert!(
        code.js
            .contains(&format!("gl.uniformMatrix4fv(loc0_{}, false, (mvp))", mvp))
    );
}

#[test]
fn test_dynamic_vtx_rejected() {
    let err = generate_source(indoc! {"
        var v = vertex<
          gl_Position = vec4(0, 0, 0, 1);
          frag(fragment< gl_FragColor = vec4(1, 1, 1, 1) >)
        >;
        vtx(v)
    "})
    .unwrap_err();
    assert!(matches!(
        err,
        CodegenError::DynamicInvocation("vtx", StageAnnotation::Vertex)
    ));
}

#[test]
fn test_generation_is_deterministic() {
    let source = indoc! {"
        var x = 1;
        var g = fun a:Int -> a + 1;
        var q = < g(2) + %[x] >;
        !q
    "};
    let (_, first) = generate_source(source).expect("Failed to generate");
    let (_, second) = generate_source(source).expect("Failed to generate");
    assert_eq!(first.js, second.js);
}
