use super::*;
use crate::desugar::desugar;
use crate::driver::compile::parse_source;
use crate::elaborate::elaborate;
use indoc::indoc;

fn eval_source(source: &str) -> Result<Value, RuntimeError> {
    let parsed = parse_source(source).expect("Failed to parse");
    let elaborated = elaborate(parsed).expect("Failed to elaborate");
    let desugared = desugar(elaborated).expect("Failed to desugar");
    interpret(&desugared)
}

fn eval_display(source: &str) -> String {
    eval_source(source).expect("Failed to interpret").to_string()
}

#[test]
fn test_integer_arithmetic() {
    assert!(matches!(eval_source("1 + 2"), Ok(Value::Int(3))));
    assert!(matches!(eval_source("7 / 2"), Ok(Value::Int(3))));
    assert!(matches!(eval_source("-3 + 1"), Ok(Value::Int(-2))));
}

#[test]
fn test_mixed_arithmetic_is_float() {
    let value = eval_source("1.5 * 2").expect("Failed to interpret");
    assert!(matches!(value, Value::Float(v) if v == 3.0));
    assert_eq!(value.to_string(), "3");
}

#[test]
fn test_division_by_zero() {
    let err = eval_source("1 / 0").unwrap_err();
    assert!(matches!(err.kind(), RuntimeErrorKind::DivisionByZero));
    assert_eq!(err.span().start.column, 1);
}

#[test]
fn test_assignment_and_compound_assignment() {
    assert_eq!(eval_display("var x = 1; x = x + 4; x"), "5");
    assert_eq!(eval_display("var x = 1; x += 2; x"), "3");
}

#[test]
fn test_closure_sees_enclosing_binding() {
    assert_eq!(
        eval_display("var k = 10; var f = fun a:Int -> a + k; f(2)"),
        "12"
    );
}

#[test]
fn test_redeclaration_shadows_for_later_code_only() {
    assert_eq!(eval_display("var x = 1; var f = fun -> x; var x = 2; f()"), "1");
    assert_eq!(eval_display("var x = 1; var f = fun -> x; var x = 2; f() + x"), "3");
    assert_eq!(
        eval_display("var x = 1; var f = fun -> x; var x = < 3 >; f() + 1"),
        "2"
    );
}

#[test]
fn test_assignment_reaches_shadowed_binding_seen_by_closure() {
    assert_eq!(eval_display("var x = 1; var f = fun -> x; x = 7; f()"), "7");
}

#[test]
fn test_closure_env_excludes_its_own_binding() {
    let value = eval_source("var k = 1; var f = fun -> k; f").expect("Failed to interpret");
    let Value::Fun(closure) = &value else {
        panic!("expected a function, found {}", value.kind_name());
    };
    assert!(closure.env.lookup("k").is_some());
    assert!(closure.env.lookup("f").is_none());
    assert_eq!(Rc::strong_count(closure), 1);
}

#[test]
fn test_redeclaration_agrees_with_compiled_code() {
    use crate::driver::compile::{CompileOptions, compile};

    let output = compile(
        "var x = 1; var f = fun -> x; var x = 2; f()",
        &CompileOptions::default(),
    )
    .expect("Failed to compile");
    let ExprKind::Seq(items) = &output.ir.main.kind else {
        panic!("expected a sequence, found {}", output.ir.main.tag());
    };
    let first_x = items[0].id;
    let proc = output.ir.procs.iter().next().expect("missing procedure");
    assert_eq!(proc.captures, vec![first_x]);

    assert_eq!(eval_display("var x = 1; var f = fun -> x; var x = 2; f()"), "1");
}

#[test]
fn test_run_quote() {
    assert_eq!(eval_display("var x = 5; !< x + 1 >"), "6");
}

#[test]
fn test_persist_evaluated_when_quoted() {
    let source = indoc! {"
        var x = 2;
        var q = < %[x] * 3 >;
        x = 100;
        !q
    "};
    assert_eq!(eval_display(source), "6");
}

#[test]
fn test_splice_and_persist() {
    assert_eq!(eval_display("var c = < 2 >; !< [c] + %[3] >"), "5");
}

#[test]
fn test_nested_splices() {
    let source = indoc! {"
        var a = < 1 >;
        var b = < [a] + 1 >;
        !< [b] * 10 >
    "};
    assert_eq!(eval_display(source), "20");
}

#[test]
fn test_code_value_display() {
    assert_eq!(eval_display("< 1 >"), "<code>");
    assert_eq!(eval_display("render(< 1 >)"), "<code>");
}

#[test]
fn test_vector_builtins() {
    assert_eq!(eval_display("dot(vec3(1, 2, 3), vec3(4, 5, 6))"), "32");
    assert_eq!(eval_display("vec3(1, 2, 3) * 2"), "[2, 4, 6]");
    assert_eq!(eval_display("vec4(vec3(1, 2, 3), 4)"), "[1, 2, 3, 4]");
    assert_eq!(eval_display("normalize(vec3(3, 0, 4))"), "[0.6, 0, 0.8]");
}

#[test]
fn test_shader_invocation_unsupported() {
    let err = eval_source(indoc! {"
        vtx(vertex<
          gl_Position = vec4(0, 0, 0, 1);
          frag(fragment< gl_FragColor = vec4(1, 1, 1, 1) >)
        >)
    "})
    .unwrap_err();
    assert!(matches!(err.kind(), RuntimeErrorKind::Unsupported(name) if name == "vtx"));
}

#[test]
fn test_extern_has_no_value() {
    let err = eval_source("extern m: Float4x4; m * m").unwrap_err();
    assert!(matches!(err.kind(), RuntimeErrorKind::ExternValue(name) if name == "m"));
}

#[test]
fn test_matrix_arithmetic() {
    let identity = Value::Matrix {
        dim: 3,
        elems: vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };
    let scaled = arith(BinaryOp::Mul, &identity, &Value::Int(2)).expect("Failed to scale");
    let product = arith(BinaryOp::Mul, &scaled, &identity).expect("Failed to multiply");
    assert_eq!(product.to_string(), "[2, 0, 0, 0, 2, 0, 0, 0, 2]");

    let moved = arith(BinaryOp::Mul, &scaled, &Value::Vector(vec![1.0, 2.0, 3.0]))
        .expect("Failed to transform");
    assert_eq!(moved.to_string(), "[2, 4, 6]");

    let err = arith(BinaryOp::Add, &identity, &Value::String("x".to_string())).unwrap_err();
    assert!(matches!(err, RuntimeErrorKind::InvalidOperands { .. }));
}
