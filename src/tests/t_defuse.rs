use super::*;
use crate::desugar::desugar;
use crate::driver::compile::parse_source;
use crate::elaborate::elaborate;

fn analyze_source(source: &str) -> AnalyzedContext {
    let parsed = parse_source(source).expect("Failed to parse");
    let elaborated = elaborate(parsed).expect("Failed to elaborate");
    let desugared = desugar(elaborated).expect("Failed to desugar");
    analyze(desugared).expect("Failed to analyze")
}

fn seq_items(expr: &Expr) -> &[Expr] {
    match &expr.kind {
        ExprKind::Seq(items) => items,
        _ => panic!("Expected Seq"),
    }
}

#[test]
fn test_local_reference_crosses_nothing() {
    let ctx = analyze_source("var x = 1; x + 1");
    let items = seq_items(&ctx.expr);
    let ExprKind::Binary { left, .. } = &items[1].kind else {
        panic!("Expected Binary");
    };

    let res = ctx.def_use.resolution(left.id).expect("no resolution");
    assert_eq!(res.def, DefSite::Binding(items[0].id));
    assert!(res.crossings.is_empty());
    assert_eq!(ctx.def_use.binding(items[0].id).unwrap().name, "x");
}

#[test]
fn test_quote_and_closure_crossings() {
    let ctx = analyze_source("var x = 1; < fun a:Int -> a + x >");
    let items = seq_items(&ctx.expr);
    let quote = &items[1];
    let ExprKind::Quote { body: fun, .. } = &quote.kind else {
        panic!("Expected Quote");
    };
    let ExprKind::Fun { params, body } = &fun.kind else {
        panic!("Expected Fun");
    };
    let ExprKind::Binary { left, right, .. } = &body.kind else {
        panic!("Expected Binary");
    };

    let a = ctx.def_use.resolution(left.id).unwrap();
    assert_eq!(a.def, DefSite::Binding(params[0].id));
    assert!(a.crossings.is_empty());

    let x = ctx.def_use.resolution(right.id).unwrap();
    assert_eq!(x.def, DefSite::Binding(items[0].id));
    assert_eq!(
        x.crossings,
        vec![Boundary::Closure(fun.id), Boundary::Quote(quote.id)]
    );
    assert_eq!(x.innermost_quote(), Some(quote.id));
}

#[test]
fn test_escape_pops_boundary() {
    let ctx = analyze_source("var x = 1; < %[x] >");
    let items = seq_items(&ctx.expr);
    let ExprKind::Quote { body: escape, .. } = &items[1].kind else {
        panic!("Expected Quote");
    };
    let ExprKind::Escape { body, .. } = &escape.kind else {
        panic!("Expected Escape");
    };

    let res = ctx.def_use.resolution(body.id).unwrap();
    assert!(res.crossings.is_empty());
}

#[test]
fn test_assignment_records_target_use() {
    let ctx = analyze_source("var x = 1; x = 2");
    let items = seq_items(&ctx.expr);
    let res = ctx.def_use.resolution(items[1].id).unwrap();
    assert_eq!(res.binding(), Some(items[0].id));
}

#[test]
fn test_builtins_resolve() {
    let ctx = analyze_source("vec3(1, 2, 3)");
    let ExprKind::Call { callee, .. } = &ctx.expr.kind else {
        panic!("Expected Call");
    };
    let res = ctx.def_use.resolution(callee.id).unwrap();
    assert_eq!(res.def, DefSite::Builtin(Builtin::Vec3));
}

#[test]
fn test_extern_binding_kind() {
    let ctx = analyze_source("extern t: Float; t");
    let items = seq_items(&ctx.expr);
    let binding = ctx.def_use.binding(items[0].id).unwrap();
    assert!(binding.is_extern());
}

#[test]
fn test_unbound_reference() {
    let parsed = parse_source("y").expect("Failed to parse");
    let err = analyze_tree(&parsed.expr).unwrap_err();
    assert!(matches!(err.kind(), DefUseErrorKind::Unbound(name) if name == "y"));
}

#[test]
fn test_shader_nesting_crossings() {
    let ctx = analyze_source(
        "var c = 1.0; vertex< var v = 2.0; frag(fragment< gl_FragColor = vec4(c, v, 0, 1) >) >",
    );
    let items = seq_items(&ctx.expr);
    let vertex_id = items[1].id;

    let mut crossings = Vec::new();
    for (_, res) in ctx.def_use.uses() {
        if let Some(binding) = res.binding() {
            let name = ctx.def_use.binding(binding).unwrap().name.clone();
            crossings.push((name, res.crossings.clone()));
        }
    }

    let c = crossings.iter().find(|(n, _)| n == "c").unwrap();
    assert_eq!(c.1.len(), 2);
    assert_eq!(c.1[1], Boundary::Quote(vertex_id));

    let v = crossings.iter().find(|(n, _)| n == "v").unwrap();
    assert_eq!(v.1.len(), 1);
}
