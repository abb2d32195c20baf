//! First-class functions over the per-file dispatch state: distinct tags,
//! exclusive bodies, parameters and returns through the shared frame
//! machinery.

use super::harness::*;
use tycon_ast::BinaryOperator;

#[test]
fn test_two_closures_get_distinct_tags() {
    let text = compile_ok(module(vec![
        let_stmt("fa", num(0)),
        let_stmt("gb", num(0)),
        let_stmt("f", arrow(vec![], vec![expr_stmt(assign(name("fa"), num(1)))])),
        let_stmt("g", arrow(vec![], vec![expr_stmt(assign(name("gb"), num(1)))])),
    ]));
    // one shared dispatch state per file, two distinct case tags
    assert!(text.contains("state closures_"));
    assert!(text.contains("ife rfn 1 {"));
    assert!(text.contains("ife rfn 2 {"));
    assert_eq!(text.matches("state closures_").count(), 1);
}

#[test]
fn test_each_closure_runs_only_its_own_body() {
    let make = |invoke_f: bool, invoke_g: bool| {
        let mut stmts = vec![
            let_stmt("fa", num(0)),
            let_stmt("gb", num(0)),
            let_stmt("f", arrow(vec![], vec![expr_stmt(assign(name("fa"), num(1)))])),
            let_stmt("g", arrow(vec![], vec![expr_stmt(assign(name("gb"), num(1)))])),
        ];
        if invoke_f {
            stmts.push(expr_stmt(call_name("f", vec![])));
        }
        if invoke_g {
            stmts.push(expr_stmt(call_name("g", vec![])));
        }
        module(stmts)
    };

    let only_f = run_module(make(true, false));
    assert_eq!(only_f.reg("g_fa"), 1);
    assert_eq!(only_f.reg("g_gb"), 0, "the other closure body must not run");

    let only_g = run_module(make(false, true));
    assert_eq!(only_g.reg("g_fa"), 0);
    assert_eq!(only_g.reg("g_gb"), 1);

    let both = run_module(make(true, true));
    assert_eq!(both.reg("g_fa"), 1);
    assert_eq!(both.reg("g_gb"), 1);
}

#[test]
fn test_closure_with_parameters_and_return() {
    let machine = run_module(module(vec![
        let_stmt("add", arrow(vec!["x", "y"], vec![ret(Some(bin(
            BinaryOperator::Add,
            name("x"),
            name("y"),
        )))])),
        let_stmt("r", call_name("add", vec![num(2), num(3)])),
    ]));
    assert_eq!(machine.reg("g_r"), 5);
    assert_eq!(machine.reg("rsp"), 0);
}

#[test]
fn test_closure_value_can_be_reassigned() {
    let machine = run_module(module(vec![
        let_stmt("fst", arrow(vec![], vec![ret(Some(num(10)))])),
        let_stmt("snd", arrow(vec![], vec![ret(Some(num(20)))])),
        let_stmt("slot", name("fst")),
        let_stmt("a", call_name("slot", vec![])),
        expr_stmt(assign(name("slot"), name("snd"))),
        let_stmt("b", call_name("slot", vec![])),
    ]));
    assert_eq!(machine.reg("g_a"), 10);
    assert_eq!(machine.reg("g_b"), 20);
}

#[test]
fn test_closure_inside_function_frame() {
    let machine = run_module(module(vec![
        func("runner", vec!["seed"], vec![
            let_stmt("double", arrow(vec!["v"], vec![ret(Some(bin(
                BinaryOperator::Multiply,
                name("v"),
                num(2),
            )))])),
            ret(Some(call_name("double", vec![name("seed")]))),
        ]),
        let_stmt("r", call_name("runner", vec![num(21)])),
    ]));
    assert_eq!(machine.reg("g_r"), 42);
    assert_eq!(machine.reg("rsp"), 0);
}
