//! Function compilation: frames, the calling convention, recursion, and
//! frame balance on every control path.

use super::harness::*;
use tycon_ast::BinaryOperator;

#[test]
fn test_call_with_arguments() {
    let machine = run_module(module(vec![
        func("add", vec!["x", "y"], vec![ret(Some(bin(
            BinaryOperator::Add,
            name("x"),
            name("y"),
        )))]),
        let_stmt("r", call_name("add", vec![num(2), num(3)])),
    ]));
    assert_eq!(machine.reg("g_r"), 5);
    // every frame set up was torn down
    assert_eq!(machine.reg("rsp"), 0, "stack top must return to zero");
    assert_eq!(machine.reg("rbp"), 0);
}

#[test]
fn test_recursion_factorial() {
    let machine = run_module(module(vec![
        func("fact", vec!["n"], vec![
            if_stmt(
                bin(BinaryOperator::LessEqual, name("n"), num(1)),
                vec![ret(Some(num(1)))],
            ),
            ret(Some(bin(
                BinaryOperator::Multiply,
                name("n"),
                call_name("fact", vec![bin(BinaryOperator::Subtract, name("n"), num(1))]),
            ))),
        ]),
        let_stmt("r", call_name("fact", vec![num(5)])),
    ]));
    assert_eq!(machine.reg("g_r"), 120);
    assert_eq!(machine.reg("rsp"), 0);
}

#[test]
fn test_frame_balance_on_both_return_paths() {
    let machine = run_module(module(vec![
        func("pick", vec!["n"], vec![
            if_stmt(
                bin(BinaryOperator::GreaterThan, name("n"), num(0)),
                vec![ret(Some(num(1)))],
            ),
            ret(Some(num(2)))
        ]),
        let_stmt("a", call_name("pick", vec![num(5)])),
        let_stmt("b", call_name("pick", vec![num(-5)])),
    ]));
    assert_eq!(machine.reg("g_a"), 1);
    assert_eq!(machine.reg("g_b"), 2);
    assert_eq!(machine.reg("rsp"), 0);
}

#[test]
fn test_implicit_fall_through_returns() {
    // no return statement: the fall-through epilogue still balances
    let machine = run_module(module(vec![
        let_stmt("side", num(0)),
        func("touch", vec![], vec![expr_stmt(assign(name("side"), num(9)))]),
        expr_stmt(call_name("touch", vec![])),
    ]));
    assert_eq!(machine.reg("g_side"), 9);
    assert_eq!(machine.reg("rsp"), 0);
}

#[test]
fn test_locals_do_not_leak_between_calls() {
    let machine = run_module(module(vec![
        func("work", vec!["seed"], vec![
            let_stmt("local", bin(BinaryOperator::Add, name("seed"), num(1))),
            ret(Some(name("local"))),
        ]),
        let_stmt("a", call_name("work", vec![num(10)])),
        let_stmt("b", call_name("work", vec![num(20)])),
    ]));
    assert_eq!(machine.reg("g_a"), 11);
    assert_eq!(machine.reg("g_b"), 21);
}

#[test]
fn test_nested_calls_as_operands_preserve_order() {
    // both operands are calls; the fixed evaluation order must hold
    let machine = run_module(module(vec![
        let_stmt("trace", num(0)),
        func("mark", vec!["v"], vec![
            // trace = trace * 10 + v records evaluation order
            expr_stmt(assign(
                name("trace"),
                bin(
                    BinaryOperator::Add,
                    bin(BinaryOperator::Multiply, name("trace"), num(10)),
                    name("v"),
                ),
            )),
            ret(Some(name("v"))),
        ]),
        let_stmt("r", bin(
            BinaryOperator::Subtract,
            call_name("mark", vec![num(7)]),
            call_name("mark", vec![num(3)]),
        )),
    ]));
    // the right operand evaluates first into a temporary
    assert_eq!(machine.reg("g_trace"), 37);
    assert_eq!(machine.reg("g_r"), 4);
}

#[test]
fn test_arity_mismatch_is_diagnosed_not_fatal() {
    let (text, diagnostics) = compile_module(module(vec![
        func("add", vec!["x", "y"], vec![ret(Some(num(0)))]),
        expr_stmt(call_name("add", vec![num(1)])),
        let_stmt("after", num(4)),
    ]));
    assert!(
        diagnostics.iter().any(|d| d.message.contains("expects 2 argument")),
        "{:?}",
        diagnostics
    );
    // sibling code still compiled
    assert!(text.contains("var g_after 4"));
}

#[test]
fn test_module_qualified_call() {
    let machine = run_module(module(vec![
        tycon_ast::Statement::ModuleDecl(tycon_ast::ModuleDecl {
            name: id("Weapons"),
            body: vec![func("damage", vec!["base"], vec![ret(Some(bin(
                BinaryOperator::Multiply,
                name("base"),
                num(3),
            )))])],
            span: sp(),
        }),
        let_stmt("r", call(member(name("Weapons"), "damage"), vec![num(7)])),
    ]));
    assert_eq!(machine.reg("g_r"), 21);
}
