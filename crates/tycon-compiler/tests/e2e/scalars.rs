//! Scalar declarations, arithmetic, and logical evaluation order.

use super::harness::*;
use tycon_ast::{BinaryOperator, LogicalOperator};

#[test]
fn test_scalar_round_trip_folded() {
    // let x = 2 + 3; if (x == 5) { hit = 1; }
    let machine = run_module(module(vec![
        let_stmt("x", bin(BinaryOperator::Add, num(2), num(3))),
        let_stmt("hit", num(0)),
        if_stmt(
            bin(BinaryOperator::Equal, name("x"), num(5)),
            vec![expr_stmt(assign(name("hit"), num(1)))],
        ),
    ]));
    assert_eq!(machine.reg("g_x"), 5);
    assert_eq!(machine.reg("g_hit"), 1);
}

#[test]
fn test_scalar_round_trip_computed() {
    // the sum comes from a call, so the condition reads a runtime value
    let machine = run_module(module(vec![
        func("two", vec![], vec![ret(Some(num(2)))]),
        let_stmt("x", bin(BinaryOperator::Add, call_name("two", vec![]), num(3))),
        let_stmt("hit", num(0)),
        if_stmt(
            bin(BinaryOperator::Equal, name("x"), num(5)),
            vec![expr_stmt(assign(name("hit"), num(1)))],
        ),
    ]));
    assert_eq!(machine.reg("g_x"), 5);
    assert_eq!(machine.reg("g_hit"), 1);
}

#[test]
fn test_arithmetic_operators() {
    let machine = run_module(module(vec![
        func("calc", vec!["a", "b"], vec![ret(Some(bin(
            BinaryOperator::Subtract,
            bin(BinaryOperator::Multiply, name("a"), name("b")),
            bin(BinaryOperator::Modulo, name("a"), name("b")),
        )))]),
        // 10 * 3 - 10 % 3 = 29
        let_stmt("r", call_name("calc", vec![num(10), num(3)])),
    ]));
    assert_eq!(machine.reg("g_r"), 29);
}

#[test]
fn test_unary_minus_and_not() {
    let machine = run_module(module(vec![
        func("neg", vec!["a"], vec![ret(Some(tycon_ast::Expression::Unary(
            tycon_ast::UnaryExpression {
                operator: tycon_ast::UnaryOperator::Minus,
                operand: Box::new(name("a")),
                span: sp(),
            },
        )))]),
        let_stmt("r", call_name("neg", vec![num(7)])),
    ]));
    assert_eq!(machine.reg("g_r"), -7);
}

#[test]
fn test_logical_operands_both_evaluate() {
    // no short-circuit: the right call runs even when the left is false
    let machine = run_module(module(vec![
        let_stmt("ran_a", num(0)),
        let_stmt("ran_b", num(0)),
        func("a", vec![], vec![
            expr_stmt(assign(name("ran_a"), num(1))),
            ret(Some(num(0))),
        ]),
        func("b", vec![], vec![
            expr_stmt(assign(name("ran_b"), num(1))),
            ret(Some(num(1))),
        ]),
        let_stmt("took_else", num(0)),
        if_else(
            logical(LogicalOperator::And, call_name("a", vec![]), call_name("b", vec![])),
            vec![],
            vec![expr_stmt(assign(name("took_else"), num(1)))],
        ),
    ]));
    assert_eq!(machine.reg("g_ran_a"), 1);
    assert_eq!(machine.reg("g_ran_b"), 1, "right operand must always evaluate");
    assert_eq!(machine.reg("g_took_else"), 1);
}

#[test]
fn test_string_literal_interns_quote() {
    let (text, diagnostics) = compile_module(module(vec![
        expr_stmt(call_name("quote", vec![string("PRESS TO OPERATE")])),
    ]));
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert!(text.contains("definequote 0 PRESS TO OPERATE"));

    let mut machine = Machine::load(&text);
    machine.run_new_game();
    assert_eq!(machine.effects, vec!["quote 0".to_string()]);
}

#[test]
fn test_const_folds_to_no_storage() {
    let (text, _) = compile_module(module(vec![
        const_stmt("LIMIT", num(12)),
        let_stmt("x", bin(BinaryOperator::Add, name("LIMIT"), num(1))),
    ]));
    // the const never becomes a register; its value folds into users
    assert!(!text.contains("var g_LIMIT"));
    assert!(text.contains("var g_x 13"));
}
