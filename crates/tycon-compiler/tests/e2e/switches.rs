//! Switch lowering: the called-state equality chain, native fallthrough,
//! break as a synthetic return, and return-from-switch propagation.

use super::harness::*;
use tycon_ast::BinaryOperator;

fn case_markers(input: i64, with_breaks: bool) -> tycon_ast::Module {
    let case_body = |reg: &str| {
        let mut stmts = vec![expr_stmt(assign(name(reg), num(1)))];
        if with_breaks {
            stmts.push(break_stmt());
        }
        stmts
    };
    module(vec![
        let_stmt("c1", num(0)),
        let_stmt("c2", num(0)),
        let_stmt("c3", num(0)),
        switch(
            num(input),
            vec![
                (Some(1), case_body("c1")),
                (Some(2), case_body("c2")),
                (Some(3), case_body("c3")),
            ],
        ),
    ])
}

#[test]
fn test_fallthrough_runs_matching_and_later_cases() {
    // input 2: case 2 and case 3 execute, case 1 never does
    let machine = run_module(case_markers(2, false));
    assert_eq!(machine.reg("g_c1"), 0);
    assert_eq!(machine.reg("g_c2"), 1);
    assert_eq!(machine.reg("g_c3"), 1);
}

#[test]
fn test_break_stops_fallthrough() {
    let machine = run_module(case_markers(2, true));
    assert_eq!(machine.reg("g_c1"), 0);
    assert_eq!(machine.reg("g_c2"), 1);
    assert_eq!(machine.reg("g_c3"), 0);
}

#[test]
fn test_no_case_matches() {
    let machine = run_module(case_markers(9, false));
    assert_eq!(machine.reg("g_c1"), 0);
    assert_eq!(machine.reg("g_c2"), 0);
    assert_eq!(machine.reg("g_c3"), 0);
}

#[test]
fn test_default_clause() {
    let machine = run_module(module(vec![
        let_stmt("r", num(0)),
        switch(
            num(42),
            vec![
                (Some(1), vec![expr_stmt(assign(name("r"), num(1))), break_stmt()]),
                (None, vec![expr_stmt(assign(name("r"), num(99))), break_stmt()]),
            ],
        ),
    ]));
    assert_eq!(machine.reg("g_r"), 99);
}

#[test]
fn test_return_inside_switch_unwinds_the_function() {
    // a switch lowers to a called state, so return must propagate out
    // through the synthetic call
    let machine = run_module(module(vec![
        let_stmt("after", num(0)),
        func("sel", vec!["n"], vec![
            switch(
                name("n"),
                vec![
                    (Some(1), vec![ret(Some(num(10)))]),
                    (Some(2), vec![ret(Some(num(20)))]),
                    (None, vec![ret(Some(num(30)))]),
                ],
            ),
            // unreachable when the switch returns
            expr_stmt(assign(name("after"), num(1))),
            ret(Some(num(99))),
        ]),
        let_stmt("a", call_name("sel", vec![num(1)])),
        let_stmt("b", call_name("sel", vec![num(2)])),
        let_stmt("c", call_name("sel", vec![num(7)])),
    ]));
    assert_eq!(machine.reg("g_a"), 10);
    assert_eq!(machine.reg("g_b"), 20);
    assert_eq!(machine.reg("g_c"), 30);
    assert_eq!(machine.reg("g_after"), 0, "code after a returning switch must not run");
    assert_eq!(machine.reg("rsp"), 0, "frames stay balanced through switch returns");
}

#[test]
fn test_nested_switch() {
    let machine = run_module(module(vec![
        let_stmt("r", num(0)),
        switch(
            num(1),
            vec![(Some(1), vec![
                switch(
                    num(5),
                    vec![
                        (Some(4), vec![expr_stmt(assign(name("r"), num(40))), break_stmt()]),
                        (Some(5), vec![expr_stmt(assign(name("r"), num(50))), break_stmt()]),
                    ],
                ),
                break_stmt(),
            ])],
        ),
    ]));
    assert_eq!(machine.reg("g_r"), 50);
}

#[test]
fn test_loop_inside_switch_break_targets_loop() {
    let machine = run_module(module(vec![
        let_stmt("n", num(0)),
        switch(
            num(1),
            vec![(Some(1), vec![
                while_stmt(
                    bin(BinaryOperator::LessThan, name("n"), num(10)),
                    vec![
                        expr_stmt(assign(name("n"), bin(BinaryOperator::Add, name("n"), num(1)))),
                        if_stmt(
                            bin(BinaryOperator::Equal, name("n"), num(4)),
                            vec![break_stmt()],
                        ),
                    ],
                ),
                expr_stmt(assign(name("n"), bin(BinaryOperator::Add, name("n"), num(100)))),
                break_stmt(),
            ])],
        ),
    ]));
    // the inner break left the loop, not the switch
    assert_eq!(machine.reg("g_n"), 104);
}

#[test]
fn test_non_constant_case_label_is_diagnosed() {
    let (_, diagnostics) = compile_module(module(vec![
        let_stmt("x", num(1)),
        func("probe", vec![], vec![ret(Some(num(1)))]),
        switch(
            name("x"),
            vec![(Some(1), vec![break_stmt()])],
        ),
    ]));
    assert!(diagnostics.is_empty(), "constant labels are fine: {:?}", diagnostics);

    // a call is not a compile-time constant
    let mut cases = module(vec![
        let_stmt("x", num(1)),
        func("probe", vec![], vec![ret(Some(num(1)))]),
    ]);
    cases.statements.push(tycon_ast::Statement::Switch(tycon_ast::SwitchStatement {
        discriminant: name("x"),
        cases: vec![tycon_ast::SwitchCase {
            test: Some(call_name("probe", vec![])),
            consequent: vec![break_stmt()],
            span: sp(),
        }],
        span: sp(),
    }));
    let (_, diagnostics) = compile_module(cases);
    assert!(
        diagnostics.iter().any(|d| d.message.contains("compile-time constant")),
        "{:?}",
        diagnostics
    );
}
