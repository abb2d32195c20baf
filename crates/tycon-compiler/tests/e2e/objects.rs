//! Layout-driven access: alias objects, arrays, aliasless literals, and
//! heap-resident class instances.

use super::harness::*;
use tycon_ast::{BinaryOperator, TypeAnnotation};

fn point_alias() -> tycon_ast::Statement {
    type_members("Point", vec![("x", "number"), ("y", "number")])
}

#[test]
fn test_alias_object_in_frame() {
    let machine = run_module(module(vec![
        point_alias(),
        func("mk", vec![], vec![
            let_typed(
                "p",
                TypeAnnotation::Named(id("Point")),
                Some(object(vec![("x", num(3)), ("y", num(4))])),
            ),
            ret(Some(bin(
                BinaryOperator::Add,
                member(name("p"), "x"),
                member(name("p"), "y"),
            ))),
        ]),
        let_stmt("r", call_name("mk", vec![])),
    ]));
    assert_eq!(machine.reg("g_r"), 7);
    assert_eq!(machine.reg("rsp"), 0);
}

#[test]
fn test_global_alias_object_read_write() {
    let machine = run_module(module(vec![
        point_alias(),
        let_typed(
            "gp",
            TypeAnnotation::Named(id("Point")),
            Some(object(vec![("x", num(1)), ("y", num(9))])),
        ),
        expr_stmt(assign(member(name("gp"), "y"), num(2))),
        let_stmt("r", bin(
            BinaryOperator::Add,
            member(name("gp"), "x"),
            member(name("gp"), "y"),
        )),
    ]));
    assert_eq!(machine.reg("g_r"), 3);
    // members in declaration order from offset 0
    assert_eq!(&machine.array("g_gp")[..2], &[1, 2]);
}

#[test]
fn test_nested_alias_offsets() {
    let machine = run_module(module(vec![
        point_alias(),
        type_members("Rect", vec![("min", "Point"), ("max", "Point")]),
        let_typed(
            "r",
            TypeAnnotation::Named(id("Rect")),
            Some(object(vec![
                ("min", object(vec![("x", num(1)), ("y", num(2))])),
                ("max", object(vec![("x", num(3)), ("y", num(4))])),
            ])),
        ),
        let_stmt("v", member(member(name("r"), "max"), "y")),
    ]));
    assert_eq!(machine.reg("g_v"), 4);
    assert_eq!(machine.array("g_r"), &[1, 2, 3, 4]);
}

#[test]
fn test_primitive_array_header_and_elements() {
    let machine = run_module(module(vec![
        let_stmt("arr", array_lit(vec![num(5), num(6), num(7)])),
        let_stmt("len", member(name("arr"), "length")),
        let_stmt("mid", index(name("arr"), num(1))),
    ]));
    // slot 0 bears the length, elements follow
    assert_eq!(machine.array("g_arr"), &[3, 5, 6, 7]);
    assert_eq!(machine.reg("g_len"), 3);
    assert_eq!(machine.reg("g_mid"), 6);
}

#[test]
fn test_dynamic_array_index() {
    let machine = run_module(module(vec![
        let_stmt("arr", array_lit(vec![num(10), num(20), num(30)])),
        let_stmt("i", num(2)),
        let_stmt("r", index(name("arr"), name("i"))),
        expr_stmt(assign(index(name("arr"), name("i")), num(99))),
    ]));
    assert_eq!(machine.reg("g_r"), 30);
    assert_eq!(machine.array("g_arr"), &[3, 10, 20, 99]);
}

#[test]
fn test_sized_array_constructor() {
    let (text, diagnostics) = compile_module(module(vec![
        let_stmt("buf", call_name("array", vec![num(8)])),
    ]));
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert!(text.contains("array g_buf 9"));
}

#[test]
fn test_unrecognized_array_size_warns_and_lays_out_zero() {
    let (text, diagnostics) = compile_module(module(vec![
        let_typed(
            "buf",
            TypeAnnotation::Array { element: id("number"), size: None, span: sp() },
            Some(num(3)),
        ),
    ]));
    assert!(
        diagnostics.iter().any(|d| d.message.contains("size hint")),
        "{:?}",
        diagnostics
    );
    assert!(text.contains("array g_buf 1"), "zero elements plus the header:\n{}", text);
}

#[test]
fn test_inline_literal_headers_then_bodies() {
    // { a: 1, b: [10,20,30,40], c: 2 } - the 4-element block lands
    // immediately after the literal's own property slots
    let machine = run_module(module(vec![
        let_stmt(
            "o",
            object(vec![
                ("a", num(1)),
                ("b", array_lit(vec![num(10), num(20), num(30), num(40)])),
                ("c", num(2)),
            ]),
        ),
        let_stmt("third", index(member(name("o"), "b"), num(2))),
        let_stmt("len", member(member(name("o"), "b"), "length")),
        let_stmt("c", member(name("o"), "c")),
    ]));
    assert_eq!(
        machine.array("g_o"),
        &[1, 4, 2, 10, 20, 30, 40],
        "headers first (a, b-length, c), then b's element block"
    );
    assert_eq!(machine.reg("g_third"), 30);
    assert_eq!(machine.reg("g_len"), 4);
    assert_eq!(machine.reg("g_c"), 2);
}

#[test]
fn test_inline_literal_nested_object() {
    let machine = run_module(module(vec![
        let_stmt(
            "o",
            object(vec![
                ("a", num(1)),
                ("inner", object(vec![("p", num(2)), ("q", array_lit(vec![num(7), num(8)]))])),
            ]),
        ),
        let_stmt("p", member(member(name("o"), "inner"), "p")),
        let_stmt("q1", index(member(member(name("o"), "inner"), "q"), num(1))),
    ]));
    // headers a=0 inner=1; inner block at 2: p, q-header, then 7 8
    assert_eq!(machine.array("g_o"), &[1, 2, 2, 2, 7, 8]);
    assert_eq!(machine.reg("g_p"), 2);
    assert_eq!(machine.reg("g_q1"), 8);
}

#[test]
fn test_class_instances_on_heap() {
    use tycon_ast::*;
    let counter = Statement::ClassDecl(ClassDecl {
        name: id("Counter"),
        extends: None,
        implements: vec![],
        members: vec![
            ClassMember::Field(FieldDecl {
                name: id("value"),
                annotation: Some(TypeAnnotation::Named(id("number"))),
                initializer: Some(num(0)),
                is_static: false,
                is_readonly: false,
                span: sp(),
            }),
            ClassMember::Constructor(ConstructorDecl {
                params: vec![param("start")],
                body: block(vec![expr_stmt(assign(
                    member(this(), "value"),
                    name("start"),
                ))]),
                span: sp(),
            }),
            ClassMember::Method(MethodDecl {
                name: id("bump"),
                params: vec![],
                return_type: Some(TypeAnnotation::Named(id("number"))),
                body: Some(block(vec![
                    expr_stmt(assign(
                        member(this(), "value"),
                        bin(BinaryOperator::Add, member(this(), "value"), num(1)),
                    )),
                    ret(Some(member(this(), "value"))),
                ])),
                is_static: false,
                span: sp(),
            }),
        ],
        span: sp(),
    });

    let machine = run_module(module(vec![
        counter,
        let_stmt("c", new_expr("Counter", vec![num(10)])),
        expr_stmt(call(member(name("c"), "bump"), vec![])),
        let_stmt("v", call(member(name("c"), "bump"), vec![])),
        let_stmt("direct", member(name("c"), "value")),
    ]));
    assert_eq!(machine.reg("g_v"), 12);
    assert_eq!(machine.reg("g_direct"), 12);
    assert_eq!(machine.reg("rsp"), 0);
}

#[test]
fn test_two_instances_are_distinct_blocks() {
    use tycon_ast::*;
    let cell = Statement::ClassDecl(ClassDecl {
        name: id("Cell"),
        extends: None,
        implements: vec![],
        members: vec![
            ClassMember::Field(FieldDecl {
                name: id("v"),
                annotation: Some(TypeAnnotation::Named(id("number"))),
                initializer: None,
                is_static: false,
                is_readonly: false,
                span: sp(),
            }),
            ClassMember::Constructor(ConstructorDecl {
                params: vec![param("v")],
                body: block(vec![expr_stmt(assign(member(this(), "v"), name("v")))]),
                span: sp(),
            }),
        ],
        span: sp(),
    });

    let machine = run_module(module(vec![
        cell,
        let_stmt("a", new_expr("Cell", vec![num(111)])),
        let_stmt("b", new_expr("Cell", vec![num(222)])),
        let_stmt("av", member(name("a"), "v")),
        let_stmt("bv", member(name("b"), "v")),
    ]));
    assert_ne!(machine.reg("g_a"), machine.reg("g_b"), "distinct allocations");
    assert_eq!(machine.reg("g_av"), 111);
    assert_eq!(machine.reg("g_bv"), 222);
}
