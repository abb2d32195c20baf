//! Actor and event blocks, the implicit receiver, native bindings, and
//! label tables.

use super::harness::*;
use tycon_ast::*;

fn actor_class(name_str: &str, picnum: i64, strength: i64, main_body: Vec<Statement>) -> Statement {
    Statement::ClassDecl(ClassDecl {
        name: id(name_str),
        extends: Some(id("Actor")),
        implements: vec![],
        members: vec![
            ClassMember::Constructor(ConstructorDecl {
                params: vec![],
                body: block(vec![expr_stmt(call_name(
                    "super",
                    vec![num(picnum), num(strength)],
                ))]),
                span: sp(),
            }),
            ClassMember::Method(MethodDecl {
                name: id("main"),
                params: vec![],
                return_type: None,
                body: Some(block(main_body)),
                is_static: false,
                span: sp(),
            }),
        ],
        span: sp(),
    })
}

#[test]
fn test_actor_block_emitted() {
    let text = compile_ok(module(vec![actor_class(
        "Turret",
        2120,
        30,
        vec![expr_stmt(call_name("sound", vec![num(17)]))],
    )]));
    assert!(text.contains("actor 2120 30"), "{}", text);
    assert!(text.contains("state fn_Turret_main"));
    assert!(text.contains("call fn_Turret_main"));
}

#[test]
fn test_actor_native_receiver_read_write() {
    let text = compile_ok(module(vec![actor_class(
        "Turret",
        2120,
        30,
        vec![if_stmt(
            bin(BinaryOperator::LessThan, member(this(), "health"), num(60)),
            vec![expr_stmt(assign(member(this(), "health"), num(100)))],
        )],
    )]));
    let mut machine = Machine::load(&text);
    machine.actor.insert("health".to_string(), 50);
    machine.run_actor();
    assert_eq!(machine.actor["health"], 100);

    let mut healthy = Machine::load(&text);
    healthy.actor.insert("health".to_string(), 80);
    healthy.run_actor();
    assert_eq!(healthy.actor["health"], 80);
}

#[test]
fn test_native_bindings_emit_opcodes() {
    let text = compile_ok(module(vec![actor_class(
        "Turret",
        2120,
        30,
        vec![
            expr_stmt(call_name("spawn", vec![num(1680)])),
            expr_stmt(call_name("sizeAt", vec![num(32), num(32)])),
            expr_stmt(call_name("killIt", vec![])),
        ],
    )]));
    let mut machine = Machine::load(&text);
    machine.run_actor();
    assert_eq!(
        machine.effects,
        vec!["spawn 1680", "sizeat 32 32", "killit"]
    );
}

#[test]
fn test_native_variable_argument() {
    let text = compile_ok(module(vec![actor_class(
        "Medkit",
        100,
        0,
        vec![
            let_stmt("boost", num(25)),
            expr_stmt(call_name("addHealth", vec![name("boost")])),
        ],
    )]));
    let mut machine = Machine::load(&text);
    machine.run_actor();
    assert_eq!(machine.effects.len(), 1);
    assert!(machine.effects[0].starts_with("addphealth "));
    // the evaluated argument rides in the scratch register
    let reg = machine.effects[0].split(' ').nth(1).unwrap().to_string();
    assert_eq!(machine.reg(&reg), 25);
}

#[test]
fn test_native_arity_and_kind_mismatches() {
    let (_, diagnostics) = compile_module(module(vec![actor_class(
        "Turret",
        2120,
        30,
        vec![
            expr_stmt(call_name("sizeAt", vec![num(32)])),
            expr_stmt(call_name("spawn", vec![call_name("canSee", vec![])])),
        ],
    )]));
    assert!(
        diagnostics.iter().any(|d| d.message.contains("at least 2")),
        "{:?}",
        diagnostics
    );
    assert!(
        diagnostics
            .iter()
            .any(|d| d.message.contains("compile-time constant")),
        "{:?}",
        diagnostics
    );
}

#[test]
fn test_label_tables_and_setters() {
    let text = compile_ok(module(vec![
        const_stmt("WALK", call_name("action", vec![num(0), num(4), num(5), num(1), num(12)])),
        const_stmt("FAST", call_name("move", vec![num(220), num(0)])),
        const_stmt("HUNT", call_name("ai", vec![name("WALK"), name("FAST"), num(1)])),
        actor_class(
            "Trooper",
            1680,
            30,
            vec![expr_stmt(call_name("setAi", vec![name("HUNT")]))],
        ),
    ]));
    assert!(text.contains("action act_WALK 0 4 5 1 12"), "{}", text);
    assert!(text.contains("move mov_FAST 220 0"));
    assert!(text.contains("ai ai_HUNT act_WALK mov_FAST 1"));
    assert!(text.contains("curai ai_HUNT"));

    // label tables precede all compiled bodies
    let label_pos = text.find("action act_WALK").unwrap();
    let body_pos = text.find("state ").unwrap();
    assert!(label_pos < body_pos);
}

#[test]
fn test_event_block() {
    let event = Statement::ClassDecl(ClassDecl {
        name: id("OnPickup"),
        extends: Some(id("GameEvent")),
        implements: vec![],
        members: vec![
            ClassMember::Constructor(ConstructorDecl {
                params: vec![],
                body: block(vec![expr_stmt(call_name("super", vec![string("EGS")]))]),
                span: sp(),
            }),
            ClassMember::Method(MethodDecl {
                name: id("main"),
                params: vec![],
                return_type: None,
                body: Some(block(vec![expr_stmt(call_name("globalSound", vec![num(5)]))])),
                is_static: false,
                span: sp(),
            }),
        ],
        span: sp(),
    });
    let text = compile_ok(module(vec![event]));
    assert!(text.contains("event EGS"), "{}", text);
    assert!(text.contains("state fn_OnPickup_main"));
}

#[test]
fn test_malformed_actor_constructor_abandons_declaration() {
    let bad = Statement::ClassDecl(ClassDecl {
        name: id("Broken"),
        extends: Some(id("Actor")),
        implements: vec![],
        members: vec![
            ClassMember::Constructor(ConstructorDecl {
                params: vec![],
                // a non-super statement violates the strict shape
                body: block(vec![expr_stmt(call_name("sound", vec![num(1)]))]),
                span: sp(),
            }),
            ClassMember::Method(MethodDecl {
                name: id("main"),
                params: vec![],
                return_type: None,
                body: Some(block(vec![])),
                is_static: false,
                span: sp(),
            }),
        ],
        span: sp(),
    });
    let (text, diagnostics) = compile_module(module(vec![bad, let_stmt("after", num(1))]));
    assert!(
        diagnostics.iter().any(|d| d.message.contains("super")),
        "{:?}",
        diagnostics
    );
    assert!(!text.contains("state fn_Broken_main"), "codegen abandoned");
    // sibling declarations still compile
    assert!(text.contains("var g_after 1"));
}
