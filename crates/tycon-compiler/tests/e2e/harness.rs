//! Test harness: compiles modules and executes the emitted script on a
//! reference interpreter of the target language.
#![allow(dead_code)]

use rustc_hash::FxHashMap;
use tycon_ast as ast;
use tycon_compiler::{Compiler, CompilerOptions, Diagnostic, MemoryProvider, Severity};
use tycon_script::writer::Operand;
use tycon_script::{parse, Instr, Program};

// ============================================================================
// Compilation helpers
// ============================================================================

/// Compile a single in-memory module.
pub fn compile_module(module: ast::Module) -> (String, Vec<Diagnostic>) {
    let mut provider = MemoryProvider::new();
    provider.add_module("main.tc", module);
    let compiler = Compiler::new(&provider, CompilerOptions::default());
    let output = compiler.compile("main.tc").expect("compilation failed");
    (output.text, output.diagnostics)
}

/// Compile and require a clean (error-free) result.
pub fn compile_ok(module: ast::Module) -> String {
    let (text, diagnostics) = compile_module(module);
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert!(errors.is_empty(), "unexpected errors: {:?}\n{}", errors, text);
    text
}

/// Compile, run the new-game block, and hand back the machine.
pub fn run_module(module: ast::Module) -> Machine {
    let text = compile_ok(module);
    let mut machine = Machine::load(&text);
    machine.run_new_game();
    machine
}

// ============================================================================
// Reference interpreter
// ============================================================================

const FUEL: u64 = 5_000_000;

enum Flow {
    Normal,
    Exit,
    Terminate,
}

/// A tiny interpreter for the emitted script: named registers, flat
/// arrays, states with call/exit, conditional and loop blocks. Native
/// mnemonics it does not model are recorded as side effects.
pub struct Machine {
    program: Program,
    pub regs: FxHashMap<String, i64>,
    pub arrays: FxHashMap<String, Vec<i64>>,
    /// Native operations executed, in order, one joined line each.
    pub effects: Vec<String>,
    /// Actor properties backing `geta`/`seta`.
    pub actor: FxHashMap<String, i64>,
    /// Preset results for value-returning probes (`cansee`, ...).
    pub probes: FxHashMap<String, i64>,
    steps: u64,
}

impl Machine {
    pub fn load(text: &str) -> Machine {
        let program = parse(text).expect("emitted script failed to parse");
        let mut regs = FxHashMap::default();
        for (name, init) in &program.registers {
            regs.insert(name.clone(), *init);
        }
        let mut arrays = FxHashMap::default();
        for (name, size) in &program.arrays {
            arrays.insert(name.clone(), vec![0i64; *size as usize]);
        }
        Machine {
            program,
            regs,
            arrays,
            effects: Vec::new(),
            actor: FxHashMap::default(),
            probes: FxHashMap::default(),
            steps: 0,
        }
    }

    pub fn reg(&self, name: &str) -> i64 {
        *self.regs.get(name).unwrap_or_else(|| panic!("unknown register `{}`", name))
    }

    pub fn set_reg(&mut self, name: &str, value: i64) {
        self.regs.insert(name.to_string(), value);
    }

    pub fn array(&self, name: &str) -> &[i64] {
        self.arrays
            .get(name)
            .unwrap_or_else(|| panic!("unknown array `{}`", name))
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.program.state(name).is_some()
    }

    pub fn run_new_game(&mut self) {
        if let Some(body) = self.program.new_game.clone() {
            self.exec_block(&body);
        }
    }

    pub fn run_state(&mut self, name: &str) {
        let body = self
            .program
            .state(name)
            .unwrap_or_else(|| panic!("unknown state `{}`", name))
            .to_vec();
        self.exec_block(&body);
    }

    /// Run the body of the first actor block (the per-tick entry).
    pub fn run_actor(&mut self) {
        let body = self.program.actors.first().expect("no actor block").2.clone();
        self.exec_block(&body);
    }

    fn exec_block(&mut self, instrs: &[Instr]) -> Flow {
        for instr in instrs {
            match self.exec_instr(instr) {
                Flow::Normal => {}
                other => return other,
            }
        }
        Flow::Normal
    }

    fn exec_instr(&mut self, instr: &Instr) -> Flow {
        self.steps += 1;
        assert!(self.steps < FUEL, "script did not terminate");
        match instr {
            Instr::Cond { cond, a, b, then, els } => {
                if cond.eval(self.operand(a), self.operand(b)) {
                    self.exec_block(then)
                } else {
                    self.exec_block(els)
                }
            }
            Instr::While { a, b, body } => {
                while self.operand(a) != self.operand(b) {
                    self.steps += 1;
                    assert!(self.steps < FUEL, "loop did not terminate");
                    match self.exec_block(body) {
                        Flow::Normal => {}
                        other => return other,
                    }
                }
                Flow::Normal
            }
            Instr::Op(tokens) => self.exec_op(tokens),
        }
    }

    fn exec_op(&mut self, tokens: &[String]) -> Flow {
        let op = tokens[0].as_str();
        match op {
            "setvar" | "setvarvar" => self.apply(tokens, |_, v| v),
            "addvar" | "addvarvar" => self.apply(tokens, |a, v| a.wrapping_add(v)),
            "subvar" | "subvarvar" => self.apply(tokens, |a, v| a.wrapping_sub(v)),
            "mulvar" | "mulvarvar" => self.apply(tokens, |a, v| a.wrapping_mul(v)),
            "divvar" | "divvarvar" => self.apply(tokens, |a, v| if v == 0 { 0 } else { a / v }),
            "modvar" | "modvarvar" => self.apply(tokens, |a, v| if v == 0 { 0 } else { a % v }),
            "andvar" | "andvarvar" => self.apply(tokens, |a, v| a & v),
            "orvar" | "orvarvar" => self.apply(tokens, |a, v| a | v),
            "xorvar" | "xorvarvar" => self.apply(tokens, |a, v| a ^ v),
            "getarray" => {
                // getarray DST ARR IDX
                let idx = self.token_value(&tokens[3]);
                let value = self.array_read(&tokens[2], idx);
                self.regs.insert(tokens[1].clone(), value);
                Flow::Normal
            }
            "setarray" => {
                // setarray ARR IDX SRC
                let idx = self.token_value(&tokens[2]);
                let value = self.token_value(&tokens[3]);
                self.array_write(&tokens[1], idx, value);
                Flow::Normal
            }
            "resizearray" => {
                let size = self.token_value(&tokens[2]).max(0) as usize;
                self.arrays
                    .get_mut(tokens[1].as_str())
                    .unwrap_or_else(|| panic!("unknown array `{}`", tokens[1]))
                    .resize(size, 0);
                Flow::Normal
            }
            "call" => {
                let body = self
                    .program
                    .state(&tokens[1])
                    .unwrap_or_else(|| panic!("call to unknown state `{}`", tokens[1]))
                    .to_vec();
                match self.exec_block(&body) {
                    // exit only unwinds the called state
                    Flow::Normal | Flow::Exit => Flow::Normal,
                    Flow::Terminate => Flow::Terminate,
                }
            }
            "exit" => Flow::Exit,
            "terminate" => Flow::Terminate,
            "geta" => {
                // geta CODE DST
                let value = *self.actor.get(tokens[1].as_str()).unwrap_or(&0);
                self.regs.insert(tokens[2].clone(), value);
                Flow::Normal
            }
            "seta" => {
                let value = self.token_value(&tokens[2]);
                self.actor.insert(tokens[1].clone(), value);
                Flow::Normal
            }
            // host natives: record the effect; probes report a result
            _ => {
                self.effects.push(tokens.join(" "));
                match op {
                    "cansee" | "canshoot" | "awayfromwall" => {
                        let result = *self.probes.get(op).unwrap_or(&1);
                        self.regs.insert("racc".to_string(), result);
                    }
                    "randv" => {
                        let result = *self.probes.get(op).unwrap_or(&0);
                        self.regs.insert("racc".to_string(), result);
                    }
                    _ => {}
                }
                Flow::Normal
            }
        }
    }

    fn apply(&mut self, tokens: &[String], f: impl Fn(i64, i64) -> i64) -> Flow {
        let value = self.token_value(&tokens[2]);
        let current = *self.regs.get(tokens[1].as_str()).unwrap_or(&0);
        self.regs.insert(tokens[1].clone(), f(current, value));
        Flow::Normal
    }

    fn operand(&self, op: &Operand) -> i64 {
        match op {
            Operand::Imm(v) => *v,
            Operand::Reg(name) => *self.regs.get(name.as_str()).unwrap_or(&0),
        }
    }

    fn token_value(&self, token: &str) -> i64 {
        token
            .parse::<i64>()
            .unwrap_or_else(|_| *self.regs.get(token).unwrap_or(&0))
    }

    fn array_read(&self, name: &str, idx: i64) -> i64 {
        let array = self
            .arrays
            .get(name)
            .unwrap_or_else(|| panic!("unknown array `{}`", name));
        assert!(
            idx >= 0 && (idx as usize) < array.len(),
            "read out of bounds: {}[{}] (len {})",
            name,
            idx,
            array.len()
        );
        array[idx as usize]
    }

    fn array_write(&mut self, name: &str, idx: i64, value: i64) {
        let array = self
            .arrays
            .get_mut(name)
            .unwrap_or_else(|| panic!("unknown array `{}`", name));
        assert!(
            idx >= 0 && (idx as usize) < array.len(),
            "write out of bounds: {}[{}] (len {})",
            name,
            idx,
            array.len()
        );
        array[idx as usize] = value;
    }
}

// ============================================================================
// Syntax-tree builders
// ============================================================================

use ast::*;

pub fn sp() -> Span {
    Span::default()
}

pub fn at(line: u32) -> Span {
    Span::at_line(line)
}

pub fn id(name: &str) -> Identifier {
    Identifier::new(name, sp())
}

pub fn num(value: i64) -> Expression {
    Expression::NumberLiteral(NumberLiteral { value, span: sp() })
}

pub fn string(value: &str) -> Expression {
    Expression::StringLiteral(StringLiteral { value: value.to_string(), span: sp() })
}

pub fn name(n: &str) -> Expression {
    Expression::Identifier(id(n))
}

pub fn this() -> Expression {
    Expression::This(sp())
}

pub fn member(object: Expression, property: &str) -> Expression {
    Expression::Member(MemberExpression {
        object: Box::new(object),
        property: id(property),
        span: sp(),
    })
}

pub fn index(object: Expression, idx: Expression) -> Expression {
    Expression::Index(IndexExpression {
        object: Box::new(object),
        index: Box::new(idx),
        span: sp(),
    })
}

pub fn bin(op: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpression {
        operator: op,
        left: Box::new(left),
        right: Box::new(right),
        span: sp(),
    })
}

pub fn logical(op: LogicalOperator, left: Expression, right: Expression) -> Expression {
    Expression::Logical(LogicalExpression {
        operator: op,
        left: Box::new(left),
        right: Box::new(right),
        span: sp(),
    })
}

pub fn assign(target: Expression, value: Expression) -> Expression {
    Expression::Assignment(AssignmentExpression {
        target: Box::new(target),
        value: Box::new(value),
        span: sp(),
    })
}

pub fn call(callee: Expression, arguments: Vec<Expression>) -> Expression {
    Expression::Call(CallExpression {
        callee: Box::new(callee),
        arguments,
        span: sp(),
    })
}

pub fn call_name(name_str: &str, arguments: Vec<Expression>) -> Expression {
    call(name(name_str), arguments)
}

pub fn new_expr(class: &str, arguments: Vec<Expression>) -> Expression {
    Expression::New(NewExpression { class: id(class), arguments, span: sp() })
}

pub fn object(props: Vec<(&str, Expression)>) -> Expression {
    Expression::ObjectLiteral(ObjectLiteral {
        properties: props
            .into_iter()
            .map(|(n, value)| ObjectProperty { name: id(n), value, span: sp() })
            .collect(),
        span: sp(),
    })
}

pub fn array_lit(elements: Vec<Expression>) -> Expression {
    Expression::ArrayLiteral(ArrayLiteral { elements, span: sp() })
}

pub fn arrow(params: Vec<&str>, body: Vec<Statement>) -> Expression {
    Expression::Arrow(ArrowFunction {
        params: params.into_iter().map(param).collect(),
        body: block(body),
        span: sp(),
    })
}

pub fn param(name: &str) -> Parameter {
    Parameter {
        name: id(name),
        annotation: Some(TypeAnnotation::Named(id("number"))),
        span: sp(),
    }
}

pub fn block(statements: Vec<Statement>) -> BlockStatement {
    BlockStatement { statements, span: sp() }
}

pub fn let_stmt(name: &str, init: Expression) -> Statement {
    Statement::VariableDecl(VariableDecl {
        kind: VariableKind::Let,
        name: id(name),
        annotation: None,
        initializer: Some(init),
        span: sp(),
    })
}

pub fn let_typed(name: &str, ty: TypeAnnotation, init: Option<Expression>) -> Statement {
    Statement::VariableDecl(VariableDecl {
        kind: VariableKind::Let,
        name: id(name),
        annotation: Some(ty),
        initializer: init,
        span: sp(),
    })
}

pub fn const_stmt(name: &str, init: Expression) -> Statement {
    Statement::VariableDecl(VariableDecl {
        kind: VariableKind::Const,
        name: id(name),
        annotation: None,
        initializer: Some(init),
        span: sp(),
    })
}

pub fn expr_stmt(expression: Expression) -> Statement {
    Statement::Expression(ExpressionStatement { expression, span: sp() })
}

pub fn if_stmt(condition: Expression, then: Vec<Statement>) -> Statement {
    Statement::If(IfStatement {
        condition,
        then_branch: Box::new(Statement::Block(block(then))),
        else_branch: None,
        span: sp(),
    })
}

pub fn if_else(condition: Expression, then: Vec<Statement>, els: Vec<Statement>) -> Statement {
    Statement::If(IfStatement {
        condition,
        then_branch: Box::new(Statement::Block(block(then))),
        else_branch: Some(Box::new(Statement::Block(block(els)))),
        span: sp(),
    })
}

pub fn while_stmt(condition: Expression, body: Vec<Statement>) -> Statement {
    Statement::While(WhileStatement {
        condition,
        body: Box::new(Statement::Block(block(body))),
        span: sp(),
    })
}

pub fn switch(discriminant: Expression, cases: Vec<(Option<i64>, Vec<Statement>)>) -> Statement {
    Statement::Switch(SwitchStatement {
        discriminant,
        cases: cases
            .into_iter()
            .map(|(test, consequent)| SwitchCase {
                test: test.map(num),
                consequent,
                span: sp(),
            })
            .collect(),
        span: sp(),
    })
}

pub fn break_stmt() -> Statement {
    Statement::Break(BreakStatement { span: sp() })
}

pub fn ret(value: Option<Expression>) -> Statement {
    Statement::Return(ReturnStatement { value, span: sp() })
}

pub fn func(name: &str, params: Vec<&str>, body: Vec<Statement>) -> Statement {
    Statement::FunctionDecl(FunctionDecl {
        name: id(name),
        params: params.into_iter().map(param).collect(),
        return_type: Some(TypeAnnotation::Named(id("number"))),
        body: block(body),
        span: sp(),
    })
}

pub fn type_members(name_str: &str, members: Vec<(&str, &str)>) -> Statement {
    Statement::TypeAliasDecl(TypeAliasDecl {
        name: id(name_str),
        body: AliasBody::Members(
            members
                .into_iter()
                .map(|(n, ty)| AliasMember {
                    name: id(n),
                    annotation: TypeAnnotation::Named(id(ty)),
                    native_code: None,
                    span: sp(),
                })
                .collect(),
        ),
        span: sp(),
    })
}

pub fn module(statements: Vec<Statement>) -> Module {
    Module::new(statements)
}
