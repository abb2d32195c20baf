//! Expression code generation
//!
//! Three modes, chosen by context: *retrieval* (the value must be known at
//! compile time - `const_eval`), *value* (emit code leaving the result in
//! the accumulator - `emit_value`), and *assignment-target* (store the
//! right-hand value into a resolved storage location - `emit_assign`).
//! Evaluation order is fixed: the right operand of a binary expression is
//! computed first into a stack-protected temporary when both sides are
//! non-trivial, because target-side side effects are order-sensitive.
//! Logical and/or never short-circuit; both operands always evaluate.

use super::{pop_reg, push_reg, frame_addr, load_frame, store_frame, Codegen, ClassKind};
use crate::layout::{is_primitive, parse_array_text, parse_pointer_text, LayoutEngine};
use crate::natives::{self, Callee, NativeArg};
use crate::symbols::{Symbol, SymbolKind};
use tycon_ast as ast;
use tycon_script::ops;
use tycon_script::regs::{HEAP, RACC, RFN, RSC0, RSC1, STACK};
use tycon_script::writer::ArithOp::{self, Add, Set};
use tycon_script::{Cond, Operand, ScriptWriter};

/// A compile-time value produced in retrieval mode.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ConstVal {
    Num(i64),
    Label(String),
}

impl ConstVal {
    pub(crate) fn num(&self) -> Option<i64> {
        match self {
            ConstVal::Num(v) => Some(*v),
            ConstVal::Label(_) => None,
        }
    }
}

/// A resolved storage location. Indexed variants leave the element index
/// in `rsc1`; `HeapAddr` leaves an absolute heap slot in `rsc0`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Access {
    Const(i64),
    Reg(String),
    Frame(u32),
    FrameIndexed { base: u32 },
    GlobalSlot { array: String, index: u32 },
    GlobalIndexed { array: String, base: u32 },
    HeapAddr,
    Actor(String),
    Error,
}

/// Base slot of an aggregate on the stack frame or in a global array.
#[derive(Clone)]
enum AggStore {
    Frame(u32),
    Global(String, u32),
}

impl AggStore {
    fn advance(&self, rel: u32) -> AggStore {
        match self {
            AggStore::Frame(base) => AggStore::Frame(base + rel),
            AggStore::Global(array, base) => AggStore::Global(array.clone(), base + rel),
        }
    }

    fn slot_access(&self, rel: u32) -> Access {
        match self {
            AggStore::Frame(base) => Access::Frame(base + rel),
            AggStore::Global(array, base) => Access::GlobalSlot {
                array: array.clone(),
                index: base + rel,
            },
        }
    }

    /// Access with the element index already in `rsc1`.
    fn indexed_access(&self, rel: u32) -> Access {
        match self {
            AggStore::Frame(base) => Access::FrameIndexed { base: base + rel },
            AggStore::Global(array, base) => Access::GlobalIndexed {
                array: array.clone(),
                base: base + rel,
            },
        }
    }
}

/// Where an aggregate path currently points while a member chain resolves.
enum PathBase {
    /// Frame-resident aggregate at a static offset.
    Frame { offset: u32, type_text: String },
    /// Slot range inside a named global array.
    Global { array: String, offset: u32, type_text: String },
    /// Heap object: pointer value in `racc`, members at static offsets.
    Heap { offset: u32, type_text: String },
    /// Aliasless literal: resolved through its child symbols (headers in
    /// property order, bodies after all siblings).
    Inline { store: AggStore, children: Vec<(String, Symbol)> },
    /// An array property of an aliasless literal: the header slot sits
    /// among the siblings, the element block elsewhere.
    InlineArray { store: AggStore, header: u32, elems: u32, len: u32 },
    /// The implicit actor receiver.
    ActorThis,
    Failed,
}

impl Codegen<'_> {
    // ========================================================================
    // Retrieval mode
    // ========================================================================

    /// Evaluate an expression at compile time, or None if it needs code.
    pub(crate) fn const_eval(&self, expr: &ast::Expression) -> Option<ConstVal> {
        match expr {
            ast::Expression::NumberLiteral(lit) => Some(ConstVal::Num(lit.value)),
            ast::Expression::BooleanLiteral(lit) => {
                Some(ConstVal::Num(if lit.value { 1 } else { 0 }))
            }
            ast::Expression::Identifier(_) | ast::Expression::Member(_) => {
                let symbol = self.resolve_dotted(expr)?;
                match symbol.kind {
                    SymbolKind::Constant => symbol.value.map(ConstVal::Num),
                    SymbolKind::Native => symbol.emitted_name.map(ConstVal::Label),
                    _ => None,
                }
            }
            ast::Expression::Unary(unary) => {
                let v = self.const_eval(&unary.operand)?.num()?;
                Some(ConstVal::Num(match unary.operator {
                    ast::UnaryOperator::Minus => -v,
                    ast::UnaryOperator::Not => (v == 0) as i64,
                }))
            }
            ast::Expression::Binary(binary) => {
                let l = self.const_eval(&binary.left)?.num()?;
                let r = self.const_eval(&binary.right)?.num()?;
                fold_binary(binary.operator, l, r).map(ConstVal::Num)
            }
            ast::Expression::Logical(logical) => {
                let l = self.const_eval(&logical.left)?.num()?;
                let r = self.const_eval(&logical.right)?.num()?;
                Some(ConstVal::Num(match logical.operator {
                    ast::LogicalOperator::And => ((l != 0) && (r != 0)) as i64,
                    ast::LogicalOperator::Or => ((l != 0) || (r != 0)) as i64,
                }))
            }
            _ => None,
        }
    }

    /// Resolve a pure dotted symbol path (`E.A`, `Weapons.ammo`, `x`).
    pub(crate) fn resolve_dotted(&self, expr: &ast::Expression) -> Option<Symbol> {
        match expr {
            ast::Expression::Identifier(ident) => self.symbols.resolve(&ident.name).cloned(),
            ast::Expression::Member(member) => {
                let base = self.resolve_dotted(&member.object)?;
                match base.kind {
                    SymbolKind::Enum | SymbolKind::Class => {
                        base.child(&member.property.name).cloned()
                    }
                    SymbolKind::Module => self
                        .symbols
                        .resolve(&format!("{}.{}", base.name, member.property.name))
                        .cloned(),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    // ========================================================================
    // Value mode
    // ========================================================================

    /// Emit code leaving the expression's value in the accumulator.
    pub(crate) fn emit_value(&mut self, w: &mut ScriptWriter, expr: &ast::Expression) {
        if let Some(cv) = self.const_eval(expr) {
            match cv {
                ConstVal::Num(v) => w.arith(Set, RACC, v),
                ConstVal::Label(_) => {
                    self.diags
                        .error("a label cannot be used as a value", expr.span().line);
                    w.arith(Set, RACC, 0);
                }
            }
            return;
        }

        match expr {
            ast::Expression::NumberLiteral(_)
            | ast::Expression::BooleanLiteral(_) => unreachable!("handled by const_eval"),
            ast::Expression::StringLiteral(lit) => {
                let idx = self.unit.add_quote(&lit.value);
                w.arith(Set, RACC, idx as i64);
            }
            ast::Expression::Identifier(_)
            | ast::Expression::This(_)
            | ast::Expression::Member(_)
            | ast::Expression::Index(_) => {
                let access = self.resolve_access(w, expr);
                self.emit_load_access(w, &access);
            }
            ast::Expression::Binary(binary) => self.emit_binary(w, binary),
            ast::Expression::Logical(logical) => self.emit_logical(w, logical),
            ast::Expression::Unary(unary) => self.emit_unary(w, unary),
            ast::Expression::Assignment(assign) => {
                self.emit_assign(w, &assign.target, &assign.value, assign.span.line)
            }
            ast::Expression::Call(call) => self.emit_call(w, call),
            ast::Expression::New(new) => self.emit_new(w, new),
            ast::Expression::Arrow(arrow) => {
                let tag = self.compile_closure(arrow);
                w.arith(Set, RACC, tag);
            }
            ast::Expression::ObjectLiteral(lit) => {
                self.diags.error(
                    "an object literal is only valid as a declaration initializer",
                    lit.span.line,
                );
                w.arith(Set, RACC, 0);
            }
            ast::Expression::ArrayLiteral(lit) => {
                self.diags.error(
                    "an array literal is only valid as a declaration initializer",
                    lit.span.line,
                );
                w.arith(Set, RACC, 0);
            }
        }
    }

    fn emit_binary(&mut self, w: &mut ScriptWriter, binary: &ast::BinaryExpression) {
        // right operand first into a temporary when both sides are
        // non-trivial, keeping the accumulator free for the left side
        let right_const = self.const_eval(&binary.right).and_then(|cv| cv.num());
        let right: Operand = match right_const {
            Some(v) => Operand::Imm(v),
            None => {
                self.emit_value(w, &binary.right);
                push_reg(w, RACC);
                Operand::Reg(RSC1.to_string())
            }
        };
        self.emit_value(w, &binary.left);
        if right_const.is_none() {
            pop_reg(w, RSC1);
        }

        if binary.operator.is_comparison() {
            let cond = comparison_cond(binary.operator);
            w.begin_cond(cond, RACC, right);
            w.arith(Set, RACC, 1);
            w.begin_else();
            w.arith(Set, RACC, 0);
            w.end_block();
        } else {
            let op = match binary.operator {
                ast::BinaryOperator::Add => ArithOp::Add,
                ast::BinaryOperator::Subtract => ArithOp::Sub,
                ast::BinaryOperator::Multiply => ArithOp::Mul,
                ast::BinaryOperator::Divide => ArithOp::Div,
                ast::BinaryOperator::Modulo => ArithOp::Mod,
                ast::BinaryOperator::BitAnd => ArithOp::And,
                ast::BinaryOperator::BitOr => ArithOp::Or,
                ast::BinaryOperator::BitXor => ArithOp::Xor,
                _ => unreachable!("comparison handled above"),
            };
            w.arith(op, RACC, right);
        }
    }

    /// No short-circuit: both operands always evaluate, then one
    /// two-operand conditional block produces the flag.
    fn emit_logical(&mut self, w: &mut ScriptWriter, logical: &ast::LogicalExpression) {
        self.emit_value(w, &logical.left);
        push_reg(w, RACC);
        self.emit_value(w, &logical.right);
        w.arith(Set, RSC1, RACC);
        pop_reg(w, RSC0);
        let cond = match logical.operator {
            ast::LogicalOperator::And => Cond::Both,
            ast::LogicalOperator::Or => Cond::Either,
        };
        w.begin_cond(cond, RSC0, RSC1);
        w.arith(Set, RACC, 1);
        w.begin_else();
        w.arith(Set, RACC, 0);
        w.end_block();
    }

    fn emit_unary(&mut self, w: &mut ScriptWriter, unary: &ast::UnaryExpression) {
        self.emit_value(w, &unary.operand);
        match unary.operator {
            ast::UnaryOperator::Minus => w.arith(ArithOp::Mul, RACC, -1),
            ast::UnaryOperator::Not => {
                w.begin_cond(Cond::Eq, RACC, 0);
                w.arith(Set, RACC, 1);
                w.begin_else();
                w.arith(Set, RACC, 0);
                w.end_block();
            }
        }
    }

    // ========================================================================
    // Assignment-target mode
    // ========================================================================

    /// Store the right-hand value into an already-resolved location. The
    /// assigned value is left in the accumulator (assignment is an
    /// expression).
    pub(crate) fn emit_assign(
        &mut self,
        w: &mut ScriptWriter,
        target: &ast::Expression,
        value: &ast::Expression,
        line: u32,
    ) {
        let access = self.resolve_access(w, target);
        match access {
            Access::Const(_) => {
                self.diags.error("cannot assign to a constant", line);
                self.emit_value(w, value);
            }
            Access::Error => {
                self.emit_value(w, value);
            }
            Access::Reg(reg) => {
                self.emit_value(w, value);
                w.arith(Set, &reg, RACC);
            }
            Access::Frame(offset) => {
                self.emit_value(w, value);
                store_frame(w, RSC0, offset);
            }
            Access::GlobalSlot { array, index } => {
                self.emit_value(w, value);
                w.set_array(&array, index as i64, RACC);
            }
            Access::Actor(code) => {
                self.emit_value(w, value);
                w.line(&format!("{} {} {}", ops::SETA, code, RACC));
            }
            Access::FrameIndexed { base } => {
                push_reg(w, RSC1);
                self.emit_value(w, value);
                pop_reg(w, RSC1);
                frame_addr(w, RSC0, base);
                w.arith(Add, RSC0, RSC1);
                w.set_array(STACK, RSC0, RACC);
            }
            Access::GlobalIndexed { array, base } => {
                push_reg(w, RSC1);
                self.emit_value(w, value);
                pop_reg(w, RSC1);
                if base > 0 {
                    w.arith(Add, RSC1, base as i64);
                }
                w.set_array(&array, RSC1, RACC);
            }
            Access::HeapAddr => {
                push_reg(w, RSC0);
                self.emit_value(w, value);
                pop_reg(w, RSC1);
                w.set_array(HEAP, RSC1, RACC);
            }
        }
    }

    // ========================================================================
    // Storage resolution
    // ========================================================================

    /// Read a resolved location into the accumulator.
    pub(crate) fn emit_load_access(&mut self, w: &mut ScriptWriter, access: &Access) {
        match access {
            Access::Const(v) => w.arith(Set, RACC, *v),
            Access::Reg(reg) => w.arith(Set, RACC, reg.as_str()),
            Access::Frame(offset) => load_frame(w, RSC0, *offset),
            Access::FrameIndexed { base } => {
                frame_addr(w, RSC0, *base);
                w.arith(Add, RSC0, RSC1);
                w.get_array(RACC, STACK, RSC0);
            }
            Access::GlobalSlot { array, index } => {
                w.get_array(RACC, array, *index as i64);
            }
            Access::GlobalIndexed { array, base } => {
                w.arith(Set, RSC0, RSC1);
                if *base > 0 {
                    w.arith(Add, RSC0, *base as i64);
                }
                w.get_array(RACC, array, RSC0);
            }
            Access::HeapAddr => w.get_array(RACC, HEAP, RSC0),
            Access::Actor(code) => w.line(&format!("{} {} {}", ops::GETA, code, RACC)),
            Access::Error => w.arith(Set, RACC, 0),
        }
    }

    /// Resolve an expression to a storage location, emitting index or
    /// address computations where the shape requires them.
    pub(crate) fn resolve_access(&mut self, w: &mut ScriptWriter, expr: &ast::Expression) -> Access {
        match expr {
            ast::Expression::Identifier(ident) => {
                let symbol = self.symbols.resolve_or_error(&ident.name, ident.span);
                self.scalar_access(&symbol, ident.span.line)
            }
            ast::Expression::This(span) => match self.current_class_kind() {
                Some(ClassKind::Plain) => Access::Frame(0),
                Some(_) => {
                    self.diags.error(
                        "`this` on an actor is only valid for member access",
                        span.line,
                    );
                    Access::Error
                }
                None => {
                    self.diags.error("`this` outside a class", span.line);
                    Access::Error
                }
            },
            ast::Expression::Member(member) => {
                // pure constant paths (enums, class consts, module members)
                if let Some(symbol) = self.resolve_dotted(expr) {
                    if symbol.kind == SymbolKind::Constant {
                        return Access::Const(symbol.value.unwrap_or(0));
                    }
                    if symbol.kind != SymbolKind::Module && symbol.is_global_storage() {
                        return self.scalar_access(&symbol, member.span.line);
                    }
                }
                self.resolve_member(w, member)
            }
            ast::Expression::Index(index) => self.resolve_index(w, index),
            other => {
                self.diags.error(
                    "expression does not resolve to a storage location",
                    other.span().line,
                );
                Access::Error
            }
        }
    }

    /// Access for a symbol with scalar storage (one slot).
    fn scalar_access(&mut self, symbol: &Symbol, line: u32) -> Access {
        match symbol.kind {
            SymbolKind::Error => {
                self.diags
                    .error(format!("cannot find name `{}`", symbol.name), line);
                Access::Error
            }
            SymbolKind::Constant => Access::Const(symbol.value.unwrap_or(0)),
            SymbolKind::Number
            | SymbolKind::Str
            | SymbolKind::Boolean
            | SymbolKind::Pointer => match &symbol.emitted_name {
                Some(reg) => Access::Reg(reg.clone()),
                None => Access::Frame(symbol.offset),
            },
            SymbolKind::Function => {
                // closure tags live in scalar slots; declared functions
                // have emitted state names and are not values
                match &symbol.emitted_name {
                    Some(name) if name.starts_with("fn_") => {
                        self.diags.error(
                            format!("function `{}` is not a value", symbol.name),
                            line,
                        );
                        Access::Error
                    }
                    Some(reg) => Access::Reg(reg.clone()),
                    None => Access::Frame(symbol.offset),
                }
            }
            SymbolKind::Native => {
                self.diags.error(
                    format!("`{}` is a label and cannot be used here", symbol.name),
                    line,
                );
                Access::Error
            }
            SymbolKind::Object | SymbolKind::Array => {
                self.diags.error(
                    format!("`{}` is an aggregate, not a scalar", symbol.name),
                    line,
                );
                Access::Error
            }
            SymbolKind::Class | SymbolKind::Enum | SymbolKind::Module => {
                self.diags
                    .error(format!("`{}` is not a value", symbol.name), line);
                Access::Error
            }
        }
    }

    fn resolve_member(&mut self, w: &mut ScriptWriter, member: &ast::MemberExpression) -> Access {
        let line = member.span.line;
        let prop = member.property.name.as_str();
        match self.resolve_base(w, &member.object) {
            PathBase::Failed => Access::Error,
            PathBase::Inline { store, children } => {
                match children.iter().find(|(name, _)| name == prop) {
                    Some((_, child)) => match child.kind {
                        SymbolKind::Number => store.slot_access(child.offset),
                        _ => {
                            self.diags.error(
                                format!("`{}` is an aggregate, not a scalar", prop),
                                line,
                            );
                            Access::Error
                        }
                    },
                    None => {
                        self.diags
                            .error(format!("no property `{}` on the literal", prop), line);
                        Access::Error
                    }
                }
            }
            PathBase::InlineArray { store, header, .. } => {
                if prop == "length" {
                    store.slot_access(header)
                } else {
                    self.diags
                        .error(format!("no property `{}` on an array", prop), line);
                    Access::Error
                }
            }
            PathBase::ActorThis => match self.actor_native_code(prop) {
                Some(code) => Access::Actor(code),
                None => {
                    self.diags.error(
                        format!("actor has no native member `{}`", prop),
                        line,
                    );
                    Access::Error
                }
            },
            PathBase::Frame { offset, type_text } => {
                if prop == "length" && parse_array_text(&type_text).is_some() {
                    // the length-bearing header slot
                    return Access::Frame(offset);
                }
                match self.member_slot(&type_text, prop, line) {
                    Some((member_offset, _)) => Access::Frame(offset + member_offset),
                    None => Access::Error,
                }
            }
            PathBase::Global { array, offset, type_text } => {
                if prop == "length" && parse_array_text(&type_text).is_some() {
                    return Access::GlobalSlot { array, index: offset };
                }
                match self.member_slot(&type_text, prop, line) {
                    Some((member_offset, _)) => Access::GlobalSlot {
                        array,
                        index: offset + member_offset,
                    },
                    None => Access::Error,
                }
            }
            PathBase::Heap { offset, type_text } => {
                match self.member_slot(&type_text, prop, line) {
                    Some((member_offset, _)) => {
                        w.arith(Set, RSC0, RACC);
                        let total = offset + member_offset;
                        if total > 0 {
                            w.arith(Add, RSC0, total as i64);
                        }
                        Access::HeapAddr
                    }
                    None => Access::Error,
                }
            }
        }
    }

    fn resolve_index(&mut self, w: &mut ScriptWriter, index: &ast::IndexExpression) -> Access {
        let line = index.span.line;
        let base = self.resolve_base(w, &index.object);

        // inline-literal arrays: elements live in the body block, the
        // header among the sibling slots
        if let PathBase::InlineArray { store, elems, len, .. } = base {
            let const_index = self.const_eval(&index.index).and_then(|cv| cv.num());
            return match const_index {
                Some(i) => {
                    if i < 0 || i as u32 >= len {
                        self.diags
                            .warning(format!("index {} is out of bounds", i), line);
                    }
                    store.slot_access(elems + i.max(0) as u32)
                }
                None => {
                    self.emit_value(w, &index.index);
                    w.arith(Set, RSC1, RACC);
                    store.indexed_access(elems)
                }
            };
        }

        let (elem, count) = match &base {
            PathBase::Frame { type_text, .. }
            | PathBase::Global { type_text, .. }
            | PathBase::Heap { type_text, .. } => match parse_array_text(type_text) {
                Some((elem, count)) => (elem, count),
                None => {
                    self.diags.error("only arrays can be indexed", line);
                    return Access::Error;
                }
            },
            PathBase::Inline { .. } => {
                self.diags.error("only arrays can be indexed", line);
                return Access::Error;
            }
            PathBase::ActorThis => {
                self.diags.error("the actor receiver cannot be indexed", line);
                return Access::Error;
            }
            PathBase::Failed | PathBase::InlineArray { .. } => return Access::Error,
        };
        if !is_primitive(&elem) {
            self.diags.error(
                "indexing an object array requires a compile-time index via member access",
                line,
            );
            return Access::Error;
        }

        // numeric index literals collapse at compile time
        let const_index = self.const_eval(&index.index).and_then(|cv| cv.num());
        if let Some(i) = const_index {
            if i < 0 || count.map(|n| i as u32 >= n).unwrap_or(false) {
                self.diags
                    .warning(format!("index {} is out of bounds", i), line);
            }
            let slot = 1 + i.max(0) as u32;
            return match base {
                PathBase::Frame { offset, .. } => Access::Frame(offset + slot),
                PathBase::Global { array, offset, .. } => Access::GlobalSlot {
                    array,
                    index: offset + slot,
                },
                PathBase::Heap { offset, .. } => {
                    w.arith(Set, RSC0, RACC);
                    w.arith(Add, RSC0, (offset + slot) as i64);
                    Access::HeapAddr
                }
                _ => unreachable!(),
            };
        }

        match base {
            PathBase::Frame { offset, .. } => {
                self.emit_value(w, &index.index);
                w.arith(Set, RSC1, RACC);
                Access::FrameIndexed { base: offset + 1 }
            }
            PathBase::Global { array, offset, .. } => {
                self.emit_value(w, &index.index);
                w.arith(Set, RSC1, RACC);
                Access::GlobalIndexed { array, base: offset + 1 }
            }
            PathBase::Heap { .. } => {
                self.diags.error(
                    "a computed index into a heap array must be a compile-time constant",
                    line,
                );
                Access::Error
            }
            _ => unreachable!(),
        }
    }

    /// Resolve the aggregate an access path starts from.
    fn resolve_base(&mut self, w: &mut ScriptWriter, expr: &ast::Expression) -> PathBase {
        match expr {
            ast::Expression::Identifier(ident) => {
                let symbol = self.symbols.resolve_or_error(&ident.name, ident.span);
                match symbol.kind {
                    SymbolKind::Error => {
                        self.diags.error(
                            format!("cannot find name `{}`", symbol.name),
                            ident.span.line,
                        );
                        PathBase::Failed
                    }
                    SymbolKind::Object | SymbolKind::Array => {
                        let store = match symbol.emitted_name.clone() {
                            Some(array) => AggStore::Global(array, 0),
                            None => AggStore::Frame(symbol.offset),
                        };
                        if symbol.type_text.is_none() {
                            // aliasless literal; navigate its child symbols
                            return PathBase::Inline {
                                store,
                                children: symbol.children.clone().unwrap_or_default(),
                            };
                        }
                        let type_text = symbol.type_text.clone().unwrap_or_default();
                        match store {
                            AggStore::Global(array, offset) => {
                                PathBase::Global { array, offset, type_text }
                            }
                            AggStore::Frame(offset) => PathBase::Frame { offset, type_text },
                        }
                    }
                    SymbolKind::Pointer => {
                        let type_text = symbol.type_text.clone().unwrap_or_default();
                        let access = self.scalar_access(&symbol, ident.span.line);
                        self.emit_load_access(w, &access);
                        PathBase::Heap { offset: 0, type_text }
                    }
                    _ => {
                        self.diags.error(
                            format!("`{}` has no members", symbol.name),
                            ident.span.line,
                        );
                        PathBase::Failed
                    }
                }
            }
            ast::Expression::This(span) => match self.current_class_kind() {
                Some(ClassKind::Actor) | Some(ClassKind::Event) => PathBase::ActorThis,
                Some(ClassKind::Plain) => {
                    let class = self.current_class.as_ref().map(|c| c.name.clone());
                    load_frame(w, RSC0, 0);
                    PathBase::Heap { offset: 0, type_text: class.unwrap_or_default() }
                }
                None => {
                    self.diags.error("`this` outside a class", span.line);
                    PathBase::Failed
                }
            },
            ast::Expression::Member(member) => {
                let line = member.span.line;
                let prop = member.property.name.clone();
                match self.resolve_base(w, &member.object) {
                    PathBase::Failed => PathBase::Failed,
                    PathBase::ActorThis => {
                        self.diags.error(
                            format!("actor member `{}` is not an aggregate", prop),
                            line,
                        );
                        PathBase::Failed
                    }
                    PathBase::Inline { store, children } => {
                        let found = children
                            .iter()
                            .enumerate()
                            .find(|(_, (name, _))| name == &prop)
                            .map(|(idx, (_, child))| (idx as u32, child.clone()));
                        match found {
                            Some((idx, child)) => match child.kind {
                                SymbolKind::Object => PathBase::Inline {
                                    store: store.advance(child.offset),
                                    children: child.children.clone().unwrap_or_default(),
                                },
                                SymbolKind::Array => PathBase::InlineArray {
                                    store,
                                    header: idx,
                                    elems: child.offset,
                                    len: child.elem_count.unwrap_or(0),
                                },
                                _ => {
                                    self.diags.error(
                                        format!("`{}` has no members", prop),
                                        line,
                                    );
                                    PathBase::Failed
                                }
                            },
                            None => {
                                self.diags.error(
                                    format!("no property `{}` on the literal", prop),
                                    line,
                                );
                                PathBase::Failed
                            }
                        }
                    }
                    PathBase::InlineArray { .. } => {
                        self.diags.error(
                            format!("array elements have no member `{}`", prop),
                            line,
                        );
                        PathBase::Failed
                    }
                    PathBase::Frame { offset, type_text } => {
                        match self.aggregate_member(&type_text, &prop, line) {
                            Some((member_offset, member_text)) => {
                                // a pointer member dereferences into the heap
                                if let Some(pointee) = parse_pointer_text(&member_text) {
                                    load_frame(w, RSC0, offset + member_offset);
                                    PathBase::Heap { offset: 0, type_text: pointee.to_string() }
                                } else {
                                    PathBase::Frame {
                                        offset: offset + member_offset,
                                        type_text: member_text,
                                    }
                                }
                            }
                            None => PathBase::Failed,
                        }
                    }
                    PathBase::Global { array, offset, type_text } => {
                        match self.aggregate_member(&type_text, &prop, line) {
                            Some((member_offset, member_text)) => {
                                if let Some(pointee) = parse_pointer_text(&member_text) {
                                    w.get_array(RACC, &array, (offset + member_offset) as i64);
                                    PathBase::Heap { offset: 0, type_text: pointee.to_string() }
                                } else {
                                    PathBase::Global {
                                        array,
                                        offset: offset + member_offset,
                                        type_text: member_text,
                                    }
                                }
                            }
                            None => PathBase::Failed,
                        }
                    }
                    PathBase::Heap { offset, type_text } => {
                        match self.aggregate_member(&type_text, &prop, line) {
                            Some((member_offset, member_text)) => {
                                if let Some(pointee) = parse_pointer_text(&member_text) {
                                    w.arith(Set, RSC0, RACC);
                                    let total = offset + member_offset;
                                    if total > 0 {
                                        w.arith(Add, RSC0, total as i64);
                                    }
                                    w.get_array(RACC, HEAP, RSC0);
                                    PathBase::Heap { offset: 0, type_text: pointee.to_string() }
                                } else {
                                    PathBase::Heap {
                                        offset: offset + member_offset,
                                        type_text: member_text,
                                    }
                                }
                            }
                            None => PathBase::Failed,
                        }
                    }
                }
            }
            ast::Expression::Index(index) => {
                let line = index.span.line;
                let base = self.resolve_base(w, &index.object);
                let const_index = self.const_eval(&index.index).and_then(|cv| cv.num());
                let (elem, count) = match &base {
                    PathBase::Frame { type_text, .. }
                    | PathBase::Global { type_text, .. }
                    | PathBase::Heap { type_text, .. } => match parse_array_text(type_text) {
                        Some(parsed) => parsed,
                        None => {
                            self.diags.error("only arrays can be indexed", line);
                            return PathBase::Failed;
                        }
                    },
                    PathBase::InlineArray { .. } => {
                        self.diags.error("array elements have no members", line);
                        return PathBase::Failed;
                    }
                    PathBase::Failed => return PathBase::Failed,
                    _ => {
                        self.diags.error("only arrays can be indexed", line);
                        return PathBase::Failed;
                    }
                };
                if is_primitive(&elem) {
                    // a scalar element is not an aggregate base
                    self.diags.error(
                        format!("`{}` elements have no members", elem),
                        line,
                    );
                    return PathBase::Failed;
                }
                let i = match const_index {
                    Some(i) if i >= 0 => i as u32,
                    _ => {
                        self.diags.error(
                            "an object-array element index must be a compile-time constant",
                            line,
                        );
                        return PathBase::Failed;
                    }
                };
                let n = count.unwrap_or(0);
                if i >= n {
                    self.diags
                        .warning(format!("index {} is out of bounds", i), line);
                }
                let elem_size = {
                    let engine = LayoutEngine::new(&self.aliases);
                    engine.size_of(&elem).unwrap_or(1)
                };
                // pointer slots first, then the element sub-blocks
                let member_offset = n + i * elem_size;
                match base {
                    PathBase::Frame { offset, .. } => PathBase::Frame {
                        offset: offset + member_offset,
                        type_text: elem,
                    },
                    PathBase::Global { array, offset, .. } => PathBase::Global {
                        array,
                        offset: offset + member_offset,
                        type_text: elem,
                    },
                    PathBase::Heap { offset, .. } => PathBase::Heap {
                        offset: offset + member_offset,
                        type_text: elem,
                    },
                    _ => unreachable!(),
                }
            }
            other => {
                self.diags.error(
                    "unsupported access shape",
                    other.span().line,
                );
                PathBase::Failed
            }
        }
    }

    /// Offset and type text of a scalar member inside an alias shape.
    fn member_slot(&mut self, type_text: &str, prop: &str, line: u32) -> Option<(u32, String)> {
        let result = {
            let engine = LayoutEngine::new(&self.aliases);
            engine.layout_of(type_text).map(|layout| {
                layout
                    .member(prop)
                    .map(|m| (m.offset, m.type_text.clone(), m.native_code.clone()))
            })
        };
        match result {
            Ok(Some((offset, text, native))) => {
                if native.is_some() {
                    self.diags.error(
                        format!("`{}` is a native member and needs an actor receiver", prop),
                        line,
                    );
                    return None;
                }
                Some((offset, text))
            }
            Ok(None) => {
                self.diags.error(
                    format!("no member `{}` on type `{}`", prop, type_text),
                    line,
                );
                None
            }
            Err(issue) => {
                self.diags.error(issue.to_string(), line);
                None
            }
        }
    }

    /// Like `member_slot`, for members that are themselves aggregates.
    fn aggregate_member(&mut self, type_text: &str, prop: &str, line: u32) -> Option<(u32, String)> {
        self.member_slot(type_text, prop, line)
    }

    /// Native property code for the implicit actor receiver, resolved
    /// through the built-in `Actor` shape.
    fn actor_native_code(&self, prop: &str) -> Option<String> {
        self.aliases
            .shape("Actor")
            .and_then(|shape| shape.member(prop))
            .and_then(|m| m.native_code.clone())
    }

    pub(crate) fn current_class_kind(&self) -> Option<ClassKind> {
        self.current_class.as_ref().map(|c| c.kind)
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Emit a call expression; the result (for value-returning callees)
    /// lands in the accumulator.
    pub(crate) fn emit_call(&mut self, w: &mut ScriptWriter, call: &ast::CallExpression) {
        let line = call.span.line;
        match call.callee.as_ref() {
            ast::Expression::Identifier(ident) => {
                match ident.name.as_str() {
                    "action" | "move" | "ai" => {
                        self.diags.error(
                            format!(
                                "`{}` labels may only be declared by a module-level const",
                                ident.name
                            ),
                            line,
                        );
                        w.arith(Set, RACC, 0);
                        return;
                    }
                    "array" => {
                        self.diags.error(
                            "`array` is only valid as a declaration initializer",
                            line,
                        );
                        w.arith(Set, RACC, 0);
                        return;
                    }
                    _ => {}
                }
                // a call site resolves once: user symbol, else native
                let callee = match self.symbols.resolve(&ident.name) {
                    Some(symbol) => Callee::User(symbol.clone()),
                    None => match natives::lookup(&ident.name) {
                        Some(descriptor) => Callee::Native(descriptor),
                        None => {
                            self.diags.error(
                                format!("cannot find function `{}`", ident.name),
                                line,
                            );
                            w.arith(Set, RACC, 0);
                            return;
                        }
                    },
                };
                match callee {
                    Callee::Native(descriptor) => self.emit_native_call(w, descriptor, call),
                    Callee::User(symbol) => self.emit_symbol_call(w, &symbol, call),
                }
            }
            ast::Expression::Member(member) => self.emit_method_call(w, member, call),
            other => {
                self.diags
                    .error("expression is not callable", other.span().line);
                w.arith(Set, RACC, 0);
            }
        }
    }

    fn emit_symbol_call(&mut self, w: &mut ScriptWriter, symbol: &Symbol, call: &ast::CallExpression) {
        let line = call.span.line;
        match symbol.kind {
            SymbolKind::Function => match symbol.emitted_name.clone() {
                Some(state) if state.starts_with("fn_") => {
                    let expected = symbol.size.unwrap_or(0) as usize;
                    if call.arguments.len() != expected {
                        self.diags.error(
                            format!(
                                "`{}` expects {} argument(s), got {}",
                                symbol.name,
                                expected,
                                call.arguments.len()
                            ),
                            line,
                        );
                        return;
                    }
                    self.emit_user_call(w, &state, None, &call.arguments, line);
                }
                // a variable holding a closure tag
                _ => self.emit_closure_invoke(w, symbol, &call.arguments, line),
            },
            // a number-typed binding may carry a closure tag (e.g. a
            // callback parameter); dispatch decides at runtime
            SymbolKind::Number => self.emit_closure_invoke(w, symbol, &call.arguments, line),
            SymbolKind::Error => {
                self.diags
                    .error(format!("cannot find function `{}`", symbol.name), line);
            }
            _ => {
                self.diags
                    .error(format!("`{}` is not callable", symbol.name), line);
            }
        }
    }

    fn emit_method_call(
        &mut self,
        w: &mut ScriptWriter,
        member: &ast::MemberExpression,
        call: &ast::CallExpression,
    ) {
        let line = call.span.line;
        let method = member.property.name.clone();

        // module-qualified function call
        if let Some(symbol) = self.resolve_dotted(call.callee.as_ref()) {
            if symbol.kind == SymbolKind::Function && symbol.emitted_name.is_some() {
                return self.emit_symbol_call(w, &symbol, call);
            }
        }

        match member.object.as_ref() {
            ast::Expression::This(span) => {
                let class = match self.current_class.as_ref() {
                    Some(ctx) => ctx.clone(),
                    None => {
                        self.diags.error("`this` outside a class", span.line);
                        return;
                    }
                };
                match self.find_method(&class.name, &method) {
                    Some(info) => {
                        if call.arguments.len() != info.params {
                            self.diags.error(
                                format!(
                                    "`{}` expects {} argument(s), got {}",
                                    method,
                                    info.params,
                                    call.arguments.len()
                                ),
                                line,
                            );
                            return;
                        }
                        let state = super::mangle_method_name(&info.defining, &method);
                        let this = match class.kind {
                            // actor methods share the implicit receiver
                            ClassKind::Actor | ClassKind::Event => None,
                            ClassKind::Plain => {
                                if info.is_static {
                                    None
                                } else {
                                    Some(member.object.as_ref())
                                }
                            }
                        };
                        self.emit_user_call(w, &state, this, &call.arguments, line);
                    }
                    None => {
                        self.diags.error(
                            format!("class `{}` has no method `{}`", class.name, method),
                            line,
                        );
                    }
                }
            }
            object => {
                // class-qualified static call: `Counter.reset()`
                if let ast::Expression::Identifier(ident) = object {
                    let is_class = self
                        .symbols
                        .resolve(&ident.name)
                        .map(|s| s.kind == SymbolKind::Class)
                        .unwrap_or(false);
                    if is_class {
                        match self.find_method(&ident.name, &method) {
                            Some(info) if info.is_static => {
                                if call.arguments.len() != info.params {
                                    self.diags.error(
                                        format!(
                                            "`{}` expects {} argument(s), got {}",
                                            method,
                                            info.params,
                                            call.arguments.len()
                                        ),
                                        line,
                                    );
                                    return;
                                }
                                let state = super::mangle_method_name(&info.defining, &method);
                                self.emit_user_call(w, &state, None, &call.arguments, line);
                            }
                            Some(_) => self.diags.error(
                                format!("`{}` is not a static method", method),
                                line,
                            ),
                            None => self.diags.error(
                                format!("class `{}` has no method `{}`", ident.name, method),
                                line,
                            ),
                        }
                        return;
                    }
                }
                // a pointer receiver with a statically-known class
                let class_name = match self.receiver_class(object) {
                    Some(name) => name,
                    None => {
                        self.diags.error(
                            format!("cannot resolve a receiver for `{}`", method),
                            line,
                        );
                        return;
                    }
                };
                match self.find_method(&class_name, &method) {
                    Some(info) => {
                        if call.arguments.len() != info.params {
                            self.diags.error(
                                format!(
                                    "`{}` expects {} argument(s), got {}",
                                    method,
                                    info.params,
                                    call.arguments.len()
                                ),
                                line,
                            );
                            return;
                        }
                        let state = super::mangle_method_name(&info.defining, &method);
                        let this = if info.is_static { None } else { Some(object) };
                        self.emit_user_call(w, &state, this, &call.arguments, line);
                    }
                    None => {
                        self.diags.error(
                            format!("class `{}` has no method `{}`", class_name, method),
                            line,
                        );
                    }
                }
            }
        }
    }

    /// The declared class of a pointer-typed receiver expression.
    fn receiver_class(&self, object: &ast::Expression) -> Option<String> {
        match object {
            ast::Expression::Identifier(ident) => {
                let symbol = self.symbols.resolve(&ident.name)?;
                if symbol.kind == SymbolKind::Pointer {
                    symbol.type_text.clone()
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub(crate) fn find_method(&self, class: &str, method: &str) -> Option<super::MethodInfo> {
        let mut current = Some(class.to_string());
        while let Some(name) = current {
            if let Some(info) = self.classes.get(&name) {
                if let Some(found) = info.methods.get(method) {
                    return Some(found.clone());
                }
                current = info.base.clone();
            } else {
                return None;
            }
        }
        None
    }

    /// Calling convention: arguments ride in `ra0..` with a save/restore
    /// bracket sized to the argument count protecting caller-live
    /// registers across the call. The result comes back in the
    /// accumulator.
    pub(crate) fn emit_user_call(
        &mut self,
        w: &mut ScriptWriter,
        state: &str,
        this: Option<&ast::Expression>,
        args: &[ast::Expression],
        line: u32,
    ) {
        let argc = args.len() + usize::from(this.is_some());
        if argc > tycon_script::regs::ARG_REG_COUNT {
            self.diags.error(
                format!("too many arguments ({}, max 8)", argc),
                line,
            );
            return;
        }
        for i in 0..argc {
            push_reg(w, &tycon_script::regs::arg(i));
        }
        let mut next = 0usize;
        if let Some(receiver) = this {
            self.emit_value(w, receiver);
            w.arith(Set, &tycon_script::regs::arg(0), RACC);
            next = 1;
        }
        for arg in args {
            self.emit_value(w, arg);
            w.arith(Set, &tycon_script::regs::arg(next), RACC);
            next += 1;
        }
        w.call(state);
        for i in (0..argc).rev() {
            pop_reg(w, &tycon_script::regs::arg(i));
        }
    }

    /// Invoking a first-class function value: set the dispatch tag and run
    /// the owning file's shared dispatch state.
    fn emit_closure_invoke(
        &mut self,
        w: &mut ScriptWriter,
        symbol: &Symbol,
        args: &[ast::Expression],
        line: u32,
    ) {
        let argc = args.len();
        if argc > tycon_script::regs::ARG_REG_COUNT {
            self.diags
                .error(format!("too many arguments ({}, max 8)", argc), line);
            return;
        }
        for i in 0..argc {
            push_reg(w, &tycon_script::regs::arg(i));
        }
        for (i, arg) in args.iter().enumerate() {
            self.emit_value(w, arg);
            w.arith(Set, &tycon_script::regs::arg(i), RACC);
        }
        match &symbol.emitted_name {
            Some(reg) => w.arith(Set, RACC, reg.as_str()),
            None => load_frame(w, RSC0, symbol.offset),
        }
        w.arith(Set, RFN, RACC);
        let dispatch = self.dispatch.state_name().to_string();
        w.call(&dispatch);
        for i in (0..argc).rev() {
            pop_reg(w, &tycon_script::regs::arg(i));
        }
    }

    /// Fixed-arity native call: constants fold, strings become quote
    /// indexes, labels resolve to their emitted names, and variable
    /// arguments evaluate into scratch registers.
    fn emit_native_call(
        &mut self,
        w: &mut ScriptWriter,
        descriptor: &'static natives::NativeDescriptor,
        call: &ast::CallExpression,
    ) {
        let line = call.span.line;
        if call.arguments.len() < descriptor.min_args {
            self.diags.error(
                format!(
                    "`{}` expects at least {} argument(s), got {}",
                    descriptor.name,
                    descriptor.min_args,
                    call.arguments.len()
                ),
                line,
            );
            return;
        }
        if call.arguments.len() > descriptor.args.len() {
            self.diags.error(
                format!(
                    "`{}` expects at most {} argument(s), got {}",
                    descriptor.name,
                    descriptor.args.len(),
                    call.arguments.len()
                ),
                line,
            );
            return;
        }

        let mut tokens: Vec<Option<String>> = vec![None; call.arguments.len()];
        let mut var_positions = Vec::new();

        for (i, arg) in call.arguments.iter().enumerate() {
            match descriptor.args[i] {
                NativeArg::Constant => match self.const_eval(arg).and_then(|cv| cv.num()) {
                    Some(v) => tokens[i] = Some(v.to_string()),
                    None => {
                        self.diags.error(
                            format!(
                                "argument {} of `{}` must be a compile-time constant",
                                i + 1,
                                descriptor.name
                            ),
                            line,
                        );
                        return;
                    }
                },
                NativeArg::Str => match arg {
                    ast::Expression::StringLiteral(lit) => {
                        let idx = self.unit.add_quote(&lit.value);
                        tokens[i] = Some(idx.to_string());
                    }
                    _ => {
                        self.diags.error(
                            format!(
                                "argument {} of `{}` must be a string literal",
                                i + 1,
                                descriptor.name
                            ),
                            line,
                        );
                        return;
                    }
                },
                NativeArg::Label => match self.resolve_dotted(arg) {
                    Some(symbol)
                        if symbol.kind == SymbolKind::Native && symbol.emitted_name.is_some() =>
                    {
                        tokens[i] = symbol.emitted_name;
                    }
                    _ => {
                        self.diags.error(
                            format!(
                                "argument {} of `{}` must name a declared label",
                                i + 1,
                                descriptor.name
                            ),
                            line,
                        );
                        return;
                    }
                },
                NativeArg::Variable => var_positions.push(i),
            }
        }

        if var_positions.len() > 2 {
            self.diags.error(
                format!("`{}` has too many runtime arguments", descriptor.name),
                line,
            );
            return;
        }
        for &i in &var_positions {
            self.emit_value(w, &call.arguments[i]);
            push_reg(w, RACC);
        }
        for (slot, &i) in var_positions.iter().enumerate().rev() {
            let reg = if slot == 0 { RSC0 } else { RSC1 };
            pop_reg(w, reg);
            tokens[i] = Some(reg.to_string());
        }

        let mut text = descriptor.opcode.to_string();
        for token in tokens.into_iter().flatten() {
            text.push(' ');
            text.push_str(&token);
        }
        w.line(&text);
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// `new C(...)`: allocate the instance on the heap, run the
    /// constructor with the pointer as the implicit first argument, and
    /// leave the pointer in the accumulator.
    pub(crate) fn emit_new(&mut self, w: &mut ScriptWriter, new: &ast::NewExpression) {
        let line = new.span.line;
        let class = new.class.name.clone();
        match self.classes.get(&class).map(|info| info.kind) {
            Some(Some(ClassKind::Plain)) => {}
            Some(_) => {
                self.diags.error(
                    format!("`{}` is host-managed and cannot be constructed", class),
                    line,
                );
                w.arith(Set, RACC, 0);
                return;
            }
            None => {
                self.diags
                    .error(format!("cannot find class `{}`", class), line);
                w.arith(Set, RACC, 0);
                return;
            }
        }
        let size = {
            let engine = LayoutEngine::new(&self.aliases);
            engine.size_of(&class).unwrap_or(0)
        };
        let ctor_params = self
            .classes
            .get(&class)
            .and_then(|info| info.methods.get("ctor"))
            .map(|m| m.params)
            .unwrap_or(0);
        if new.arguments.len() != ctor_params {
            self.diags.error(
                format!(
                    "`new {}` expects {} argument(s), got {}",
                    class,
                    ctor_params,
                    new.arguments.len()
                ),
                line,
            );
            w.arith(Set, RACC, 0);
            return;
        }

        w.arith(Set, tycon_script::regs::RHSZ, size.max(1) as i64);
        w.call(crate::heap::STATE_ALLOC);
        push_reg(w, tycon_script::regs::RHPTR);

        let argc = new.arguments.len() + 1;
        if argc > tycon_script::regs::ARG_REG_COUNT {
            self.diags
                .error(format!("too many arguments ({}, max 8)", argc), line);
            pop_reg(w, RACC);
            return;
        }
        for i in 0..argc {
            push_reg(w, &tycon_script::regs::arg(i));
        }
        w.arith(Set, &tycon_script::regs::arg(0), tycon_script::regs::RHPTR);
        for (i, arg) in new.arguments.iter().enumerate() {
            self.emit_value(w, arg);
            w.arith(Set, &tycon_script::regs::arg(i + 1), RACC);
        }
        w.call(&super::mangle_method_name(&class, "ctor"));
        for i in (0..argc).rev() {
            pop_reg(w, &tycon_script::regs::arg(i));
        }
        pop_reg(w, RACC);
    }
}

fn comparison_cond(op: ast::BinaryOperator) -> Cond {
    match op {
        ast::BinaryOperator::Equal => Cond::Eq,
        ast::BinaryOperator::NotEqual => Cond::Ne,
        ast::BinaryOperator::LessThan => Cond::Lt,
        ast::BinaryOperator::GreaterThan => Cond::Gt,
        ast::BinaryOperator::LessEqual => Cond::Le,
        ast::BinaryOperator::GreaterEqual => Cond::Ge,
        _ => unreachable!("not a comparison"),
    }
}

fn fold_binary(op: ast::BinaryOperator, l: i64, r: i64) -> Option<i64> {
    Some(match op {
        ast::BinaryOperator::Add => l.wrapping_add(r),
        ast::BinaryOperator::Subtract => l.wrapping_sub(r),
        ast::BinaryOperator::Multiply => l.wrapping_mul(r),
        ast::BinaryOperator::Divide => {
            if r == 0 {
                return None;
            }
            l / r
        }
        ast::BinaryOperator::Modulo => {
            if r == 0 {
                return None;
            }
            l % r
        }
        ast::BinaryOperator::BitAnd => l & r,
        ast::BinaryOperator::BitOr => l | r,
        ast::BinaryOperator::BitXor => l ^ r,
        ast::BinaryOperator::Equal => (l == r) as i64,
        ast::BinaryOperator::NotEqual => (l != r) as i64,
        ast::BinaryOperator::LessThan => (l < r) as i64,
        ast::BinaryOperator::GreaterThan => (l > r) as i64,
        ast::BinaryOperator::LessEqual => (l <= r) as i64,
        ast::BinaryOperator::GreaterEqual => (l >= r) as i64,
    })
}
