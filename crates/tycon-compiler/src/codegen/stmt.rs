//! Statement and control-flow lowering
//!
//! Conditions must reduce to one of a fixed set of recognized shapes,
//! lowered to a single conditional block over two pre-evaluated scratch
//! registers; anything else is a diagnostic with a never-true guard so
//! compilation continues. While loops run on a continue flag recomputed
//! at the bottom of the body. Switches lower into their own called state
//! - an equality chain over the captured switch value with a matched
//! flag, native fallthrough, and `exit` as `break` - so the lowerer
//! tracks whether `break` currently means "leave the loop" or "pop out
//! of the switch".

use super::{pop_reg, push_reg, store_frame, Codegen, FlowKind};
use crate::layout::{array_size_hint, inline_object_layout, InlineBody, InlineObject, LayoutEngine};
use crate::symbols::{Symbol, SymbolKind};
use tycon_ast as ast;
use tycon_script::regs::{RACC, RCASE, RRET, RSC0, RSC1, RSW, RWHL};
use tycon_script::writer::ArithOp::Set;
use tycon_script::{Cond, ScriptWriter};

/// The condition shapes an `if`/`while` may take.
enum CondShape<'e> {
    /// A binary comparison.
    Cmp(Cond, &'e ast::Expression, &'e ast::Expression),
    /// Logical and/or of two subexpressions, or a negated or.
    Pair(Cond, &'e ast::Expression, &'e ast::Expression),
    /// A bare truthy identifier, property access, or literal.
    Truthy(&'e ast::Expression),
    /// A call used as a truthy probe (non-zero-return convention).
    Probe(&'e ast::CallExpression),
}

/// Storage shape of one variable declaration; computed identically by the
/// frame pre-pass and the emitting visitor so offsets line up.
#[derive(Debug, Clone)]
pub(crate) struct DeclShape {
    pub kind: SymbolKind,
    pub type_text: Option<String>,
    pub slots: u32,
    pub elem_count: Option<u32>,
    pub inline: Option<InlineObject>,
}

impl DeclShape {
    fn scalar(kind: SymbolKind) -> Self {
        DeclShape { kind, type_text: None, slots: 1, elem_count: None, inline: None }
    }

    fn scalar_typed(kind: SymbolKind, type_text: String) -> Self {
        DeclShape { kind, type_text: Some(type_text), slots: 1, elem_count: None, inline: None }
    }
}

impl Codegen<'_> {
    // ========================================================================
    // Statement dispatch
    // ========================================================================

    pub(crate) fn visit_stmt(&mut self, w: &mut ScriptWriter, stmt: &ast::Statement) {
        match stmt {
            ast::Statement::VariableDecl(decl) => self.visit_var_decl(w, decl),
            ast::Statement::Expression(expr_stmt) => {
                self.emit_value(w, &expr_stmt.expression);
            }
            ast::Statement::If(if_stmt) => self.visit_if(w, if_stmt),
            ast::Statement::While(while_stmt) => self.visit_while(w, while_stmt),
            ast::Statement::Switch(switch) => self.visit_switch(w, switch),
            ast::Statement::Break(brk) => self.visit_break(w, brk),
            ast::Statement::Return(ret) => self.visit_return(w, ret),
            ast::Statement::Block(block) => self.visit_block(w, block),
            ast::Statement::Empty(_) => {}
            other => {
                self.diags.error(
                    "declaration is not allowed in this position",
                    other.span().line,
                );
            }
        }
    }

    pub(crate) fn visit_block(&mut self, w: &mut ScriptWriter, block: &ast::BlockStatement) {
        self.symbols.push_scope(crate::symbols::ScopeKind::Block);
        for stmt in &block.statements {
            self.visit_stmt(w, stmt);
        }
        self.symbols.pop_scope();
    }

    // ========================================================================
    // Conditions
    // ========================================================================

    fn classify_condition<'e>(&self, expr: &'e ast::Expression) -> Option<CondShape<'e>> {
        match expr {
            ast::Expression::Binary(binary) if binary.operator.is_comparison() => {
                Some(CondShape::Cmp(
                    comparison_cond(binary.operator),
                    &binary.left,
                    &binary.right,
                ))
            }
            ast::Expression::Logical(logical) => {
                let cond = match logical.operator {
                    ast::LogicalOperator::And => Cond::Both,
                    ast::LogicalOperator::Or => Cond::Either,
                };
                Some(CondShape::Pair(cond, &logical.left, &logical.right))
            }
            // negated or: !(a || b)
            ast::Expression::Unary(unary) if unary.operator == ast::UnaryOperator::Not => {
                match unary.operand.as_ref() {
                    ast::Expression::Logical(inner)
                        if inner.operator == ast::LogicalOperator::Or =>
                    {
                        Some(CondShape::Pair(Cond::Neither, &inner.left, &inner.right))
                    }
                    _ => None,
                }
            }
            ast::Expression::Identifier(_)
            | ast::Expression::Member(_)
            | ast::Expression::Index(_)
            | ast::Expression::NumberLiteral(_)
            | ast::Expression::BooleanLiteral(_) => Some(CondShape::Truthy(expr)),
            ast::Expression::Call(call) => Some(CondShape::Probe(call)),
            _ => None,
        }
    }

    /// Pre-evaluate two condition operands into the fixed scratch pair.
    fn emit_cond_operands(
        &mut self,
        w: &mut ScriptWriter,
        a: &ast::Expression,
        b: &ast::Expression,
    ) {
        self.emit_value(w, a);
        push_reg(w, RACC);
        self.emit_value(w, b);
        w.arith(Set, RSC1, RACC);
        pop_reg(w, RSC0);
    }

    /// Open the conditional block for a recognized shape; returns false if
    /// the shape was unrecognized (a never-true guard was opened instead).
    fn open_condition(&mut self, w: &mut ScriptWriter, condition: &ast::Expression) -> bool {
        match self.classify_condition(condition) {
            Some(CondShape::Cmp(cond, left, right))
            | Some(CondShape::Pair(cond, left, right)) => {
                self.emit_cond_operands(w, left, right);
                w.begin_cond(cond, RSC0, RSC1);
                true
            }
            Some(CondShape::Truthy(expr)) => {
                self.emit_value(w, expr);
                w.begin_cond(Cond::Ne, RACC, 0);
                true
            }
            Some(CondShape::Probe(call)) => {
                self.emit_call(w, call);
                w.begin_cond(Cond::Ne, RACC, 0);
                true
            }
            None => {
                self.diags.error(
                    "condition does not reduce to a recognized shape",
                    condition.span().line,
                );
                // never-true guard keeps compilation going
                w.begin_cond(Cond::Eq, 0, 1);
                false
            }
        }
    }

    /// Evaluate a condition to a 0/1 flag in the accumulator.
    fn emit_condition_flag(&mut self, w: &mut ScriptWriter, condition: &ast::Expression) {
        match self.classify_condition(condition) {
            Some(CondShape::Cmp(cond, left, right))
            | Some(CondShape::Pair(cond, left, right)) => {
                self.emit_cond_operands(w, left, right);
                w.begin_cond(cond, RSC0, RSC1);
                w.arith(Set, RACC, 1);
                w.begin_else();
                w.arith(Set, RACC, 0);
                w.end_block();
            }
            Some(CondShape::Truthy(expr)) => {
                self.emit_value(w, expr);
                w.begin_cond(Cond::Ne, RACC, 0);
                w.arith(Set, RACC, 1);
                w.begin_else();
                w.arith(Set, RACC, 0);
                w.end_block();
            }
            Some(CondShape::Probe(call)) => {
                self.emit_call(w, call);
                w.begin_cond(Cond::Ne, RACC, 0);
                w.arith(Set, RACC, 1);
                w.begin_else();
                w.arith(Set, RACC, 0);
                w.end_block();
            }
            None => {
                self.diags.error(
                    "condition does not reduce to a recognized shape",
                    condition.span().line,
                );
                w.arith(Set, RACC, 0);
            }
        }
    }

    // ========================================================================
    // Control flow
    // ========================================================================

    fn visit_if(&mut self, w: &mut ScriptWriter, if_stmt: &ast::IfStatement) {
        self.open_condition(w, &if_stmt.condition);
        self.visit_stmt(w, &if_stmt.then_branch);
        if let Some(else_branch) = &if_stmt.else_branch {
            w.begin_else();
            self.visit_stmt(w, else_branch);
        }
        w.end_block();
    }

    /// Negated-guard loop: the condition flag is computed into `rwhl`,
    /// the loop runs while it is nonzero, and the flag is recomputed at
    /// the bottom of the body. The enclosing loop's flag is stack-saved
    /// around the body so nested loops stay independent.
    fn visit_while(&mut self, w: &mut ScriptWriter, while_stmt: &ast::WhileStatement) {
        push_reg(w, RWHL);
        self.emit_condition_flag(w, &while_stmt.condition);
        w.arith(Set, RWHL, RACC);
        w.begin_while(RWHL, 0);
        self.flow.push(FlowKind::Loop);
        self.visit_stmt(w, &while_stmt.body);
        self.flow.pop();
        // a break cleared the flag; don't let the recompute revive it
        w.begin_cond(Cond::Ne, RWHL, 0);
        self.emit_condition_flag(w, &while_stmt.condition);
        w.arith(Set, RWHL, RACC);
        w.end_block();
        w.end_block();
        pop_reg(w, RWHL);
    }

    /// Switches lower to their own state entered by `call`: a linear
    /// equality chain over the captured switch value, guarded by a
    /// matched flag that also serves the default clause. Fallthrough is
    /// native - nothing re-tests after a case matches.
    fn visit_switch(&mut self, w: &mut ScriptWriter, switch: &ast::SwitchStatement) {
        let state = self.next_switch_state();

        self.emit_value(w, &switch.discriminant);
        push_reg(w, RSW);
        push_reg(w, RCASE);
        w.arith(Set, RSW, RACC);
        w.arith(Set, RRET, 0);
        w.call(&state);
        pop_reg(w, RCASE);
        pop_reg(w, RSW);

        // a `return` inside the switch raised the pending-return flag
        if self.frame.in_function {
            w.begin_cond(Cond::Eq, RRET, 1);
            if self.flow.contains(&FlowKind::Switch) {
                w.exit();
            } else {
                if !self.frame.bare_state {
                    super::func::emit_epilogue(w);
                }
                w.exit();
            }
            w.end_block();
        }

        let mut sw = ScriptWriter::new();
        sw.begin_state(&state);
        sw.arith(Set, RCASE, 0);
        self.flow.push(FlowKind::Switch);
        for case in &switch.cases {
            match &case.test {
                Some(test) => match self.const_eval(test).and_then(|cv| cv.num()) {
                    Some(value) => {
                        sw.begin_cond(Cond::Eq, RSW, value);
                        sw.arith(Set, RCASE, 1);
                        sw.end_block();
                    }
                    None => {
                        self.diags.error(
                            "case label must be a compile-time constant",
                            case.span.line,
                        );
                        continue;
                    }
                },
                // default: matches once no prior case matched
                None => {
                    sw.begin_cond(Cond::Eq, RCASE, 0);
                    sw.arith(Set, RCASE, 1);
                    sw.end_block();
                }
            }
            sw.begin_cond(Cond::Eq, RCASE, 1);
            for stmt in &case.consequent {
                self.visit_stmt(&mut sw, stmt);
            }
            sw.end_block();
        }
        self.flow.pop();
        sw.end_state();
        self.unit.push_body(sw.into_text());
    }

    /// `break` exits a loop by clearing its continue flag, or pops the
    /// synthetic return of a switch state, depending on what encloses it.
    fn visit_break(&mut self, w: &mut ScriptWriter, brk: &ast::BreakStatement) {
        match self.flow.last() {
            Some(FlowKind::Loop) => w.arith(Set, RWHL, 0),
            Some(FlowKind::Switch) => w.exit(),
            None => self
                .diags
                .error("`break` outside a loop or switch", brk.span.line),
        }
    }

    fn visit_return(&mut self, w: &mut ScriptWriter, ret: &ast::ReturnStatement) {
        if !self.frame.in_function {
            self.diags
                .error("`return` outside a function", ret.span.line);
            return;
        }
        match &ret.value {
            Some(value) => self.emit_value(w, value),
            None => w.arith(Set, RACC, 0),
        }
        if self.flow.contains(&FlowKind::Switch) {
            // leaving a switch state: raise the pending-return flag and
            // let the call site finish the unwind
            w.arith(Set, RRET, 1);
            w.exit();
        } else {
            if !self.frame.bare_state {
                super::func::emit_epilogue(w);
            }
            w.exit();
        }
    }

    // ========================================================================
    // Variable declarations
    // ========================================================================

    fn visit_var_decl(&mut self, w: &mut ScriptWriter, decl: &ast::VariableDecl) {
        if self.frame.in_function {
            self.visit_local_decl(w, decl);
        } else {
            // top-level bindings hoist to the module, even from inside a
            // loose statement block
            self.global_var_into(w, decl);
        }
    }

    fn visit_local_decl(&mut self, w: &mut ScriptWriter, decl: &ast::VariableDecl) {
        let line = decl.span.line;
        if self.frame.bare_state {
            self.diags.error(
                "state functions have no frame; local variables are not available",
                line,
            );
            return;
        }
        let shape = self.decl_shape(decl);
        self.check_shape_diagnostics(decl, &shape);

        let offset = self.frame.alloc_slots(shape.slots.max(1));
        let mut symbol = Symbol::new(&decl.name.name, shape.kind, decl.name.span).with_offset(offset);
        symbol.size = Some(shape.slots.max(1));
        symbol.elem_count = shape.elem_count;
        symbol.type_text = shape.type_text.clone();
        if let Some(inline) = &shape.inline {
            symbol.children = Some(inline_children(inline));
        }
        self.declare_local(symbol);

        match shape.kind {
            SymbolKind::Object if shape.inline.is_some() => {
                let inline = shape.inline.clone().expect("inline shape");
                if let Some(ast::Expression::ObjectLiteral(obj)) = decl.initializer.as_ref() {
                    self.init_inline_frame(w, offset, &inline, obj);
                }
            }
            SymbolKind::Object => {
                let type_text = shape.type_text.clone().unwrap_or_default();
                match decl.initializer.as_ref() {
                    Some(ast::Expression::ObjectLiteral(obj)) => {
                        self.init_alias_frame(w, offset, &type_text, obj, line);
                    }
                    Some(other) => {
                        self.diags.error(
                            "an object declaration takes an object literal initializer",
                            other.span().line,
                        );
                    }
                    None => self.zero_frame_slots(w, offset, shape.slots),
                }
            }
            SymbolKind::Array => {
                let count = shape.elem_count.unwrap_or(0);
                let elem_is_primitive = shape
                    .type_text
                    .as_deref()
                    .and_then(crate::layout::parse_array_text)
                    .map(|(elem, _)| crate::layout::is_primitive(&elem))
                    .unwrap_or(true);
                if elem_is_primitive {
                    // length-bearing header, then the elements
                    w.arith(Set, RACC, count as i64);
                    store_frame(w, RSC0, offset);
                    match decl.initializer.as_ref() {
                        Some(ast::Expression::ArrayLiteral(lit)) => {
                            for (i, element) in lit.elements.iter().enumerate() {
                                self.emit_value(w, element);
                                store_frame(w, RSC0, offset + 1 + i as u32);
                            }
                        }
                        _ => self.zero_frame_slots(w, offset + 1, count),
                    }
                } else {
                    self.init_object_array_frame(w, offset, &shape);
                }
            }
            _ => {
                // scalar: evaluate the initializer (default 0) and store
                match decl.initializer.as_ref() {
                    Some(init) => self.emit_value(w, init),
                    None => w.arith(Set, RACC, 0),
                }
                store_frame(w, RSC0, offset);
            }
        }
    }

    fn zero_frame_slots(&mut self, w: &mut ScriptWriter, offset: u32, slots: u32) {
        if slots == 0 {
            return;
        }
        w.arith(Set, RACC, 0);
        for i in 0..slots {
            store_frame(w, RSC0, offset + i);
        }
    }

    /// Object-array locals: pointer slots hold the aggregate-relative
    /// offset of each element sub-block, member slots start zeroed.
    fn init_object_array_frame(&mut self, w: &mut ScriptWriter, offset: u32, shape: &DeclShape) {
        let (elem, count) = match shape
            .type_text
            .as_deref()
            .and_then(crate::layout::parse_array_text)
        {
            Some((elem, Some(count))) => (elem, count),
            _ => return,
        };
        let elem_size = {
            let engine = LayoutEngine::new(&self.aliases);
            engine.size_of(&elem).unwrap_or(1)
        };
        for i in 0..count {
            w.arith(Set, RACC, (count + i * elem_size) as i64);
            store_frame(w, RSC0, offset + i);
        }
        self.zero_frame_slots(w, offset + count, count * elem_size);
    }

    /// Alias-typed object local: store each provided property at its
    /// layout offset; unnamed members start zeroed.
    fn init_alias_frame(
        &mut self,
        w: &mut ScriptWriter,
        base: u32,
        type_text: &str,
        obj: &ast::ObjectLiteral,
        line: u32,
    ) {
        let layout = {
            let engine = LayoutEngine::new(&self.aliases);
            engine.layout_of(type_text)
        };
        let layout = match layout {
            Ok(layout) => layout,
            Err(issue) => {
                self.diags.error(issue.to_string(), line);
                return;
            }
        };
        self.zero_frame_slots(w, base, layout.size);
        for prop in &obj.properties {
            let member = match layout.member(&prop.name.name) {
                Some(member) => member.clone(),
                None => {
                    self.diags.error(
                        format!("no member `{}` on type `{}`", prop.name.name, type_text),
                        prop.span.line,
                    );
                    continue;
                }
            };
            match &prop.value {
                ast::Expression::ObjectLiteral(nested) => {
                    self.init_alias_frame(
                        w,
                        base + member.offset,
                        &member.type_text,
                        nested,
                        prop.span.line,
                    );
                }
                ast::Expression::ArrayLiteral(lit) => {
                    let count = member.elem_count.unwrap_or(0);
                    w.arith(Set, RACC, count as i64);
                    store_frame(w, RSC0, base + member.offset);
                    for (i, element) in lit.elements.iter().enumerate() {
                        self.emit_value(w, element);
                        store_frame(w, RSC0, base + member.offset + 1 + i as u32);
                    }
                }
                value => {
                    self.emit_value(w, value);
                    store_frame(w, RSC0, base + member.offset);
                }
            }
        }
    }

    /// Aliasless literal: headers in property order, bodies after all
    /// siblings. Array headers hold the element count; object headers
    /// hold the aggregate-relative offset of their block.
    fn init_inline_frame(
        &mut self,
        w: &mut ScriptWriter,
        base: u32,
        inline: &InlineObject,
        obj: &ast::ObjectLiteral,
    ) {
        for (idx, prop) in obj.properties.iter().enumerate() {
            let plan = &inline.props[idx];
            match (&plan.body, &prop.value) {
                (InlineBody::Scalar, value) => {
                    self.emit_value(w, value);
                    store_frame(w, RSC0, base + plan.header_offset);
                }
                (InlineBody::Array { offset, len }, ast::Expression::ArrayLiteral(lit)) => {
                    w.arith(Set, RACC, *len as i64);
                    store_frame(w, RSC0, base + plan.header_offset);
                    for (i, element) in lit.elements.iter().enumerate() {
                        self.emit_value(w, element);
                        store_frame(w, RSC0, base + *offset + i as u32);
                    }
                }
                (InlineBody::Object { offset, object }, ast::Expression::ObjectLiteral(nested)) => {
                    w.arith(Set, RACC, *offset as i64);
                    store_frame(w, RSC0, base + plan.header_offset);
                    self.init_inline_frame(w, base + *offset, object, nested);
                }
                _ => unreachable!("inline layout mirrors the literal"),
            }
        }
    }

    // ========================================================================
    // Declaration shapes
    // ========================================================================

    fn check_shape_diagnostics(&mut self, decl: &ast::VariableDecl, shape: &DeclShape) {
        let line = decl.span.line;
        if shape.kind == SymbolKind::Array && shape.elem_count == Some(0) {
            self.diags.warning(
                format!(
                    "array `{}` has no recognizable size hint; laying out zero elements",
                    decl.name.name
                ),
                line,
            );
        }
        if let Some(text) = &shape.type_text {
            if shape.kind == SymbolKind::Object {
                let engine = LayoutEngine::new(&self.aliases);
                if let Err(issue) = engine.size_of(text) {
                    self.diags.error(issue.to_string(), line);
                }
            }
        }
    }

    /// Storage shape of a declaration, derived from the annotation first
    /// and the initializer otherwise. Must stay in lockstep with the
    /// frame pre-pass.
    pub(crate) fn decl_shape(&self, decl: &ast::VariableDecl) -> DeclShape {
        if let Some(annotation) = &decl.annotation {
            return self.annotated_shape(decl, annotation);
        }
        match decl.initializer.as_ref() {
            Some(ast::Expression::BooleanLiteral(_)) => DeclShape::scalar(SymbolKind::Boolean),
            Some(ast::Expression::StringLiteral(_)) => DeclShape::scalar(SymbolKind::Str),
            Some(ast::Expression::ObjectLiteral(obj)) => {
                let inline = inline_object_layout(obj);
                DeclShape {
                    kind: SymbolKind::Object,
                    type_text: None,
                    slots: inline.size,
                    elem_count: None,
                    inline: Some(inline),
                }
            }
            Some(ast::Expression::ArrayLiteral(lit)) => {
                let count = lit.elements.len() as u32;
                DeclShape {
                    kind: SymbolKind::Array,
                    type_text: Some(format!("number[{}]", count)),
                    slots: count + 1,
                    elem_count: Some(count),
                    inline: None,
                }
            }
            Some(init @ ast::Expression::Call(call)) => {
                if let ast::Expression::Identifier(ident) = call.callee.as_ref() {
                    if ident.name == "array" {
                        let count = array_size_hint(init).unwrap_or(0);
                        return DeclShape {
                            kind: SymbolKind::Array,
                            type_text: Some(format!("number[{}]", count)),
                            slots: count + 1,
                            elem_count: Some(count),
                            inline: None,
                        };
                    }
                }
                DeclShape::scalar(SymbolKind::Number)
            }
            Some(ast::Expression::New(new)) => {
                DeclShape::scalar_typed(SymbolKind::Pointer, new.class.name.clone())
            }
            Some(ast::Expression::Arrow(_)) => DeclShape::scalar(SymbolKind::Function),
            // copying a function-valued binding keeps it callable
            Some(ast::Expression::Identifier(ident)) => {
                match self.symbols.resolve(&ident.name) {
                    Some(symbol) if symbol.kind == SymbolKind::Function => {
                        DeclShape::scalar(SymbolKind::Function)
                    }
                    Some(symbol) if symbol.kind == SymbolKind::Pointer => DeclShape::scalar_typed(
                        SymbolKind::Pointer,
                        symbol.type_text.clone().unwrap_or_default(),
                    ),
                    _ => DeclShape::scalar(SymbolKind::Number),
                }
            }
            _ => DeclShape::scalar(SymbolKind::Number),
        }
    }

    fn annotated_shape(&self, decl: &ast::VariableDecl, annotation: &ast::TypeAnnotation) -> DeclShape {
        match annotation {
            ast::TypeAnnotation::Named(ident) => {
                let name = ident.name.as_str();
                match name {
                    "number" => DeclShape::scalar(SymbolKind::Number),
                    "boolean" => DeclShape::scalar(SymbolKind::Boolean),
                    "string" => DeclShape::scalar(SymbolKind::Str),
                    _ => {
                        if self.classes.contains_key(name) {
                            return DeclShape::scalar_typed(SymbolKind::Pointer, name.to_string());
                        }
                        match self.aliases.shape(name) {
                            Some(shape) if shape.primitive.is_some() => {
                                DeclShape::scalar_typed(SymbolKind::Number, name.to_string())
                            }
                            Some(_) => {
                                let engine = LayoutEngine::new(&self.aliases);
                                let slots = engine.size_of(name).unwrap_or(1);
                                DeclShape {
                                    kind: SymbolKind::Object,
                                    type_text: Some(name.to_string()),
                                    slots,
                                    elem_count: None,
                                    inline: None,
                                }
                            }
                            // unknown names read as primitive in this context
                            None => DeclShape::scalar_typed(SymbolKind::Number, name.to_string()),
                        }
                    }
                }
            }
            ast::TypeAnnotation::Array { element, size, .. } => {
                let count = size
                    .or_else(|| decl.initializer.as_ref().and_then(array_size_hint))
                    .unwrap_or(0);
                let type_text = format!("{}[{}]", element.name, count);
                if crate::layout::is_primitive(&element.name)
                    || !self.aliases.is_alias(&element.name)
                {
                    DeclShape {
                        kind: SymbolKind::Array,
                        type_text: Some(type_text),
                        slots: count + 1,
                        elem_count: Some(count),
                        inline: None,
                    }
                } else {
                    let engine = LayoutEngine::new(&self.aliases);
                    let elem_size = engine.size_of(&element.name).unwrap_or(1);
                    DeclShape {
                        kind: SymbolKind::Array,
                        type_text: Some(type_text),
                        slots: count + count * elem_size,
                        elem_count: Some(count),
                        inline: None,
                    }
                }
            }
        }
    }
}

/// Child symbols for an inline layout: scalars sit at their header index,
/// aggregates carry their body offset (the header index is the child's
/// position in declaration order).
pub(crate) fn inline_children(inline: &InlineObject) -> Vec<(String, Symbol)> {
    let mut children = Vec::new();
    for prop in &inline.props {
        let span = tycon_ast::Span::default();
        let symbol = match &prop.body {
            InlineBody::Scalar => {
                Symbol::new(&prop.name, SymbolKind::Number, span).with_offset(prop.header_offset)
            }
            InlineBody::Array { offset, len } => {
                let mut s = Symbol::new(&prop.name, SymbolKind::Array, span).with_offset(*offset);
                s.elem_count = Some(*len);
                s.type_text = Some(format!("number[{}]", len));
                s
            }
            InlineBody::Object { offset, object } => {
                let mut s = Symbol::new(&prop.name, SymbolKind::Object, span).with_offset(*offset);
                s.children = Some(inline_children(object));
                s
            }
        };
        children.push((prop.name.clone(), symbol));
    }
    children
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
