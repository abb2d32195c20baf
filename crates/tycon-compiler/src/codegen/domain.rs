//! Module-level declarations and the actor/event domain layer
//!
//! Classes extending the built-in `Actor` (or `GameEvent`) compile into
//! the specialized block forms the host runtime recognizes; their
//! constructors have a strict shape - exactly one `super(...)` call with
//! compile-time-constant arguments - and violations abandon the whole
//! declaration's codegen. Module-level consts initialized by the
//! `action`/`move`/`ai` label constructors become label-table entries
//! resolved entirely at compile time.

use super::{ClassContext, ClassInfo, ClassKind, Codegen, MethodInfo};
use crate::symbols::{AliasMemberDef, AliasShape, Symbol, SymbolKind};
use std::mem;
use tycon_ast as ast;
use tycon_script::regs::RACC;
use tycon_script::writer::ArithOp::Set;
use tycon_script::ScriptWriter;

/// Native actor properties exposed through the built-in `Actor` shape.
const ACTOR_MEMBERS: &[(&str, &str)] = &[
    ("health", "health"),
    ("picnum", "picnum"),
    ("pal", "pal"),
    ("ang", "ang"),
    ("x", "x"),
    ("y", "y"),
    ("z", "z"),
    ("extra", "extra"),
    ("owner", "owner"),
    ("lotag", "lotag"),
    ("hitag", "hitag"),
];

/// Register the ambient host interface: the `Actor` and `GameEvent` base
/// classes and the native member codes of the implicit receiver.
pub(crate) fn install_builtins(gen: &mut Codegen) {
    let members = ACTOR_MEMBERS
        .iter()
        .map(|(name, code)| AliasMemberDef {
            name: (*name).to_string(),
            type_text: "number".to_string(),
            native_code: Some((*code).to_string()),
        })
        .collect();
    gen.aliases.declare("Actor", AliasShape::members(members));

    gen.classes.insert(
        "Actor".to_string(),
        ClassInfo { base: None, kind: Some(ClassKind::Actor), methods: Default::default() },
    );
    gen.classes.insert(
        "GameEvent".to_string(),
        ClassInfo { base: None, kind: Some(ClassKind::Event), methods: Default::default() },
    );
    for name in ["Actor", "GameEvent"] {
        let symbol = Symbol::new(name, SymbolKind::Class, tycon_ast::Span::default());
        let _ = gen.symbols.declare_global(symbol);
    }
}

impl Codegen<'_> {
    // ========================================================================
    // Type-introducing declarations (signature pass)
    // ========================================================================

    pub(crate) fn declare_interface(&mut self, iface: &ast::InterfaceDecl) {
        let members = iface
            .members
            .iter()
            .map(|m| AliasMemberDef {
                name: m.name.name.clone(),
                type_text: m.annotation.type_text(),
                native_code: m.native_code.clone(),
            })
            .collect();
        let name = self.qualify(&iface.name.name);
        if !self.aliases.declare(&name, AliasShape::members(members)) {
            self.diags.error(
                format!("type `{}` is already declared", name),
                iface.span.line,
            );
        }
    }

    pub(crate) fn declare_type_alias(&mut self, alias: &ast::TypeAliasDecl) {
        let shape = match &alias.body {
            ast::AliasBody::PrimitiveNumber => {
                AliasShape::primitive(crate::symbols::AliasPrimitive::Number)
            }
            ast::AliasBody::PrimitiveString => {
                AliasShape::primitive(crate::symbols::AliasPrimitive::Str)
            }
            ast::AliasBody::Members(members) => AliasShape::members(
                members
                    .iter()
                    .map(|m| AliasMemberDef {
                        name: m.name.name.clone(),
                        type_text: m.annotation.type_text(),
                        native_code: m.native_code.clone(),
                    })
                    .collect(),
            ),
        };
        let name = self.qualify(&alias.name.name);
        if !self.aliases.declare(&name, shape) {
            self.diags.error(
                format!("type `{}` is already declared", name),
                alias.span.line,
            );
        }
    }

    /// Enums live entirely at compile time: an enum-kind symbol whose
    /// children are constant-valued; member access folds to a literal.
    pub(crate) fn declare_enum(&mut self, decl: &ast::EnumDecl) {
        let mut children = Vec::new();
        let mut next = 0i64;
        for member in &decl.members {
            let value = member.value.unwrap_or(next);
            next = value + 1;
            let child = Symbol::new(&member.name.name, SymbolKind::Constant, member.span)
                .with_value(value);
            children.push((member.name.name.clone(), child));
        }
        let name = self.qualify(&decl.name.name);
        let mut symbol = Symbol::new(&name, SymbolKind::Enum, decl.name.span);
        symbol.children = Some(children);
        self.declare_hoisted(symbol);
    }

    /// Register a class's shape: its field layout (inherited fields
    /// first), its static constants, and its method table.
    pub(crate) fn declare_class(&mut self, class: &ast::ClassDecl) {
        let name = class.name.name.clone();
        let base = class.extends.as_ref().map(|b| b.name.clone());
        let kind = match base.as_deref() {
            None => ClassKind::Plain,
            Some(base_name) => self
                .classes
                .get(base_name)
                .and_then(|info| info.kind)
                .unwrap_or(ClassKind::Plain),
        };

        // field layout; a plain base class contributes its fields first
        let mut members: Vec<AliasMemberDef> = Vec::new();
        if kind == ClassKind::Plain {
            if let Some(base_name) = base.as_deref() {
                if let Some(base_shape) = self.aliases.shape(base_name) {
                    members.extend(base_shape.members.iter().cloned());
                }
            }
        }
        let mut statics = Vec::new();
        for member in &class.members {
            if let ast::ClassMember::Field(field) = member {
                if field.is_static {
                    statics.push(field);
                    continue;
                }
                let mut type_text = field
                    .annotation
                    .as_ref()
                    .map(|a| a.type_text())
                    .unwrap_or_else(|| "number".to_string());
                // class-typed fields hold a heap pointer, not an inline block
                if self.classes.contains_key(type_text.as_str()) {
                    type_text.push('*');
                }
                members.push(AliasMemberDef {
                    name: field.name.name.clone(),
                    type_text,
                    native_code: None,
                });
            }
        }
        if kind == ClassKind::Plain {
            self.aliases.declare(&name, AliasShape::members(members));
        } else if !members.is_empty() {
            // actors are host-managed; per-instance storage has nowhere
            // to live
            self.diags.error(
                format!("actor class `{}` cannot declare instance fields", name),
                class.span.line,
            );
        }

        // static constants become children of the class symbol
        let mut children = Vec::new();
        for field in statics {
            match field.initializer.as_ref().and_then(|i| self.const_eval(i)) {
                Some(cv) => {
                    if let Some(v) = cv.num() {
                        let child = Symbol::new(&field.name.name, SymbolKind::Constant, field.span)
                            .with_value(v);
                        children.push((field.name.name.clone(), child));
                    }
                }
                None => self.diags.error(
                    format!(
                        "static field `{}` needs a compile-time constant initializer",
                        field.name.name
                    ),
                    field.span.line,
                ),
            }
        }

        // method table
        let mut info = ClassInfo { base: base.clone(), kind: Some(kind), methods: Default::default() };
        for member in &class.members {
            match member {
                ast::ClassMember::Method(method) => {
                    info.methods.insert(
                        method.name.name.clone(),
                        MethodInfo {
                            params: method.params.len(),
                            is_static: method.is_static,
                            defining: name.clone(),
                        },
                    );
                }
                ast::ClassMember::Constructor(ctor) => {
                    info.methods.insert(
                        "ctor".to_string(),
                        MethodInfo {
                            params: ctor.params.len(),
                            is_static: false,
                            defining: name.clone(),
                        },
                    );
                }
                ast::ClassMember::Field(_) => {}
            }
        }
        self.classes.insert(name.clone(), info);

        let mut symbol = Symbol::new(&name, SymbolKind::Class, class.name.span);
        symbol.children = Some(children);
        self.declare_hoisted(symbol);
    }

    // ========================================================================
    // Class bodies (visit pass)
    // ========================================================================

    pub(crate) fn compile_class(&mut self, class: &ast::ClassDecl) {
        if self.symbols_only() {
            return;
        }
        let kind = self
            .classes
            .get(&class.name.name)
            .and_then(|info| info.kind)
            .unwrap_or(ClassKind::Plain);
        match kind {
            ClassKind::Plain => self.compile_plain_class(class),
            ClassKind::Actor => self.compile_actor_class(class),
            ClassKind::Event => self.compile_event_class(class),
        }
    }

    fn compile_plain_class(&mut self, class: &ast::ClassDecl) {
        let name = class.name.name.clone();
        let saved = mem::replace(
            &mut self.current_class,
            Some(ClassContext { name: name.clone(), kind: ClassKind::Plain }),
        );

        // the constructor runs field initializers, then the user body
        let mut ctor_stmts: Vec<ast::Statement> = Vec::new();
        for member in &class.members {
            if let ast::ClassMember::Field(field) = member {
                if field.is_static {
                    continue;
                }
                if let Some(init) = &field.initializer {
                    ctor_stmts.push(field_init_stmt(field, init));
                }
            }
        }
        let user_ctor = class.members.iter().find_map(|m| match m {
            ast::ClassMember::Constructor(ctor) => Some(ctor),
            _ => None,
        });
        let (ctor_params, ctor_span): (&[ast::Parameter], tycon_ast::Span) = match user_ctor {
            Some(ctor) => {
                ctor_stmts.extend(ctor.body.statements.iter().cloned());
                (&ctor.params, ctor.span)
            }
            None => (&[], class.span),
        };
        let ctor_body = ast::BlockStatement { statements: ctor_stmts, span: ctor_span };
        let body = self.compile_callable(ctor_params, &ctor_body, Some(&name), false, false);
        let mut w = ScriptWriter::new();
        w.begin_state(&super::mangle_method_name(&name, "ctor"));
        w.splice(&body);
        w.end_state();
        self.unit.push_body(w.into_text());

        // ensure the synthesized ctor is callable even without a user one
        if user_ctor.is_none() {
            if let Some(info) = self.classes.get_mut(&name) {
                info.methods.entry("ctor".to_string()).or_insert(MethodInfo {
                    params: 0,
                    is_static: false,
                    defining: name.clone(),
                });
            }
        }

        for member in &class.members {
            if let ast::ClassMember::Method(method) = member {
                self.compile_method(&name, method, !method.is_static);
            }
        }
        self.current_class = saved;
    }

    fn compile_method(&mut self, class: &str, method: &ast::MethodDecl, with_this: bool) {
        let body = match &method.body {
            Some(body) => body,
            None => {
                self.diags.error(
                    format!("method `{}` has no body", method.name.name),
                    method.span.line,
                );
                return;
            }
        };
        let this_class = if with_this { Some(class) } else { None };
        let text = self.compile_callable(&method.params, body, this_class, false, false);
        let mut w = ScriptWriter::new();
        w.begin_state(&super::mangle_method_name(class, &method.name.name));
        w.splice(&text);
        w.end_state();
        self.unit.push_body(w.into_text());
    }

    /// Actor subclass: the constructor must be exactly one
    /// `super(picnum, strength)` call with constant arguments, and a
    /// zero-argument `main` method drives the actor each tick.
    fn compile_actor_class(&mut self, class: &ast::ClassDecl) {
        let name = class.name.name.clone();
        let (picnum, strength) = match self.actor_super_args(class) {
            Some(args) => args,
            None => return, // structural diagnostic already recorded
        };
        if self.find_method(&name, "main").map(|m| m.params) != Some(0) {
            self.diags.error(
                format!("actor class `{}` needs a zero-argument `main` method", name),
                class.span.line,
            );
            return;
        }

        let saved = mem::replace(
            &mut self.current_class,
            Some(ClassContext { name: name.clone(), kind: ClassKind::Actor }),
        );
        for member in &class.members {
            if let ast::ClassMember::Method(method) = member {
                // the host supplies the receiver; no `this` pointer rides
                // in the frame
                self.compile_method(&name, method, false);
            }
        }
        self.current_class = saved;

        let mut w = ScriptWriter::new();
        w.begin_keyword_block(&format!("{} {} {}", tycon_script::ops::ACTOR, picnum, strength));
        w.call(&super::mangle_method_name(&name, "main"));
        w.end_state();
        self.unit.push_body(w.into_text());
    }

    fn compile_event_class(&mut self, class: &ast::ClassDecl) {
        let name = class.name.name.clone();
        let event_name = match self.event_super_name(class) {
            Some(event_name) => event_name,
            None => return,
        };
        if self.find_method(&name, "main").map(|m| m.params) != Some(0) {
            self.diags.error(
                format!("event class `{}` needs a zero-argument `main` method", name),
                class.span.line,
            );
            return;
        }

        let saved = mem::replace(
            &mut self.current_class,
            Some(ClassContext { name: name.clone(), kind: ClassKind::Event }),
        );
        for member in &class.members {
            if let ast::ClassMember::Method(method) = member {
                self.compile_method(&name, method, false);
            }
        }
        self.current_class = saved;

        let mut w = ScriptWriter::new();
        w.begin_keyword_block(&format!("{} {}", tycon_script::ops::EVENT, event_name));
        w.call(&super::mangle_method_name(&name, "main"));
        w.end_state();
        self.unit.push_body(w.into_text());
    }

    /// The single `super(picnum, strength)` statement of an actor
    /// constructor, or None after a structural diagnostic.
    fn actor_super_args(&mut self, class: &ast::ClassDecl) -> Option<(i64, i64)> {
        let ctor = class.members.iter().find_map(|m| match m {
            ast::ClassMember::Constructor(ctor) => Some(ctor),
            _ => None,
        })?;
        let call = match single_super_call(ctor) {
            Some(call) => call,
            None => {
                self.diags.error(
                    "an actor constructor must contain exactly one super(picnum, strength) call",
                    ctor.span.line,
                );
                return None;
            }
        };
        if call.arguments.len() != 2 {
            self.diags.error(
                "super(picnum, strength) takes exactly two arguments",
                call.span.line,
            );
            return None;
        }
        let picnum = self.const_eval(&call.arguments[0]).and_then(|cv| cv.num());
        let strength = self.const_eval(&call.arguments[1]).and_then(|cv| cv.num());
        match (picnum, strength) {
            (Some(p), Some(s)) => Some((p, s)),
            _ => {
                self.diags.error(
                    "super(picnum, strength) arguments must be compile-time constants",
                    call.span.line,
                );
                None
            }
        }
    }

    fn event_super_name(&mut self, class: &ast::ClassDecl) -> Option<String> {
        let ctor = class.members.iter().find_map(|m| match m {
            ast::ClassMember::Constructor(ctor) => Some(ctor),
            _ => None,
        })?;
        let call = match single_super_call(ctor) {
            Some(call) => call,
            None => {
                self.diags.error(
                    "an event constructor must contain exactly one super(name) call",
                    ctor.span.line,
                );
                return None;
            }
        };
        match call.arguments.first() {
            Some(ast::Expression::StringLiteral(lit)) => Some(lit.value.clone()),
            _ => {
                self.diags.error(
                    "super(name) takes one string literal argument",
                    call.span.line,
                );
                None
            }
        }
    }

    // ========================================================================
    // Module-level variables and labels
    // ========================================================================

    pub(crate) fn compile_global_var(&mut self, decl: &ast::VariableDecl) {
        let mut w = mem::take(&mut self.new_game);
        self.global_var_into(&mut w, decl);
        self.new_game = w;
    }

    /// Lower a module-level variable: a label-table entry, a compile-time
    /// constant, a global register, or a global aggregate array with its
    /// initialization code in the new-game block.
    pub(crate) fn global_var_into(&mut self, w: &mut ScriptWriter, decl: &ast::VariableDecl) {
        if let Some(ast::Expression::Call(call)) = decl.initializer.as_ref() {
            if let ast::Expression::Identifier(callee) = call.callee.as_ref() {
                match callee.name.as_str() {
                    "action" | "move" | "ai" => {
                        let kind = callee.name.clone();
                        return self.declare_label(decl, &kind, call);
                    }
                    _ => {}
                }
            }
        }

        let shape = self.decl_shape(decl);
        self.check_global_shape(decl, &shape);
        let qualified = self.qualify(&decl.name.name);

        match shape.kind {
            SymbolKind::Object | SymbolKind::Array => {
                let array = self.global_name(&decl.name.name);
                let mut symbol = Symbol::new(&qualified, shape.kind, decl.name.span)
                    .with_emitted_name(&array);
                symbol.size = Some(shape.slots.max(1));
                symbol.elem_count = shape.elem_count;
                symbol.type_text = shape.type_text.clone();
                if let Some(inline) = &shape.inline {
                    symbol.children = Some(super::stmt::inline_children(inline));
                }
                self.declare_hoisted(symbol);
                if self.symbols_only() {
                    return;
                }
                self.unit.declare_array(&array, shape.slots.max(1));
                self.init_global_aggregate(w, &array, decl, &shape);
            }
            _ => {
                // compile-time constant, or register-backed scalar
                let folded = match decl.initializer.as_ref() {
                    Some(ast::Expression::StringLiteral(lit)) => {
                        Some(self.unit.add_quote(&lit.value) as i64)
                    }
                    Some(ast::Expression::Arrow(arrow)) => {
                        if self.symbols_only() {
                            None
                        } else {
                            Some(self.compile_closure(arrow))
                        }
                    }
                    Some(init) => self.const_eval(init).and_then(|cv| cv.num()),
                    None => Some(0),
                };

                if decl.kind == ast::VariableKind::Const && shape.kind != SymbolKind::Function {
                    match folded {
                        Some(value) => {
                            let symbol =
                                Symbol::new(&qualified, SymbolKind::Constant, decl.name.span)
                                    .with_value(value);
                            self.declare_hoisted(symbol);
                            return;
                        }
                        None => self.diags.error(
                            format!(
                                "const `{}` needs a compile-time constant initializer",
                                decl.name.name
                            ),
                            decl.span.line,
                        ),
                    }
                }

                let reg = self.global_name(&decl.name.name);
                let mut symbol = Symbol::new(&qualified, shape.kind, decl.name.span)
                    .with_emitted_name(&reg);
                symbol.type_text = shape.type_text.clone();
                self.declare_hoisted(symbol);
                if self.symbols_only() {
                    return;
                }
                self.unit.declare_register(&reg, folded.unwrap_or(0));
                // the declaration site also assigns, so a declaration
                // re-entered at runtime (inside a top-level loop) resets
                if decl.initializer.is_some() {
                    match folded {
                        Some(value) => w.arith(Set, &reg, value),
                        None => {
                            if let Some(init) = decl.initializer.as_ref() {
                                self.emit_value(w, init);
                                w.arith(Set, &reg, RACC);
                            }
                        }
                    }
                }
            }
        }
    }

    fn check_global_shape(&mut self, decl: &ast::VariableDecl, shape: &super::stmt::DeclShape) {
        if shape.kind == SymbolKind::Array && shape.elem_count == Some(0) {
            self.diags.warning(
                format!(
                    "array `{}` has no recognizable size hint; laying out zero elements",
                    decl.name.name
                ),
                decl.span.line,
            );
        }
    }

    /// New-game initialization for a global aggregate. Global arrays start
    /// zeroed by the host, so only explicit values are stored.
    fn init_global_aggregate(
        &mut self,
        w: &mut ScriptWriter,
        array: &str,
        decl: &ast::VariableDecl,
        shape: &super::stmt::DeclShape,
    ) {
        match (&shape.inline, decl.initializer.as_ref()) {
            (Some(inline), Some(ast::Expression::ObjectLiteral(obj))) => {
                self.init_inline_global(w, array, 0, inline, obj);
            }
            (None, Some(ast::Expression::ArrayLiteral(lit))) => {
                let count = shape.elem_count.unwrap_or(0);
                w.set_array(array, 0i64, count as i64);
                for (i, element) in lit.elements.iter().enumerate() {
                    self.store_global_slot(w, array, 1 + i as u32, element);
                }
            }
            (None, Some(ast::Expression::ObjectLiteral(obj))) => {
                let type_text = shape.type_text.clone().unwrap_or_default();
                self.init_alias_global(w, array, 0, &type_text, obj, decl.span.line);
            }
            _ => {
                // array(n) and friends: the length header is the only
                // slot that needs a value
                if let Some(count) = shape.elem_count {
                    let elem_primitive = shape
                        .type_text
                        .as_deref()
                        .and_then(crate::layout::parse_array_text)
                        .map(|(elem, _)| crate::layout::is_primitive(&elem))
                        .unwrap_or(true);
                    if elem_primitive {
                        w.set_array(array, 0i64, count as i64);
                    } else {
                        // pointer slots lead to each element sub-block
                        let elem_size = shape
                            .type_text
                            .as_deref()
                            .and_then(crate::layout::parse_array_text)
                            .map(|(elem, _)| {
                                let engine = crate::layout::LayoutEngine::new(&self.aliases);
                                engine.size_of(&elem).unwrap_or(1)
                            })
                            .unwrap_or(1);
                        for i in 0..count {
                            w.set_array(array, i as i64, (count + i * elem_size) as i64);
                        }
                    }
                }
            }
        }
    }

    fn store_global_slot(
        &mut self,
        w: &mut ScriptWriter,
        array: &str,
        index: u32,
        value: &ast::Expression,
    ) {
        match self.const_eval(value).and_then(|cv| cv.num()) {
            Some(v) => w.set_array(array, index as i64, v),
            None => {
                self.emit_value(w, value);
                w.set_array(array, index as i64, RACC);
            }
        }
    }

    fn init_alias_global(
        &mut self,
        w: &mut ScriptWriter,
        array: &str,
        base: u32,
        type_text: &str,
        obj: &ast::ObjectLiteral,
        line: u32,
    ) {
        let layout = {
            let engine = crate::layout::LayoutEngine::new(&self.aliases);
            engine.layout_of(type_text)
        };
        let layout = match layout {
            Ok(layout) => layout,
            Err(issue) => {
                self.diags.error(issue.to_string(), line);
                return;
            }
        };
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
                    self.init_alias_global(
                        w,
                        array,
                        base + member.offset,
                        &member.type_text,
                        nested,
                        prop.span.line,
                    );
                }
                ast::Expression::ArrayLiteral(lit) => {
                    let count = member.elem_count.unwrap_or(0);
                    w.set_array(array, (base + member.offset) as i64, count as i64);
                    for (i, element) in lit.elements.iter().enumerate() {
                        self.store_global_slot(
                            w,
                            array,
                            base + member.offset + 1 + i as u32,
                            element,
                        );
                    }
                }
                value => self.store_global_slot(w, array, base + member.offset, value),
            }
        }
    }

    fn init_inline_global(
        &mut self,
        w: &mut ScriptWriter,
        array: &str,
        base: u32,
        inline: &crate::layout::InlineObject,
        obj: &ast::ObjectLiteral,
    ) {
        use crate::layout::InlineBody;
        for (idx, prop) in obj.properties.iter().enumerate() {
            let plan = &inline.props[idx];
            match (&plan.body, &prop.value) {
                (InlineBody::Scalar, value) => {
                    self.store_global_slot(w, array, base + plan.header_offset, value);
                }
                (InlineBody::Array { offset, len }, ast::Expression::ArrayLiteral(lit)) => {
                    w.set_array(array, (base + plan.header_offset) as i64, *len as i64);
                    for (i, element) in lit.elements.iter().enumerate() {
                        self.store_global_slot(w, array, base + *offset + i as u32, element);
                    }
                }
                (InlineBody::Object { offset, object }, ast::Expression::ObjectLiteral(nested)) => {
                    w.set_array(array, (base + plan.header_offset) as i64, *offset as i64);
                    self.init_inline_global(w, array, base + *offset, object, nested);
                }
                _ => unreachable!("inline layout mirrors the literal"),
            }
        }
    }

    /// A module-level `const X = action/move/ai(...)` becomes a label
    /// table entry; the symbol binds to the emitted label name and never
    /// produces code.
    fn declare_label(&mut self, decl: &ast::VariableDecl, kind: &str, call: &ast::CallExpression) {
        let line = decl.span.line;
        let (prefix, keyword, max_args) = match kind {
            "action" => ("act", tycon_script::ops::ACTION, 5),
            "move" => ("mov", tycon_script::ops::MOVE, 2),
            _ => ("ai", tycon_script::ops::AI, 3),
        };
        if call.arguments.len() > max_args {
            self.diags.error(
                format!("`{}` takes at most {} arguments", kind, max_args),
                line,
            );
            return;
        }

        let label = if self.module_prefix.is_empty() {
            format!("{}_{}", prefix, decl.name.name)
        } else {
            format!("{}_{}_{}", prefix, self.module_prefix.join("_"), decl.name.name)
        };

        let mut args = Vec::new();
        for (i, arg) in call.arguments.iter().enumerate() {
            if kind == "ai" && i < 2 {
                // ai labels reference an action and a move by name
                match self.resolve_dotted(arg) {
                    Some(symbol)
                        if symbol.kind == SymbolKind::Native && symbol.emitted_name.is_some() =>
                    {
                        args.push(symbol.emitted_name.unwrap_or_default());
                    }
                    _ => {
                        self.diags.error(
                            format!("argument {} of `ai` must name a declared label", i + 1),
                            line,
                        );
                        return;
                    }
                }
            } else {
                match self.const_eval(arg).and_then(|cv| cv.num()) {
                    Some(v) => args.push(v.to_string()),
                    None => {
                        self.diags.error(
                            format!(
                                "argument {} of `{}` must be a compile-time constant",
                                i + 1,
                                kind
                            ),
                            line,
                        );
                        return;
                    }
                }
            }
        }

        if !self.symbols_only() {
            let mut label_line = format!("{} {}", keyword, label);
            for arg in &args {
                label_line.push(' ');
                label_line.push_str(arg);
            }
            self.unit.push_label(label_line);
        }

        let qualified = self.qualify(&decl.name.name);
        let symbol = Symbol::new(&qualified, SymbolKind::Native, decl.name.span)
            .with_emitted_name(&label);
        self.declare_hoisted(symbol);
    }
}

/// Synthesize `this.<field> = <init>;` for a constructor preamble.
fn field_init_stmt(field: &ast::FieldDecl, init: &ast::Expression) -> ast::Statement {
    let target = ast::Expression::Member(ast::MemberExpression {
        object: Box::new(ast::Expression::This(field.span)),
        property: field.name.clone(),
        span: field.span,
    });
    ast::Statement::Expression(ast::ExpressionStatement {
        expression: ast::Expression::Assignment(ast::AssignmentExpression {
            target: Box::new(target),
            value: Box::new(init.clone()),
            span: field.span,
        }),
        span: field.span,
    })
}

/// Exactly one statement, and it is a `super(...)` call.
fn single_super_call(ctor: &ast::ConstructorDecl) -> Option<&ast::CallExpression> {
    if ctor.body.statements.len() != 1 {
        return None;
    }
    match &ctor.body.statements[0] {
        ast::Statement::Expression(expr_stmt) => match &expr_stmt.expression {
            ast::Expression::Call(call) => match call.callee.as_ref() {
                ast::Expression::Identifier(ident) if ident.name == "super" => Some(call),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}
