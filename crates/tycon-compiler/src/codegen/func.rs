//! Function and closure compilation
//!
//! Every function, method and constructor compiles to a named state with
//! a fixed prologue (save the caller's frame base, claim a new frame,
//! park the argument registers into frame slots) and a fixed epilogue on
//! every control path. Frame sizes come from a pre-pass over the body so
//! emission stays append-only. Arrow expressions compile once into the
//! per-file dispatch arena; their value is the dispatch tag.

use super::{frame_addr, pop_reg, push_reg, Codegen, FrameState};
use crate::symbols::{ScopeKind, Symbol, SymbolKind};
use std::mem;
use tycon_ast as ast;
use tycon_script::regs::{self, RBP, RSC0, RSP, STACK};
use tycon_script::writer::ArithOp::{Add, Set};
use tycon_script::ScriptWriter;

/// Fixed prologue: save the caller's frame base, point the frame base at
/// the current stack top, advance the top past the new frame, then park
/// the argument registers in slots `0..param_count`.
pub(crate) fn emit_prologue(w: &mut ScriptWriter, param_count: u32, frame_size: u32) {
    push_reg(w, RBP);
    w.arith(Set, RBP, RSP);
    if frame_size > 0 {
        w.arith(Add, RSP, frame_size as i64);
    }
    for i in 0..param_count {
        frame_addr(w, RSC0, i);
        w.set_array(STACK, RSC0, regs::arg(i as usize));
    }
}

/// Fixed epilogue: tear the frame down and restore the caller's base.
pub(crate) fn emit_epilogue(w: &mut ScriptWriter) {
    w.arith(Set, RSP, RBP);
    pop_reg(w, RBP);
}

impl Codegen<'_> {
    /// Compile a top-level function declaration into its own state.
    pub(crate) fn compile_top_function(&mut self, func: &ast::FunctionDecl) {
        if self.module_prefix.is_empty() {
            match func.name.name.as_str() {
                "newGame" => self.has_new_game_fn = true,
                "onSpawn" => self.has_on_spawn_fn = true,
                _ => {}
            }
        }
        if self.symbols_only() {
            return;
        }
        let bare = self.state_functions();
        if bare && !func.params.is_empty() {
            self.diags.error(
                format!(
                    "state function `{}` cannot take parameters",
                    func.name.name
                ),
                func.span.line,
            );
            return;
        }
        let state = super::mangle_fn_name(&self.module_prefix, &func.name.name);
        let body = self.compile_callable(&func.params, &func.body, None, bare, false);
        let mut w = ScriptWriter::new();
        w.begin_state(&state);
        w.splice(&body);
        w.end_state();
        self.unit.push_body(w.into_text());
    }

    /// Compile a callable body (function, method, constructor, closure)
    /// and return its inner text: prologue, statements, fall-through
    /// epilogue. `force_exit` appends an explicit `exit` for bodies that
    /// live inside the closure dispatch switch.
    pub(crate) fn compile_callable(
        &mut self,
        params: &[ast::Parameter],
        body: &ast::BlockStatement,
        this_class: Option<&str>,
        bare: bool,
        force_exit: bool,
    ) -> String {
        let saved_frame = mem::replace(&mut self.frame, FrameState::top_level());
        let saved_flow = mem::take(&mut self.flow);
        self.symbols.push_scope(ScopeKind::Function);

        let this_count = u32::from(this_class.is_some());
        let total_params = this_count + params.len() as u32;
        let frame_size = if bare {
            0
        } else {
            total_params + self.frame_slots_of_block(body)
        };
        self.frame = if bare {
            FrameState::bare()
        } else {
            FrameState::function(frame_size)
        };
        // parameters bind to fixed offsets in declaration order
        self.frame.next_offset = total_params;

        if let Some(class) = this_class {
            let symbol = Symbol::new("this", SymbolKind::Pointer, body.span)
                .with_offset(0)
                .with_type_text(class);
            self.declare_local(symbol);
        }
        for (i, param) in params.iter().enumerate() {
            let (kind, type_text) = self.param_shape(param);
            let mut symbol =
                Symbol::new(&param.name.name, kind, param.name.span).with_offset(this_count + i as u32);
            symbol.type_text = type_text;
            self.declare_local(symbol);
        }

        let mut w = ScriptWriter::new();
        if !bare {
            emit_prologue(&mut w, total_params, frame_size);
        }
        for stmt in &body.statements {
            self.visit_stmt(&mut w, stmt);
        }
        let returned = matches!(body.statements.last(), Some(ast::Statement::Return(_)));
        if !returned {
            if !bare {
                emit_epilogue(&mut w);
            }
            if force_exit {
                w.exit();
            }
        }

        self.symbols.pop_scope();
        self.frame = saved_frame;
        self.flow = saved_flow;
        w.into_text()
    }

    /// Compile an arrow expression into the per-file dispatch arena and
    /// return its tag.
    pub(crate) fn compile_closure(&mut self, arrow: &ast::ArrowFunction) -> i64 {
        let body = self.compile_callable(&arrow.params, &arrow.body, None, false, true);
        self.dispatch.add(body)
    }

    /// Scalar kind of a parameter. Aggregates travel by pointer; the
    /// target has no way to pass a frame block by value.
    fn param_shape(&mut self, param: &ast::Parameter) -> (SymbolKind, Option<String>) {
        match &param.annotation {
            Some(ast::TypeAnnotation::Named(ident)) => match ident.name.as_str() {
                "number" => (SymbolKind::Number, None),
                "boolean" => (SymbolKind::Boolean, None),
                "string" => (SymbolKind::Str, None),
                name => {
                    if self.classes.contains_key(name) || self.aliases.is_alias(name) {
                        (SymbolKind::Pointer, Some(name.to_string()))
                    } else {
                        (SymbolKind::Number, Some(name.to_string()))
                    }
                }
            },
            Some(ast::TypeAnnotation::Array { span, .. }) => {
                self.diags.error(
                    "array parameters are not supported; pass a pointer",
                    span.line,
                );
                (SymbolKind::Number, None)
            }
            None => (SymbolKind::Number, None),
        }
    }

    /// Pre-pass: total local slots a block's declarations will claim.
    /// Must agree exactly with the emitting visitor.
    pub(crate) fn frame_slots_of_block(&self, block: &ast::BlockStatement) -> u32 {
        block
            .statements
            .iter()
            .map(|stmt| self.frame_slots_of_stmt(stmt))
            .sum()
    }

    fn frame_slots_of_stmt(&self, stmt: &ast::Statement) -> u32 {
        match stmt {
            ast::Statement::VariableDecl(decl) => self.decl_shape(decl).slots.max(1),
            ast::Statement::If(if_stmt) => {
                let mut slots = self.frame_slots_of_stmt(&if_stmt.then_branch);
                if let Some(else_branch) = &if_stmt.else_branch {
                    slots += self.frame_slots_of_stmt(else_branch);
                }
                slots
            }
            ast::Statement::While(while_stmt) => self.frame_slots_of_stmt(&while_stmt.body),
            ast::Statement::Block(block) => self.frame_slots_of_block(block),
            ast::Statement::Switch(switch) => switch
                .cases
                .iter()
                .flat_map(|case| case.consequent.iter())
                .map(|stmt| self.frame_slots_of_stmt(stmt))
                .sum(),
            _ => 0,
        }
    }
}
