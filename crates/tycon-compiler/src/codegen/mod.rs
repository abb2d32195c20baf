//! Code generation
//!
//! A driver walks the top-level declarations of a compilation unit in
//! source order, dispatching each to the statement visitor; class
//! declarations recurse into constructor and method visitors, which
//! recurse into the statement/expression visitors, which query the symbol
//! table and layout engine and emit target-language text. Emission is
//! append-only and forward-referencing: nothing already emitted is ever
//! rewritten, and forward calls resolve through the target's own state
//! names.

mod domain;
mod expr;
mod func;
mod stmt;

use crate::diagnostics::Diagnostics;
use crate::error::{CompileError, CompileResult};
use crate::heap;
use crate::symbols::{Symbol, SymbolKind, SymbolTable, TypeAliasTable};
use crate::unit::{normalize_path, CompileOptions, CompiledFile, CompilerOptions, ModuleProvider};
use rustc_hash::FxHashMap;
use std::mem;
use std::path::{Path, PathBuf};
use tycon_ast as ast;
use tycon_script::regs::{self, RACC, RBP, RSP, STACK};
use tycon_script::writer::ArithOp::{Add, Set, Sub};
use tycon_script::{ScriptUnit, ScriptWriter};

/// What `break` means right now: the innermost construct decides between
/// clearing a loop's continue flag and popping out of a switch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlowKind {
    Loop,
    Switch,
}

/// The current function frame, swapped wholesale when the visitor enters
/// a nested compilable body (closure, method) and restored on the way out.
#[derive(Debug, Clone)]
pub(crate) struct FrameState {
    /// False while emitting top-level (new-game block) code.
    pub in_function: bool,
    /// Compiled under the functions-as-state-blocks option: no frame.
    pub bare_state: bool,
    /// Total frame slots, fixed by the pre-pass before the prologue.
    pub size: u32,
    /// Next unassigned local slot.
    pub next_offset: u32,
}

impl FrameState {
    pub(crate) fn top_level() -> Self {
        FrameState { in_function: false, bare_state: false, size: 0, next_offset: 0 }
    }

    pub(crate) fn function(size: u32) -> Self {
        FrameState { in_function: true, bare_state: false, size, next_offset: 0 }
    }

    pub(crate) fn bare() -> Self {
        FrameState { in_function: true, bare_state: true, size: 0, next_offset: 0 }
    }

    /// Assign the next `slots` contiguous frame slots.
    pub(crate) fn alloc_slots(&mut self, slots: u32) -> u32 {
        let offset = self.next_offset;
        self.next_offset += slots;
        offset
    }
}

/// Which flavor of class body the visitor is inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClassKind {
    Plain,
    Actor,
    Event,
}

#[derive(Debug, Clone)]
pub(crate) struct ClassContext {
    pub name: String,
    pub kind: ClassKind,
}

#[derive(Debug, Clone)]
pub(crate) struct MethodInfo {
    pub params: usize,
    pub is_static: bool,
    /// Class whose state actually carries the body (for inherited calls).
    pub defining: String,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ClassInfo {
    pub base: Option<String>,
    pub kind: Option<ClassKind>,
    pub methods: FxHashMap<String, MethodInfo>,
}

/// Per-file arena of compiled closure bodies: `(tag, body)` pairs with a
/// monotonically increasing tag counter. The shared dispatch state's name
/// derives from the owning file's path, so recompiling the same file is
/// stable.
#[derive(Debug)]
pub(crate) struct DispatchArena {
    state_name: String,
    next_tag: i64,
    entries: Vec<(i64, String)>,
}

impl DispatchArena {
    pub(crate) fn new(path: &Path) -> Self {
        let hash = crc32fast::hash(path.to_string_lossy().as_bytes());
        DispatchArena {
            state_name: format!("closures_{:08x}", hash),
            next_tag: 1,
            entries: Vec::new(),
        }
    }

    pub(crate) fn state_name(&self) -> &str {
        &self.state_name
    }

    /// Register a compiled closure body and return its dispatch tag.
    pub(crate) fn add(&mut self, body: String) -> i64 {
        let tag = self.next_tag;
        self.next_tag += 1;
        self.entries.push((tag, body));
        tag
    }

    /// Render the shared dispatch state, or None if the file had no
    /// closures. Every body ends by returning, so the tag cases are
    /// mutually exclusive without extra bookkeeping.
    pub(crate) fn flush(self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let mut w = ScriptWriter::new();
        w.begin_state(&self.state_name);
        for (tag, body) in &self.entries {
            w.begin_cond(tycon_script::Cond::Eq, regs::RFN, *tag);
            w.splice(body);
            w.end_block();
        }
        w.end_state();
        Some(w.into_text())
    }
}

/// The code generator: one per compilation, threaded through every visit.
pub struct Codegen<'a> {
    provider: &'a dyn ModuleProvider,
    copts: CompilerOptions,
    pub symbols: SymbolTable,
    pub aliases: TypeAliasTable,
    pub diags: Diagnostics,
    pub(crate) unit: ScriptUnit,

    files: FxHashMap<PathBuf, CompiledFile>,
    file_order: Vec<PathBuf>,
    pub(crate) current_file: PathBuf,
    pub(crate) file_options: CompileOptions,
    pub(crate) dispatch: DispatchArena,

    pub(crate) frame: FrameState,
    pub(crate) flow: Vec<FlowKind>,
    pub(crate) current_class: Option<ClassContext>,
    pub(crate) classes: FxHashMap<String, ClassInfo>,
    pub(crate) module_prefix: Vec<String>,

    pub(crate) new_game: ScriptWriter,
    pub(crate) has_new_game_fn: bool,
    pub(crate) has_on_spawn_fn: bool,
    sw_counter: u32,
}

impl<'a> Codegen<'a> {
    pub fn new(provider: &'a dyn ModuleProvider, copts: CompilerOptions) -> Self {
        let mut unit = ScriptUnit::new(copts.stack_size);
        for (name, init) in regs::reserved_registers() {
            unit.declare_register(name, init);
        }
        for i in 0..regs::ARG_REG_COUNT {
            unit.declare_register(&regs::arg(i), 0);
        }
        unit.declare_array(STACK, copts.stack_size);

        let mut gen = Codegen {
            provider,
            copts,
            symbols: SymbolTable::new(),
            aliases: TypeAliasTable::new(),
            diags: Diagnostics::new(),
            unit,
            files: FxHashMap::default(),
            file_order: Vec::new(),
            current_file: PathBuf::new(),
            file_options: CompileOptions::NONE,
            dispatch: DispatchArena::new(Path::new("")),
            frame: FrameState::top_level(),
            flow: Vec::new(),
            current_class: None,
            classes: FxHashMap::default(),
            module_prefix: Vec::new(),
            new_game: ScriptWriter::new(),
            has_new_game_fn: false,
            has_on_spawn_fn: false,
            sw_counter: 0,
        };
        domain::install_builtins(&mut gen);
        gen
    }

    /// Compile the entry file and its transitive imports.
    pub fn compile_entry(&mut self, entry: &Path) -> CompileResult<()> {
        let entry = normalize_path(entry);
        let module = self
            .provider
            .module(&entry)
            .ok_or_else(|| CompileError::MissingModule(entry.display().to_string()))?;
        if module.statements.is_empty() {
            return Err(CompileError::EmptyUnit);
        }
        heap::emit_preamble(&mut self.unit, self.copts.heap_pages);
        self.compile_file(&entry);
        Ok(())
    }

    /// Assemble the final program text and hand back the diagnostics.
    pub fn finish(mut self) -> (String, Diagnostics) {
        if !self.new_game.is_empty() || self.has_new_game_fn {
            let mut w = ScriptWriter::new();
            w.begin_keyword_block(tycon_script::ops::ONNEWGAME);
            w.splice(self.new_game.text());
            if self.has_new_game_fn {
                w.call(&mangle_fn_name(&[], "newGame"));
            }
            w.end_state();
            self.unit.set_new_game(w.into_text());
        }
        if self.has_on_spawn_fn {
            let mut w = ScriptWriter::new();
            w.begin_keyword_block(tycon_script::ops::ONSPAWN);
            w.call(&mangle_fn_name(&[], "onSpawn"));
            w.end_state();
            self.unit.set_on_spawn(w.into_text());
        }
        (self.unit.assemble(), self.diags)
    }

    /// The files compiled so far, in first-visit order.
    pub fn compiled_files(&self) -> Vec<&CompiledFile> {
        self.file_order
            .iter()
            .filter_map(|path| self.files.get(path))
            .collect()
    }

    /// Compile one resolved file. A file begins its "compiled" bookkeeping
    /// before its body is visited, so an import cycle back to it is seen
    /// as already done; a second import is a no-op lookup.
    pub(crate) fn compile_file(&mut self, path: &Path) {
        let path = normalize_path(path);
        if self.files.contains_key(&path) {
            return;
        }
        let options = self.provider.options(&path);
        self.files
            .insert(path.clone(), CompiledFile::new(path.clone(), options));
        self.file_order.push(path.clone());
        if options.contains(CompileOptions::SKIP) {
            return;
        }

        let provider = self.provider;
        let module = match provider.module(&path) {
            Some(module) => module,
            None => return,
        };

        let saved_file = mem::replace(&mut self.current_file, path.clone());
        let saved_options = mem::replace(&mut self.file_options, options);
        let saved_dispatch = mem::replace(&mut self.dispatch, DispatchArena::new(&path));
        let bodies_before = self.unit.body_count();

        self.declare_signatures(&module.statements);
        for stmt in &module.statements {
            self.visit_top_level(stmt);
        }

        let arena = mem::replace(&mut self.dispatch, saved_dispatch);
        if let Some(dispatch_state) = arena.flush() {
            self.unit.push_body(dispatch_state);
        }

        let emitted = self.unit.bodies()[bodies_before..].concat();
        if let Some(file) = self.files.get_mut(&path) {
            file.seal(&emitted);
        }
        self.current_file = saved_file;
        self.file_options = saved_options;
    }

    /// First pass over a module's declarations so later bodies can call
    /// forward; the target resolves state names at load time anyway.
    fn declare_signatures(&mut self, statements: &[ast::Statement]) {
        for stmt in statements {
            match stmt {
                ast::Statement::FunctionDecl(func) => self.declare_function_signature(func),
                ast::Statement::ClassDecl(class) => self.declare_class(class),
                ast::Statement::InterfaceDecl(iface) => self.declare_interface(iface),
                ast::Statement::TypeAliasDecl(alias) => self.declare_type_alias(alias),
                ast::Statement::EnumDecl(decl) => self.declare_enum(decl),
                ast::Statement::ModuleDecl(module) => {
                    self.module_prefix.push(module.name.name.clone());
                    self.declare_signatures(&module.body);
                    self.module_prefix.pop();
                    self.declare_module_symbol(module);
                }
                _ => {}
            }
        }
    }

    fn declare_function_signature(&mut self, func: &ast::FunctionDecl) {
        let qualified = self.qualify(&func.name.name);
        let mut symbol = Symbol::new(&qualified, SymbolKind::Function, func.name.span)
            .with_emitted_name(mangle_fn_name(&self.module_prefix, &func.name.name));
        symbol.size = Some(func.params.len() as u32);
        self.declare_hoisted(symbol);
    }

    fn declare_module_symbol(&mut self, module: &ast::ModuleDecl) {
        let qualified = self.qualify(&module.name.name);
        let symbol = Symbol::new(&qualified, SymbolKind::Module, module.name.span);
        self.declare_hoisted(symbol);
    }

    /// Dispatch one top-level statement. Imperative statements outside any
    /// declaration compile into the new-game block.
    fn visit_top_level(&mut self, stmt: &ast::Statement) {
        match stmt {
            ast::Statement::ImportDecl(import) => self.visit_import(import),
            ast::Statement::FunctionDecl(func) => self.compile_top_function(func),
            ast::Statement::ClassDecl(class) => self.compile_class(class),
            ast::Statement::VariableDecl(decl) => self.compile_global_var(decl),
            ast::Statement::ModuleDecl(module) => self.compile_module_decl(module),
            // registered during the signature pass
            ast::Statement::InterfaceDecl(_)
            | ast::Statement::TypeAliasDecl(_)
            | ast::Statement::EnumDecl(_)
            | ast::Statement::Empty(_) => {}
            other => {
                if self.symbols_only() {
                    return;
                }
                // loose top-level statements run once at game start
                let mut w = mem::take(&mut self.new_game);
                let saved_frame = mem::replace(&mut self.frame, FrameState::top_level());
                self.visit_stmt(&mut w, other);
                self.frame = saved_frame;
                self.new_game = w;
            }
        }
    }

    fn visit_import(&mut self, import: &ast::ImportDecl) {
        let from = self.current_file.clone();
        match self.provider.resolve(&from, &import.source.value) {
            Some(resolved) => self.compile_file(&resolved),
            None => self.diags.error(
                format!("cannot resolve module `{}`", import.source.value),
                import.span.line,
            ),
        }
    }

    fn compile_module_decl(&mut self, module: &ast::ModuleDecl) {
        self.module_prefix.push(module.name.name.clone());
        for stmt in &module.body {
            match stmt {
                ast::Statement::FunctionDecl(func) => self.compile_top_function(func),
                ast::Statement::VariableDecl(decl) => self.compile_global_var(decl),
                ast::Statement::ClassDecl(class) => self.compile_class(class),
                ast::Statement::InterfaceDecl(_)
                | ast::Statement::TypeAliasDecl(_)
                | ast::Statement::EnumDecl(_)
                | ast::Statement::Empty(_) => {}
                ast::Statement::ModuleDecl(nested) => self.compile_module_decl(nested),
                other => self.diags.error(
                    "only declarations are allowed inside a module",
                    other.span().line,
                ),
            }
        }
        self.module_prefix.pop();
    }

    // ===== Shared helpers =====

    pub(crate) fn symbols_only(&self) -> bool {
        self.file_options.contains(CompileOptions::SYMBOLS_ONLY)
    }

    pub(crate) fn state_functions(&self) -> bool {
        self.file_options.contains(CompileOptions::STATE_FUNCTIONS)
    }

    /// Dotted-qualified symbol name under the current module prefix.
    pub(crate) fn qualify(&self, name: &str) -> String {
        if self.module_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.module_prefix.join("."), name)
        }
    }

    /// Emitted global register/array name for a module-level binding.
    pub(crate) fn global_name(&self, name: &str) -> String {
        if self.module_prefix.is_empty() {
            format!("g_{}", name)
        } else {
            format!("g_{}_{}", self.module_prefix.join("_"), name)
        }
    }

    /// Declare a hoisted (module-level) binding, downgrading duplicates to
    /// a diagnostic.
    pub(crate) fn declare_hoisted(&mut self, symbol: Symbol) {
        let line = symbol.span.line;
        if let Err(err) = self.symbols.declare_global(symbol) {
            self.diags.error(
                format!(
                    "`{}` is already declared on line {}",
                    err.name, err.original.line
                ),
                line,
            );
        }
    }

    /// Declare a scope-local binding, downgrading duplicates to a
    /// diagnostic.
    pub(crate) fn declare_local(&mut self, symbol: Symbol) {
        let line = symbol.span.line;
        if let Err(err) = self.symbols.declare(symbol) {
            self.diags.error(
                format!(
                    "`{}` is already declared on line {}",
                    err.name, err.original.line
                ),
                line,
            );
        }
    }

    pub(crate) fn next_switch_state(&mut self) -> String {
        let name = format!("sw_{}", self.sw_counter);
        self.sw_counter += 1;
        name
    }
}

// ===== Emission helpers (free of the generator's borrow) =====

/// Push a register onto the emitted stack.
pub(crate) fn push_reg(w: &mut ScriptWriter, reg: &str) {
    w.set_array(STACK, RSP, reg);
    w.arith(Add, RSP, 1);
}

/// Pop the emitted stack into a register.
pub(crate) fn pop_reg(w: &mut ScriptWriter, reg: &str) {
    w.arith(Sub, RSP, 1);
    w.get_array(reg, STACK, RSP);
}

/// Compute `dst = rbp + offset`.
pub(crate) fn frame_addr(w: &mut ScriptWriter, dst: &str, offset: u32) {
    w.arith(Set, dst, RBP);
    if offset > 0 {
        w.arith(Add, dst, offset as i64);
    }
}

/// Read frame slot `offset` into `racc`.
pub(crate) fn load_frame(w: &mut ScriptWriter, scratch: &str, offset: u32) {
    frame_addr(w, scratch, offset);
    w.get_array(RACC, STACK, scratch);
}

/// Write `racc` into frame slot `offset`.
pub(crate) fn store_frame(w: &mut ScriptWriter, scratch: &str, offset: u32) {
    frame_addr(w, scratch, offset);
    w.set_array(STACK, scratch, RACC);
}

/// Mangled state name for a function under a module prefix.
pub(crate) fn mangle_fn_name(prefix: &[String], name: &str) -> String {
    if prefix.is_empty() {
        format!("fn_{}", name)
    } else {
        format!("fn_{}_{}", prefix.join("_"), name)
    }
}

/// Mangled state name for a class method or constructor.
pub(crate) fn mangle_method_name(class: &str, method: &str) -> String {
    format!("fn_{}_{}", class, method)
}
