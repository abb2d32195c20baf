//! Symbol table and type-alias table
//!
//! Name resolution is nearest-enclosing over a scope tree: every symbol
//! visible at a lexical point has a unique name within its innermost
//! scope, and shadowing across scope levels resolves to the innermost
//! binding. Declarations that hoist (top-level bindings of a compilable
//! module) go to the global scope regardless of where the visitor
//! currently sits.

use rustc_hash::FxHashMap;
use tycon_ast::Span;

/// Symbol kind - the closed set the backend distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Numeric scalar
    Number,
    /// Interned string (a quote index at runtime)
    Str,
    /// Boolean scalar
    Boolean,
    /// Frame- or globally-resident object with a computed layout
    Object,
    /// Scalar slot holding a heap address
    Pointer,
    /// User-defined function or method
    Function,
    /// Binding to a native host facility (labels, actor properties)
    Native,
    /// Class declaration
    Class,
    /// Fixed-size array
    Array,
    /// Enum declaration
    Enum,
    /// Compile-time constant
    Constant,
    /// Namespace-style module
    Module,
    /// Unresolved name; downstream code keeps going
    Error,
}

/// A named entity known to the compiler.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Slot offset relative to the owning frame or object base.
    pub offset: u32,
    /// Slots occupied, when the symbol owns storage.
    pub size: Option<u32>,
    /// Element count for arrays.
    pub elem_count: Option<u32>,
    /// Nested member symbols for object/array-of-object layouts,
    /// in declaration order.
    pub children: Option<Vec<(String, Symbol)>>,
    /// Compile-time literal for constants and enum members.
    pub value: Option<i64>,
    /// Emitted-name override: global register/array name, label name,
    /// native property code, or mangled state name.
    pub emitted_name: Option<String>,
    /// Enclosing symbol for dotted resolution.
    pub parent: Option<String>,
    /// Canonical type text, when the symbol has one (locals, fields).
    pub type_text: Option<String>,
    pub span: Span,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, span: Span) -> Self {
        Symbol {
            name: name.into(),
            kind,
            offset: 0,
            size: None,
            elem_count: None,
            children: None,
            value: None,
            emitted_name: None,
            parent: None,
            type_text: None,
            span,
        }
    }

    /// The error-kind symbol substituted for unresolved names.
    pub fn error(name: impl Into<String>, span: Span) -> Self {
        Symbol::new(name, SymbolKind::Error, span)
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_emitted_name(mut self, name: impl Into<String>) -> Self {
        self.emitted_name = Some(name.into());
        self
    }

    pub fn with_type_text(mut self, text: impl Into<String>) -> Self {
        self.type_text = Some(text.into());
        self
    }

    /// Look up a nested member by name.
    pub fn child(&self, name: &str) -> Option<&Symbol> {
        self.children
            .as_ref()
            .and_then(|kids| kids.iter().find(|(n, _)| n == name).map(|(_, s)| s))
    }

    /// Globals carry an emitted register/array name; locals are
    /// frame-relative.
    pub fn is_global_storage(&self) -> bool {
        self.emitted_name.is_some()
    }
}

/// Scope identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

/// Scope kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Module,
    Function,
    Block,
    Class,
}

/// Scope in the scope tree
#[derive(Debug)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub symbols: FxHashMap<String, Symbol>,
}

impl Scope {
    fn new(id: ScopeId, kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Scope {
            id,
            kind,
            parent,
            symbols: FxHashMap::default(),
        }
    }
}

/// Error indicating a non-shadowing redeclaration in one scope.
#[derive(Debug, Clone)]
pub struct DuplicateSymbolError {
    pub name: String,
    pub original: Span,
    pub duplicate: Span,
}

/// Symbol table with scope tree
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current_scope: ScopeId,
}

impl SymbolTable {
    /// Create a new symbol table with a global scope
    pub fn new() -> Self {
        SymbolTable {
            scopes: vec![Scope::new(ScopeId(0), ScopeKind::Global, None)],
            current_scope: ScopeId(0),
        }
    }

    /// Push a new scope as a child of the current scope
    pub fn push_scope(&mut self, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(id, kind, Some(self.current_scope)));
        self.current_scope = id;
        id
    }

    /// Pop the current scope, returning to its parent
    pub fn pop_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current_scope.0 as usize].parent {
            self.current_scope = parent;
        }
    }

    /// Register a binding in the current scope.
    ///
    /// Fails on a non-shadowing redeclaration; the caller downgrades that
    /// to a diagnostic rather than aborting.
    pub fn declare(&mut self, symbol: Symbol) -> Result<(), DuplicateSymbolError> {
        let scope = &mut self.scopes[self.current_scope.0 as usize];
        if let Some(existing) = scope.symbols.get(&symbol.name) {
            return Err(DuplicateSymbolError {
                name: symbol.name.clone(),
                original: existing.span,
                duplicate: symbol.span,
            });
        }
        scope.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Register a hoisted binding in the global scope, regardless of the
    /// current scope.
    pub fn declare_global(&mut self, symbol: Symbol) -> Result<(), DuplicateSymbolError> {
        let scope = &mut self.scopes[0];
        if let Some(existing) = scope.symbols.get(&symbol.name) {
            return Err(DuplicateSymbolError {
                name: symbol.name.clone(),
                original: existing.span,
                duplicate: symbol.span,
            });
        }
        scope.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Nearest-enclosing lookup from the current scope.
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        let mut scope_id = self.current_scope;
        loop {
            let scope = &self.scopes[scope_id.0 as usize];
            if let Some(symbol) = scope.symbols.get(name) {
                return Some(symbol);
            }
            match scope.parent {
                Some(parent) => scope_id = parent,
                None => return None,
            }
        }
    }

    /// Nearest-enclosing lookup that substitutes an error-kind symbol for
    /// unresolved names, letting the visitor continue.
    pub fn resolve_or_error(&self, name: &str, span: Span) -> Symbol {
        self.resolve(name)
            .cloned()
            .unwrap_or_else(|| Symbol::error(name, span))
    }

    pub fn current_scope_id(&self) -> ScopeId {
        self.current_scope
    }

    pub fn current_kind(&self) -> ScopeKind {
        self.scopes[self.current_scope.0 as usize].kind
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Type aliases
// ============================================================================

/// Literal primitive base of an alias (`type Health = number;`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasPrimitive {
    Number,
    Str,
}

/// One member of a structural alias shape.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasMemberDef {
    pub name: String,
    pub type_text: String,
    /// Native property code, when the member aliases a host facility
    /// rather than a plain field.
    pub native_code: Option<String>,
}

/// A named structural shape: member map or literal primitive base.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasShape {
    pub primitive: Option<AliasPrimitive>,
    pub members: Vec<AliasMemberDef>,
}

impl AliasShape {
    pub fn primitive(p: AliasPrimitive) -> Self {
        AliasShape { primitive: Some(p), members: Vec::new() }
    }

    pub fn members(members: Vec<AliasMemberDef>) -> Self {
        AliasShape { primitive: None, members }
    }

    pub fn member(&self, name: &str) -> Option<&AliasMemberDef> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// The only source of nested object layouts; layout computation always
/// resolves through this table.
#[derive(Debug, Default)]
pub struct TypeAliasTable {
    shapes: FxHashMap<String, AliasShape>,
}

impl TypeAliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an alias shape. Returns false if the name was already
    /// declared (the first declaration wins).
    pub fn declare(&mut self, name: impl Into<String>, shape: AliasShape) -> bool {
        let name = name.into();
        if self.shapes.contains_key(&name) {
            return false;
        }
        self.shapes.insert(name, shape);
        true
    }

    /// The structural member map for a declared alias, or None if the
    /// name is not a known alias. Callers treat unknown names as either
    /// primitive or a hard error depending on context.
    pub fn shape(&self, name: &str) -> Option<&AliasShape> {
        self.shapes.get(name)
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }
}
