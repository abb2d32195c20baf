//! Tycon compiler backend
//!
//! Lowers a statically-typed, class-based surface notation into a flat,
//! label-and-register level-script: symbol and type resolution, slot
//! layout for stack- and heap-resident values, expression and statement
//! code generation, control-flow lowering, the function/closure calling
//! convention, and the page-based heap allocator emitted into every
//! program. The front-end parser and file resolution are capabilities
//! supplied by the caller; diagnostics accumulate instead of aborting.

pub mod codegen;
pub mod diagnostics;
pub mod error;
pub mod heap;
pub mod layout;
pub mod natives;
pub mod symbols;
pub mod unit;

pub use codegen::Codegen;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{CompileError, CompileResult};
pub use unit::{CompileOptions, CompiledFile, CompilerOptions, MemoryProvider, ModuleProvider};

use std::path::Path;

/// The result of compiling an entry file and its transitive imports.
#[derive(Debug)]
pub struct CompileOutput {
    /// The assembled program text.
    pub text: String,
    /// Every diagnostic, in the order it was recorded.
    pub diagnostics: Vec<Diagnostic>,
    /// Per-file compilation records, in first-visit order.
    pub files: Vec<CompiledFile>,
}

/// Main compiler entry point.
pub struct Compiler<'a> {
    provider: &'a dyn ModuleProvider,
    options: CompilerOptions,
}

impl<'a> Compiler<'a> {
    pub fn new(provider: &'a dyn ModuleProvider, options: CompilerOptions) -> Self {
        Compiler { provider, options }
    }

    /// Compile one entry file to a program. One file compiles to
    /// completion, including its transitive imports, before this returns;
    /// compiling an already-compiled path is a cached no-op.
    pub fn compile(&self, entry: impl AsRef<Path>) -> CompileResult<CompileOutput> {
        let mut gen = Codegen::new(self.provider, self.options.clone());
        gen.compile_entry(entry.as_ref())?;
        let files = gen.compiled_files().into_iter().cloned().collect();
        let (text, diags) = gen.finish();
        Ok(CompileOutput {
            text,
            diagnostics: diags.into_records(),
            files,
        })
    }
}
