//! Compilation units and module resolution
//!
//! One `CompiledFile` exists per unique resolved path: created the first
//! time the path is imported or compiled, registered *before* its body is
//! visited so cyclic imports short-circuit, and never recompiled - a
//! second import is a no-op lookup. Module resolution itself is a
//! capability supplied by the caller.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};
use tycon_ast as ast;

/// Per-file compilation options, stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompileOptions(pub u8);

impl CompileOptions {
    pub const NONE: CompileOptions = CompileOptions(0);
    /// Skip the file entirely.
    pub const SKIP: CompileOptions = CompileOptions(1);
    /// Register symbols and aliases but emit no code.
    pub const SYMBOLS_ONLY: CompileOptions = CompileOptions(2);
    /// Compile functions as bare state blocks: no frame, no parameters,
    /// for interop with hand-written script.
    pub const STATE_FUNCTIONS: CompileOptions = CompileOptions(4);

    pub fn contains(self, other: CompileOptions) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for CompileOptions {
    type Output = CompileOptions;

    fn bitor(self, rhs: CompileOptions) -> CompileOptions {
        CompileOptions(self.0 | rhs.0)
    }
}

/// Whole-compilation options, loadable from a build manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Slots in the emitted `stack` array (the stack-size header).
    pub stack_size: u32,
    /// Initial heap capacity, in pages.
    pub heap_pages: u32,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions { stack_size: 1024, heap_pages: 16 }
    }
}

/// Module resolution and source access, supplied by the embedder.
///
/// The compiler de-duplicates already-resolved paths itself; providers do
/// not need to cache.
pub trait ModuleProvider {
    /// Resolve an import specifier relative to the importing file.
    fn resolve(&self, from: &Path, specifier: &str) -> Option<PathBuf>;

    /// The parsed module for a resolved path.
    fn module(&self, path: &Path) -> Option<&ast::Module>;

    /// Per-file compilation options.
    fn options(&self, _path: &Path) -> CompileOptions {
        CompileOptions::NONE
    }
}

/// One resolved source file's compilation record.
#[derive(Debug, Clone)]
pub struct CompiledFile {
    pub path: PathBuf,
    pub options: CompileOptions,
    /// SHA-256 over the file's emitted bodies, hex-encoded. Empty until
    /// the file finishes compiling.
    pub fingerprint: String,
}

impl CompiledFile {
    pub fn new(path: PathBuf, options: CompileOptions) -> Self {
        CompiledFile { path, options, fingerprint: String::new() }
    }

    pub fn seal(&mut self, emitted: &str) {
        let digest = Sha256::digest(emitted.as_bytes());
        let mut hex = String::with_capacity(64);
        for byte in digest {
            let _ = write!(hex, "{:02x}", byte);
        }
        self.fingerprint = hex;
    }
}

/// Normalize a path: drop `.` components, resolve `..` lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// In-memory provider used by tests and embedders that parse elsewhere.
#[derive(Default)]
pub struct MemoryProvider {
    modules: FxHashMap<PathBuf, ast::Module>,
    options: FxHashMap<PathBuf, CompileOptions>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, path: impl Into<PathBuf>, module: ast::Module) {
        self.modules.insert(normalize_path(&path.into()), module);
    }

    pub fn set_options(&mut self, path: impl Into<PathBuf>, options: CompileOptions) {
        self.options.insert(normalize_path(&path.into()), options);
    }
}

impl ModuleProvider for MemoryProvider {
    fn resolve(&self, from: &Path, specifier: &str) -> Option<PathBuf> {
        let base = from.parent().unwrap_or_else(|| Path::new(""));
        let candidate = normalize_path(&base.join(specifier));
        if self.modules.contains_key(&candidate) {
            Some(candidate)
        } else {
            None
        }
    }

    fn module(&self, path: &Path) -> Option<&ast::Module> {
        self.modules.get(&normalize_path(path))
    }

    fn options(&self, path: &Path) -> CompileOptions {
        self.options
            .get(&normalize_path(path))
            .copied()
            .unwrap_or(CompileOptions::NONE)
    }
}
