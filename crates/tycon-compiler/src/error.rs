//! Compilation errors
//!
//! The visitor itself never aborts; everything recoverable flows through
//! the diagnostics list. These are the few conditions that stop a
//! compilation before any visiting happens.

use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("no declarations to compile")]
    EmptyUnit,

    #[error("module `{0}` could not be loaded")]
    MissingModule(String),
}
