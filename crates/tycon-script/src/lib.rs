//! Tycon target-language model
//!
//! The compiler lowers the typed surface notation into a flat, line-oriented
//! level-script: named registers, flat arrays, labeled state blocks,
//! conditional blocks and loops. This crate owns that target's surface:
//! the mnemonic set, the registers the compiler reserves for its synthesized
//! machinery, an append-only emitter, unit assembly in the section order the
//! host runtime expects, and a structural parser used by tooling and tests.

pub mod ops;
pub mod parse;
pub mod regs;
pub mod unit;
pub mod writer;

pub use ops::Cond;
pub use parse::{parse, Instr, ParseError, Program};
pub use unit::ScriptUnit;
pub use writer::{ArithOp, Operand, ScriptWriter};
