//! Line-oriented script emission
//!
//! `ScriptWriter` is append-only: lowering never rewrites already-emitted
//! text, and forward references are carried by state names rather than
//! patched offsets.

use crate::ops::{self, Cond};

/// A mnemonic operand: a register name or an integer literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Reg(String),
    Imm(i64),
}

impl Operand {
    pub fn reg(name: impl Into<String>) -> Self {
        Operand::Reg(name.into())
    }

    pub fn imm(value: i64) -> Self {
        Operand::Imm(value)
    }

    fn token(&self) -> String {
        match self {
            Operand::Reg(name) => name.clone(),
            Operand::Imm(value) => value.to_string(),
        }
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Imm(value)
    }
}

impl From<&str> for Operand {
    fn from(name: &str) -> Self {
        Operand::Reg(name.to_string())
    }
}

impl From<String> for Operand {
    fn from(name: String) -> Self {
        Operand::Reg(name)
    }
}

/// Register-mutating operations; each picks its immediate or register
/// mnemonic form from the operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
}

impl ArithOp {
    fn mnemonics(self) -> (&'static str, &'static str) {
        match self {
            ArithOp::Set => (ops::SETVAR, ops::SETVARVAR),
            ArithOp::Add => (ops::ADDVAR, ops::ADDVARVAR),
            ArithOp::Sub => (ops::SUBVAR, ops::SUBVARVAR),
            ArithOp::Mul => (ops::MULVAR, ops::MULVARVAR),
            ArithOp::Div => (ops::DIVVAR, ops::DIVVARVAR),
            ArithOp::Mod => (ops::MODVAR, ops::MODVARVAR),
            ArithOp::And => (ops::ANDVAR, ops::ANDVARVAR),
            ArithOp::Or => (ops::ORVAR, ops::ORVARVAR),
            ArithOp::Xor => (ops::XORVAR, ops::XORVARVAR),
        }
    }
}

/// Append-only emitter for target-language text.
pub struct ScriptWriter {
    buf: String,
    indent: usize,
}

impl ScriptWriter {
    pub fn new() -> Self {
        Self { buf: String::new(), indent: 0 }
    }

    /// Emit one raw line at the current indentation.
    pub fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.buf.push_str("  ");
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    /// Emit a `// ...` comment line.
    pub fn comment(&mut self, text: &str) {
        self.line(&format!("// {}", text));
    }

    /// Register-mutating operation: `dst op= src`.
    pub fn arith(&mut self, op: ArithOp, dst: &str, src: impl Into<Operand>) {
        let (imm_mn, reg_mn) = op.mnemonics();
        let src = src.into();
        let mn = match src {
            Operand::Imm(_) => imm_mn,
            Operand::Reg(_) => reg_mn,
        };
        self.line(&format!("{} {} {}", mn, dst, src.token()));
    }

    /// `dst = ARR[idx]`
    pub fn get_array(&mut self, dst: &str, array: &str, idx: impl Into<Operand>) {
        self.line(&format!("{} {} {} {}", ops::GETARRAY, dst, array, idx.into().token()));
    }

    /// `ARR[idx] = src`
    pub fn set_array(&mut self, array: &str, idx: impl Into<Operand>, src: impl Into<Operand>) {
        self.line(&format!(
            "{} {} {} {}",
            ops::SETARRAY,
            array,
            idx.into().token(),
            src.into().token()
        ));
    }

    pub fn resize_array(&mut self, array: &str, size: impl Into<Operand>) {
        self.line(&format!("{} {} {}", ops::RESIZEARRAY, array, size.into().token()));
    }

    pub fn call(&mut self, state: &str) {
        self.line(&format!("{} {}", ops::CALL, state));
    }

    pub fn exit(&mut self) {
        self.line(ops::EXIT);
    }

    // ===== Blocks =====

    /// Open a conditional block: `ife A B {`.
    pub fn begin_cond(&mut self, cond: Cond, a: impl Into<Operand>, b: impl Into<Operand>) {
        self.line(&format!(
            "{} {} {} {{",
            cond.mnemonic(),
            a.into().token(),
            b.into().token()
        ));
        self.indent += 1;
    }

    /// Close the current block and open its else branch: `} else {`.
    pub fn begin_else(&mut self) {
        self.indent -= 1;
        self.line("} else {");
        self.indent += 1;
    }

    /// Open a loop block: `whilen A B {` (repeats while A != B).
    pub fn begin_while(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) {
        self.line(&format!(
            "{} {} {} {{",
            ops::WHILEN,
            a.into().token(),
            b.into().token()
        ));
        self.indent += 1;
    }

    /// Close a conditional or loop block: `}`.
    pub fn end_block(&mut self) {
        self.indent -= 1;
        self.line("}");
    }

    /// Open a named state block.
    pub fn begin_state(&mut self, name: &str) {
        self.line(&format!("{} {}", ops::STATE, name));
        self.indent += 1;
    }

    /// Open a block with an arbitrary header (`actor 2120 30`, `onnewgame`).
    pub fn begin_keyword_block(&mut self, header: &str) {
        self.line(header);
        self.indent += 1;
    }

    /// Close a state/actor/event block with `ends`.
    pub fn end_state(&mut self) {
        self.indent -= 1;
        self.line(ops::ENDS);
    }

    /// Splice pre-rendered text, re-indenting each line to the current level.
    pub fn splice(&mut self, text: &str) {
        for line in text.lines() {
            self.line(line);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_text(self) -> String {
        self.buf
    }

    pub fn text(&self) -> &str {
        &self.buf
    }
}

impl Default for ScriptWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScriptWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.buf)
    }
}
