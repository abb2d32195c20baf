//! Target-language mnemonics
//!
//! The level-script target is line-oriented text: one mnemonic plus its
//! operands per line, with block constructs (`ife`/`whilen`/`state`)
//! spanning multiple lines. Operands are register names or integer
//! literals; there is no expression syntax on the target side.
//!
//! Mnemonics are organized into categories:
//! - data movement and arithmetic (`setvar`, `addvarvar`, ...)
//! - flat-array access (`getarray`, `setarray`, `resizearray`)
//! - conditional blocks (`ife` ... `ifneither`)
//! - loop blocks (`whilen`)
//! - control transfer (`call`, `exit`, `terminate`)
//! - actor-member access (`geta`, `seta`)

// ===== Data movement & arithmetic =====
// Each operation comes in an immediate form (`setvar R n`) and a
// register form (`setvarvar R S`).
pub const SETVAR: &str = "setvar";
pub const SETVARVAR: &str = "setvarvar";
pub const ADDVAR: &str = "addvar";
pub const ADDVARVAR: &str = "addvarvar";
pub const SUBVAR: &str = "subvar";
pub const SUBVARVAR: &str = "subvarvar";
pub const MULVAR: &str = "mulvar";
pub const MULVARVAR: &str = "mulvarvar";
pub const DIVVAR: &str = "divvar";
pub const DIVVARVAR: &str = "divvarvar";
pub const MODVAR: &str = "modvar";
pub const MODVARVAR: &str = "modvarvar";
pub const ANDVAR: &str = "andvar";
pub const ANDVARVAR: &str = "andvarvar";
pub const ORVAR: &str = "orvar";
pub const ORVARVAR: &str = "orvarvar";
pub const XORVAR: &str = "xorvar";
pub const XORVARVAR: &str = "xorvarvar";

// ===== Flat arrays =====
/// `getarray DST ARR IDX` - DST = ARR[IDX]
pub const GETARRAY: &str = "getarray";
/// `setarray ARR IDX SRC` - ARR[IDX] = SRC
pub const SETARRAY: &str = "setarray";
/// `resizearray ARR n` - grow (or shrink) ARR; new slots read as 0
pub const RESIZEARRAY: &str = "resizearray";

// ===== Control transfer =====
/// `call NAME` - run a state; execution resumes after the call when the
/// state falls off its `ends` or runs `exit`
pub const CALL: &str = "call";
/// `exit` - return from the current state immediately
pub const EXIT: &str = "exit";
/// `terminate` - end the current actor/event tick
pub const TERMINATE: &str = "terminate";

// ===== Actor members =====
/// `geta CODE DST` - read a native actor property into DST
pub const GETA: &str = "geta";
/// `seta CODE SRC` - write SRC into a native actor property
pub const SETA: &str = "seta";

// ===== Block keywords =====
pub const STATE: &str = "state";
pub const ENDS: &str = "ends";
pub const WHILEN: &str = "whilen";
pub const ACTOR: &str = "actor";
pub const EVENT: &str = "event";
pub const ONNEWGAME: &str = "onnewgame";
pub const ONSPAWN: &str = "onspawn";

// ===== Top-level declarations =====
pub const STACKSIZE: &str = "stacksize";
pub const VAR: &str = "var";
pub const ARRAY: &str = "array";
pub const ACTION: &str = "action";
pub const MOVE: &str = "move";
pub const AI: &str = "ai";
pub const DEFINEQUOTE: &str = "definequote";

/// Two-operand conditional block forms.
///
/// Every conditional in the target is a block guarded by exactly one of
/// these over two pre-evaluated operands; there are no jump instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cond {
    /// `ife A B` - A == B
    Eq,
    /// `ifn A B` - A != B
    Ne,
    /// `ifl A B` - A < B
    Lt,
    /// `ifg A B` - A > B
    Gt,
    /// `ifle A B` - A <= B
    Le,
    /// `ifge A B` - A >= B
    Ge,
    /// `ifboth A B` - A != 0 and B != 0
    Both,
    /// `ifeither A B` - A != 0 or B != 0
    Either,
    /// `ifneither A B` - neither A nor B is nonzero (negated or)
    Neither,
}

impl Cond {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Cond::Eq => "ife",
            Cond::Ne => "ifn",
            Cond::Lt => "ifl",
            Cond::Gt => "ifg",
            Cond::Le => "ifle",
            Cond::Ge => "ifge",
            Cond::Both => "ifboth",
            Cond::Either => "ifeither",
            Cond::Neither => "ifneither",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Cond> {
        Some(match s {
            "ife" => Cond::Eq,
            "ifn" => Cond::Ne,
            "ifl" => Cond::Lt,
            "ifg" => Cond::Gt,
            "ifle" => Cond::Le,
            "ifge" => Cond::Ge,
            "ifboth" => Cond::Both,
            "ifeither" => Cond::Either,
            "ifneither" => Cond::Neither,
            _ => return None,
        })
    }

    /// Evaluate the condition over two operand values.
    pub fn eval(self, a: i64, b: i64) -> bool {
        match self {
            Cond::Eq => a == b,
            Cond::Ne => a != b,
            Cond::Lt => a < b,
            Cond::Gt => a > b,
            Cond::Le => a <= b,
            Cond::Ge => a >= b,
            Cond::Both => a != 0 && b != 0,
            Cond::Either => a != 0 || b != 0,
            Cond::Neither => a == 0 && b == 0,
        }
    }

    /// The condition matching a negated comparison, used when a lowering
    /// needs the opposite branch sense.
    pub fn negated(self) -> Option<Cond> {
        Some(match self {
            Cond::Eq => Cond::Ne,
            Cond::Ne => Cond::Eq,
            Cond::Lt => Cond::Ge,
            Cond::Gt => Cond::Le,
            Cond::Le => Cond::Gt,
            Cond::Ge => Cond::Lt,
            Cond::Either => Cond::Neither,
            Cond::Neither => Cond::Either,
            Cond::Both => return None,
        })
    }
}
