//! Native binding table
//!
//! Fixed-arity, fixed-semantics operations provided by the host runtime.
//! Each entry declares its emitted opcode and the expected kind of every
//! argument; arity and kind mismatches are diagnostics, never aborts. A
//! call site resolves to either one of these descriptors or a user-defined
//! symbol exactly once, as a tagged variant.

use crate::symbols::Symbol;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// Expected kind of one native argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeArg {
    /// Must fold to a compile-time numeric literal.
    Constant,
    /// Evaluated at runtime; passed in a scratch register.
    Variable,
    /// Must be a string literal; passed as a quote index.
    Str,
    /// Must name a declared action/move/ai label.
    Label,
}

/// Descriptor of one native binding.
#[derive(Debug, Clone)]
pub struct NativeDescriptor {
    /// Surface name callers use.
    pub name: &'static str,
    /// Emitted mnemonic.
    pub opcode: &'static str,
    /// Expected argument kinds, in order.
    pub args: &'static [NativeArg],
    /// Minimum arity; arguments past this are optional.
    pub min_args: usize,
    /// True for probes that leave a result in the accumulator.
    pub returns_value: bool,
}

const fn native(
    name: &'static str,
    opcode: &'static str,
    args: &'static [NativeArg],
    min_args: usize,
    returns_value: bool,
) -> NativeDescriptor {
    NativeDescriptor { name, opcode, args, min_args, returns_value }
}

use NativeArg::{Constant, Label, Str, Variable};

/// The full native table. Keep alphabetized by surface name.
static DESCRIPTORS: &[NativeDescriptor] = &[
    native("addAmmo", "addammo", &[Constant, Variable], 2, false),
    native("addHealth", "addphealth", &[Variable], 1, false),
    native("addWeapon", "addweapon", &[Constant, Variable], 2, false),
    native("awayFromWall", "awayfromwall", &[], 0, true),
    native("cactor", "cactor", &[Constant], 1, false),
    native("canSee", "cansee", &[], 0, true),
    native("canShoot", "canshoot", &[], 0, true),
    native("count", "count", &[Constant], 1, false),
    native("debris", "debris", &[Constant, Constant], 2, false),
    native("globalSound", "globalsound", &[Constant], 1, false),
    native("guts", "guts", &[Constant, Constant], 2, false),
    native("hitRadius", "hitradius", &[Constant, Constant, Constant, Constant, Constant], 5, false),
    native("killIt", "killit", &[], 0, false),
    native("operate", "operate", &[], 0, false),
    native(
        "palFrom",
        "palfrom",
        &[Constant, Constant, Constant, Constant],
        1,
        false,
    ),
    native("quote", "quote", &[Str], 1, false),
    native("rand", "randv", &[Constant], 1, true),
    native("setAction", "curaction", &[Label], 1, false),
    native("setAi", "curai", &[Label], 1, false),
    native("setMove", "curmove", &[Label, Constant], 1, false),
    native("shoot", "shoot", &[Constant], 1, false),
    native("sizeAt", "sizeat", &[Constant, Constant], 2, false),
    native("sizeTo", "sizeto", &[Constant, Constant], 2, false),
    native("sleepTime", "sleeptime", &[Constant], 1, false),
    native("sound", "sound", &[Constant], 1, false),
    native("spawn", "spawn", &[Constant], 1, false),
    native("spriteCstat", "cstat", &[Constant], 1, false),
    native("spritePal", "spritepal", &[Constant], 1, false),
    native("strength", "strength", &[Constant], 1, false),
];

static TABLE: Lazy<FxHashMap<&'static str, &'static NativeDescriptor>> = Lazy::new(|| {
    let mut map = FxHashMap::default();
    for descriptor in DESCRIPTORS {
        map.insert(descriptor.name, descriptor);
    }
    map
});

/// Look up a native binding by surface name.
pub fn lookup(name: &str) -> Option<&'static NativeDescriptor> {
    TABLE.get(name).copied()
}

/// A call site's resolved target, decided once per site.
#[derive(Debug, Clone)]
pub enum Callee {
    Native(&'static NativeDescriptor),
    User(Symbol),
}
