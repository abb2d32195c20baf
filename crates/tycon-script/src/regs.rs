//! Well-known registers and arrays
//!
//! The target has a single global address space of named registers and
//! arrays. The compiler reserves this fixed set for the machinery it
//! synthesizes (frames, scratch, calling convention, switch/loop state,
//! closure dispatch, heap allocator); user globals get `g_`-prefixed names
//! and never collide.

/// Frame base: start of the current function's local window on `stack`.
pub const RBP: &str = "rbp";
/// Stack top: next free slot on `stack`.
pub const RSP: &str = "rsp";
/// Accumulator: expression results and return values.
pub const RACC: &str = "racc";
/// Expression scratch registers.
pub const RSC0: &str = "rsc0";
pub const RSC1: &str = "rsc1";
/// Captured switch value.
pub const RSW: &str = "rsw";
/// Switch matched flag (set once a case has matched; drives fallthrough).
pub const RCASE: &str = "rcase";
/// Loop continue flag for the innermost while.
pub const RWHL: &str = "rwhl";
/// Pending-return flag raised by `return` inside a switch state.
pub const RRET: &str = "rret";
/// Closure dispatch tag.
pub const RFN: &str = "rfn";

/// Allocator interface registers.
pub const RHSZ: &str = "rhsz";
pub const RHPTR: &str = "rhptr";
/// Allocator internals.
pub const RHPG: &str = "rhpg";
pub const RHI: &str = "rhi";
pub const RHRUN: &str = "rhrun";
pub const RHSTART: &str = "rhstart";
pub const RHFOUND: &str = "rhfound";
pub const RHGO: &str = "rhgo";
pub const RHTMP: &str = "rhtmp";
pub const RHEND: &str = "rhend";
pub const RHN: &str = "rhn";
pub const RHCAP: &str = "rhcap";
pub const RHOLD: &str = "rhold";
pub const RHOSZ: &str = "rhosz";
pub const RHV: &str = "rhv";

/// The three well-known arrays.
pub const STACK: &str = "stack";
pub const HEAP: &str = "heap";
pub const PAGES: &str = "pages";

/// Number of argument registers (`ra0`..`ra7`).
pub const ARG_REG_COUNT: usize = 8;

/// Name of argument register `i`. Panics if `i` is out of range; callers
/// enforce the arity limit before asking.
pub fn arg(i: usize) -> String {
    assert!(i < ARG_REG_COUNT, "argument register index out of range");
    format!("ra{}", i)
}

/// All reserved registers with their initial values, in declaration order.
pub fn reserved_registers() -> Vec<(&'static str, i64)> {
    let mut regs = vec![
        (RBP, 0),
        (RSP, 0),
        (RACC, 0),
        (RSC0, 0),
        (RSC1, 0),
        (RSW, 0),
        (RCASE, 0),
        (RWHL, 0),
        (RRET, 0),
        (RFN, 0),
        (RHSZ, 0),
        (RHPTR, 0),
        (RHPG, 0),
        (RHI, 0),
        (RHRUN, 0),
        (RHSTART, 0),
        (RHFOUND, 0),
        (RHGO, 0),
        (RHTMP, 0),
        (RHEND, 0),
        (RHN, 0),
        (RHOLD, 0),
        (RHOSZ, 0),
        (RHV, 0),
    ];
    // rhcap starts at the configured page count; the caller patches it in.
    regs.push((RHCAP, 0));
    regs
}
