//! Heap allocator runtime
//!
//! A fixed preamble emitted once per program, whether or not the program
//! allocates: a page-based allocator over the flat `heap` array with a
//! `pages` lookup table. Every page of an allocated run stores
//! `(endPage << 16) | (startPage + 1)` - the +1 start bias keeps entry 0
//! meaning "free" even for a run starting at page 0 - so `free` can decode
//! the whole run from the block's first page without a separate metadata
//! block. Reuse is strictly first-fit by linear scan from page 0;
//! fragmentation is never compacted.

use tycon_script::regs::{
    HEAP, PAGES, RHCAP, RHEND, RHFOUND, RHGO, RHI, RHN, RHOLD, RHOSZ, RHPG, RHPTR, RHRUN,
    RHSTART, RHSZ, RHTMP, RHV,
};
use tycon_script::writer::ArithOp::{Add, Div, Mod, Mul, Set, Sub};
use tycon_script::{Cond, ScriptUnit, ScriptWriter};

/// Allocation granule, in slots.
pub const PAGE_SIZE: u32 = 16;

/// Names of the emitted allocator states.
pub const STATE_ALLOC: &str = "alloc";
pub const STATE_REALLOC: &str = "realloc";
pub const STATE_FREE: &str = "free";

/// Emit the allocator preamble into the unit: the `heap`/`pages` arrays
/// sized for `heap_pages` and the three allocator states.
pub fn emit_preamble(unit: &mut ScriptUnit, heap_pages: u32) {
    unit.declare_array(HEAP, heap_pages * PAGE_SIZE);
    unit.declare_array(PAGES, heap_pages);
    unit.declare_register(RHCAP, heap_pages as i64);

    let mut w = ScriptWriter::new();
    emit_alloc(&mut w);
    emit_realloc(&mut w);
    emit_free(&mut w);
    unit.set_preamble(w.into_text());
}

/// `alloc`: in `rhsz` (slots), out `rhptr` (heap slot index of the block).
fn emit_alloc(w: &mut ScriptWriter) {
    w.begin_state(STATE_ALLOC);

    w.comment("pages needed, minimum one");
    w.arith(Set, RHPG, RHSZ);
    w.arith(Add, RHPG, (PAGE_SIZE - 1) as i64);
    w.arith(Div, RHPG, PAGE_SIZE as i64);
    w.begin_cond(Cond::Eq, RHPG, 0);
    w.arith(Set, RHPG, 1);
    w.end_block();

    w.comment("first-fit scan from page 0 for a free run");
    w.arith(Set, RHFOUND, -1);
    w.arith(Set, RHSTART, 0);
    w.arith(Set, RHRUN, 0);
    w.arith(Set, RHI, 0);
    w.arith(Set, RHGO, 1);
    w.begin_while(RHGO, 0);
    {
        w.begin_cond(Cond::Ge, RHI, RHCAP);
        w.arith(Set, RHGO, 0);
        w.begin_else();
        {
            w.get_array(RHTMP, PAGES, RHI);
            w.begin_cond(Cond::Eq, RHTMP, 0);
            {
                w.begin_cond(Cond::Eq, RHRUN, 0);
                w.arith(Set, RHSTART, RHI);
                w.end_block();
                w.arith(Add, RHRUN, 1);
                w.begin_cond(Cond::Eq, RHRUN, RHPG);
                w.arith(Set, RHFOUND, RHSTART);
                w.arith(Set, RHGO, 0);
                w.end_block();
            }
            w.begin_else();
            w.arith(Set, RHRUN, 0);
            w.end_block();
            w.arith(Add, RHI, 1);
        }
        w.end_block();
    }
    w.end_block();

    w.comment("exhausted: grow heap and lookup table by the requested run");
    w.begin_cond(Cond::Eq, RHFOUND, -1);
    w.arith(Set, RHFOUND, RHCAP);
    w.arith(Add, RHCAP, RHPG);
    w.resize_array(PAGES, RHCAP);
    w.arith(Set, RHTMP, RHCAP);
    w.arith(Mul, RHTMP, PAGE_SIZE as i64);
    w.resize_array(HEAP, RHTMP);
    w.end_block();

    w.comment("mark the run: (end << 16) | (start + 1)");
    w.arith(Set, RHEND, RHFOUND);
    w.arith(Add, RHEND, RHPG);
    w.arith(Sub, RHEND, 1);
    w.arith(Set, RHTMP, RHEND);
    w.arith(Mul, RHTMP, 65536);
    w.arith(Add, RHTMP, RHFOUND);
    w.arith(Add, RHTMP, 1);
    w.arith(Set, RHI, RHFOUND);
    w.arith(Set, RHN, RHEND);
    w.arith(Add, RHN, 1);
    w.begin_while(RHI, RHN);
    w.set_array(PAGES, RHI, RHTMP);
    w.arith(Add, RHI, 1);
    w.end_block();

    w.arith(Set, RHPTR, RHFOUND);
    w.arith(Mul, RHPTR, PAGE_SIZE as i64);
    w.end_state();
}

/// `realloc`: in `rhptr` (old block) and `rhsz` (new size in slots), out
/// `rhptr` (new block). The old block's live slots are copied; the old
/// block itself is left allocated (stale).
fn emit_realloc(w: &mut ScriptWriter) {
    w.begin_state(STATE_REALLOC);

    w.arith(Set, RHOLD, RHPTR);
    w.comment("decode the old run length from its first page");
    w.arith(Set, RHI, RHOLD);
    w.arith(Div, RHI, PAGE_SIZE as i64);
    w.get_array(RHTMP, PAGES, RHI);
    w.begin_cond(Cond::Eq, RHTMP, 0);
    w.arith(Set, RHOSZ, 0);
    w.begin_else();
    w.arith(Set, RHOSZ, RHTMP);
    w.arith(Div, RHOSZ, 65536);
    w.arith(Set, RHSTART, RHTMP);
    w.arith(Mod, RHSTART, 65536);
    w.arith(Sub, RHSTART, 1);
    w.arith(Sub, RHOSZ, RHSTART);
    w.arith(Add, RHOSZ, 1);
    w.arith(Mul, RHOSZ, PAGE_SIZE as i64);
    w.end_block();

    w.call(STATE_ALLOC);

    w.comment("copy the old block's live slots");
    w.arith(Set, RHN, RHOSZ);
    w.begin_cond(Cond::Gt, RHN, RHSZ);
    w.arith(Set, RHN, RHSZ);
    w.end_block();
    w.arith(Set, RHI, 0);
    w.begin_while(RHI, RHN);
    w.arith(Set, RHTMP, RHOLD);
    w.arith(Add, RHTMP, RHI);
    w.get_array(RHV, HEAP, RHTMP);
    w.arith(Set, RHTMP, RHPTR);
    w.arith(Add, RHTMP, RHI);
    w.set_array(HEAP, RHTMP, RHV);
    w.arith(Add, RHI, 1);
    w.end_block();
    w.end_state();
}

/// `free`: in `rhptr`. Decodes the run from the block's first page and
/// clears every page in it; freeing an unallocated block is a no-op.
fn emit_free(w: &mut ScriptWriter) {
    w.begin_state(STATE_FREE);
    w.arith(Set, RHI, RHPTR);
    w.arith(Div, RHI, PAGE_SIZE as i64);
    w.get_array(RHTMP, PAGES, RHI);
    w.begin_cond(Cond::Ne, RHTMP, 0);
    w.arith(Set, RHEND, RHTMP);
    w.arith(Div, RHEND, 65536);
    w.arith(Set, RHSTART, RHTMP);
    w.arith(Mod, RHSTART, 65536);
    w.arith(Sub, RHSTART, 1);
    w.arith(Set, RHI, RHSTART);
    w.arith(Set, RHN, RHEND);
    w.arith(Add, RHN, 1);
    w.begin_while(RHI, RHN);
    w.set_array(PAGES, RHI, 0);
    w.arith(Add, RHI, 1);
    w.end_block();
    w.end_block();
    w.end_state();
}
