//! The emitted page allocator: first-fit scan, run encoding, growth on
//! exhaustion, realloc copying, and alloc/free accounting.

use super::harness::*;

const PAGE: i64 = 16;

fn machine() -> Machine {
    // any compiled program carries the allocator preamble
    let text = compile_ok(module(vec![let_stmt("x", num(1))]));
    let mut machine = Machine::load(&text);
    machine.run_new_game();
    machine
}

fn alloc(machine: &mut Machine, slots: i64) -> i64 {
    machine.set_reg("rhsz", slots);
    machine.run_state("alloc");
    machine.reg("rhptr")
}

fn free(machine: &mut Machine, ptr: i64) {
    machine.set_reg("rhptr", ptr);
    machine.run_state("free");
}

#[test]
fn test_alloc_free_restores_lookup_table() {
    // for sizes from one slot up to several page multiples, freeing the
    // block leaves the table exactly as it was
    for n in [1i64, 5, 16, 17, 40, 64, 128] {
        let mut machine = machine();
        let before = machine.array("pages").to_vec();
        let ptr = alloc(&mut machine, n);
        assert!(
            machine.array("pages").iter().any(|&p| p != 0),
            "alloc({}) must mark pages",
            n
        );
        free(&mut machine, ptr);
        assert_eq!(
            machine.array("pages"),
            &before[..],
            "alloc({})/free must round-trip the lookup table",
            n
        );
    }
}

#[test]
fn test_run_encoding_with_start_bias() {
    let mut machine = machine();
    // 17 slots round up to two pages starting at page 0
    let ptr = alloc(&mut machine, 17);
    assert_eq!(ptr, 0);
    let expected = (1 << 16) | (0 + 1);
    assert_eq!(machine.array("pages")[0], expected);
    assert_eq!(machine.array("pages")[1], expected, "every page of the run is marked");
    assert_eq!(machine.array("pages")[2], 0);
}

#[test]
fn test_first_fit_reuses_freed_run() {
    let mut machine = machine();
    let a = alloc(&mut machine, 4);
    let b = alloc(&mut machine, 4);
    assert_eq!(a, 0);
    assert_eq!(b, PAGE, "second block takes the next page");
    free(&mut machine, a);
    let c = alloc(&mut machine, 4);
    assert_eq!(c, 0, "first-fit scans from page 0");
}

#[test]
fn test_zero_size_still_takes_a_page() {
    let mut machine = machine();
    let ptr = alloc(&mut machine, 0);
    assert_eq!(ptr, 0);
    assert_ne!(machine.array("pages")[0], 0);
}

#[test]
fn test_growth_on_exhaustion() {
    let mut machine = machine();
    // claim the whole initial heap (16 pages)
    let first = alloc(&mut machine, 16 * PAGE);
    assert_eq!(first, 0);
    // exhausted: both the heap and the table grow by the requested run
    let second = alloc(&mut machine, 1);
    assert_eq!(second, 16 * PAGE);
    assert_eq!(machine.array("pages").len(), 17);
    assert_eq!(machine.array("heap").len(), 17 * PAGE as usize);
}

#[test]
fn test_realloc_copies_live_slots_and_leaves_old_block() {
    let mut machine = machine();
    let old = alloc(&mut machine, 4);
    for i in 0..4 {
        let idx = (old + i) as usize;
        machine.arrays.get_mut("heap").unwrap()[idx] = 100 + i;
    }
    machine.set_reg("rhptr", old);
    machine.set_reg("rhsz", 40);
    machine.run_state("realloc");
    let newer = machine.reg("rhptr");
    assert_ne!(newer, old);
    for i in 0..4 {
        assert_eq!(machine.array("heap")[(newer + i) as usize], 100 + i);
    }
    // the old run stays allocated (stale), never coalesced
    assert_ne!(machine.array("pages")[(old / PAGE) as usize], 0);
}

#[test]
fn test_realloc_shrink_copies_only_new_extent() {
    let mut machine = machine();
    let old = alloc(&mut machine, 32);
    for i in 0..32 {
        let idx = (old + i) as usize;
        machine.arrays.get_mut("heap").unwrap()[idx] = 500 + i;
    }
    machine.set_reg("rhptr", old);
    machine.set_reg("rhsz", 8);
    machine.run_state("realloc");
    let newer = machine.reg("rhptr");
    for i in 0..8 {
        assert_eq!(machine.array("heap")[(newer + i) as usize], 500 + i);
    }
}
