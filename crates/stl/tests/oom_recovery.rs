//! Exhaustion paths of the two-level allocator, driven by a byte budget.

use nebula_stl::allocator::{
    BudgetAllocator, MallocAllocator, MemoryBudget, PoolAllocator, PoolConfig,
};
use pretty_assertions::assert_eq;

fn budgeted_pool(limit: usize) -> (PoolAllocator<BudgetAllocator>, MemoryBudget) {
    let budget = MemoryBudget::new(limit);
    let raw = BudgetAllocator::new(budget.clone());
    let pool = PoolAllocator::with_allocator(raw, PoolConfig::production()).unwrap();
    (pool, budget)
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("nebula_stl=debug")
        .with_test_writer()
        .try_init();
}

#[test]
fn test_handler_runs_until_budget_allows() {
    init_logging();
    let (pool, budget) = budgeted_pool(0);

    let handle = budget.clone();
    pool.set_oom_handler(Some(Box::new(move || handle.grow(256))));

    // First refill of the 16-byte class asks for 640 bytes.
    let block = pool.allocate(16);
    assert_eq!(pool.first_level().oom_invocations(), 3);
    assert_eq!(pool.heap_size(), 640);
    assert_eq!(budget.used(), 640);
    assert_eq!(pool.free_count(16), 19);

    unsafe { pool.deallocate(block, 16) };
}

#[test]
fn test_handler_can_be_swapped_out() {
    let malloc = MallocAllocator::with_allocator(BudgetAllocator::new(MemoryBudget::new(0)));
    assert!(malloc.set_oom_handler(Some(Box::new(|| {}))).is_none());
    assert!(malloc.has_oom_handler());

    let previous = malloc.set_oom_handler(None);
    assert!(previous.is_some());
    assert!(!malloc.has_oom_handler());
    assert!(malloc.try_allocate(64).is_err());
}

#[test]
fn test_try_allocate_reports_exhaustion() {
    let (pool, budget) = budgeted_pool(0);

    let error = pool.try_allocate(16).unwrap_err();
    assert!(error.is_allocation_failure());
    assert!(error.is_retryable());
    assert_eq!(error.code(), "MEM:ALLOC:FAILED");

    assert!(pool.try_allocate(4096).is_err());
    assert!(budget.denied() >= 2);
    assert_eq!(pool.heap_size(), 0);
}

#[test]
fn test_scavenges_larger_block_when_growth_fails() {
    init_logging();
    // Exactly one arena: 64-byte refill asks for 2 * 20 * 64.
    let (pool, budget) = budgeted_pool(2560);

    let _a = pool.allocate(64);
    assert_eq!(pool.bytes_left(), 1280);

    // Partial batch of ten 128-byte blocks drains the arena.
    let _b = pool.allocate(128);
    assert_eq!(pool.bytes_left(), 0);
    assert_eq!(pool.free_count(128), 9);
    assert_eq!(budget.remaining(), 0);

    // Growth is denied, so a spare 64-byte block becomes the arena.
    let small = pool.try_allocate(8).unwrap();
    let stats = pool.stats();
    assert_eq!(stats.scavenges, 1);
    assert_eq!(stats.heap_size, 2560);
    assert_eq!(stats.arena_chunks, 1);
    assert_eq!(pool.free_count(64), 18);
    assert_eq!(pool.free_count(8), 7);
    assert_eq!(pool.bytes_left(), 0);

    unsafe { pool.deallocate(small, 8) };
    assert_eq!(pool.free_count(8), 8);
}

#[test]
fn test_salvages_arena_tail_before_growing() {
    let (pool, _budget) = budgeted_pool(usize::MAX);

    // 320-byte arena, 160 carved for the 8-byte class.
    let _a = pool.allocate(8);
    // One 96-byte block fits, leaving a 64-byte tail.
    let _b = pool.allocate(96);
    assert_eq!(pool.bytes_left(), 64);

    // 72 bytes do not fit the tail: it is filed under the 64-byte class.
    let _c = pool.allocate(72);
    let stats = pool.stats();
    assert_eq!(pool.free_count(64), 1);
    assert_eq!(stats.salvaged_bytes, 64);
    assert_eq!(stats.arena_chunks, 2);
}
