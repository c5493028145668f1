use nebula_stl::allocator::{Allocator, PoolAllocator, PoolConfig};
use nebula_stl::utils::{MAX_BYTES, round_up};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::alloc::Layout;

fn pool() -> PoolAllocator {
    PoolAllocator::with_config(PoolConfig::production()).unwrap()
}

#[rstest]
#[case(1)]
#[case(7)]
#[case(8)]
#[case(9)]
#[case(24)]
#[case(63)]
#[case(100)]
#[case(128)]
fn test_freed_block_is_reused_first(#[case] bytes: usize) {
    let pool = pool();
    let first = pool.allocate(bytes);
    unsafe { pool.deallocate(first, bytes) };
    let second = pool.allocate(bytes);
    assert_eq!(first, second);
    unsafe { pool.deallocate(second, bytes) };
}

#[rstest]
#[case(1)]
#[case(16)]
#[case(40)]
#[case(128)]
fn test_first_refill_leaves_nineteen(#[case] bytes: usize) {
    let pool = pool();
    let _block = pool.allocate(bytes);
    assert_eq!(pool.free_count(bytes), 19);

    let size = round_up(bytes);
    assert_eq!(pool.heap_size(), 2 * 20 * size);
    assert_eq!(pool.bytes_left(), 20 * size);
}

#[rstest]
#[case(9, 16)]
#[case(16, 9)]
#[case(100, 104)]
fn test_same_class_shares_bucket(#[case] a: usize, #[case] b: usize) {
    let pool = pool();
    let block = pool.allocate(a);
    unsafe { pool.deallocate(block, a) };
    assert_eq!(pool.allocate(b), block);
}

#[test]
fn test_large_requests_bypass_buckets() {
    let pool = pool();
    let block = pool.allocate(MAX_BYTES + 1);
    unsafe { block.as_ptr().write_bytes(0x5A, MAX_BYTES + 1) };

    let stats = pool.stats();
    assert_eq!(stats.total_free_blocks(), 0);
    assert_eq!(stats.heap_size, 0);
    assert_eq!(stats.refills, 0);

    unsafe { pool.deallocate(block, MAX_BYTES + 1) };
    assert_eq!(pool.stats().total_free_blocks(), 0);
}

#[test]
fn test_steady_churn_does_not_grow_heap() {
    let pool = pool();
    for _ in 0..1000 {
        let block = pool.allocate(16);
        unsafe { pool.deallocate(block, 16) };
    }
    assert_eq!(pool.heap_size(), 640);
    assert_eq!(pool.stats().refills, 1);
    assert_eq!(pool.free_count(16), 20);
}

#[test]
fn test_thousand_blocks_reused_after_reverse_free() {
    let pool = pool();
    let blocks: Vec<_> = (0..1000).map(|_| pool.allocate(16)).collect();
    let heap = pool.heap_size();
    let refills = pool.stats().refills;

    for &block in blocks.iter().rev() {
        unsafe { pool.deallocate(block, 16) };
    }
    assert!(pool.free_count(16) >= 1000);

    let again: Vec<_> = (0..1000).map(|_| pool.allocate(16)).collect();
    assert_eq!(pool.heap_size(), heap);
    assert_eq!(pool.stats().refills, refills);
    // LIFO: the first block handed back out is the last one freed.
    assert_eq!(again[0], blocks[0]);
}

#[test]
fn test_many_live_blocks_are_distinct() {
    let pool = pool();
    let blocks: Vec<_> = (0..100).map(|_| pool.allocate(24)).collect();

    let mut addrs: Vec<_> = blocks.iter().map(|b| b.as_ptr().addr()).collect();
    addrs.sort_unstable();
    addrs.dedup();
    assert_eq!(addrs.len(), 100);
    assert!(addrs.iter().all(|addr| addr % 8 == 0));

    for block in blocks {
        unsafe { pool.deallocate(block, 24) };
    }
    assert!(pool.free_count(24) >= 100);
}

#[test]
fn test_reallocate_same_class_keeps_pointer() {
    let pool = pool();
    let block = pool.allocate(10);
    unsafe {
        assert_eq!(pool.reallocate(block, 10, 10), block);
        assert_eq!(pool.reallocate(block, 10, 16), block);
        pool.deallocate(block, 16);
    }
}

#[test]
fn test_reallocate_moves_and_copies_prefix() {
    let pool = pool();
    let block = pool.allocate(16);
    unsafe {
        for i in 0..16u8 {
            block.as_ptr().add(usize::from(i)).write(i);
        }

        let grown = pool.reallocate(block, 16, 200);
        assert_ne!(grown, block);
        let prefix = std::slice::from_raw_parts(grown.as_ptr(), 16);
        assert_eq!(prefix, (0..16u8).collect::<Vec<_>>().as_slice());
        // The old block went back to its bucket.
        assert_eq!(pool.free_count(16), 20);

        let shrunk = pool.reallocate(grown, 200, 4);
        let prefix = std::slice::from_raw_parts(shrunk.as_ptr(), 4);
        assert_eq!(prefix, &[0, 1, 2, 3]);
        pool.deallocate(shrunk, 4);
    }
}

#[test]
fn test_layout_interface_routes_by_alignment() {
    let pool = pool();
    unsafe {
        let small = Layout::from_size_align(32, 8).unwrap();
        let block = Allocator::allocate(&pool, small).unwrap();
        assert_eq!(pool.free_count(32), 19);
        Allocator::deallocate(&pool, block.cast(), small);
        assert_eq!(pool.free_count(32), 20);

        let aligned = Layout::from_size_align(32, 64).unwrap();
        let block = Allocator::allocate(&pool, aligned).unwrap();
        assert_eq!(block.cast::<u8>().as_ptr().addr() % 64, 0);
        assert_eq!(pool.free_count(32), 20);
        Allocator::deallocate(&pool, block.cast(), aligned);
    }
}
