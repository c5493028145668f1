//! Storage from the pool, values placed with the lifecycle helpers.

use std::cell::Cell;
use std::rc::Rc;

use nebula_stl::allocator::{PoolAllocator, PoolBox, PoolConfig, TypedAllocator};
use nebula_stl::construct::{destroy_range, try_uninitialized_fill_with, uninitialized_copy};
use nebula_stl::set::TreeSet;
use pretty_assertions::assert_eq;

#[derive(Clone)]
struct Counted(Rc<Cell<usize>>);

impl Drop for Counted {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn test_fill_pool_block_and_destroy() {
    let pool = PoolAllocator::with_config(PoolConfig::debug()).unwrap();
    let drops = Rc::new(Cell::new(0));
    let source = vec![Counted(Rc::clone(&drops)); 6];

    unsafe {
        let block = pool.alloc_array::<Counted>(6).unwrap();
        let end = uninitialized_copy(&source, block.as_ptr());
        assert_eq!(end.offset_from(block.as_ptr()), 6);

        destroy_range(block.as_ptr(), 6);
        assert_eq!(drops.get(), 6);
        pool.dealloc_array(block, 6);
    }

    drop(source);
    assert_eq!(drops.get(), 12);
}

#[test]
fn test_failed_fill_leaves_nothing_behind() {
    let pool = PoolAllocator::new();
    let drops = Rc::new(Cell::new(0));

    unsafe {
        let block = pool.alloc_array::<Counted>(8).unwrap();
        let result = try_uninitialized_fill_with(block.as_ptr(), 8, |i| {
            if i == 5 {
                Err(i)
            } else {
                Ok(Counted(Rc::clone(&drops)))
            }
        });
        assert_eq!(result, Err(5));
        assert_eq!(drops.get(), 5);
        pool.dealloc_array(block, 8);
    }
}

#[test]
fn test_pool_boxes_share_buckets() {
    let pool = PoolAllocator::with_config(PoolConfig::production()).unwrap();
    let a = PoolBox::new_in(TreeSet::<u32>::new(), &pool).unwrap();
    let b = PoolBox::new_in(TreeSet::<u32>::new(), &pool).unwrap();
    assert_eq!(pool.stats().refills, 1);

    let bytes = size_of::<TreeSet<u32>>();
    let free = pool.free_count(bytes);
    drop(a);
    drop(b);
    assert_eq!(pool.free_count(bytes), free + 2);
}

#[test]
fn test_set_roundtrip_through_iterators() {
    let mut set: TreeSet<&str> = ["pear", "apple", "fig"].into_iter().collect();
    set.extend(["apple", "kiwi"]);
    assert_eq!(set.len(), 4);

    let borrowed: Vec<&str> = (&set).into_iter().copied().collect();
    assert_eq!(borrowed, vec!["apple", "fig", "kiwi", "pear"]);

    let owned: Vec<&str> = set.into_iter().rev().collect();
    assert_eq!(owned, vec!["pear", "kiwi", "fig", "apple"]);
}
