//! Smart pointer for pool-allocated objects

use core::fmt;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};

use super::PoolAllocator;
use crate::allocator::{Allocator, SystemAllocator, TypedAllocator};
use crate::construct::{construct, destroy};
use crate::error::AllocResult;

/// RAII smart pointer for pool-allocated values
///
/// Automatically destroys the value and returns its block to the pool when
/// dropped. The borrow of the pool keeps the box from outliving it.
pub struct PoolBox<'a, T, A: Allocator = SystemAllocator> {
    ptr: NonNull<T>,
    pool: &'a PoolAllocator<A>,
    _owns: PhantomData<T>,
}

impl<'a, T, A: Allocator> PoolBox<'a, T, A> {
    /// Moves `value` into a block taken from `pool`.
    #[must_use = "allocated value must be used"]
    pub fn new_in(value: T, pool: &'a PoolAllocator<A>) -> AllocResult<Self> {
        // SAFETY: the block is sized and aligned for `T` and initialized
        // right away; `PoolBox` owns it exclusively until drop.
        let ptr = unsafe {
            let ptr = pool.alloc_typed::<T>()?;
            construct(ptr.as_ptr(), value);
            ptr
        };

        Ok(Self {
            ptr,
            pool,
            _owns: PhantomData,
        })
    }

    /// Pool this value lives in.
    pub fn pool(&self) -> &'a PoolAllocator<A> {
        self.pool
    }

    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Consumes the box and returns the contained value
    #[must_use]
    pub fn into_inner(self) -> T {
        let this = ManuallyDrop::new(self);
        // SAFETY: the value is initialized and read exactly once; the block is
        // released without running the destructor again.
        unsafe {
            let value = ptr::read(this.ptr.as_ptr());
            this.pool.dealloc_typed(this.ptr);
            value
        }
    }
}

impl<T, A: Allocator> Deref for PoolBox<'_, T, A> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: initialized in `new_in`, exclusively owned by `self`.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T, A: Allocator> DerefMut for PoolBox<'_, T, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: initialized in `new_in`; `&mut self` guarantees exclusivity.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T, A: Allocator> Drop for PoolBox<'_, T, A> {
    fn drop(&mut self) {
        // SAFETY: the value is live and owned by `self`; its block came from
        // `alloc_typed::<T>` on the same pool.
        unsafe {
            destroy(self.ptr.as_ptr());
            self.pool.dealloc_typed(self.ptr);
        }
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for PoolBox<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PoolBox").field(&**self).finish()
    }
}
