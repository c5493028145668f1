//! System allocator implementation
//!
//! Wraps the platform allocator behind the crate's [`Allocator`] trait. This
//! is the raw memory source underneath the first-level allocator.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::NonNull;
use std::alloc::System;

use super::Allocator;
use super::traits::dangling_for;
use crate::error::{AllocError, AllocResult};

/// Wrapper for the system's default allocator
///
/// Zero-sized requests are answered with a well-aligned dangling pointer and
/// never reach the platform allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl SystemAllocator {
    /// Creates a new SystemAllocator
    #[inline]
    pub const fn new() -> Self {
        SystemAllocator
    }
}

// SAFETY: delegates to `std::alloc::System`, which upholds the same contract.
unsafe impl Allocator for SystemAllocator {
    #[inline]
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        if layout.size() == 0 {
            return Ok(NonNull::slice_from_raw_parts(dangling_for(layout), 0));
        }

        // SAFETY: non-zero size checked above.
        let ptr = unsafe { System.alloc(layout) };

        match NonNull::new(ptr) {
            Some(non_null) => Ok(NonNull::slice_from_raw_parts(non_null, layout.size())),
            None => Err(AllocError::allocation_failed(layout.size(), layout.align())),
        }
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }

        // SAFETY: caller guarantees `ptr` came from `allocate` with `layout`.
        unsafe { System.dealloc(ptr.as_ptr(), layout) };
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> AllocResult<NonNull<[u8]>> {
        if old_layout.align() == new_layout.align()
            && old_layout.size() > 0
            && new_layout.size() > 0
        {
            // SAFETY: same alignment, both sizes non-zero, `ptr` owned by us.
            let new_ptr = unsafe { System.realloc(ptr.as_ptr(), old_layout, new_layout.size()) };
            return match NonNull::new(new_ptr) {
                Some(non_null) => Ok(NonNull::slice_from_raw_parts(non_null, new_layout.size())),
                None => Err(AllocError::allocation_failed(
                    new_layout.size(),
                    new_layout.align(),
                )),
            };
        }

        // Fall back to allocate + copy + deallocate
        // SAFETY: fresh allocation for `new_layout`.
        let new_ptr = unsafe { self.allocate(new_layout)? };
        let copy_size = old_layout.size().min(new_layout.size());
        if copy_size > 0 {
            // SAFETY: both regions valid for `copy_size` bytes and disjoint.
            unsafe {
                core::ptr::copy_nonoverlapping(
                    ptr.as_ptr(),
                    new_ptr.cast::<u8>().as_ptr(),
                    copy_size,
                );
            }
        }
        // SAFETY: caller contract.
        unsafe { self.deallocate(ptr, old_layout) };
        Ok(new_ptr)
    }
}
