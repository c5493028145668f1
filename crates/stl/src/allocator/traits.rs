//! Allocator traits
//!
//! The system is built around two traits:
//! - `Allocator`: layout-based allocation/deallocation/reallocation over raw
//!   memory. Implemented by the system allocator, the budget wrapper and the
//!   pool allocator.
//! - `TypedAllocator`: typed convenience layer (single values and arrays of
//!   `T`) blanket-implemented for every `Allocator`.
//!
//! # Safety
//!
//! `Allocator` is an unsafe trait. Implementors promise that:
//! - returned pointers are valid for reads and writes of `layout.size()` bytes
//!   and aligned to `layout.align()`;
//! - memory stays valid until passed back to `deallocate` with the same layout;
//! - a failed `reallocate` leaves the original block untouched and valid.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::error::{AllocError, AllocResult};

/// Well-aligned dangling pointer for zero-sized layouts.
#[inline]
pub(crate) fn dangling_for(layout: Layout) -> NonNull<u8> {
    NonNull::new(core::ptr::without_provenance_mut::<u8>(layout.align()))
        .unwrap_or(NonNull::dangling())
}

/// Raw, layout-based allocator.
///
/// All methods take `&self`: allocators keep their bookkeeping behind
/// interior mutability so they can be shared by the containers they serve.
///
/// # Safety Requirements
///
/// Implementors must ensure that:
/// - Returned pointers are valid for the requested size and alignment
/// - Deallocation only accepts pointers this allocator produced
/// - A failed reallocation leaves the original allocation intact
pub unsafe trait Allocator {
    /// Allocates memory with the given layout.
    ///
    /// # Safety
    /// The returned memory is uninitialized and must be initialized before
    /// it is read.
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>>;

    /// Deallocates memory at the given pointer with the specified layout.
    ///
    /// # Safety
    /// - `ptr` must have been allocated by this allocator
    /// - `layout` must match the original allocation layout exactly
    /// - After this call, `ptr` becomes invalid and must not be used
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Resizes an existing allocation.
    ///
    /// The default implementation returns the same pointer when the layouts
    /// are identical and otherwise allocates, copies the common prefix and
    /// frees the old block.
    ///
    /// # Safety
    /// - `ptr` must have been allocated by this allocator with `old_layout`
    /// - on success the old pointer is invalid; on error it is untouched
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> AllocResult<NonNull<[u8]>> {
        if old_layout == new_layout {
            return Ok(NonNull::slice_from_raw_parts(ptr, new_layout.size()));
        }

        // SAFETY: a `Layout` is always a valid request.
        let new_ptr = unsafe { self.allocate(new_layout)? };

        let copy_size = old_layout.size().min(new_layout.size());
        // SAFETY: both blocks are valid for `copy_size` bytes and distinct.
        unsafe {
            core::ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.cast::<u8>().as_ptr(), copy_size);
        }

        // SAFETY: caller contract; contents already moved to `new_ptr`.
        unsafe { self.deallocate(ptr, old_layout) };
        Ok(new_ptr)
    }
}

// SAFETY: forwards every call to the referenced allocator unchanged.
unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).allocate(layout) }
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).deallocate(ptr, layout) }
    }

    #[inline]
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> AllocResult<NonNull<[u8]>> {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).reallocate(ptr, old_layout, new_layout) }
    }
}

/// Typed allocation helpers for any [`Allocator`].
///
/// Mirrors the classic `alloc<T>` interface: `alloc_array(0)` hands back a
/// dangling pointer without touching the allocator, and `dealloc_array` with
/// a zero count is a no-op.
pub trait TypedAllocator: Allocator {
    /// Allocates uninitialized storage for one `T`.
    ///
    /// # Safety
    /// Initialize before reading; release with [`TypedAllocator::dealloc_typed`].
    #[inline]
    unsafe fn alloc_typed<T>(&self) -> AllocResult<NonNull<T>> {
        // SAFETY: layout derived from `T`.
        let ptr = unsafe { self.allocate(Layout::new::<T>())? };
        Ok(ptr.cast::<T>())
    }

    /// Allocates uninitialized storage for `count` values of `T`.
    ///
    /// # Safety
    /// Initialize before reading; release with
    /// [`TypedAllocator::dealloc_array`] passing the same `count`.
    #[inline]
    unsafe fn alloc_array<T>(&self, count: usize) -> AllocResult<NonNull<T>> {
        if count == 0 {
            return Ok(NonNull::dangling());
        }

        let layout =
            Layout::array::<T>(count).map_err(|_| AllocError::size_overflow("array layout"))?;
        // SAFETY: layout checked for overflow above.
        let ptr = unsafe { self.allocate(layout)? };
        Ok(ptr.cast::<T>())
    }

    /// Releases storage from [`TypedAllocator::alloc_typed`].
    ///
    /// # Safety
    /// `ptr` came from `alloc_typed::<T>` on this allocator; any value in it
    /// has already been destroyed.
    #[inline]
    unsafe fn dealloc_typed<T>(&self, ptr: NonNull<T>) {
        // SAFETY: forwarded caller contract.
        unsafe { self.deallocate(ptr.cast(), Layout::new::<T>()) }
    }

    /// Releases storage from [`TypedAllocator::alloc_array`].
    ///
    /// # Safety
    /// `ptr` came from `alloc_array::<T>(count)` on this allocator.
    #[inline]
    unsafe fn dealloc_array<T>(&self, ptr: NonNull<T>, count: usize) {
        if count == 0 {
            return;
        }
        // The same `count` produced a valid layout at allocation time.
        if let Ok(layout) = Layout::array::<T>(count) {
            // SAFETY: forwarded caller contract.
            unsafe { self.deallocate(ptr.cast(), layout) }
        }
    }
}

impl<A: Allocator + ?Sized> TypedAllocator for A {}
