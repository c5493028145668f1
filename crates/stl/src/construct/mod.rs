//! Object lifecycle over raw memory
//!
//! Placement construction and explicit destruction for storage obtained from
//! an allocator. Containers pair these with `allocate`/`deallocate`: storage
//! is acquired first, values are constructed into it, destroyed in place, and
//! only then is the storage released.
//!
//! # Safety
//!
//! Every function here is `unsafe`: the caller vouches that pointers are
//! valid, aligned for `T`, and in the right state (uninitialized before
//! `construct`, initialized before `destroy`).

mod uninitialized;

pub use uninitialized::{
    uninitialized_copy, uninitialized_fill, uninitialized_fill_n, try_uninitialized_fill_with,
};

use core::ptr;

/// Moves `value` into uninitialized storage at `ptr`.
///
/// # Safety
/// `ptr` must be valid for writes and aligned for `T`. Any previous value at
/// `ptr` is overwritten without being dropped.
#[inline]
pub unsafe fn construct<T>(ptr: *mut T, value: T) {
    // SAFETY: caller guarantees `ptr` is writable and aligned for `T`.
    unsafe { ptr.write(value) }
}

/// Constructs `T::default()` at `ptr`.
///
/// # Safety
/// Same as [`construct`].
#[inline]
pub unsafe fn construct_default<T: Default>(ptr: *mut T) {
    // SAFETY: forwarded caller contract.
    unsafe { construct(ptr, T::default()) }
}

/// Runs the destructor of the value at `ptr`, leaving the storage
/// uninitialized.
///
/// # Safety
/// `ptr` must point to an initialized `T` that is not used afterwards.
#[inline]
pub unsafe fn destroy<T>(ptr: *mut T) {
    // SAFETY: caller guarantees `ptr` holds a live `T`.
    unsafe { ptr::drop_in_place(ptr) }
}

/// Destroys `len` consecutive values starting at `first`.
///
/// When `T` has no drop glue the loop is skipped entirely; `needs_drop` is a
/// compile-time constant, so the branch is resolved per monomorphization.
///
/// # Safety
/// `first..first + len` must hold initialized values of `T` that are not used
/// afterwards.
#[inline]
pub unsafe fn destroy_range<T>(first: *mut T, len: usize) {
    if !core::mem::needs_drop::<T>() {
        return;
    }
    // SAFETY: caller guarantees the whole range is initialized; dropping the
    // slice in place runs each destructor once, front to back.
    unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(first, len)) }
}
