//! Bulk construction into uninitialized storage
//!
//! Each routine either constructs the whole range or leaves it fully
//! uninitialized: a scoped [`InitGuard`] destroys the already-built prefix when
//! a clone panics or a fallible constructor returns an error.

use core::ptr;

use super::destroy_range;

/// Tracks how much of a range has been constructed. Dropping the guard
/// without [`InitGuard::finish`] destroys the constructed prefix.
struct InitGuard<T> {
    first: *mut T,
    initialized: usize,
}

impl<T> InitGuard<T> {
    fn new(first: *mut T) -> Self {
        Self {
            first,
            initialized: 0,
        }
    }

    /// # Safety
    /// Slot `first + initialized` must be valid for writes.
    #[inline]
    unsafe fn push(&mut self, value: T) {
        // SAFETY: forwarded caller contract; slot index is in range.
        unsafe { self.first.add(self.initialized).write(value) };
        self.initialized += 1;
    }

    /// Commits the range and returns one past the last constructed slot.
    fn finish(self) -> *mut T {
        let this = core::mem::ManuallyDrop::new(self);
        // SAFETY: `initialized` slots were written, so the offset stays in
        // the caller's allocation.
        unsafe { this.first.add(this.initialized) }
    }
}

impl<T> Drop for InitGuard<T> {
    fn drop(&mut self) {
        // SAFETY: exactly `initialized` leading slots hold live values.
        unsafe { destroy_range(self.first, self.initialized) }
    }
}

/// Clones every element of `src` into uninitialized storage at `dst` and
/// returns one past the last written slot.
///
/// # Safety
/// `dst` must be valid for `src.len()` writes, aligned for `T`, and must not
/// overlap `src`.
pub unsafe fn uninitialized_copy<T: Clone>(src: &[T], dst: *mut T) -> *mut T {
    let mut guard = InitGuard::new(dst);
    for value in src {
        // SAFETY: fewer than `src.len()` slots written so far.
        unsafe { guard.push(value.clone()) };
    }
    guard.finish()
}

/// Fills `len` uninitialized slots at `dst` with clones of `value`.
///
/// # Safety
/// `dst` must be valid for `len` writes and aligned for `T`.
pub unsafe fn uninitialized_fill<T: Clone>(dst: *mut T, len: usize, value: &T) {
    // SAFETY: forwarded caller contract.
    unsafe { uninitialized_fill_n(dst, len, value) };
}

/// Like [`uninitialized_fill`] but returns one past the last written slot.
///
/// # Safety
/// `dst` must be valid for `n` writes and aligned for `T`.
pub unsafe fn uninitialized_fill_n<T: Clone>(dst: *mut T, n: usize, value: &T) -> *mut T {
    if !core::mem::needs_drop::<T>() {
        // No drop glue means an interrupted fill leaves nothing to clean up.
        for i in 0..n {
            // SAFETY: `i < n`, within the caller's writable range.
            unsafe { ptr::write(dst.add(i), value.clone()) };
        }
        // SAFETY: one-past-the-end of the caller's range.
        return unsafe { dst.add(n) };
    }

    let mut guard = InitGuard::new(dst);
    for _ in 0..n {
        // SAFETY: fewer than `n` slots written so far.
        unsafe { guard.push(value.clone()) };
    }
    guard.finish()
}

/// Constructs `len` values produced by `make(index)`.
///
/// On the first `Err`, every value already built is destroyed and the error is
/// returned; the range is then entirely uninitialized again.
///
/// # Safety
/// `dst` must be valid for `len` writes and aligned for `T`.
pub unsafe fn try_uninitialized_fill_with<T, E, F>(
    dst: *mut T,
    len: usize,
    mut make: F,
) -> Result<*mut T, E>
where
    F: FnMut(usize) -> Result<T, E>,
{
    let mut guard = InitGuard::new(dst);
    for index in 0..len {
        let value = make(index)?;
        // SAFETY: fewer than `len` slots written so far.
        unsafe { guard.push(value) };
    }
    Ok(guard.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::MaybeUninit;
    use std::cell::Cell;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::rc::Rc;

    #[derive(Debug)]
    struct Tracked {
        live: Rc<Cell<isize>>,
        id: usize,
        poison: bool,
    }

    impl Tracked {
        fn new(live: &Rc<Cell<isize>>, id: usize) -> Self {
            live.set(live.get() + 1);
            Self {
                live: Rc::clone(live),
                id,
                poison: false,
            }
        }
    }

    impl Clone for Tracked {
        fn clone(&self) -> Self {
            assert!(!self.poison, "clone of poisoned value");
            Self::new(&self.live, self.id)
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.live.set(self.live.get() - 1);
        }
    }

    #[test]
    fn test_uninitialized_copy_clones_in_order() {
        let live = Rc::new(Cell::new(0));
        let src: Vec<Tracked> = (0..4).map(|i| Tracked::new(&live, i)).collect();
        let mut dst: [MaybeUninit<Tracked>; 4] = [const { MaybeUninit::uninit() }; 4];
        let base = dst.as_mut_ptr().cast::<Tracked>();

        unsafe {
            let end = uninitialized_copy(&src, base);
            assert_eq!(end.offset_from(base), 4);
            for i in 0..4 {
                assert_eq!((*base.add(i)).id, i);
            }
            assert_eq!(live.get(), 8);
            destroy_range(base, 4);
        }
        assert_eq!(live.get(), 4);
    }

    #[test]
    fn test_uninitialized_copy_rolls_back_on_panic() {
        let live = Rc::new(Cell::new(0));
        let mut src: Vec<Tracked> = (0..4).map(|i| Tracked::new(&live, i)).collect();
        src[2].poison = true;
        let mut dst: [MaybeUninit<Tracked>; 4] = [const { MaybeUninit::uninit() }; 4];
        let base = dst.as_mut_ptr().cast::<Tracked>();

        let outcome = catch_unwind(AssertUnwindSafe(|| unsafe {
            uninitialized_copy(&src, base);
        }));

        assert!(outcome.is_err());
        // Only the four originals remain; the two clones were destroyed.
        assert_eq!(live.get(), 4);
    }

    #[test]
    fn test_uninitialized_fill_n_returns_end() {
        let mut dst: [MaybeUninit<u32>; 6] = [const { MaybeUninit::uninit() }; 6];
        let base = dst.as_mut_ptr().cast::<u32>();

        unsafe {
            let end = uninitialized_fill_n(base, 6, &7);
            assert_eq!(end.offset_from(base), 6);
            assert!((0..6).all(|i| *base.add(i) == 7));
        }
    }

    #[test]
    fn test_uninitialized_fill_non_trivial() {
        let mut dst: [MaybeUninit<String>; 3] = [const { MaybeUninit::uninit() }; 3];
        let base = dst.as_mut_ptr().cast::<String>();
        let value = String::from("node");

        unsafe {
            uninitialized_fill(base, 3, &value);
            assert!((0..3).all(|i| *base.add(i) == "node"));
            destroy_range(base, 3);
        }
    }

    #[test]
    fn test_try_fill_with_rolls_back_on_error() {
        let live = Rc::new(Cell::new(0));
        let mut dst: [MaybeUninit<Tracked>; 5] = [const { MaybeUninit::uninit() }; 5];
        let base = dst.as_mut_ptr().cast::<Tracked>();

        let result = unsafe {
            try_uninitialized_fill_with(base, 5, |i| {
                if i == 3 {
                    Err("constructor failed")
                } else {
                    Ok(Tracked::new(&live, i))
                }
            })
        };

        assert_eq!(result.err(), Some("constructor failed"));
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_try_fill_with_success() {
        let mut dst: [MaybeUninit<usize>; 4] = [const { MaybeUninit::uninit() }; 4];
        let base = dst.as_mut_ptr().cast::<usize>();

        let end = unsafe { try_uninitialized_fill_with::<_, (), _>(base, 4, |i| Ok(i * i)) };
        let end = end.unwrap();
        unsafe {
            assert_eq!(end.offset_from(base), 4);
            assert_eq!(*base.add(3), 9);
        }
    }
}
