//! First-level allocator
//!
//! Thin layer over a raw [`Allocator`] that works in plain byte counts at word
//! alignment and adds out-of-memory recovery: when the raw allocator fails and
//! an [`OomHandler`] is installed, the handler runs and the same request is
//! retried, with no bound on the number of rounds. Without a handler the
//! infallible entry points terminate through [`std::alloc::handle_alloc_error`]
//! and the `try_*` twins report [`MemoryError::AllocationFailed`].
//!
//! [`MemoryError::AllocationFailed`]: crate::error::MemoryError::AllocationFailed

use core::alloc::Layout;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::{error, warn};

use super::{Allocator, SystemAllocator};
use crate::error::{AllocError, AllocResult};
use crate::utils::ALIGN;

/// Out-of-memory callback.
///
/// Expected to free memory (or raise a budget) before returning; a handler
/// that can never make progress should terminate instead of returning.
pub type OomHandler = Box<dyn FnMut()>;

/// Word-aligned layout for a byte count; zero is served as one byte.
#[inline]
pub(crate) fn word_layout(bytes: usize) -> AllocResult<Layout> {
    Layout::from_size_align(bytes.max(1), ALIGN)
        .map_err(|_| AllocError::size_overflow("word-aligned allocation size"))
}

#[cold]
#[inline(never)]
pub(crate) fn out_of_memory(layout: Layout) -> ! {
    #[cfg(feature = "logging")]
    error!(
        size = layout.size(),
        align = layout.align(),
        "out of memory with no OOM handler installed"
    );

    std::alloc::handle_alloc_error(layout)
}

#[cold]
fn capacity_overflow() -> ! {
    panic!("capacity overflow")
}

/// Terminal path for an unsatisfiable request of `bytes`.
#[cold]
pub(crate) fn exhausted(bytes: usize) -> ! {
    match word_layout(bytes) {
        Ok(layout) => out_of_memory(layout),
        Err(_) => capacity_overflow(),
    }
}

/// Puts the handler back after one retry round, also when the handler
/// unwinds. A replacement installed by the handler itself wins.
struct HandlerSlot<'a> {
    slot: &'a RefCell<Option<OomHandler>>,
    handler: Option<OomHandler>,
}

impl HandlerSlot<'_> {
    fn run(&mut self) {
        if let Some(handler) = self.handler.as_mut() {
            handler();
        }
    }
}

impl Drop for HandlerSlot<'_> {
    fn drop(&mut self) {
        let mut slot = self.slot.borrow_mut();
        if slot.is_none() {
            *slot = self.handler.take();
        }
    }
}

/// Raw byte allocator with an installable OOM retry hook.
pub struct MallocAllocator<A = SystemAllocator> {
    raw: A,
    oom_handler: RefCell<Option<OomHandler>>,
    oom_invocations: Cell<usize>,
}

impl MallocAllocator<SystemAllocator> {
    pub fn new() -> Self {
        Self::with_allocator(SystemAllocator::new())
    }
}

impl Default for MallocAllocator<SystemAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Allocator> MallocAllocator<A> {
    /// Wraps `raw` with no OOM handler installed.
    pub fn with_allocator(raw: A) -> Self {
        Self {
            raw,
            oom_handler: RefCell::new(None),
            oom_invocations: Cell::new(0),
        }
    }

    /// The underlying raw allocator.
    pub fn raw(&self) -> &A {
        &self.raw
    }

    /// Installs `handler` (or removes the current one with `None`) and returns
    /// the previous handler.
    pub fn set_oom_handler(&self, handler: Option<OomHandler>) -> Option<OomHandler> {
        self.oom_handler.replace(handler)
    }

    pub fn has_oom_handler(&self) -> bool {
        self.oom_handler.borrow().is_some()
    }

    /// Total number of handler calls made so far.
    pub fn oom_invocations(&self) -> usize {
        self.oom_invocations.get()
    }

    /// Allocates `bytes`, running the OOM handler until the raw allocator
    /// succeeds. Terminates the process if no handler is installed.
    pub fn allocate(&self, bytes: usize) -> NonNull<u8> {
        self.try_allocate(bytes).unwrap_or_else(|_| exhausted(bytes))
    }

    /// Like [`MallocAllocator::allocate`] but reports exhaustion instead of
    /// terminating when no handler is installed.
    pub fn try_allocate(&self, bytes: usize) -> AllocResult<NonNull<u8>> {
        let layout = word_layout(bytes)?;
        // SAFETY: layout built by `word_layout`.
        let attempt = || unsafe { self.raw.allocate(layout) };
        self.with_retry(layout, attempt)
    }

    /// Single raw attempt: no handler, no retry.
    pub(crate) fn allocate_once(&self, bytes: usize) -> AllocResult<NonNull<u8>> {
        let layout = word_layout(bytes)?;
        // SAFETY: layout built by `word_layout`.
        unsafe { self.raw.allocate(layout) }.map(NonNull::cast)
    }

    /// Releases a block from this allocator.
    ///
    /// # Safety
    /// `ptr` came from this allocator with the same `bytes`.
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>, bytes: usize) {
        // The layout was valid when the block was allocated.
        if let Ok(layout) = word_layout(bytes) {
            // SAFETY: forwarded caller contract.
            unsafe { self.raw.deallocate(ptr, layout) };
        }
    }

    /// Resizes a block, retrying through the OOM handler. Terminates the
    /// process if no handler is installed.
    ///
    /// # Safety
    /// `ptr` came from this allocator with `old_bytes`.
    pub unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_bytes: usize,
        new_bytes: usize,
    ) -> NonNull<u8> {
        // SAFETY: forwarded caller contract.
        unsafe { self.try_reallocate(ptr, old_bytes, new_bytes) }
            .unwrap_or_else(|_| exhausted(new_bytes))
    }

    /// Fallible twin of [`MallocAllocator::reallocate`]. On error the original
    /// block is untouched.
    ///
    /// # Safety
    /// `ptr` came from this allocator with `old_bytes`.
    pub unsafe fn try_reallocate(
        &self,
        ptr: NonNull<u8>,
        old_bytes: usize,
        new_bytes: usize,
    ) -> AllocResult<NonNull<u8>> {
        let old_layout = word_layout(old_bytes)?;
        let new_layout = word_layout(new_bytes)?;
        // SAFETY: forwarded caller contract; a failed attempt leaves `ptr` valid.
        let attempt = || unsafe { self.raw.reallocate(ptr, old_layout, new_layout) };
        self.with_retry(new_layout, attempt)
    }

    fn with_retry<F>(&self, layout: Layout, mut attempt: F) -> AllocResult<NonNull<u8>>
    where
        F: FnMut() -> AllocResult<NonNull<[u8]>>,
    {
        if let Ok(ptr) = attempt() {
            return Ok(ptr.cast());
        }

        loop {
            // Re-read every round: the handler may install a successor.
            let Some(handler) = self.oom_handler.borrow_mut().take() else {
                return Err(AllocError::allocation_failed_with_layout(layout));
            };

            self.oom_invocations.set(self.oom_invocations.get() + 1);

            #[cfg(feature = "logging")]
            warn!(
                size = layout.size(),
                round = self.oom_invocations.get(),
                "raw allocation failed, running OOM handler"
            );

            // Taken out of the cell so the handler may itself call
            // `set_oom_handler` on this allocator.
            HandlerSlot {
                slot: &self.oom_handler,
                handler: Some(handler),
            }
            .run();

            if let Ok(ptr) = attempt() {
                return Ok(ptr.cast());
            }
        }
    }
}

impl<A: fmt::Debug> fmt::Debug for MallocAllocator<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MallocAllocator")
            .field("raw", &self.raw)
            .field("has_oom_handler", &self.oom_handler.borrow().is_some())
            .field("oom_invocations", &self.oom_invocations.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{BudgetAllocator, MemoryBudget};
    use std::rc::Rc;

    #[test]
    fn test_allocate_without_pressure() {
        let malloc = MallocAllocator::new();
        let ptr = malloc.allocate(256);
        unsafe {
            ptr.as_ptr().write_bytes(0xAB, 256);
            malloc.deallocate(ptr, 256);
        }
        assert_eq!(malloc.oom_invocations(), 0);
    }

    #[test]
    fn test_try_allocate_reports_exhaustion() {
        let budget = MemoryBudget::new(0);
        let malloc = MallocAllocator::with_allocator(BudgetAllocator::new(budget));

        let err = malloc.try_allocate(64).unwrap_err();
        assert!(err.is_allocation_failure());
        assert_eq!(malloc.oom_invocations(), 0);
    }

    #[test]
    fn test_handler_retries_until_budget_allows() {
        let budget = MemoryBudget::new(0);
        let malloc = MallocAllocator::with_allocator(BudgetAllocator::new(budget.clone()));

        let grants = Rc::new(Cell::new(0));
        let (b, g) = (budget.clone(), Rc::clone(&grants));
        malloc.set_oom_handler(Some(Box::new(move || {
            g.set(g.get() + 1);
            b.grow(100);
        })));

        // 300 bytes need three grants of 100.
        let ptr = malloc.try_allocate(300).unwrap();
        assert_eq!(grants.get(), 3);
        assert_eq!(malloc.oom_invocations(), 3);
        assert!(malloc.has_oom_handler());

        unsafe { malloc.deallocate(ptr, 300) };
        assert_eq!(budget.used(), 0);
    }

    #[test]
    fn test_handler_replaced_mid_loop_takes_over() {
        let budget = MemoryBudget::new(0);
        let malloc = Rc::new(MallocAllocator::with_allocator(BudgetAllocator::new(
            budget.clone(),
        )));

        let first_calls = Rc::new(Cell::new(0));
        let second_calls = Rc::new(Cell::new(0));

        let (owner, first, second) = (
            Rc::downgrade(&malloc),
            Rc::clone(&first_calls),
            Rc::clone(&second_calls),
        );
        malloc.set_oom_handler(Some(Box::new(move || {
            first.set(first.get() + 1);
            let (b, s) = (budget.clone(), Rc::clone(&second));
            if let Some(malloc) = owner.upgrade() {
                malloc.set_oom_handler(Some(Box::new(move || {
                    s.set(s.get() + 1);
                    b.grow(64);
                })));
            }
        })));

        let ptr = malloc.try_allocate(64).unwrap();
        assert_eq!(first_calls.get(), 1);
        assert_eq!(second_calls.get(), 1);
        assert_eq!(malloc.oom_invocations(), 2);
        assert!(malloc.has_oom_handler());

        unsafe { malloc.deallocate(ptr, 64) };
    }

    #[test]
    fn test_handler_removing_itself_is_restored() {
        let malloc = Rc::new(MallocAllocator::with_allocator(BudgetAllocator::new(
            MemoryBudget::new(0),
        )));
        let owner = Rc::downgrade(&malloc);
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        malloc.set_oom_handler(Some(Box::new(move || {
            c.set(c.get() + 1);
            if let Some(malloc) = owner.upgrade() {
                // Nothing to remove: the running handler is out of the slot.
                assert!(malloc.set_oom_handler(None).is_none());
            }
            if c.get() == 3 {
                panic!("giving up");
            }
        })));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            malloc.try_allocate(16)
        }));
        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
        assert!(malloc.has_oom_handler());
    }

    #[test]
    fn test_set_oom_handler_returns_previous() {
        let malloc = MallocAllocator::new();
        assert!(malloc.set_oom_handler(Some(Box::new(|| {}))).is_none());
        assert!(malloc.set_oom_handler(None).is_some());
        assert!(!malloc.has_oom_handler());
    }

    #[test]
    fn test_reallocate_keeps_prefix() {
        let malloc = MallocAllocator::new();
        unsafe {
            let ptr = malloc.allocate(16);
            ptr.as_ptr().write_bytes(7, 16);
            let grown = malloc.reallocate(ptr, 16, 1024);
            assert!((0..16).all(|i| *grown.as_ptr().add(i) == 7));
            malloc.deallocate(grown, 1024);
        }
    }
}
