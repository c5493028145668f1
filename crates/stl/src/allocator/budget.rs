//! Byte-budgeted raw allocator
//!
//! [`BudgetAllocator`] caps how many bytes its inner allocator may hand out.
//! The cap lives in a shared [`MemoryBudget`] handle so code outside the
//! allocator (typically an OOM handler) can inspect usage and raise the limit
//! while the allocator is in use.

use core::alloc::Layout;
use core::cell::Cell;
use core::ptr::NonNull;
use std::rc::Rc;

use super::{Allocator, SystemAllocator};
use crate::error::{AllocError, AllocResult};

#[derive(Debug)]
struct BudgetState {
    limit: Cell<usize>,
    used: Cell<usize>,
    denied: Cell<usize>,
}

/// Shared byte budget.
///
/// Cloning yields another handle to the same budget.
#[derive(Debug, Clone)]
pub struct MemoryBudget {
    state: Rc<BudgetState>,
}

impl MemoryBudget {
    /// Creates a budget allowing `limit` outstanding bytes.
    pub fn new(limit: usize) -> Self {
        Self {
            state: Rc::new(BudgetState {
                limit: Cell::new(limit),
                used: Cell::new(0),
                denied: Cell::new(0),
            }),
        }
    }

    /// Budget that never denies a request.
    pub fn unlimited() -> Self {
        Self::new(usize::MAX)
    }

    pub fn limit(&self) -> usize {
        self.state.limit.get()
    }

    pub fn used(&self) -> usize {
        self.state.used.get()
    }

    pub fn remaining(&self) -> usize {
        self.limit().saturating_sub(self.used())
    }

    /// Number of requests refused so far.
    pub fn denied(&self) -> usize {
        self.state.denied.get()
    }

    pub fn set_limit(&self, limit: usize) {
        self.state.limit.set(limit);
    }

    /// Raises the limit by `bytes`, saturating.
    pub fn grow(&self, bytes: usize) {
        self.set_limit(self.limit().saturating_add(bytes));
    }

    fn try_reserve(&self, bytes: usize) -> bool {
        if bytes > self.remaining() {
            self.state.denied.set(self.denied() + 1);
            return false;
        }
        self.state.used.set(self.used() + bytes);
        true
    }

    fn release(&self, bytes: usize) {
        self.state.used.set(self.used().saturating_sub(bytes));
    }
}

/// Raw allocator that refuses requests exceeding its [`MemoryBudget`].
#[derive(Debug, Clone)]
pub struct BudgetAllocator<A = SystemAllocator> {
    inner: A,
    budget: MemoryBudget,
}

impl BudgetAllocator<SystemAllocator> {
    /// Budgets the system allocator.
    pub fn new(budget: MemoryBudget) -> Self {
        Self::with_allocator(SystemAllocator::new(), budget)
    }
}

impl<A: Allocator> BudgetAllocator<A> {
    pub fn with_allocator(inner: A, budget: MemoryBudget) -> Self {
        Self { inner, budget }
    }

    /// Handle to the shared budget.
    pub fn budget(&self) -> &MemoryBudget {
        &self.budget
    }
}

// SAFETY: every block comes from `inner`; the budget only gates requests.
unsafe impl<A: Allocator> Allocator for BudgetAllocator<A> {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        if !self.budget.try_reserve(layout.size()) {
            return Err(AllocError::allocation_failed_with_layout(layout));
        }

        // SAFETY: forwarded caller contract.
        let result = unsafe { self.inner.allocate(layout) };
        if result.is_err() {
            self.budget.release(layout.size());
        }
        result
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded caller contract.
        unsafe { self.inner.deallocate(ptr, layout) };
        self.budget.release(layout.size());
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> AllocResult<NonNull<[u8]>> {
        let (old, new) = (old_layout.size(), new_layout.size());
        if new > old && !self.budget.try_reserve(new - old) {
            return Err(AllocError::allocation_failed_with_layout(new_layout));
        }

        // SAFETY: forwarded caller contract.
        let result = unsafe { self.inner.reallocate(ptr, old_layout, new_layout) };
        match (&result, new > old) {
            (Err(_), true) => self.budget.release(new - old),
            (Ok(_), false) => self.budget.release(old - new),
            _ => {}
        }
        result
    }
}
