//! Allocators
//!
//! Two levels, both explicit instances:
//! - [`MallocAllocator`]: first level over a raw [`Allocator`], with an
//!   installable out-of-memory retry handler
//! - [`PoolAllocator`]: second level, bucketed free lists for blocks up to
//!   [`MAX_BYTES`](crate::utils::MAX_BYTES) refilled from arenas
//!
//! Raw sources: [`SystemAllocator`] and the byte-capped [`BudgetAllocator`].

mod budget;
mod malloc;
pub mod pool;
mod system;
mod traits;

pub use budget::{BudgetAllocator, MemoryBudget};
pub use malloc::{MallocAllocator, OomHandler};
pub use pool::{PoolAllocator, PoolBox, PoolConfig, PoolStats};
pub use system::SystemAllocator;
pub use traits::{Allocator, TypedAllocator};

pub use crate::error::{AllocError, AllocResult};
