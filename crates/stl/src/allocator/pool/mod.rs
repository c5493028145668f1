//! Two-level pool allocator
//!
//! Small requests (up to [`MAX_BYTES`](crate::utils::MAX_BYTES)) are served
//! from per-size-class free lists that are refilled in batches carved out of
//! a shared arena. Larger requests go straight to the first-level
//! [`MallocAllocator`](crate::allocator::MallocAllocator).
//!
//! ## Modules
//! - `allocator` - Main PoolAllocator implementation (buckets, refill, arena)
//! - `config` - Configuration variants (production, debug, performance)
//! - `pool_box` - RAII smart pointer for pool-allocated objects
//! - `stats` - Statistics snapshot types

pub mod allocator;
pub mod config;
pub mod pool_box;
pub mod stats;

pub use allocator::PoolAllocator;
pub use config::PoolConfig;
pub use pool_box::PoolBox;
pub use stats::PoolStats;
