//! # nebula-stl
//!
//! Memory and ordering core for generic containers.
//!
//! This crate provides:
//! - A two-level allocator: a [`PoolAllocator`](allocator::PoolAllocator)
//!   serving small blocks from size-class free lists, layered over a
//!   [`MallocAllocator`](allocator::MallocAllocator) with an installable
//!   out-of-memory retry handler
//! - A red-black tree ([`tree::RbTree`]) with unique and multi-value
//!   insertion, stable positions and a structural self-check
//! - An ordered set adapter ([`set::TreeSet`])
//! - Object lifecycle helpers for raw storage ([`construct`])
//!
//! ## Quick Start
//!
//! ```rust
//! use nebula_stl::prelude::*;
//!
//! let pool = PoolAllocator::new();
//! let block = pool.allocate(24);
//! // SAFETY: `block` came from this pool with the same size.
//! unsafe { pool.deallocate(block, 24) };
//! assert_eq!(pool.free_count(24), 20);
//!
//! let mut set = TreeSet::new();
//! set.insert(3);
//! set.insert(1);
//! assert!(set.iter().copied().eq([1, 3]));
//! ```
//!
//! ## Features
//!
//! - `logging` (default): structured `tracing` events for arena growth,
//!   scavenging, OOM handler retries and fatal exhaustion
//!
//! Everything here is single-threaded: allocator state lives in `Cell`s, so
//! the allocators are neither `Send`-shared nor `Sync`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rust_2018_idioms)]

// Error types
pub mod error;

// Core modules
pub mod allocator;
pub mod construct;
pub mod set;
pub mod tree;
pub mod utils;

pub use crate::error::{MemoryError, MemoryResult, Result};

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::error::{MemoryError, MemoryResult, Result};

    pub use crate::allocator::{
        AllocError, AllocResult, Allocator, BudgetAllocator, MallocAllocator, MemoryBudget,
        OomHandler, PoolAllocator, PoolBox, PoolConfig, PoolStats, SystemAllocator,
        TypedAllocator,
    };

    pub use crate::construct::{construct, destroy, destroy_range};

    pub use crate::set::TreeSet;
    pub use crate::tree::{Compare, First, Greater, Identity, KeyOfValue, Less, Position, RbTree};
}
