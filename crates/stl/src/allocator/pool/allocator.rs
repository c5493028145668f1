//! Main pool allocator implementation
//!
//! Second level of the two-level allocator:
//! - sixteen buckets, one per size class (8, 16, ..., 128 bytes), each an
//!   intrusive singly linked list threaded through the first word of its free
//!   blocks
//! - an arena `[start_free, end_free)` that buckets are refilled from in
//!   batches
//! - the first-level [`MallocAllocator`] for requests above
//!   [`MAX_BYTES`] and for new arena chunks
//!
//! When the arena cannot supply even one block, the leftover tail is pushed
//! into the bucket matching its size, a larger arena is requested from the raw
//! allocator and, if that fails, the first spare block of a larger bucket is
//! used as the arena instead. Only when every bucket is empty does the request
//! reach the first level's OOM handler (or the fatal path).
//!
//! The allocator is not self-describing: callers pass the size of a block back
//! on `deallocate`. All state lives in `Cell`s, so an instance is `!Sync`.

use core::alloc::Layout;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::ptr::{self, NonNull};

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

use super::{PoolConfig, PoolStats};
use crate::allocator::malloc::{OomHandler, exhausted};
use crate::allocator::traits::dangling_for;
use crate::allocator::{Allocator, MallocAllocator, SystemAllocator};
use crate::error::{AllocError, AllocResult};
use crate::utils::{ALIGN, MAX_BYTES, NFREELISTS, bucket_size, freelist_index, round_up};

/// Free block header
///
/// Overlays the first word of a block while it sits in a bucket.
#[repr(C)]
struct FreeBlock {
    next: *mut FreeBlock,
}

/// What to do once every recovery step has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exhaustion {
    /// Run the OOM handler loop, or terminate without one.
    Abort,
    /// Run the OOM handler loop, or return an error without one.
    Report,
}

#[derive(Debug, Default)]
struct Counters {
    refills: Cell<usize>,
    scavenges: Cell<usize>,
    salvaged_bytes: Cell<usize>,
    small_allocs: Cell<usize>,
    small_deallocs: Cell<usize>,
    large_allocs: Cell<usize>,
    large_deallocs: Cell<usize>,
}

#[inline]
fn bump(counter: &Cell<usize>, by: usize) {
    counter.set(counter.get() + by);
}

/// Bucketed free-list allocator for small blocks
///
/// # Examples
/// ```
/// use nebula_stl::allocator::PoolAllocator;
///
/// let pool = PoolAllocator::new();
/// let block = pool.allocate(24);
/// unsafe { pool.deallocate(block, 24) };
///
/// // LIFO reuse from the same bucket
/// assert_eq!(pool.allocate(24), block);
/// ```
pub struct PoolAllocator<A: Allocator = SystemAllocator> {
    malloc: MallocAllocator<A>,
    free_lists: [Cell<*mut FreeBlock>; NFREELISTS],
    start_free: Cell<*mut u8>,
    end_free: Cell<*mut u8>,
    heap_size: Cell<usize>,
    /// Every arena chunk obtained from the first level, released on drop.
    chunks: RefCell<Vec<(NonNull<u8>, usize)>>,
    config: PoolConfig,
    counters: Counters,
}

impl PoolAllocator<SystemAllocator> {
    /// Creates a pool over the system allocator with the default config.
    pub fn new() -> Self {
        Self::from_parts(MallocAllocator::new(), PoolConfig::default())
    }

    /// Creates a pool over the system allocator.
    pub fn with_config(config: PoolConfig) -> AllocResult<Self> {
        Self::with_allocator(SystemAllocator::new(), config)
    }

    /// Production preset
    pub fn production() -> Self {
        Self::from_parts(MallocAllocator::new(), PoolConfig::production())
    }

    /// Debug preset: fill patterns and counters enabled
    pub fn debug() -> Self {
        Self::from_parts(MallocAllocator::new(), PoolConfig::debug())
    }
}

impl Default for PoolAllocator<SystemAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Allocator> PoolAllocator<A> {
    /// Creates a pool whose arenas and large blocks come from `raw`.
    pub fn with_allocator(raw: A, config: PoolConfig) -> AllocResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(MallocAllocator::with_allocator(raw), config))
    }

    fn from_parts(malloc: MallocAllocator<A>, config: PoolConfig) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            refill_objects = config.refill_objects,
            track_stats = config.track_stats,
            "pool allocator created"
        );

        Self {
            malloc,
            free_lists: [const { Cell::new(ptr::null_mut()) }; NFREELISTS],
            start_free: Cell::new(ptr::null_mut()),
            end_free: Cell::new(ptr::null_mut()),
            heap_size: Cell::new(0),
            chunks: RefCell::new(Vec::new()),
            config,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The first-level allocator serving large blocks and arena chunks.
    pub fn first_level(&self) -> &MallocAllocator<A> {
        &self.malloc
    }

    /// Installs an OOM handler on the first level and returns the previous
    /// one. See [`MallocAllocator::set_oom_handler`].
    pub fn set_oom_handler(&self, handler: Option<OomHandler>) -> Option<OomHandler> {
        self.malloc.set_oom_handler(handler)
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    /// Returns a block of at least `bytes` bytes, aligned to [`ALIGN`].
    ///
    /// A zero-byte request is served from the smallest bucket. Terminates the
    /// process on exhaustion unless an OOM handler is installed.
    pub fn allocate(&self, bytes: usize) -> NonNull<u8> {
        self.allocate_with(bytes, Exhaustion::Abort)
            .unwrap_or_else(|_| exhausted(bytes))
    }

    /// Fallible twin of [`PoolAllocator::allocate`].
    pub fn try_allocate(&self, bytes: usize) -> AllocResult<NonNull<u8>> {
        self.allocate_with(bytes, Exhaustion::Report)
    }

    /// Returns a block to its bucket, or to the first level above
    /// [`MAX_BYTES`].
    ///
    /// # Safety
    /// `ptr` must come from this allocator and `bytes` must be the size it was
    /// requested with. A mismatched size files the block under the wrong
    /// bucket and corrupts later allocations.
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>, bytes: usize) {
        if bytes > MAX_BYTES {
            self.count(&self.counters.large_deallocs);
            // SAFETY: forwarded caller contract.
            unsafe { self.malloc.deallocate(ptr, bytes) };
            return;
        }

        let size = round_up(bytes.max(1));
        if let Some(pattern) = self.config.dealloc_pattern {
            // SAFETY: the block spans its full size class.
            unsafe { ptr::write_bytes(ptr.as_ptr(), pattern, size) };
        }
        // SAFETY: the block belongs to this size class and is no longer used.
        unsafe { self.push(freelist_index(size), ptr) };
        self.count(&self.counters.small_deallocs);
    }

    /// Resizes a block.
    ///
    /// Both sizes above [`MAX_BYTES`]: first-level reallocation. Same size
    /// class: `ptr` is returned unchanged. Otherwise a new block is allocated,
    /// the common prefix copied and the old block released.
    ///
    /// # Safety
    /// Same as [`PoolAllocator::deallocate`] for `ptr` and `old_bytes`.
    pub unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_bytes: usize,
        new_bytes: usize,
    ) -> NonNull<u8> {
        // SAFETY: forwarded caller contract.
        unsafe { self.reallocate_with(ptr, old_bytes, new_bytes, Exhaustion::Abort) }
            .unwrap_or_else(|_| exhausted(new_bytes))
    }

    /// Fallible twin of [`PoolAllocator::reallocate`]. On error `ptr` is
    /// still valid.
    ///
    /// # Safety
    /// Same as [`PoolAllocator::deallocate`] for `ptr` and `old_bytes`.
    pub unsafe fn try_reallocate(
        &self,
        ptr: NonNull<u8>,
        old_bytes: usize,
        new_bytes: usize,
    ) -> AllocResult<NonNull<u8>> {
        // SAFETY: forwarded caller contract.
        unsafe { self.reallocate_with(ptr, old_bytes, new_bytes, Exhaustion::Report) }
    }

    fn allocate_with(&self, bytes: usize, on_exhaustion: Exhaustion) -> AllocResult<NonNull<u8>> {
        if bytes > MAX_BYTES {
            self.count(&self.counters.large_allocs);
            return match on_exhaustion {
                Exhaustion::Abort => Ok(self.malloc.allocate(bytes)),
                Exhaustion::Report => self.malloc.try_allocate(bytes),
            };
        }

        let size = round_up(bytes.max(1));
        let block = match self.pop(freelist_index(size)) {
            Some(block) => block,
            None => self.refill(size, on_exhaustion)?,
        };

        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: the block spans `size` bytes and now belongs to the caller.
            unsafe { ptr::write_bytes(block.as_ptr(), pattern, size) };
        }
        self.count(&self.counters.small_allocs);
        Ok(block)
    }

    unsafe fn reallocate_with(
        &self,
        ptr: NonNull<u8>,
        old_bytes: usize,
        new_bytes: usize,
        on_exhaustion: Exhaustion,
    ) -> AllocResult<NonNull<u8>> {
        if old_bytes > MAX_BYTES && new_bytes > MAX_BYTES {
            // SAFETY: forwarded caller contract; large blocks come from `malloc`.
            return unsafe {
                match on_exhaustion {
                    Exhaustion::Abort => Ok(self.malloc.reallocate(ptr, old_bytes, new_bytes)),
                    Exhaustion::Report => self.malloc.try_reallocate(ptr, old_bytes, new_bytes),
                }
            };
        }

        if round_up(old_bytes.max(1)) == round_up(new_bytes.max(1)) {
            return Ok(ptr);
        }

        let new_ptr = self.allocate_with(new_bytes, on_exhaustion)?;
        // SAFETY: both blocks hold at least `min(old, new)` bytes and are
        // distinct live blocks.
        unsafe {
            ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), old_bytes.min(new_bytes));
            self.deallocate(ptr, old_bytes);
        }
        Ok(new_ptr)
    }

    // ------------------------------------------------------------------
    // Buckets
    // ------------------------------------------------------------------

    #[inline]
    fn pop(&self, index: usize) -> Option<NonNull<u8>> {
        let head = self.free_lists[index].get();
        let block = NonNull::new(head)?;
        // SAFETY: every block on a free list carries a valid link in its
        // first word.
        self.free_lists[index].set(unsafe { (*head).next });
        Some(block.cast())
    }

    /// # Safety
    /// `block` must be an unused, `ALIGN`-aligned block of the size class
    /// served by bucket `index`.
    #[inline]
    unsafe fn push(&self, index: usize, block: NonNull<u8>) {
        let node = block.as_ptr().cast::<FreeBlock>();
        // SAFETY: the block is at least one word long and word aligned.
        unsafe {
            node.write(FreeBlock {
                next: self.free_lists[index].get(),
            });
        }
        self.free_lists[index].set(node);
    }

    /// Carves a batch of `size`-byte blocks, returns the first and links the
    /// rest into the bucket.
    fn refill(&self, size: usize, on_exhaustion: Exhaustion) -> AllocResult<NonNull<u8>> {
        let mut nobjs = self.config.refill_objects;
        let chunk = self.chunk_alloc(size, &mut nobjs, on_exhaustion)?;
        bump(&self.counters.refills, 1);

        #[cfg(feature = "logging")]
        trace!(size, nobjs, "refilled bucket");

        let index = freelist_index(size);
        let mut next = self.free_lists[index].get();
        for i in (1..nobjs).rev() {
            // SAFETY: block `i` lies inside the `size * nobjs` bytes just carved.
            let block = unsafe { chunk.as_ptr().add(i * size) }.cast::<FreeBlock>();
            // SAFETY: freshly carved, word aligned, owned by the bucket.
            unsafe { block.write(FreeBlock { next }) };
            next = block;
        }
        self.free_lists[index].set(next);

        Ok(chunk)
    }

    /// Carves up to `nobjs` blocks of `size` bytes from the arena, lowering
    /// `nobjs` when only a partial batch fits.
    fn chunk_alloc(
        &self,
        size: usize,
        nobjs: &mut usize,
        on_exhaustion: Exhaustion,
    ) -> AllocResult<NonNull<u8>> {
        loop {
            let total = size
                .checked_mul(*nobjs)
                .ok_or_else(|| AllocError::size_overflow("pool refill batch"))?;
            let left = self.bytes_left();

            if left >= size {
                if left < total {
                    *nobjs = left / size;
                }
                let start = self.start_free.get();
                // SAFETY: `size * nobjs <= left`, the new start stays in the arena.
                self.start_free.set(unsafe { start.add(size * *nobjs) });
                return NonNull::new(start)
                    .ok_or_else(|| AllocError::corruption("pool arena", "null arena start"));
            }

            self.salvage_tail();

            let bytes_to_get = total
                .checked_mul(2)
                .and_then(|bytes| bytes.checked_add(round_up(self.heap_size.get() >> 4)))
                .ok_or_else(|| AllocError::size_overflow("pool arena growth"))?;

            let arena = match self.malloc.allocate_once(bytes_to_get) {
                Ok(arena) => arena,
                Err(_) => {
                    if self.scavenge(size) {
                        continue;
                    }
                    match on_exhaustion {
                        Exhaustion::Abort => self.malloc.allocate(bytes_to_get),
                        Exhaustion::Report => self.malloc.try_allocate(bytes_to_get)?,
                    }
                }
            };
            self.adopt_chunk(arena, bytes_to_get);
        }
    }

    /// Files the arena tail under its own size class and empties the arena.
    fn salvage_tail(&self) {
        let left = self.bytes_left();
        if let Some(tail) = NonNull::new(self.start_free.get())
            && left > 0
        {
            // Chunks and carves are whole multiples of ALIGN and the tail is
            // smaller than the block that did not fit.
            debug_assert!(left % ALIGN == 0 && left <= MAX_BYTES);
            // SAFETY: the tail is unused arena memory of exactly `left` bytes.
            unsafe { self.push(freelist_index(left), tail) };
            bump(&self.counters.salvaged_bytes, left);

            #[cfg(feature = "logging")]
            debug!(bytes = left, "salvaged arena tail into bucket");
        }

        self.start_free.set(ptr::null_mut());
        self.end_free.set(ptr::null_mut());
    }

    /// Commandeers the first spare block of class `size` or larger as the
    /// new arena.
    fn scavenge(&self, size: usize) -> bool {
        for class in (size..=MAX_BYTES).step_by(ALIGN) {
            if let Some(block) = self.pop(freelist_index(class)) {
                self.start_free.set(block.as_ptr());
                // SAFETY: the block spans `class` bytes.
                self.end_free.set(unsafe { block.as_ptr().add(class) });
                bump(&self.counters.scavenges, 1);

                #[cfg(feature = "logging")]
                warn!(size, class, "arena growth failed, scavenged a free block");

                return true;
            }
        }
        false
    }

    fn adopt_chunk(&self, arena: NonNull<u8>, bytes: usize) {
        let mut chunks = self.chunks.borrow_mut();
        chunks.push((arena, bytes));
        self.heap_size.set(self.heap_size.get() + bytes);
        self.start_free.set(arena.as_ptr());
        // SAFETY: the chunk spans `bytes` bytes.
        self.end_free.set(unsafe { arena.as_ptr().add(bytes) });

        #[cfg(feature = "logging")]
        debug!(
            bytes,
            heap_size = self.heap_size.get(),
            chunks = chunks.len(),
            "grew pool arena"
        );
    }

    #[inline]
    fn count(&self, counter: &Cell<usize>) {
        if self.config.track_stats {
            bump(counter, 1);
        }
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Bytes not yet carved from the current arena.
    pub fn bytes_left(&self) -> usize {
        self.end_free.get().addr() - self.start_free.get().addr()
    }

    /// Cumulative bytes requested for arenas.
    pub fn heap_size(&self) -> usize {
        self.heap_size.get()
    }

    /// Number of free blocks in the bucket serving `bytes`; zero outside
    /// `1..=MAX_BYTES`.
    pub fn free_count(&self, bytes: usize) -> usize {
        if bytes == 0 || bytes > MAX_BYTES {
            return 0;
        }

        let mut count = 0;
        let mut node = self.free_lists[freelist_index(bytes)].get();
        while !node.is_null() {
            count += 1;
            // SAFETY: free-list links always point at free blocks or null.
            node = unsafe { (*node).next };
        }
        count
    }

    /// Snapshot of the pool state; walks every bucket.
    pub fn stats(&self) -> PoolStats {
        let mut free_blocks = [0; NFREELISTS];
        for (index, slot) in free_blocks.iter_mut().enumerate() {
            *slot = self.free_count(bucket_size(index));
        }

        PoolStats {
            heap_size: self.heap_size.get(),
            arena_chunks: self.chunks.borrow().len(),
            bytes_left: self.bytes_left(),
            free_blocks,
            refills: self.counters.refills.get(),
            scavenges: self.counters.scavenges.get(),
            salvaged_bytes: self.counters.salvaged_bytes.get(),
            small_allocs: self.counters.small_allocs.get(),
            small_deallocs: self.counters.small_deallocs.get(),
            large_allocs: self.counters.large_allocs.get(),
            large_deallocs: self.counters.large_deallocs.get(),
        }
    }
}

impl<A: Allocator> Drop for PoolAllocator<A> {
    fn drop(&mut self) {
        let chunks = core::mem::take(self.chunks.get_mut());

        #[cfg(feature = "logging")]
        debug!(
            chunks = chunks.len(),
            heap_size = self.heap_size.get(),
            "dropping pool allocator"
        );

        for (chunk, bytes) in chunks {
            // SAFETY: each chunk came from `malloc` with exactly `bytes`.
            unsafe { self.malloc.deallocate(chunk, bytes) };
        }
    }
}

impl<A: Allocator + fmt::Debug> fmt::Debug for PoolAllocator<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("config", &self.config)
            .field("heap_size", &self.heap_size.get())
            .field("bytes_left", &self.bytes_left())
            .field("arena_chunks", &self.chunks.borrow().len())
            .field("first_level", &self.malloc)
            .finish()
    }
}

// SAFETY: small layouts are served from buckets whose blocks are ALIGN
// aligned and at least `size` bytes; stricter alignments and everything else
// go to the raw allocator with the caller's layout.
unsafe impl<A: Allocator> Allocator for PoolAllocator<A> {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        if layout.size() == 0 {
            return Ok(NonNull::slice_from_raw_parts(dangling_for(layout), 0));
        }

        if layout.align() > ALIGN {
            self.count(&self.counters.large_allocs);
            // SAFETY: forwarded caller contract.
            return unsafe { self.malloc.raw().allocate(layout) };
        }

        let block = self.allocate_with(layout.size(), Exhaustion::Report)?;
        Ok(NonNull::slice_from_raw_parts(block, layout.size()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }

        if layout.align() > ALIGN {
            self.count(&self.counters.large_deallocs);
            // SAFETY: forwarded caller contract.
            unsafe { self.malloc.raw().deallocate(ptr, layout) };
            return;
        }

        // SAFETY: forwarded caller contract.
        unsafe { PoolAllocator::deallocate(self, ptr, layout.size()) };
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> AllocResult<NonNull<[u8]>> {
        if old_layout.size() > 0
            && new_layout.size() > 0
            && old_layout.align() <= ALIGN
            && new_layout.align() <= ALIGN
        {
            // SAFETY: forwarded caller contract.
            let block = unsafe {
                self.reallocate_with(ptr, old_layout.size(), new_layout.size(), Exhaustion::Report)?
            };
            return Ok(NonNull::slice_from_raw_parts(block, new_layout.size()));
        }

        // SAFETY: fresh block for `new_layout`.
        let new_ptr = unsafe { Allocator::allocate(self, new_layout)? };
        // SAFETY: both blocks hold at least the copied prefix.
        unsafe {
            ptr::copy_nonoverlapping(
                ptr.as_ptr(),
                new_ptr.cast::<u8>().as_ptr(),
                old_layout.size().min(new_layout.size()),
            );
            Allocator::deallocate(self, ptr, old_layout);
        }
        Ok(new_ptr)
    }
}
