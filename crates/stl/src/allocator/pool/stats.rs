//! Pool allocator statistics

use crate::utils::{NFREELISTS, bucket_size};

/// Snapshot of pool allocator state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Bytes requested from the first level for arenas, cumulative
    pub heap_size: usize,
    /// Number of arena chunks currently owned
    pub arena_chunks: usize,
    /// Bytes still uncarved in the current arena
    pub bytes_left: usize,
    /// Free blocks per bucket, indexed by size class
    pub free_blocks: [usize; NFREELISTS],
    /// Number of bucket refills
    pub refills: usize,
    /// Blocks commandeered from larger buckets after a failed arena grow
    pub scavenges: usize,
    /// Bytes of arena tail pushed into buckets before growing
    pub salvaged_bytes: usize,
    /// Small-block allocations (only with `track_stats`)
    pub small_allocs: usize,
    /// Small-block deallocations (only with `track_stats`)
    pub small_deallocs: usize,
    /// Requests forwarded to the first level (only with `track_stats`)
    pub large_allocs: usize,
    /// Large blocks returned to the first level (only with `track_stats`)
    pub large_deallocs: usize,
}

impl PoolStats {
    /// Total number of free blocks across all buckets
    pub fn total_free_blocks(&self) -> usize {
        self.free_blocks.iter().sum()
    }

    /// Bytes parked in buckets
    pub fn free_bytes(&self) -> usize {
        self.free_blocks
            .iter()
            .enumerate()
            .map(|(index, count)| count * bucket_size(index))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_totals() {
        let mut stats = PoolStats::default();
        stats.free_blocks[0] = 3;
        stats.free_blocks[15] = 1;
        assert_eq!(stats.total_free_blocks(), 4);
        assert_eq!(stats.free_bytes(), 3 * 8 + 128);
    }
}
