//! Pool allocator configuration

use crate::error::{MemoryError, MemoryResult};

/// Objects carved per refill when a bucket runs dry.
pub const DEFAULT_REFILL_OBJECTS: usize = 20;

/// Configuration for pool allocator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Target number of blocks carved per bucket refill
    pub refill_objects: usize,

    /// Enable allocation/deallocation counters
    pub track_stats: bool,

    /// Fill pattern byte for newly allocated small blocks (for debugging)
    pub alloc_pattern: Option<u8>,
    /// Fill pattern byte for returned small blocks (for debugging)
    pub dealloc_pattern: Option<u8>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            refill_objects: DEFAULT_REFILL_OBJECTS,
            track_stats: cfg!(debug_assertions),
            alloc_pattern: if cfg!(debug_assertions) {
                Some(0xBB)
            } else {
                None
            },
            dealloc_pattern: if cfg!(debug_assertions) {
                Some(0xDD)
            } else {
                None
            },
        }
    }
}

impl PoolConfig {
    /// Production configuration - optimized for performance
    #[must_use]
    pub fn production() -> Self {
        Self {
            refill_objects: DEFAULT_REFILL_OBJECTS,
            track_stats: false,
            alloc_pattern: None,
            dealloc_pattern: None,
        }
    }

    /// Debug configuration - optimized for debugging
    #[must_use]
    pub fn debug() -> Self {
        Self {
            refill_objects: DEFAULT_REFILL_OBJECTS,
            track_stats: true,
            alloc_pattern: Some(0xBB),
            dealloc_pattern: Some(0xDD),
        }
    }

    /// Performance configuration - larger batches, no bookkeeping
    #[must_use]
    pub fn performance() -> Self {
        Self {
            refill_objects: 64,
            track_stats: false,
            alloc_pattern: None,
            dealloc_pattern: None,
        }
    }

    /// Sets the refill batch size.
    #[must_use]
    pub fn with_refill_objects(mut self, refill_objects: usize) -> Self {
        self.refill_objects = refill_objects;
        self
    }

    /// Checks the configuration before a pool is built from it.
    pub fn validate(&self) -> MemoryResult<()> {
        if self.refill_objects == 0 {
            return Err(MemoryError::invalid_pool_config(
                "refill_objects must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for config in [
            PoolConfig::default(),
            PoolConfig::production(),
            PoolConfig::debug(),
            PoolConfig::performance(),
        ] {
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_zero_refill_rejected() {
        let err = PoolConfig::production()
            .with_refill_objects(0)
            .validate()
            .unwrap_err();
        assert_eq!(err.code(), "MEM:CONFIG:INVALID");
    }
}
