//! Size-class arithmetic shared by the allocators
//!
//! The pool allocator serves requests in multiples of [`ALIGN`] up to
//! [`MAX_BYTES`]; everything here is `const` so bucket math folds away.

/// Granularity of every small-block size class.
pub const ALIGN: usize = 8;

/// Largest request served from a free-list bucket.
pub const MAX_BYTES: usize = 128;

/// Number of free-list buckets (one per size class).
pub const NFREELISTS: usize = MAX_BYTES / ALIGN;

const _: () = assert!(ALIGN >= size_of::<*mut u8>());

/// Aligns a value up to the nearest multiple of alignment
///
/// # Examples
/// ```
/// use nebula_stl::utils::align_up;
///
/// assert_eq!(align_up(7, 8), 8);
/// assert_eq!(align_up(8, 8), 8);
/// assert_eq!(align_up(9, 8), 16);
/// ```
#[inline(always)]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Rounds a request up to its size class.
///
/// # Examples
/// ```
/// use nebula_stl::utils::round_up;
///
/// assert_eq!(round_up(1), 8);
/// assert_eq!(round_up(16), 16);
/// assert_eq!(round_up(17), 24);
/// ```
#[inline(always)]
pub const fn round_up(bytes: usize) -> usize {
    align_up(bytes, ALIGN)
}

/// Bucket index for a request of `bytes` (1..=[`MAX_BYTES`]).
///
/// # Examples
/// ```
/// use nebula_stl::utils::freelist_index;
///
/// assert_eq!(freelist_index(1), 0);
/// assert_eq!(freelist_index(8), 0);
/// assert_eq!(freelist_index(9), 1);
/// assert_eq!(freelist_index(128), 15);
/// ```
#[inline(always)]
pub const fn freelist_index(bytes: usize) -> usize {
    debug_assert!(bytes >= 1 && bytes <= MAX_BYTES);
    (bytes + ALIGN - 1) / ALIGN - 1
}

/// Size class served by bucket `index`.
#[inline(always)]
pub const fn bucket_size(index: usize) -> usize {
    (index + 1) * ALIGN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_up_covers_every_class() {
        for class in 0..NFREELISTS {
            let size = bucket_size(class);
            for bytes in (size - ALIGN + 1)..=size {
                assert_eq!(round_up(bytes), size);
                assert_eq!(freelist_index(bytes), class);
            }
        }
    }

    #[test]
    fn test_bucket_bounds() {
        assert_eq!(NFREELISTS, 16);
        assert_eq!(bucket_size(0), ALIGN);
        assert_eq!(bucket_size(NFREELISTS - 1), MAX_BYTES);
    }
}
