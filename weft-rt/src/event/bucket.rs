//! Cache-line sized storage unit for event rings and pipes.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// Size of one event bucket. Matches the cache-line size of the platforms we
/// target; all event allocations are measured in whole buckets.
pub const BUCKET_BYTES: usize = 64;

/// One cache-line of event storage.
///
/// Rings and pipes store buckets, not events: an event occupies
/// `header.bucket_count` consecutive buckets starting at its header.
#[derive(Clone, Copy)]
#[repr(C, align(64))]
pub struct EventBucket {
    bytes: [u8; BUCKET_BYTES],
}

impl EventBucket {
    /// A zero-filled bucket.
    pub const fn zeroed() -> Self {
        Self {
            bytes: [0; BUCKET_BYTES],
        }
    }
}

impl Default for EventBucket {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Number of buckets needed to hold `bytes` bytes.
pub const fn buckets_for(bytes: usize) -> usize {
    bytes.div_ceil(BUCKET_BYTES)
}

const _: () = assert!(std::mem::size_of::<EventBucket>() == BUCKET_BYTES);
const _: () = assert!(std::mem::align_of::<EventBucket>() == BUCKET_BYTES);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_for() {
        assert_eq!(buckets_for(0), 0);
        assert_eq!(buckets_for(1), 1);
        assert_eq!(buckets_for(64), 1);
        assert_eq!(buckets_for(65), 2);
        assert_eq!(buckets_for(1024), 16);
    }
}
