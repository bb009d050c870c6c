//! Per-core inbound mailbox: one bucket ring per producer slot.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use tracing::trace;

// Layer 3: Internal module imports
use super::spsc::BucketRing;
use super::QueueFull;
use crate::event::{drop_payload, EventBucket, EventHeader};

/// The inbound MPSC queue of one virtual core.
///
/// Producers never share a ring: producer slot `i` is owned by exactly one
/// writer (a peer core, or the engine controller on the last slot), so each
/// ring runs the uncontended SPSC protocol while the mailbox as a whole
/// accepts events from every other core. Per-producer FIFO follows directly;
/// ordering across producers is whatever the drain interleaves.
pub struct Mailbox {
    rings: Box<[BucketRing]>,
}

impl Mailbox {
    /// Create a mailbox with `producers` slots of `capacity` buckets each.
    pub fn new(producers: usize, capacity: usize) -> Self {
        let rings = (0..producers.max(1))
            .map(|_| BucketRing::with_capacity(capacity))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { rings }
    }

    /// Number of producer slots.
    pub fn producers(&self) -> usize {
        self.rings.len()
    }

    /// Capacity of each producer ring, in buckets.
    pub fn capacity(&self) -> usize {
        self.rings[0].capacity()
    }

    /// Whether any ring holds published events.
    pub fn has_pending(&self) -> bool {
        self.rings.iter().any(|r| !r.is_empty())
    }

    /// Publish one whole event into the producer's ring.
    ///
    /// All-or-nothing; [`QueueFull`] leaves the ring untouched and the
    /// caller retries later.
    ///
    /// # Safety
    /// `slot` must be owned by the calling thread: no two threads may
    /// enqueue on the same slot concurrently.
    pub unsafe fn enqueue(&self, slot: usize, buckets: &[EventBucket]) -> Result<(), QueueFull> {
        self.rings[slot].try_enqueue(buckets)
    }

    /// Drain every producer ring, invoking `visit` once per published event
    /// region.
    ///
    /// Regions are handed out in per-producer FIFO order; producers are
    /// visited round-robin in slot order. `scratch` is the consumer-side
    /// linear buffer events are copied into before being visited, so
    /// regions are always contiguous even when they wrapped the ring.
    ///
    /// Returns the number of events visited.
    ///
    /// # Safety
    /// Only the owning core may drain, from one thread at a time.
    pub unsafe fn drain(
        &self,
        scratch: &mut Vec<EventBucket>,
        mut visit: impl FnMut(&mut [EventBucket]),
    ) -> usize {
        let mut events = 0;
        for ring in self.rings.iter() {
            let n = ring.drain_into(scratch);
            let mut offset = 0;
            while offset < n {
                let header = scratch[offset..].as_ptr() as *const EventHeader;
                let span = ((*header).bucket_count as usize).max(1);
                debug_assert!(offset + span <= n, "event region exceeds drained data");
                visit(&mut scratch[offset..offset + span]);
                offset += span;
                events += 1;
            }
        }
        events
    }

    /// Destroy every event still sitting in the mailbox.
    ///
    /// Used at engine teardown, after all cores have exited: payload
    /// destructors of undelivered events must still run exactly once.
    ///
    /// # Safety
    /// No producer or consumer may touch the mailbox concurrently.
    pub(crate) unsafe fn drop_all(&self, scratch: &mut Vec<EventBucket>) -> usize {
        self.drain(scratch, |region| {
            let header = region.as_mut_ptr() as *mut EventHeader;
            unsafe {
                trace!(id = %(*header).id, dest = %(*header).dest, "dropping undelivered event");
                drop_payload(header);
            }
        })
    }
}
