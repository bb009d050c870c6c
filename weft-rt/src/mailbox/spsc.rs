//! Bounded single-producer/single-consumer ring of event buckets.

// Layer 1: Standard library imports
use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

// Layer 2: Third-party crate imports
use crossbeam_utils::CachePadded;

// Layer 3: Internal module imports
use super::QueueFull;
use crate::event::EventBucket;

/// Lock-free bounded ring carrying whole buckets.
///
/// The ring holds a power-of-two number of [`EventBucket`]s and two
/// monotonically increasing cursors: `head` is advanced by the producer
/// after it has copied a full event in, `tail` by the consumer after it has
/// copied published buckets out. An event spanning several buckets is
/// published in a single `head` store, so the consumer either sees all of it
/// or none of it.
///
/// The ring itself has no notion of threads; exclusivity of the producer and
/// consumer sides is an invariant the caller upholds, which is why both
/// operations are `unsafe`.
pub struct BucketRing {
    mask: usize,
    buf: Box<[UnsafeCell<EventBucket>]>,
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
}

// Buckets are plain bytes; the cursor protocol hands each bucket from the
// producer to the consumer with release/acquire ordering.
unsafe impl Send for BucketRing {}
unsafe impl Sync for BucketRing {}

impl BucketRing {
    /// Create a ring with at least `capacity` buckets (rounded up to a power
    /// of two).
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = capacity.max(8).next_power_of_two();
        let buf = (0..cap)
            .map(|_| UnsafeCell::new(EventBucket::zeroed()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            mask: cap - 1,
            buf,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Capacity in buckets.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Buckets currently published and not yet consumed.
    pub fn len(&self) -> usize {
        self.head
            .load(Ordering::Acquire)
            .wrapping_sub(self.tail.load(Ordering::Acquire))
    }

    /// Whether the ring holds no published buckets.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy one event (all of `buckets`) into the ring and publish it.
    ///
    /// All-or-nothing: returns [`QueueFull`] without side effects when the
    /// free space cannot take the whole event.
    ///
    /// # Safety
    /// At most one thread may act as producer at any time.
    pub unsafe fn try_enqueue(&self, buckets: &[EventBucket]) -> Result<(), QueueFull> {
        let n = buckets.len();
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if self.capacity() - head.wrapping_sub(tail) < n {
            return Err(QueueFull);
        }

        let base = self.buf.as_ptr() as *mut EventBucket;
        let at = head & self.mask;
        let first = n.min(self.capacity() - at);
        ptr::copy_nonoverlapping(buckets.as_ptr(), base.add(at), first);
        if first < n {
            ptr::copy_nonoverlapping(buckets.as_ptr().add(first), base, n - first);
        }

        self.head.store(head.wrapping_add(n), Ordering::Release);
        Ok(())
    }

    /// Copy every published bucket out into `out` (cleared first) and
    /// release the space. Returns the number of buckets copied.
    ///
    /// Wrapped events are re-linearized by the copy, so `out` always holds
    /// whole, contiguous event regions in publication order.
    ///
    /// # Safety
    /// At most one thread may act as consumer at any time.
    pub unsafe fn drain_into(&self, out: &mut Vec<EventBucket>) -> usize {
        out.clear();
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        let n = head.wrapping_sub(tail);
        if n == 0 {
            return 0;
        }

        let base = self.buf.as_ptr() as *const EventBucket;
        let at = tail & self.mask;
        let first = n.min(self.capacity() - at);
        out.extend_from_slice(std::slice::from_raw_parts(base.add(at), first));
        if first < n {
            out.extend_from_slice(std::slice::from_raw_parts(base, n - first));
        }

        self.tail.store(tail.wrapping_add(n), Ordering::Release);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn bucket(tag: u8) -> EventBucket {
        let mut b = EventBucket::zeroed();
        // First byte tags the bucket for assertions.
        unsafe {
            *(std::ptr::from_mut(&mut b) as *mut u8) = tag;
        }
        b
    }

    fn tag_of(b: &EventBucket) -> u8 {
        unsafe { *(std::ptr::from_ref(b) as *const u8) }
    }

    #[test]
    fn test_roundtrip_preserves_order() {
        let ring = BucketRing::with_capacity(16);
        unsafe {
            ring.try_enqueue(&[bucket(1), bucket(2)]).unwrap();
            ring.try_enqueue(&[bucket(3)]).unwrap();
        }
        let mut out = Vec::new();
        let n = unsafe { ring.drain_into(&mut out) };
        assert_eq!(n, 3);
        assert_eq!(out.iter().map(tag_of).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_full_enqueue_is_all_or_nothing() {
        let ring = BucketRing::with_capacity(8);
        unsafe {
            ring.try_enqueue(&[bucket(0); 6]).unwrap();
            assert_eq!(ring.try_enqueue(&[bucket(1); 3]), Err(QueueFull));
            // Nothing was written; the remaining space still fits two.
            ring.try_enqueue(&[bucket(2); 2]).unwrap();
        }
        assert_eq!(ring.len(), 8);
    }

    #[test]
    fn test_wraparound_relinearizes() {
        let ring = BucketRing::with_capacity(8);
        let mut out = Vec::new();
        unsafe {
            ring.try_enqueue(&[bucket(1); 6]).unwrap();
            ring.drain_into(&mut out);
            // Next event wraps the physical end of the ring.
            ring.try_enqueue(&[bucket(7); 5]).unwrap();
            let n = ring.drain_into(&mut out);
            assert_eq!(n, 5);
        }
        assert!(out.iter().all(|b| tag_of(b) == 7));
    }

    #[test]
    fn test_concurrent_handoff() {
        let ring = Arc::new(BucketRing::with_capacity(64));
        let producer = Arc::clone(&ring);
        let total: usize = 10_000;

        let t = thread::spawn(move || {
            let mut sent = 0usize;
            while sent < total {
                let b = bucket((sent % 251) as u8);
                if unsafe { producer.try_enqueue(std::slice::from_ref(&b)) }.is_ok() {
                    sent += 1;
                } else {
                    thread::yield_now();
                }
            }
        });

        let mut out = Vec::new();
        let mut seen = 0usize;
        while seen < total {
            let n = unsafe { ring.drain_into(&mut out) };
            for (i, b) in out.iter().enumerate() {
                assert_eq!(tag_of(b), ((seen + i) % 251) as u8);
            }
            seen += n;
            if n == 0 {
                thread::yield_now();
            }
        }
        t.join().unwrap();
    }
}
