//! Outbound per-destination event accumulator.
//!
//! Actors never write to a peer mailbox directly: they allocate events into
//! the owning core's [`Pipe`] for the destination core, and the scheduler
//! flushes every non-empty pipe once per tick. Batching keeps the mailbox
//! cursors cold, and a full mailbox costs nothing but a retry on the next
//! tick.

// Layer 1: Standard library imports
use std::ptr;

// Layer 2: Third-party crate imports
use tracing::error;

// Layer 3: Internal module imports
use crate::event::{
    drop_payload, meta_of, EventBucket, EventHeader, EventMeta, EventState, Payload,
};
use crate::mailbox::Mailbox;
use crate::util::{ActorId, CoreId};

/// Outcome of one flush attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Events handed to the destination mailbox.
    pub delivered: usize,
    /// The destination mailbox filled up; the remainder was retained and
    /// the scheduler should retry next tick.
    pub retry: bool,
    /// Events dropped because a single event exceeded the ring capacity.
    /// Always an engine-misuse condition.
    pub oversize_dropped: usize,
}

/// Append-only buffer of outbound events toward one destination core.
///
/// Owned and mutated by a single core; never shared. Events are laid out
/// back-to-back in whole buckets, exactly as they will appear in the
/// destination ring. Within one pipe, flush order is allocation order.
pub struct Pipe {
    dest: CoreId,
    buf: Vec<EventBucket>,
    /// Bucket offset of the first event not yet handed to the mailbox.
    cursor: usize,
}

impl Pipe {
    /// Create an empty pipe toward `dest`.
    pub fn new(dest: CoreId) -> Self {
        Self {
            dest,
            buf: Vec::new(),
            cursor: 0,
        }
    }

    /// Destination core of this pipe.
    pub fn dest(&self) -> CoreId {
        self.dest
    }

    /// Whether every allocated event has been flushed.
    pub fn is_empty(&self) -> bool {
        self.cursor >= self.buf.len()
    }

    /// Buckets waiting to be flushed.
    pub fn pending_buckets(&self) -> usize {
        self.buf.len() - self.cursor
    }

    fn raw_allocate(
        &mut self,
        meta: &'static EventMeta,
        extra: usize,
        service: bool,
        dest: ActorId,
        source: ActorId,
    ) -> *mut EventHeader {
        let span = meta.bucket_count(extra);
        debug_assert!(span <= u16::MAX as usize, "event exceeds addressable size");
        let at = self.buf.len();
        self.buf.resize(at + span, EventBucket::zeroed());
        let header = self.buf[at..].as_mut_ptr() as *mut EventHeader;
        // The region is freshly zeroed; writing the header makes it an event.
        unsafe {
            ptr::write(
                header,
                EventHeader::new(
                    meta.id,
                    span as u16,
                    EventState::fresh(meta.trivial, service),
                    dest,
                    source,
                ),
            );
        }
        header
    }

    /// Reserve space for an event of type `E`, construct the payload in
    /// place and return a typed reference so the caller can finish filling
    /// it in.
    pub fn allocate<E: Payload>(&mut self, payload: E, dest: ActorId, source: ActorId) -> &mut E {
        self.allocate_flagged(payload, false, dest, source)
    }

    pub(crate) fn allocate_flagged<E: Payload>(
        &mut self,
        payload: E,
        service: bool,
        dest: ActorId,
        source: ActorId,
    ) -> &mut E {
        let meta = meta_of::<E>();
        let header = self.raw_allocate(meta, 0, service, dest, source);
        unsafe {
            let p = meta.payload_ptr(header) as *mut E;
            ptr::write(p, payload);
            &mut *p
        }
    }

    /// Like [`Pipe::allocate`], plus `extra` trailing bytes copied right
    /// after the payload. Used for variable-length messages; the receiver
    /// finds the bytes at `payload_ptr + size_of::<E>()`.
    pub fn allocate_with_extra<E: Payload>(
        &mut self,
        payload: E,
        extra: &[u8],
        dest: ActorId,
        source: ActorId,
    ) -> &mut E {
        let meta = meta_of::<E>();
        let header = self.raw_allocate(meta, extra.len(), false, dest, source);
        unsafe {
            let p = meta.payload_ptr(header) as *mut E;
            ptr::write(p, payload);
            ptr::copy_nonoverlapping(
                extra.as_ptr(),
                (p as *mut u8).add(meta.payload_size),
                extra.len(),
            );
            &mut *p
        }
    }

    /// Append a raw copy of an existing event region (reply/forward paths).
    ///
    /// The copy inherits the region's state byte-for-byte; the caller is
    /// responsible for clearing the alive flag on the original so payload
    /// ownership moves with the copy.
    pub fn push_copy(&mut self, region: &[EventBucket]) {
        self.buf.extend_from_slice(region);
    }

    /// Hand the accumulated events to the destination mailbox, in order.
    ///
    /// Best effort: stops at the first [`QueueFull`](crate::mailbox::QueueFull)
    /// and retains the remainder for the next tick. On complete delivery the
    /// buffer resets; ownership of every delivered payload has transferred,
    /// so no destructors run here.
    ///
    /// # Safety
    /// `slot` must be the producer slot owned by the calling core.
    pub unsafe fn flush(&mut self, mailbox: &Mailbox, slot: usize) -> FlushReport {
        let mut report = FlushReport {
            delivered: 0,
            retry: false,
            oversize_dropped: 0,
        };
        while self.cursor < self.buf.len() {
            let header = self.buf[self.cursor..].as_mut_ptr() as *mut EventHeader;
            let span = ((*header).bucket_count as usize).max(1);
            if span > mailbox.capacity() {
                error!(
                    id = %(*header).id,
                    buckets = span,
                    capacity = mailbox.capacity(),
                    "event exceeds mailbox ring capacity, dropping"
                );
                drop_payload(header);
                self.cursor += span;
                report.oversize_dropped += 1;
                continue;
            }
            let region = &self.buf[self.cursor..self.cursor + span];
            if mailbox.enqueue(slot, region).is_err() {
                report.retry = true;
                return report;
            }
            self.cursor += span;
            report.delivered += 1;
        }
        self.buf.clear();
        self.cursor = 0;
        report
    }

    /// Move every pending event region out into `out`, leaving the pipe
    /// empty. Used for the same-core pipe, whose events are dispatched
    /// directly instead of travelling through a ring.
    pub(crate) fn take_pending(&mut self, out: &mut Vec<EventBucket>) {
        out.extend_from_slice(&self.buf[self.cursor..]);
        self.buf.clear();
        self.cursor = 0;
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        // Undelivered events die with the pipe; their payloads must still be
        // destroyed exactly once.
        let mut offset = self.cursor;
        while offset < self.buf.len() {
            let header = self.buf[offset..].as_mut_ptr() as *mut EventHeader;
            let span = unsafe { ((*header).bucket_count as usize).max(1) };
            unsafe { drop_payload(header) };
            offset += span;
        }
    }
}
