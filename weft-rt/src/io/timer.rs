//! Deadline-queue I/O driver providing `schedule_after`.

// Layer 1: Standard library imports
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::{IoContext, IoDriver};

type TimerCallback = Box<dyn FnOnce(&mut IoContext<'_>) + Send>;

struct TimerEntry {
    due: Instant,
    seq: u64,
    callback: TimerCallback,
}

// Min-heap by (due, seq): BinaryHeap is a max-heap, so compare reversed.
// seq keeps same-deadline timers in schedule order.
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

struct TimerQueue {
    heap: Mutex<BinaryHeap<TimerEntry>>,
    seq: AtomicU64,
}

/// Timer driver for one core.
///
/// Attach it to a core and hand its [`TimerHandle`]s to the actors that
/// need delayed work; the callbacks run on the same core during a future
/// `io_tick`, so they can push events exactly like the scheduling actor
/// could.
///
/// # Example
///
/// ```rust,ignore
/// let timers = TimerDriver::new();
/// let handle = timers.handle();
/// engine.attach_io(0, timers)?;
///
/// // later, from an actor on core 0:
/// let me = ctx.id();
/// handle.schedule_after(Duration::from_millis(50), move |io| {
///     io.push(me, TimerEvent { token: 1 });
/// });
/// ```
pub struct TimerDriver {
    queue: Arc<TimerQueue>,
}

impl Default for TimerDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDriver {
    /// An empty deadline queue.
    pub fn new() -> Self {
        Self {
            queue: Arc::new(TimerQueue {
                heap: Mutex::new(BinaryHeap::new()),
                seq: AtomicU64::new(0),
            }),
        }
    }

    /// A handle actors can schedule through.
    pub fn handle(&self) -> TimerHandle {
        TimerHandle {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl IoDriver for TimerDriver {
    fn io_tick(&mut self, io: &mut IoContext<'_>) {
        let now = Instant::now();
        loop {
            let entry = {
                let mut heap = self.queue.heap.lock();
                match heap.peek() {
                    Some(head) if head.due <= now => heap.pop(),
                    _ => None,
                }
            };
            // The lock is released before the callback runs; callbacks may
            // schedule new timers.
            match entry {
                Some(entry) => (entry.callback)(io),
                None => break,
            }
        }
    }
}

/// Cloneable scheduling handle of a [`TimerDriver`].
#[derive(Clone)]
pub struct TimerHandle {
    queue: Arc<TimerQueue>,
}

impl TimerHandle {
    /// Run `callback` on the driver's core once `delay` has elapsed.
    ///
    /// Timers with the same deadline fire in schedule order. The callback
    /// runs during the first `io_tick` at or after the deadline; precision
    /// is bounded by the core's tick rate.
    pub fn schedule_after(
        &self,
        delay: Duration,
        callback: impl FnOnce(&mut IoContext<'_>) + Send + 'static,
    ) {
        let entry = TimerEntry {
            due: Instant::now() + delay,
            seq: self.queue.seq.fetch_add(1, Ordering::Relaxed),
            callback: Box::new(callback),
        };
        self.queue.heap.lock().push(entry);
    }
}
