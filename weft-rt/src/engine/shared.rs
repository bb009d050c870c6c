//! State shared between the engine controller and its cores.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::time::Instant;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::core::scheduler::CoreStatus;

/// Engine-scoped synchronization block, shared by `Arc` with every core.
///
/// Holds the startup barrier (how many cores have not finished init yet),
/// the fault and stop latches, and the per-slot core status. Scoped to one
/// engine instance on purpose: two engines in one process never interfere.
pub(crate) struct EngineShared {
    /// Monotonic epoch every core clock is measured against.
    pub epoch: Instant,
    /// Cores that have not completed actor init yet. Cores spin on this
    /// reaching zero before entering their run loop.
    pub not_ready: AtomicUsize,
    /// A core failed init or panicked.
    pub fault: AtomicBool,
    /// An engine-misuse condition was detected (e.g. an event larger than
    /// the mailbox ring).
    pub misuse: AtomicBool,
    /// Cooperative shutdown requested.
    pub stop: AtomicBool,
    /// Per-slot [`CoreStatus`].
    status: Box<[AtomicU8]>,
}

impl EngineShared {
    pub(crate) fn new(cores: usize) -> Self {
        Self {
            epoch: Instant::now(),
            not_ready: AtomicUsize::new(cores),
            fault: AtomicBool::new(false),
            misuse: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            status: (0..cores)
                .map(|_| AtomicU8::new(CoreStatus::Constructed as u8))
                .collect(),
        }
    }

    /// Nanoseconds since the engine epoch.
    pub(crate) fn now_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    pub(crate) fn set_status(&self, slot: usize, status: CoreStatus) {
        self.status[slot].store(status as u8, Ordering::Release);
    }

    pub(crate) fn status(&self, slot: usize) -> CoreStatus {
        CoreStatus::from_u8(self.status[slot].load(Ordering::Acquire))
    }

    /// A core failed init or panicked. Cores poll this to abort their run
    /// loops, so misuse deliberately does not feed into it.
    pub(crate) fn is_faulted(&self) -> bool {
        self.fault.load(Ordering::Acquire)
    }

    pub(crate) fn is_misused(&self) -> bool {
        self.misuse.load(Ordering::Acquire)
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}
