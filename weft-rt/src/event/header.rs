//! The fixed header at the start of every event allocation.

// Layer 1: Standard library imports
use std::mem;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::util::{ActorId, EventId};

/// Size of the event header in bytes. The typed payload follows at the first
/// properly aligned offset past the header.
pub const HEADER_BYTES: usize = mem::size_of::<EventHeader>();

const ALIVE: u32 = 1;
const TRIVIAL: u32 = 1 << 1;
const SERVICE: u32 = 1 << 2;

/// Per-event state flags stored in the header.
///
/// `ALIVE` tracks payload ownership: while set, whoever holds the event is
/// responsible for running its destructor exactly once. `TRIVIAL` marks
/// payloads with no destructor. `SERVICE` marks events carrying the extra
/// service routing fields (see [`crate::event::ServiceEvent`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct EventState(u32);

impl EventState {
    /// Flags for a freshly allocated event.
    pub const fn fresh(trivial: bool, service: bool) -> Self {
        let mut bits = ALIVE;
        if trivial {
            bits |= TRIVIAL;
        }
        if service {
            bits |= SERVICE;
        }
        Self(bits)
    }

    /// Whether the payload is still owned by this copy of the event.
    pub const fn is_alive(self) -> bool {
        self.0 & ALIVE != 0
    }

    /// Whether the payload has no destructor.
    pub const fn is_trivial(self) -> bool {
        self.0 & TRIVIAL != 0
    }

    /// Whether the event carries service routing fields.
    pub const fn is_service(self) -> bool {
        self.0 & SERVICE != 0
    }

    pub(crate) fn set_alive(&mut self, alive: bool) {
        if alive {
            self.0 |= ALIVE;
        } else {
            self.0 &= !ALIVE;
        }
    }
}

/// Fixed routing header preceding every payload.
///
/// Laid out `repr(C)` so an event region can be reinterpreted from raw
/// buckets on the receiving core: `id` selects the typed handler,
/// `bucket_count` delimits the region, `dest`/`source` route it.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct EventHeader {
    /// Type tag of the payload.
    pub id: EventId,
    /// Number of buckets this event occupies, header included.
    pub bucket_count: u16,
    /// Ownership and kind flags.
    pub state: EventState,
    /// Routing target.
    pub dest: ActorId,
    /// Originating actor.
    pub source: ActorId,
}

impl EventHeader {
    pub(crate) fn new(
        id: EventId,
        bucket_count: u16,
        state: EventState,
        dest: ActorId,
        source: ActorId,
    ) -> Self {
        Self {
            id,
            bucket_count,
            state,
            dest,
            source,
        }
    }
}

const _: () = assert!(mem::size_of::<EventHeader>() == 16);
const _: () = assert!(mem::align_of::<EventHeader>() <= crate::event::BUCKET_BYTES);
