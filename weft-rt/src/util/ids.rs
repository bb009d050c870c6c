//! Core, actor and event identifiers.

// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// First serial id handed out to dynamically added actors.
///
/// Service-or-serial ids in `[1, SERVICE_RESERVED)` are reserved for service
/// actors (well-known singletons resolved by tag); `0` is the not-found
/// sentinel.
pub const SERVICE_RESERVED: u16 = 10_000;

/// Low-16 sentinel addressing every subscribed actor on the destination core.
pub const BROADCAST_SID: u16 = u16::MAX;

/// Index of a physical scheduler (virtual core).
///
/// The set of active core ids is fixed at engine construction and never
/// changes afterwards. [`CoreId::BROADCAST`] is reserved and may only appear
/// as the destination of a broadcast, never as a configured core.
///
/// # Example
/// ```rust
/// use weft_rt::util::CoreId;
///
/// let core = CoreId::new(3);
/// assert_eq!(core.raw(), 3);
/// assert!(!core.is_broadcast());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct CoreId(u16);

impl CoreId {
    /// Reserved id meaning "every active core".
    pub const BROADCAST: CoreId = CoreId(u16::MAX);

    /// Create a core id from its raw index.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// The raw index.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Whether this is the all-cores broadcast sentinel.
    pub const fn is_broadcast(self) -> bool {
        self.0 == u16::MAX
    }
}

impl From<u16> for CoreId {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of an actor within the process.
///
/// An `ActorId` packs the hosting [`CoreId`] into the high 16 bits and a
/// service-or-serial id into the low 16 bits. While an actor is alive its id
/// refers to exactly one actor; ids are recycled only after the actor has
/// been reaped.
///
/// Two bit patterns are special: [`ActorId::NOT_FOUND`] (all zero) names no
/// actor, and a low-16 of [`BROADCAST_SID`] addresses every subscribed actor
/// on the destination core.
///
/// # Example
/// ```rust
/// use weft_rt::util::{ActorId, CoreId};
///
/// let id = ActorId::new(CoreId::new(2), 10_000);
/// assert_eq!(id.core(), CoreId::new(2));
/// assert_eq!(id.sid(), 10_000);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct ActorId(u32);

impl ActorId {
    /// The "no such actor" sentinel.
    pub const NOT_FOUND: ActorId = ActorId(0);

    /// Compose an id from a core and a service-or-serial id.
    pub const fn new(core: CoreId, sid: u16) -> Self {
        Self(((core.0 as u32) << 16) | sid as u32)
    }

    /// The broadcast address for one core.
    pub const fn broadcast(core: CoreId) -> Self {
        Self::new(core, BROADCAST_SID)
    }

    /// The hosting core.
    pub const fn core(self) -> CoreId {
        CoreId((self.0 >> 16) as u16)
    }

    /// The service-or-serial part.
    pub const fn sid(self) -> u16 {
        self.0 as u16
    }

    /// The packed 32-bit value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Whether this is the not-found sentinel.
    pub const fn is_nil(self) -> bool {
        self.0 == 0
    }

    /// Whether the low 16 bits carry the broadcast sentinel.
    pub const fn is_broadcast(self) -> bool {
        self.sid() == BROADCAST_SID
    }

    /// Whether the low 16 bits fall in the reserved service range.
    pub const fn is_service(self) -> bool {
        let sid = self.sid();
        sid >= 1 && sid < SERVICE_RESERVED
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.core().0, self.sid())
    }
}

/// Monotonic 16-bit type tag of an event payload type.
///
/// Ids are assigned process-wide on first registration of a payload type and
/// stay stable for the lifetime of the process. Two distinct types never
/// share an id. Obtain one through [`crate::event::event_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EventId(u16);

impl EventId {
    pub(crate) const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// The raw 16-bit tag.
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
