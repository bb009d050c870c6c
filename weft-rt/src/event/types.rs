//! Built-in event types transported by the runtime.

// Layer 1: Standard library imports
use std::any::TypeId;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::util::ActorId;

/// Asks the receiving actor to kill itself.
///
/// Every actor handles this implicitly: the default handler calls
/// `Context::kill`. Implement `Handle<KillEvent>` to intercept it.
#[derive(Debug, Clone, Copy, Default)]
pub struct KillEvent;

/// A process signal translated into the actor world.
///
/// Delivered only to actors that registered for it; everyone else never sees
/// process signals.
#[derive(Debug, Clone, Copy)]
pub struct SignalEvent {
    /// The raw signal number (e.g. `SIGINT`).
    pub signum: i32,
}

/// Discovery request broadcast by `Context::require`.
///
/// Handled by the hosting core itself: every live actor whose concrete type
/// matches `actor_type` is announced back to the requester with an
/// [`AvailableEvent`].
#[derive(Debug, Clone, Copy)]
pub struct RequireEvent {
    /// `TypeId` of the requested actor type.
    pub actor_type: TypeId,
}

/// Announcement of one actor satisfying a [`RequireEvent`].
///
/// The event's `source` is the matching actor, repeated here in `actor` for
/// convenience.
#[derive(Debug, Clone, Copy)]
pub struct AvailableEvent {
    /// `TypeId` of the matched actor type.
    pub actor_type: TypeId,
    /// Id of the matching actor.
    pub actor: ActorId,
}

/// A transport session went away. Emitted by I/O drivers.
#[derive(Debug, Clone, Copy)]
pub struct DisconnectedEvent {
    /// Driver-assigned session token.
    pub session: u64,
}

/// A scheduled timer fired. Emitted by I/O drivers.
#[derive(Debug, Clone, Copy)]
pub struct TimerEvent {
    /// Caller-assigned token identifying the timer.
    pub token: u64,
}

/// Readiness change on a watched file descriptor. Emitted by I/O drivers.
#[derive(Debug, Clone, Copy)]
pub struct FileEvent {
    /// Driver-assigned token identifying the file.
    pub token: u64,
    /// The file became readable.
    pub readable: bool,
    /// The file became writable.
    pub writable: bool,
}
