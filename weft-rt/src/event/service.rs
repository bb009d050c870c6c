//! Request/response events routed through service actors.

// Layer 1: Standard library imports
use std::mem;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::header::EventHeader;
use super::registry::EventMeta;
use crate::util::{ActorId, EventId};

/// Payload wrapper for service round-trips.
///
/// A service event carries two extra routing fields in front of its body: a
/// `forward` actor id and the event id the allocation should travel back
/// under. When the hosting core receives a service-flagged event it applies
/// [`ServiceEvent::received`] before routing, so by the time the service
/// handler runs, the header is already primed for the return trip: `dest`
/// points back at the forward target and `id` carries the reply tag. The
/// handler fills in the body and sends the same allocation on with
/// `Context::reply`.
///
/// `received` swaps `dest` with `forward` and `id` with `reply_id`; applying
/// it twice restores the original header, so the operation is its own
/// inverse.
#[derive(Debug)]
#[repr(C)]
pub struct ServiceEvent<T> {
    /// Actor the allocation travels to after the service has seen it.
    pub forward: ActorId,
    /// Event id the allocation travels back under.
    pub reply_id: EventId,
    /// Request body.
    pub body: T,
}

impl<T> ServiceEvent<T> {
    /// Wrap a body for a service round-trip.
    pub fn new(forward: ActorId, reply_id: EventId, body: T) -> Self {
        Self {
            forward,
            reply_id,
            body,
        }
    }

    /// Swap the routing header for the return trip.
    pub fn received(&mut self, header: &mut EventHeader) {
        mem::swap(&mut header.dest, &mut self.forward);
        mem::swap(&mut header.id, &mut self.reply_id);
    }
}

/// Raw-pointer form of [`ServiceEvent::received`], used during mailbox drain
/// where the body type is not statically known.
///
/// Relies on `ServiceEvent<T>` being `repr(C)`: `forward` sits at payload
/// offset 0 and `reply_id` at offset 4 regardless of `T`.
///
/// # Safety
/// `header` must point at the start of a live service event region described
/// by `meta`.
pub(crate) unsafe fn service_received(header: *mut EventHeader, meta: &EventMeta) {
    let payload = meta.payload_ptr(header);
    let forward = payload as *mut ActorId;
    let reply_id = payload.add(4) as *mut EventId;
    mem::swap(&mut (*header).dest, &mut *forward);
    mem::swap(&mut (*header).id, &mut *reply_id);
}
