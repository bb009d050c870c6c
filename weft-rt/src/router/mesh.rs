//! Multi-event, single-handler routing: the per-actor dispatch table.

// Layer 1: Standard library imports
use std::marker::PhantomData;

// Layer 2: Third-party crate imports
use rustc_hash::FxHashMap;

// Layer 3: Internal module imports
use super::Accept;
use crate::event::{drop_payload, meta_of, EventHeader, Payload};
use crate::util::EventId;

/// Type-erased delivery function recovering the typed payload from a raw
/// event region.
pub type RawHandler<H> = unsafe fn(&mut H, *mut EventHeader);

unsafe fn trampoline<H: Accept<E>, E: Payload>(handler: &mut H, event: *mut EventHeader) {
    let payload = meta_of::<E>().payload_ptr(event) as *mut E;
    handler.accept(&mut *payload);
}

/// Dispatch table mapping event ids to typed delivery trampolines for one
/// handler.
///
/// The table does not own the handler: routing borrows it per call, which
/// is what lets a scheduler keep actors in its own storage and still share
/// this table shape. Lookup is a single hash probe; delivery is one
/// indirect call, no virtual dispatch.
///
/// The delivery-function slot `F` is generic so callers with richer call
/// signatures can reuse the same table: the default [`RawHandler`] form
/// carries handler and event only, while the virtual-core scheduler
/// instantiates `F` with its context-threaded handler type and drives the
/// call at its own dispatch site.
pub struct Mesh<H, F = RawHandler<H>> {
    table: FxHashMap<EventId, F>,
    _marker: PhantomData<fn(&mut H)>,
}

impl<H, F> Default for Mesh<H, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H, F> Mesh<H, F> {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            table: FxHashMap::default(),
            _marker: PhantomData,
        }
    }

    /// Remove the handler for an event id.
    pub fn unsubscribe_id(&mut self, id: EventId) {
        self.table.remove(&id);
    }

    /// Number of subscribed event types.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no event type is subscribed.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl<H, F: Copy> Mesh<H, F> {
    /// Install a delivery function for an event id.
    pub fn subscribe_with(&mut self, id: EventId, handler: F) {
        self.table.insert(id, handler);
    }

    /// The delivery function registered for an id, if any.
    pub fn get(&self, id: EventId) -> Option<F> {
        self.table.get(&id).copied()
    }
}

impl<H> Mesh<H> {
    /// Install the typed trampoline for `E`.
    pub fn subscribe<E: Payload>(&mut self)
    where
        H: Accept<E>,
    {
        self.subscribe_with(meta_of::<E>().id, trampoline::<H, E>);
    }

    /// Remove the handler for `E`.
    pub fn unsubscribe<E: Payload>(&mut self) {
        self.unsubscribe_id(meta_of::<E>().id);
    }

    /// Route a raw event region to the handler.
    ///
    /// Returns `true` when a delivery function was found. With `consume`
    /// set, the payload destructor runs afterwards (exactly once, found or
    /// not); otherwise ownership stays with the caller.
    ///
    /// # Safety
    /// `event` must point at the start of a valid event region whose id
    /// matches its payload type, and the caller must uphold the
    /// exactly-once destruction discipline implied by `consume`.
    pub unsafe fn route(&self, handler: &mut H, event: *mut EventHeader, consume: bool) -> bool {
        let found = match self.get((*event).id) {
            Some(f) => {
                f(handler, event);
                true
            }
            None => false,
        };
        if consume {
            drop_payload(event);
        }
        found
    }
}
