//! Single-event, multi-handler routing with destination select and
//! broadcast.

// Layer 1: Standard library imports
use std::marker::PhantomData;
use std::mem::ManuallyDrop;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::{Accept, RouteTarget};
use crate::util::ActorId;

/// One event type fanned across a set of handlers.
///
/// Handlers subscribe with their [`RouteTarget`] identity; routing picks the
/// handler whose id matches the destination, or, for a broadcast
/// destination, walks every live handler in subscription order.
pub struct Semh<E, H: Accept<E> + RouteTarget> {
    subscribers: Vec<H>,
    _marker: PhantomData<fn(&mut E)>,
}

impl<E, H: Accept<E> + RouteTarget> Default for Semh<E, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, H: Accept<E> + RouteTarget> Semh<E, H> {
    /// An empty fan-out.
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Add a handler at the end of the broadcast order. A handler with the
    /// same id replaces the previous one in place.
    pub fn subscribe(&mut self, handler: H) {
        let id = handler.route_id();
        match self.subscribers.iter_mut().find(|h| h.route_id() == id) {
            Some(slot) => *slot = handler,
            None => self.subscribers.push(handler),
        }
    }

    /// Remove a handler by id.
    pub fn unsubscribe(&mut self, id: ActorId) -> Option<H> {
        let at = self.subscribers.iter().position(|h| h.route_id() == id)?;
        Some(self.subscribers.remove(at))
    }

    /// Number of subscribed handlers.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether no handler is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    fn deliver(&mut self, dest: ActorId, event: &mut ManuallyDrop<E>) -> usize {
        if dest.is_broadcast() {
            let mut delivered = 0;
            for handler in self.subscribers.iter_mut() {
                if handler.is_route_alive() {
                    handler.accept(event);
                    delivered += 1;
                }
            }
            delivered
        } else {
            match self
                .subscribers
                .iter_mut()
                .find(|h| h.route_id() == dest && h.is_route_alive())
            {
                Some(handler) => {
                    handler.accept(event);
                    1
                }
                None => 0,
            }
        }
    }

    /// Deliver to the destination (or everyone, for a broadcast id),
    /// leaving payload ownership with the caller. Returns the number of
    /// deliveries.
    pub fn route(&mut self, dest: ActorId, event: &mut ManuallyDrop<E>) -> usize {
        self.deliver(dest, event)
    }

    /// Deliver and then run the payload destructor, exactly once, even when
    /// nobody was subscribed.
    ///
    /// # Safety
    /// The payload must not have been dropped already, and the caller must
    /// not use it afterwards.
    pub unsafe fn route_consume(&mut self, dest: ActorId, event: &mut ManuallyDrop<E>) -> usize {
        let delivered = self.deliver(dest, event);
        ManuallyDrop::drop(event);
        delivered
    }
}
