//! Multi-event, multi-handler routing: the general case.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::mesh::Mesh;
use super::{Accept, RouteTarget};
use crate::event::{drop_payload, EventHeader, Payload};
use crate::util::ActorId;

struct Entry<H> {
    handler: H,
    table: Mesh<H>,
}

/// Many handlers, each with its own per-type dispatch table.
///
/// Combines [`Mesh`] tables under destination-id selection and broadcast,
/// which is exactly the shape a virtual core runs on: any event type, any
/// resident actor. Entries keep insertion order, so broadcast delivery is
/// stable across ticks.
pub struct Memh<H: RouteTarget> {
    entries: Vec<Entry<H>>,
}

impl<H: RouteTarget> Default for Memh<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: RouteTarget> Memh<H> {
    /// An empty router.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a handler. Its id must not collide with a present entry.
    pub fn insert(&mut self, handler: H) -> bool {
        let id = handler.route_id();
        if self.entries.iter().any(|e| e.handler.route_id() == id) {
            return false;
        }
        self.entries.push(Entry {
            handler,
            table: Mesh::new(),
        });
        true
    }

    /// Remove a handler and its table.
    pub fn remove(&mut self, id: ActorId) -> Option<H> {
        let at = self
            .entries
            .iter()
            .position(|e| e.handler.route_id() == id)?;
        Some(self.entries.remove(at).handler)
    }

    /// Subscribe a present handler to events of type `E`.
    pub fn subscribe<E: Payload>(&mut self, id: ActorId) -> bool
    where
        H: Accept<E>,
    {
        match self.entry_mut(id) {
            Some(entry) => {
                entry.table.subscribe::<E>();
                true
            }
            None => false,
        }
    }

    /// Drop one event subscription of a handler.
    pub fn unsubscribe<E: Payload>(&mut self, id: ActorId)
    where
        H: Accept<E>,
    {
        if let Some(entry) = self.entry_mut(id) {
            entry.table.unsubscribe::<E>();
        }
    }

    /// Number of handlers present.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no handler is present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_mut(&mut self, id: ActorId) -> Option<&mut Entry<H>> {
        self.entries
            .iter_mut()
            .find(|e| e.handler.route_id() == id)
    }

    /// Route a raw event region by its header's destination and id.
    ///
    /// A broadcast destination walks every live, subscribed handler in
    /// insertion order; a unicast destination delivers to the matching
    /// handler if it subscribed to the event's type. Returns the number of
    /// deliveries. With `consume` set, the payload destructor runs once at
    /// the end regardless of delivery count.
    ///
    /// # Safety
    /// `event` must point at the start of a valid event region whose id
    /// matches its payload type, and the caller must uphold the
    /// exactly-once destruction discipline implied by `consume`.
    pub unsafe fn route(&mut self, event: *mut EventHeader, consume: bool) -> usize {
        let dest = (*event).dest;
        let mut delivered = 0;
        if dest.is_broadcast() {
            for entry in self.entries.iter_mut() {
                if entry.handler.is_route_alive()
                    && entry.table.route(&mut entry.handler, event, false)
                {
                    delivered += 1;
                }
            }
        } else if let Some(entry) = self.entry_mut(dest) {
            if entry.handler.is_route_alive()
                && entry.table.route(&mut entry.handler, event, false)
            {
                delivered += 1;
            }
        }
        if consume {
            drop_payload(event);
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventBucket;
    use crate::pipe::Pipe;
    use crate::util::CoreId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static HITS: AtomicUsize = AtomicUsize::new(0);
    static DROPS: AtomicUsize = AtomicUsize::new(0);

    struct Probe;

    struct DestroyProbe;

    impl Drop for DestroyProbe {
        fn drop(&mut self) {
            DROPS.fetch_add(1, Ordering::Relaxed);
        }
    }

    struct Node {
        id: ActorId,
    }

    impl Node {
        fn new(sid: u16) -> Self {
            Self {
                id: ActorId::new(CoreId::new(0), sid),
            }
        }
    }

    impl RouteTarget for Node {
        fn route_id(&self) -> ActorId {
            self.id
        }
    }

    impl Accept<Probe> for Node {
        fn accept(&mut self, _event: &mut Probe) {
            HITS.fetch_add(1, Ordering::Relaxed);
        }
    }

    impl Accept<DestroyProbe> for Node {
        fn accept(&mut self, _event: &mut DestroyProbe) {
            HITS.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn encode<E: Payload>(payload: E, dest: ActorId) -> Vec<EventBucket> {
        let mut pipe = Pipe::new(CoreId::new(0));
        pipe.allocate(payload, dest, ActorId::NOT_FOUND);
        let mut out = Vec::new();
        pipe.take_pending(&mut out);
        out
    }

    fn build_router() -> Memh<Node> {
        // Five subscribed, three then taken back out.
        let mut router = Memh::new();
        for sid in 1..=5u16 {
            assert!(router.insert(Node::new(sid)));
            router.subscribe::<Probe>(ActorId::new(CoreId::new(0), sid));
            router.subscribe::<DestroyProbe>(ActorId::new(CoreId::new(0), sid));
        }
        router.remove(ActorId::new(CoreId::new(0), 1));
        router.remove(ActorId::new(CoreId::new(0), 2));
        router.unsubscribe::<Probe>(ActorId::new(CoreId::new(0), 3));
        router.unsubscribe::<DestroyProbe>(ActorId::new(CoreId::new(0), 3));
        router
    }

    #[test]
    fn test_unicast_and_broadcast_counts() {
        HITS.store(0, Ordering::Relaxed);
        let mut router = build_router();

        for _ in 0..1024 {
            for sid in 1..=5u16 {
                let mut region = encode(Probe, ActorId::new(CoreId::new(0), sid));
                unsafe { router.route(region.as_mut_ptr() as *mut EventHeader, false) };
            }
            let mut region = encode(Probe, ActorId::broadcast(CoreId::new(0)));
            unsafe { router.route(region.as_mut_ptr() as *mut EventHeader, false) };
        }
        // Two reachable unicast targets plus two broadcast deliveries.
        assert_eq!(HITS.load(Ordering::Relaxed), 4096);
    }

    #[test]
    fn test_consume_destroys_per_routed_event() {
        HITS.store(0, Ordering::Relaxed);
        DROPS.store(0, Ordering::Relaxed);
        let mut router = build_router();

        for _ in 0..1024 {
            for sid in 1..=5u16 {
                let mut region = encode(DestroyProbe, ActorId::new(CoreId::new(0), sid));
                unsafe { router.route(region.as_mut_ptr() as *mut EventHeader, true) };
            }
            let mut region = encode(DestroyProbe, ActorId::broadcast(CoreId::new(0)));
            unsafe { router.route(region.as_mut_ptr() as *mut EventHeader, true) };
        }
        // Every routed event is destroyed exactly once, delivered or not.
        assert_eq!(DROPS.load(Ordering::Relaxed), 6144);
        assert_eq!(HITS.load(Ordering::Relaxed), 4096);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut router: Memh<Node> = Memh::new();
        assert!(router.insert(Node::new(1)));
        assert!(!router.insert(Node::new(1)));
        assert_eq!(router.len(), 1);
    }
}
