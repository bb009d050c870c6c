//! Single-event, single-handler routing.

// Layer 1: Standard library imports
use std::marker::PhantomData;
use std::mem::ManuallyDrop;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::Accept;

/// The degenerate topology: one event type, one handler.
///
/// Exists so the hot single-pair paths (a core delivering to itself, a
/// dedicated sink) run with zero lookup cost while keeping the same
/// consume/preserve contract as the bigger routers.
pub struct Sesh<E, H: Accept<E>> {
    handler: H,
    _marker: PhantomData<fn(&mut E)>,
}

impl<E, H: Accept<E>> Sesh<E, H> {
    /// Wrap a handler.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }

    /// Access the wrapped handler.
    pub fn handler(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Deliver the event, leaving payload ownership with the caller.
    pub fn route(&mut self, event: &mut ManuallyDrop<E>) {
        self.handler.accept(event);
    }

    /// Deliver the event and run its destructor.
    ///
    /// # Safety
    /// The payload must not have been dropped already, and the caller must
    /// not use it afterwards.
    pub unsafe fn route_consume(&mut self, event: &mut ManuallyDrop<E>) {
        self.handler.accept(event);
        ManuallyDrop::drop(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DROPS: AtomicUsize = AtomicUsize::new(0);

    struct Hit {
        count: usize,
    }

    struct Counter {
        hits: usize,
    }

    impl Accept<Hit> for Counter {
        fn accept(&mut self, event: &mut Hit) {
            event.count += 1;
            self.hits += 1;
        }
    }

    struct DropEvent;

    impl Drop for DropEvent {
        fn drop(&mut self) {
            DROPS.fetch_add(1, Ordering::Relaxed);
        }
    }

    impl Accept<DropEvent> for Counter {
        fn accept(&mut self, _event: &mut DropEvent) {
            self.hits += 1;
        }
    }

    #[test]
    fn test_preserving_route_repeats() {
        let mut router = Sesh::new(Counter { hits: 0 });
        let mut event = ManuallyDrop::new(Hit { count: 0 });
        for _ in 0..1024 {
            router.route(&mut event);
        }
        assert_eq!(event.count, 1024);
        assert_eq!(router.handler().hits, 1024);
    }

    #[test]
    fn test_consume_runs_destructor_once() {
        DROPS.store(0, Ordering::Relaxed);
        let mut router = Sesh::new(Counter { hits: 0 });
        let mut event = ManuallyDrop::new(DropEvent);
        unsafe { router.route_consume(&mut event) };
        assert_eq!(DROPS.load(Ordering::Relaxed), 1);
        assert_eq!(router.handler().hits, 1);
    }

    #[test]
    fn test_preserve_skips_destructor() {
        DROPS.store(0, Ordering::Relaxed);
        let mut router = Sesh::new(Counter { hits: 0 });
        let mut event = ManuallyDrop::new(DropEvent);
        for _ in 0..16 {
            router.route(&mut event);
        }
        assert_eq!(DROPS.load(Ordering::Relaxed), 0);
    }
}
