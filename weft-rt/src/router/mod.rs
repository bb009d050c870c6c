//! Event routing topologies.
//!
//! Four reusable shapes cover every dispatch pattern in the runtime, named
//! by how many event types and handlers they fan across:
//!
//! - [`Sesh`] - single event type, single handler.
//! - [`Semh`] - single event type, many handlers selected by destination
//!   id, with broadcast.
//! - [`Mesh`] - many event types, single handler (the per-actor dispatch
//!   table).
//! - [`Memh`] - many event types, many handlers; the general case a
//!   scheduler runs on.
//!
//! Each router routes with a consume or preserve flavor: consuming runs the
//! payload destructor exactly once after the last delivery, preserving
//! leaves ownership with the caller. Destructible payloads must eventually
//! be routed consuming (or dropped through
//! [`drop_payload`](crate::event::drop_payload)); for trivially
//! destructible payloads the flavor only controls the alive flag.
//!
//! [`Memh`] composes one [`Mesh`] per handler, and the virtual-core
//! scheduler runs on the same shape: every actor slot's dispatch table is
//! a `Mesh` instantiated with the scheduler's context-threaded handler
//! form, with destination select and broadcast provided by the core's
//! actor table.
//!
//! Broadcast delivery walks handlers in subscription order, every time.

pub mod memh;
pub mod mesh;
pub mod semh;
pub mod sesh;

pub use memh::Memh;
pub use mesh::{Mesh, RawHandler};
pub use semh::Semh;
pub use sesh::Sesh;

// Layer 3: Internal module imports
use crate::util::ActorId;

/// Identity and liveness of a routable handler.
pub trait RouteTarget {
    /// Id events are matched against.
    fn route_id(&self) -> ActorId;

    /// Dead targets are skipped by every router.
    fn is_route_alive(&self) -> bool {
        true
    }
}

/// A handler for events of type `E`.
pub trait Accept<E> {
    /// Deliver one event.
    fn accept(&mut self, event: &mut E);
}

impl<E, T: Accept<E>> Accept<E> for &mut T {
    fn accept(&mut self, event: &mut E) {
        (**self).accept(event);
    }
}
