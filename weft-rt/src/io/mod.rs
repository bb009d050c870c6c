//! The replaceable I/O collaborator interface.
//!
//! The core knows nothing about sockets, files or protocol framing. All it
//! offers an I/O layer is one hook: [`IoDriver::io_tick`], called once per
//! scheduler loop iteration on the core the driver is attached to, with an
//! [`IoContext`] that can allocate events into the core's outbound pipes.
//! Everything else (readiness polling, framing, TLS, ...) lives behind the
//! driver.
//!
//! [`TimerDriver`] is the one driver shipped in-tree: a deadline queue
//! whose callbacks run on the core during a future `io_tick`, giving actor
//! code a `schedule_after` primitive.

pub mod timer;

pub use timer::{TimerDriver, TimerHandle};

// Layer 3: Internal module imports
use crate::core::state::CoreState;
use crate::event::Payload;
use crate::util::{ActorId, CoreId};

/// Per-core I/O hook.
///
/// A driver is attached to exactly one core before the engine starts and is
/// dropped with the core. It must never block: a stalled `io_tick` stalls
/// every actor on the core.
pub trait IoDriver: Send + 'static {
    /// Called once per loop iteration, before the inbound drain.
    fn io_tick(&mut self, io: &mut IoContext<'_>);
}

/// The slice of core state an I/O driver may touch.
///
/// Events produced here carry the core's own sentinel id (serial `0`) as
/// their source unless the driver emits on behalf of an actor.
pub struct IoContext<'a> {
    pub(crate) state: &'a mut CoreState,
}

impl IoContext<'_> {
    /// The hosting core.
    pub fn core_id(&self) -> CoreId {
        self.state.core
    }

    /// Monotonic nanoseconds, sampled at tick entry.
    pub fn time(&self) -> u64 {
        self.state.now_ns
    }

    fn source(&self) -> ActorId {
        ActorId::new(self.state.core, 0)
    }

    /// Allocate an event toward `dest` on the core's outbound pipe.
    pub fn push<E: Payload>(&mut self, dest: ActorId, payload: E) -> &mut E {
        let source = self.source();
        self.state.push_event(dest, source, payload)
    }

    /// Allocate an event with trailing bytes.
    pub fn push_with_extra<E: Payload>(
        &mut self,
        dest: ActorId,
        payload: E,
        extra: &[u8],
    ) -> &mut E {
        let source = self.source();
        self.state.push_event_with_extra(dest, source, payload, extra)
    }

    /// Push and immediately attempt to flush the destination pipe.
    pub fn send<E: Payload>(&mut self, dest: ActorId, payload: E) {
        let source = self.source();
        self.state.push_event(dest, source, payload);
        self.state.flush_dest(dest.core());
    }

    /// Attempt a direct mailbox enqueue; see `Context::try_send`.
    pub fn try_send<E: Payload>(&mut self, dest: ActorId, payload: E) -> bool {
        let source = self.source();
        self.state.try_send_direct(dest, source, payload)
    }
}
