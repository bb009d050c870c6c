//! # weft-rt: sharded, lock-free actor runtime
//!
//! A multi-core execution engine for building high-throughput concurrent
//! services. Each configured core hosts a single-threaded scheduler (a
//! *virtual core*) that owns a disjoint set of actors; actors communicate
//! exclusively through typed events carried over cache-line-aligned
//! lock-free queues. No locks on the data path, no work stealing, no
//! cross-core sharing of actor state.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use weft_rt::prelude::*;
//!
//! #[derive(Clone, Copy)]
//! struct Ping { ttl: u32 }
//!
//! struct Pinger { peer: ActorId }
//!
//! impl Actor for Pinger {
//!     fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
//!         ctx.subscribe::<Ping, _>(self);
//!         if !self.peer.is_nil() {
//!             ctx.push(self.peer, Ping { ttl: 16 });
//!         }
//!         true
//!     }
//! }
//!
//! impl Handle<Ping> for Pinger {
//!     fn on(&mut self, event: &mut Ping, ctx: &mut Context<'_>) {
//!         if event.ttl == 0 {
//!             ctx.kill();
//!         } else {
//!             event.ttl -= 1;
//!             ctx.reply(event);
//!         }
//!     }
//! }
//!
//! fn main() -> Result<(), EngineError> {
//!     let mut engine = Engine::new([0u16, 1])?;
//!     let ping = engine.add_actor(0, Pinger { peer: ActorId::NOT_FOUND })?;
//!     engine.add_actor(1, Pinger { peer: ping })?;
//!     engine.start(false)?;
//!     engine.join()
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! EventBucket ─▶ BucketRing (SPSC) ─▶ Mailbox (MPSC) ─▶ VirtualCore drain
//!                                                            │
//!      Pipe (per-destination batch) ◀─ Context::push ◀─ actor handlers
//! ```
//!
//! One tick of a virtual core: sample the clock, run per-tick callbacks,
//! give the attached [`io::IoDriver`] its slot, drain the inbound mailbox
//! into typed handlers, reap killed actors, flush every non-empty outbound
//! pipe. Handlers run to completion and never block.
//!
//! # Guarantees
//!
//! - An actor id names at most one living actor; ids are recycled only
//!   after reaping.
//! - An actor executes on exactly one core for its entire lifetime; no two
//!   threads ever touch its state concurrently.
//! - Events from one actor to one destination preserve their send order.
//! - Every non-trivially-destructible payload is destroyed exactly once:
//!   on dispatch, on overflow drop, or with its pipe or mailbox at engine
//!   teardown.
//!
//! # Module map
//!
//! - [`engine`] - the controller: core set, startup barrier, shutdown,
//!   fault aggregation.
//! - [`actor`] - the [`Actor`]/[`Handle`] traits, the [`Context`] runtime
//!   handle, service tags.
//! - [`event`] - bucket layout, event header, the type registry, built-in
//!   events.
//! - [`mailbox`] / [`pipe`] - the lock-free transport.
//! - [`router`] - the four routing topologies.
//! - [`io`] - the replaceable I/O collaborator interface and the timer
//!   driver.

pub mod actor;
pub mod core;
pub mod engine;
pub mod event;
pub mod io;
pub mod mailbox;
pub mod pipe;
pub mod prelude;
pub mod router;
pub mod util;

pub use actor::{service_id, Actor, Context, Handle, ServiceTag};
pub use engine::{Engine, EngineConfig, EngineError, WaitMode};
pub use event::{
    AvailableEvent, DisconnectedEvent, EventHeader, FileEvent, KillEvent, Payload,
    RequireEvent, ServiceEvent, SignalEvent, TimerEvent,
};
pub use io::{IoContext, IoDriver, TimerDriver, TimerHandle};
pub use router::{Memh, Mesh, Semh, Sesh};
pub use self::core::CoreStatus;
pub use util::{ActorId, CoreId, EventId};
