//! The runtime handle passed into every actor lifecycle method and handler.

// Layer 1: Standard library imports
use std::any::TypeId;
use std::slice;

// Layer 2: Third-party crate imports
use tracing::warn;

// Layer 3: Internal module imports
use super::traits::{Actor, Handle};
use crate::core::state::CoreState;
use crate::core::table::dispatch_trampoline;
use crate::event::registry::{event_id, EventMeta};
use crate::event::service::ServiceEvent;
use crate::event::types::RequireEvent;
use crate::event::{EventBucket, EventHeader, Payload};
use crate::util::{ActorId, CoreId};

/// The event currently being dispatched, kept as raw coordinates so
/// [`Context::reply`] and [`Context::forward`] can recycle the allocation.
#[derive(Clone, Copy)]
pub(crate) struct CurrentEvent {
    pub header: *mut EventHeader,
    pub meta: &'static EventMeta,
}

/// An actor's window into its hosting core.
///
/// A `Context` is constructed by the scheduler for the duration of one
/// call into the actor (init, callback or event handler) and carries the
/// actor's identity, its liveness flag and mutable access to the core's
/// outbound machinery. Everything an actor may legally do to the runtime
/// happens through these methods; the actor itself stays plain state.
pub struct Context<'a> {
    aid: ActorId,
    alive: &'a mut bool,
    callback: &'a mut bool,
    pub(crate) state: &'a mut CoreState,
    pub(crate) current: Option<CurrentEvent>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        aid: ActorId,
        alive: &'a mut bool,
        callback: &'a mut bool,
        state: &'a mut CoreState,
    ) -> Self {
        Self {
            aid,
            alive,
            callback,
            state,
            current: None,
        }
    }

    /// Id of the actor this context belongs to.
    pub fn id(&self) -> ActorId {
        self.aid
    }

    /// The hosting core.
    pub fn core_id(&self) -> CoreId {
        self.state.core
    }

    /// Monotonic nanoseconds, sampled once per tick.
    pub fn time(&self) -> u64 {
        self.state.now_ns
    }

    /// Whether the actor is still alive (i.e. has not called
    /// [`Context::kill`] and received no effective `KillEvent`).
    pub fn is_alive(&self) -> bool {
        *self.alive
    }

    /// Source id of the event currently being handled, if any.
    pub fn event_source(&self) -> Option<ActorId> {
        self.current.map(|cur| unsafe { (*cur.header).source })
    }

    /// Destination id of the event currently being handled, if any.
    ///
    /// For broadcast deliveries this is the broadcast address, not the
    /// receiving actor's id.
    pub fn event_dest(&self) -> Option<ActorId> {
        self.current.map(|cur| unsafe { (*cur.header).dest })
    }

    /// Mark the actor dead. It finishes the current call normally and is
    /// reaped at the end of the tick; no further handlers run on it.
    pub fn kill(&mut self) {
        if *self.alive {
            *self.alive = false;
            let sid = self.aid.sid();
            self.state.to_remove.push(sid);
        }
    }

    /// Subscribe the actor to events of type `E`.
    ///
    /// Pass `self` so the concrete actor type is captured for dispatch:
    ///
    /// ```rust,ignore
    /// fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
    ///     ctx.subscribe::<Ping, _>(self);
    ///     true
    /// }
    /// ```
    pub fn subscribe<E: Payload, A: Handle<E>>(&mut self, _actor: &A) {
        let sid = self.aid.sid();
        self.state
            .queue_subscription(sid, event_id::<E>(), dispatch_trampoline::<A, E>);
    }

    /// Enroll for one `on_callback` invocation per tick.
    pub fn register_callback(&mut self) {
        if !*self.callback {
            *self.callback = true;
            let sid = self.aid.sid();
            self.state.enroll_callback(sid);
        }
    }

    /// Stop per-tick callbacks, effective from the next tick.
    pub fn unregister_callback(&mut self) {
        *self.callback = false;
    }

    /// Allocate an event toward `dest` on this core's outbound pipe and
    /// return it for further field writes. Delivered with the tick's batch
    /// flush.
    pub fn push<E: Payload>(&mut self, dest: ActorId, payload: E) -> &mut E {
        let aid = self.aid;
        self.state.push_event(dest, aid, payload)
    }

    /// Like [`Context::push`] with `extra` trailing bytes after the
    /// payload, for variable-length messages.
    pub fn push_with_extra<E: Payload>(
        &mut self,
        dest: ActorId,
        payload: E,
        extra: &[u8],
    ) -> &mut E {
        let aid = self.aid;
        self.state.push_event_with_extra(dest, aid, payload, extra)
    }

    /// Push and immediately attempt to flush the destination pipe.
    ///
    /// Best effort: a full destination mailbox simply leaves the event
    /// batched for the next tick. No delivery-before-next-tick guarantee
    /// is made, same-core destinations included.
    pub fn send<E: Payload>(&mut self, dest: ActorId, payload: E) {
        let aid = self.aid;
        self.state.push_event(dest, aid, payload);
        self.state.flush_dest(dest.core());
    }

    /// Attempt a direct mailbox enqueue, bypassing the outbound pipe.
    ///
    /// Returns whether the destination accepted the event. Pending pipe
    /// contents are neither consulted nor flushed, so ordering relative to
    /// pushed events is not preserved. On failure the payload has been
    /// destroyed.
    pub fn try_send<E: Payload>(&mut self, dest: ActorId, payload: E) -> bool {
        let aid = self.aid;
        self.state.try_send_direct(dest, aid, payload)
    }

    /// Start a service round-trip.
    ///
    /// Allocates a [`ServiceEvent`] toward `service` whose return leg
    /// travels back to this actor under the event id of `R`. `R` must be a
    /// payload type with the same layout as `ServiceEvent<B>` (typically a
    /// `repr(transparent)` wrapper), because the returning allocation is
    /// reinterpreted under the new tag.
    pub fn push_service<B: Payload, R: Payload>(
        &mut self,
        service: ActorId,
        body: B,
    ) -> &mut ServiceEvent<B> {
        debug_assert_eq!(
            std::mem::size_of::<R>(),
            std::mem::size_of::<ServiceEvent<B>>(),
            "service reply type must mirror the request layout"
        );
        let aid = self.aid;
        let event = ServiceEvent::new(aid, event_id::<R>(), body);
        self.state.push_service_event(service, aid, event)
    }

    /// Send the event currently being handled back to its source.
    ///
    /// The allocation is recycled: headers are rewritten (`dest` becomes
    /// the original source, `source` becomes this actor) and payload
    /// ownership moves to the outbound copy, so the dispatcher will not
    /// destroy it. Only valid on the event passed into the running
    /// handler.
    pub fn reply<E: Payload>(&mut self, event: &mut E) {
        let Some(cur) = self.current else {
            warn!(actor = %self.aid, "reply called outside event dispatch");
            return;
        };
        debug_assert!(
            std::ptr::eq(event as *mut E as *const u8, unsafe {
                cur.meta.payload_ptr(cur.header)
            } as *const u8),
            "reply must receive the event being handled"
        );
        let _ = event;
        unsafe {
            (*cur.header).dest = (*cur.header).source;
            (*cur.header).source = self.aid;
            self.recycle(cur);
        }
    }

    /// Re-route the event currently being handled to a new destination,
    /// preserving its original source.
    pub fn forward<E: Payload>(&mut self, dest: ActorId, event: &mut E) {
        let Some(cur) = self.current else {
            warn!(actor = %self.aid, "forward called outside event dispatch");
            return;
        };
        debug_assert!(
            std::ptr::eq(event as *mut E as *const u8, unsafe {
                cur.meta.payload_ptr(cur.header)
            } as *const u8),
            "forward must receive the event being handled"
        );
        let _ = event;
        unsafe {
            (*cur.header).dest = dest;
            self.recycle(cur);
        }
    }

    /// Copy the current allocation into the pipe for its (rewritten)
    /// destination and move payload ownership to the copy.
    ///
    /// # Safety
    /// `cur` must describe the live event region of the running dispatch,
    /// with no outstanding references into it.
    unsafe fn recycle(&mut self, cur: CurrentEvent) {
        let span = (*cur.header).bucket_count as usize;
        let dest_core = (*cur.header).dest.core();
        {
            let region = slice::from_raw_parts(cur.header as *const EventBucket, span);
            self.state.pipe_for(dest_core).push_copy(region);
        }
        (*cur.header).state.set_alive(false);
    }

    /// Deliver one copy of `payload` to every subscribed actor on every
    /// active core (this one included).
    pub fn broadcast<E: Payload + Clone>(&mut self, payload: E) {
        let aid = self.aid;
        let cores = self.state.set.len();
        for slot in 0..cores - 1 {
            let core = self.state.set.core_at(slot);
            self.state
                .push_event(ActorId::broadcast(core), aid, payload.clone());
        }
        // The last copy moves instead of cloning.
        let core = self.state.set.core_at(cores - 1);
        self.state
            .push_event(ActorId::broadcast(core), aid, payload);
    }

    /// Chainable push builder bound to one destination pipe.
    pub fn to(&mut self, dest: ActorId) -> EventBuilder<'_, 'a> {
        EventBuilder { ctx: self, dest }
    }

    /// Construct a child actor on this core and run its `on_init` inline.
    ///
    /// The child is owned by the core's table like any other actor,
    /// independently killable and reapable. Returns `None` when id space is
    /// exhausted or init refused (the child is destroyed in that case).
    pub fn add_referenced_actor<A: Actor>(&mut self, actor: A) -> Option<ActorId> {
        let sid = self.state.alloc_sid()?;
        let id = ActorId::new(self.state.core, sid);
        if self.state.install(id, Box::new(actor), TypeId::of::<A>()) {
            Some(id)
        } else {
            None
        }
    }

    /// Ask every core to announce its live actors of concrete type `A`.
    ///
    /// Each match arrives as an
    /// [`AvailableEvent`](crate::event::AvailableEvent) whose source is the
    /// matching actor; subscribe to it before requiring. Responses are not
    /// deduplicated across repeated requests.
    pub fn require<A: Actor>(&mut self) {
        self.broadcast(RequireEvent {
            actor_type: TypeId::of::<A>(),
        });
    }
}

/// Fluent multi-push toward a single destination.
///
/// ```rust,ignore
/// ctx.to(peer).push(First { .. }).push(Second { .. });
/// ```
pub struct EventBuilder<'c, 'a> {
    ctx: &'c mut Context<'a>,
    dest: ActorId,
}

impl<'c, 'a> EventBuilder<'c, 'a> {
    /// Allocate one event toward the bound destination.
    pub fn push<E: Payload>(self, payload: E) -> Self {
        let Self { ctx, dest } = self;
        ctx.push(dest, payload);
        Self { ctx, dest }
    }

    /// The bound destination.
    pub fn dest(&self) -> ActorId {
        self.dest
    }
}
