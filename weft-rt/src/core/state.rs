//! Mutable per-core runtime state shared by the scheduler and the actor
//! [`Context`].

// Layer 1: Standard library imports
use std::any::TypeId;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use rustc_hash::FxHashMap;
use tracing::{debug, error, warn};

// Layer 3: Internal module imports
use super::table::{ActorTable, BoxedActor, CoreHandler, Slot};
use crate::actor::context::Context;
use crate::engine::shared::EngineShared;
use crate::event::service::ServiceEvent;
use crate::event::{
    drop_payload, meta_of, EventBucket, EventHeader, EventState, Payload,
};
use crate::mailbox::Mailbox;
use crate::pipe::Pipe;
use crate::util::{ActorId, CoreId, CoreSet, EventId, SERVICE_RESERVED};

/// Deferred actor construction shipped through a mailbox.
pub(crate) type SpawnFn = Box<dyn FnOnce(&mut CoreState) + Send>;

/// Payload of the internal spawn event (runtime `add_actor`).
pub(crate) struct SpawnRequest {
    pub ctor: Option<SpawnFn>,
}

/// A subscription made during a dispatch, applied to the slot's table once
/// the handler has returned.
pub(crate) struct PendingSub {
    pub id: EventId,
    pub handler: CoreHandler,
}

/// Serial-id allocator of one core.
///
/// Fresh ids come from an atomic counter shared with the engine controller
/// (so runtime `add_actor` can hand out ids synchronously); reaped serial
/// ids are recycled through a core-local free list.
pub(crate) struct IdAlloc {
    next: Arc<AtomicU16>,
    free: Vec<u16>,
}

impl IdAlloc {
    pub(crate) fn new(next: Arc<AtomicU16>) -> Self {
        Self {
            next,
            free: Vec::new(),
        }
    }

    /// Allocate a fresh serial id from the shared counter.
    ///
    /// Deterministically fails once the serial space of the core is used
    /// up.
    pub(crate) fn alloc_shared(next: &AtomicU16) -> Option<u16> {
        next.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
            // u16::MAX is the broadcast sentinel, never an actor id.
            if v >= u16::MAX - 1 {
                None
            } else {
                Some(v + 1)
            }
        })
        .ok()
    }

    fn alloc(&mut self) -> Option<u16> {
        if let Some(sid) = self.free.pop() {
            return Some(sid);
        }
        Self::alloc_shared(&self.next)
    }

    fn free(&mut self, sid: u16) {
        if sid >= SERVICE_RESERVED {
            self.free.push(sid);
        }
    }
}

/// Everything a virtual core owns and mutates on its own thread.
///
/// Field order doubles as teardown order: the actor table (and any events
/// still referenced by it) drops before the outbound pipes; the mailboxes
/// are engine-owned and outlive both.
pub(crate) struct CoreState {
    pub core: CoreId,
    pub slot: usize,
    pub actors: ActorTable,
    pub subscriptions: FxHashMap<EventId, Vec<u16>>,
    pub callbacks: Vec<u16>,
    pub to_remove: Vec<u16>,
    pub pipes: FxHashMap<u16, Pipe>,
    pub pending_subs: Vec<PendingSub>,
    pub ids: IdAlloc,
    pub set: Arc<CoreSet>,
    pub mailboxes: Arc<Vec<Mailbox>>,
    pub shared: Arc<EngineShared>,
    pub now_ns: u64,
    /// Staging area for direct sends that bypass the pipes.
    scratch: Vec<EventBucket>,
}

impl CoreState {
    pub(crate) fn new(
        core: CoreId,
        slot: usize,
        set: Arc<CoreSet>,
        mailboxes: Arc<Vec<Mailbox>>,
        shared: Arc<EngineShared>,
        serial: Arc<AtomicU16>,
    ) -> Self {
        Self {
            core,
            slot,
            actors: ActorTable::default(),
            subscriptions: FxHashMap::default(),
            callbacks: Vec::new(),
            to_remove: Vec::new(),
            pipes: FxHashMap::default(),
            pending_subs: Vec::new(),
            ids: IdAlloc::new(serial),
            set,
            mailboxes,
            shared,
            now_ns: 0,
            scratch: Vec::new(),
        }
    }

    /// The outbound pipe toward `core`, created on first use.
    pub(crate) fn pipe_for(&mut self, core: CoreId) -> &mut Pipe {
        self.pipes
            .entry(core.raw())
            .or_insert_with(|| Pipe::new(core))
    }

    /// Allocate an event into the pipe for its destination core.
    pub(crate) fn push_event<E: Payload>(
        &mut self,
        dest: ActorId,
        source: ActorId,
        payload: E,
    ) -> &mut E {
        self.pipe_for(dest.core()).allocate(payload, dest, source)
    }

    /// Allocate a service-flagged event.
    pub(crate) fn push_service_event<B: Payload>(
        &mut self,
        dest: ActorId,
        source: ActorId,
        event: ServiceEvent<B>,
    ) -> &mut ServiceEvent<B> {
        self.pipe_for(dest.core())
            .allocate_flagged(event, true, dest, source)
    }

    /// Allocate an event with trailing bytes.
    pub(crate) fn push_event_with_extra<E: Payload>(
        &mut self,
        dest: ActorId,
        source: ActorId,
        payload: E,
        extra: &[u8],
    ) -> &mut E {
        self.pipe_for(dest.core())
            .allocate_with_extra(payload, extra, dest, source)
    }

    /// Best-effort flush of the pipe toward `core` (used by `send`).
    ///
    /// The same-core pipe is not flushed here; its events are dispatched in
    /// the flush phase of the current tick.
    pub(crate) fn flush_dest(&mut self, core: CoreId) {
        if core == self.core {
            return;
        }
        let Some(dslot) = self.set.resolve(core) else {
            return;
        };
        let my_slot = self.slot;
        let mailboxes = Arc::clone(&self.mailboxes);
        if let Some(pipe) = self.pipes.get_mut(&core.raw()) {
            // Producer slot exclusivity: this core owns `my_slot`.
            let report = unsafe { pipe.flush(&mailboxes[dslot], my_slot) };
            if report.oversize_dropped > 0 {
                self.shared.misuse.store(true, Ordering::Release);
            }
        }
    }

    /// Direct enqueue into the destination mailbox, bypassing the pipe.
    ///
    /// Same-core destinations fall back to the self pipe (there is no ring
    /// to itself). Returns whether the event was accepted; on `false` the
    /// payload has been destroyed.
    pub(crate) fn try_send_direct<E: Payload>(
        &mut self,
        dest: ActorId,
        source: ActorId,
        payload: E,
    ) -> bool {
        if dest.core() == self.core {
            self.push_event(dest, source, payload);
            return true;
        }
        let Some(dslot) = self.set.resolve(dest.core()) else {
            warn!(%dest, "try_send to a core outside the engine's core set");
            return false;
        };

        let meta = meta_of::<E>();
        let span = meta.bucket_count(0);
        if span > self.mailboxes[dslot].capacity() {
            error!(event = meta.type_name, "event exceeds mailbox ring capacity");
            self.shared.misuse.store(true, Ordering::Release);
            return false;
        }

        self.scratch.clear();
        self.scratch.resize(span, EventBucket::zeroed());
        let header = self.scratch.as_mut_ptr() as *mut EventHeader;
        unsafe {
            ptr::write(
                header,
                EventHeader::new(
                    meta.id,
                    span as u16,
                    EventState::fresh(meta.trivial, false),
                    dest,
                    source,
                ),
            );
            ptr::write(meta.payload_ptr(header) as *mut E, payload);
            // Producer slot exclusivity: this core owns its slot.
            match self.mailboxes[dslot].enqueue(self.slot, &self.scratch[..span]) {
                Ok(()) => true,
                Err(_) => {
                    drop_payload(header);
                    false
                }
            }
        }
    }

    /// Record a subscription made through a [`Context`].
    ///
    /// The handler lands in the slot's dispatch table once the current
    /// dispatch (or init) finishes; the broadcast list is updated
    /// immediately.
    pub(crate) fn queue_subscription(&mut self, sid: u16, id: EventId, handler: CoreHandler) {
        self.pending_subs.push(PendingSub { id, handler });
        let subs = self.subscriptions.entry(id).or_default();
        if !subs.contains(&sid) {
            subs.push(sid);
        }
    }

    pub(crate) fn apply_pending(&mut self, slot: &mut Slot) {
        for sub in self.pending_subs.drain(..) {
            slot.handlers.subscribe_with(sub.id, sub.handler);
        }
    }

    pub(crate) fn enroll_callback(&mut self, sid: u16) {
        if !self.callbacks.contains(&sid) {
            self.callbacks.push(sid);
        }
    }

    pub(crate) fn alloc_sid(&mut self) -> Option<u16> {
        self.ids.alloc()
    }

    /// Construct-and-init protocol for a new resident actor.
    ///
    /// Runs `on_init` with a fresh [`Context`]; on `false` the actor is
    /// dropped, its registrations rolled back and its id released. The slot
    /// is inserted even when init killed the actor, so the regular reap
    /// path destroys it.
    pub(crate) fn install(&mut self, id: ActorId, actor: BoxedActor, actor_type: TypeId) -> bool {
        let sid = id.sid();
        if self.actors.contains(sid) {
            error!(actor = %id, "actor id already occupied");
            self.ids.free(sid);
            return false;
        }

        // Nested installs (referenced actors spawned from on_init) share
        // the pending list; isolate this install's registrations.
        let saved = mem::take(&mut self.pending_subs);
        let mut slot = Slot::new(actor, actor_type);
        let ok = {
            let Slot {
                actor,
                alive,
                callback,
                ..
            } = &mut slot;
            let mut ctx = Context::new(id, alive, callback, self);
            actor.on_init(&mut ctx)
        };

        if !ok {
            debug!(actor = %id, "on_init refused, dropping actor");
            self.pending_subs.clear();
            self.pending_subs = saved;
            self.purge_sid(sid);
            self.to_remove.retain(|s| *s != sid);
            self.ids.free(sid);
            return false;
        }

        self.apply_pending(&mut slot);
        self.pending_subs = saved;
        if slot.callback {
            self.enroll_callback(sid);
        }
        self.actors.insert(sid, slot);
        debug!(actor = %id, "actor installed");
        true
    }

    /// Drop everything the core still knows about a reaped id.
    pub(crate) fn purge_sid(&mut self, sid: u16) {
        for subs in self.subscriptions.values_mut() {
            subs.retain(|s| *s != sid);
        }
        self.callbacks.retain(|s| *s != sid);
    }

    /// Destroy actors killed during this tick and recycle their ids.
    pub(crate) fn reap(&mut self) {
        if self.to_remove.is_empty() {
            return;
        }
        let removed: Vec<u16> = self.to_remove.drain(..).collect();
        for sid in removed {
            if let Some(slot) = self.actors.remove(sid) {
                debug!(actor = %ActorId::new(self.core, sid), "actor reaped");
                drop(slot);
                self.purge_sid(sid);
                self.ids.free(sid);
            }
        }
    }
}
