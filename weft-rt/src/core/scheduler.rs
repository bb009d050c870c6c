//! The per-core scheduler loop.
//!
//! One `VirtualCore` runs on one OS thread and owns one core's actors for
//! the lifetime of the engine. Each loop iteration (a *tick*): sample the
//! clock, run per-tick callbacks, give the I/O driver its slot, drain the
//! inbound mailbox and dispatch every event, reap killed actors, then flush
//! the outbound pipes. Handlers run to completion; nothing on this thread
//! ever blocks on another core.

// Layer 1: Standard library imports
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// Layer 2: Third-party crate imports
use tracing::{debug, error, info, warn};

// Layer 3: Internal module imports
use super::state::{CoreState, SpawnRequest};
use super::table::{BoxedActor, Slot};
use crate::actor::context::{Context, CurrentEvent};
use crate::engine::config::{EngineConfig, WaitMode};
use crate::engine::shared::EngineShared;
use crate::engine::signal;
use crate::event::registry::{meta_by_id, meta_of, EventMeta};
use crate::event::service::service_received;
use crate::event::types::{AvailableEvent, RequireEvent, SignalEvent};
use crate::event::{drop_payload, EventBucket, EventHeader};
use crate::io::{IoContext, IoDriver};
use crate::mailbox::Mailbox;
use crate::util::{ActorId, CoreId, CoreSet, EventId, BROADCAST_SID};

/// Lifecycle of a virtual core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CoreStatus {
    /// Allocated, thread not running yet.
    Constructed = 0,
    /// Running seeded actor inits.
    Initializing = 1,
    /// In the run loop.
    Running = 2,
    /// Stop requested; finishing the current tick.
    Draining = 3,
    /// Thread finished (normally or through a fault).
    Exited = 4,
}

impl CoreStatus {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => CoreStatus::Constructed,
            1 => CoreStatus::Initializing,
            2 => CoreStatus::Running,
            3 => CoreStatus::Draining,
            _ => CoreStatus::Exited,
        }
    }
}

/// One actor queued for construction on its host core.
pub(crate) struct Seed {
    pub id: ActorId,
    pub actor: BoxedActor,
    pub actor_type: std::any::TypeId,
}

/// Everything a core thread needs to start.
pub(crate) struct CoreLaunch {
    pub core: CoreId,
    pub slot: usize,
    pub set: Arc<CoreSet>,
    pub mailboxes: Arc<Vec<Mailbox>>,
    pub shared: Arc<EngineShared>,
    pub serial: Arc<AtomicU16>,
    pub seeds: Vec<Seed>,
    pub io: Option<Box<dyn IoDriver>>,
    pub config: EngineConfig,
}

pub(crate) struct VirtualCore {
    state: CoreState,
    seeds: Vec<Seed>,
    io: Option<Box<dyn IoDriver>>,
    wait_mode: WaitMode,
    spawn_id: EventId,
    require_id: EventId,
    idle_ticks: u32,
}

impl VirtualCore {
    /// Thread entry point.
    pub(crate) fn launch(launch: CoreLaunch) {
        VirtualCore::new(launch).run();
    }

    fn new(launch: CoreLaunch) -> Self {
        let state = CoreState::new(
            launch.core,
            launch.slot,
            launch.set,
            launch.mailboxes,
            launch.shared,
            launch.serial,
        );
        Self {
            state,
            seeds: launch.seeds,
            io: launch.io,
            wait_mode: launch.config.wait_mode,
            spawn_id: meta_of::<SpawnRequest>().id,
            require_id: meta_of::<RequireEvent>().id,
            idle_ticks: 0,
        }
    }

    fn run(self) {
        let shared = Arc::clone(&self.state.shared);
        let slot = self.state.slot;
        let core = self.state.core;
        // A panicking handler takes the whole engine down cooperatively:
        // latch the fault, let the unwind drop this core's actors and
        // pipes, and leave the other cores to observe the flag.
        let outcome = catch_unwind(AssertUnwindSafe(move || {
            let mut vc = self;
            vc.run_inner();
        }));
        if outcome.is_err() {
            error!(%core, "core panicked; engine faulted");
            shared.fault.store(true, Ordering::Release);
            shared.set_status(slot, CoreStatus::Exited);
        }
    }

    fn run_inner(&mut self) {
        let shared = Arc::clone(&self.state.shared);
        let slot = self.state.slot;
        shared.set_status(slot, CoreStatus::Initializing);

        if !self.init_seeds() {
            shared.fault.store(true, Ordering::Release);
            shared.set_status(slot, CoreStatus::Exited);
            return;
        }

        // Startup barrier: nobody delivers events until every actor on
        // every core has initialized.
        shared.not_ready.fetch_sub(1, Ordering::AcqRel);
        while shared.not_ready.load(Ordering::Acquire) > 0 {
            if shared.is_faulted() {
                shared.set_status(slot, CoreStatus::Exited);
                return;
            }
            std::hint::spin_loop();
        }
        shared.set_status(slot, CoreStatus::Running);
        debug!(core = %self.state.core, "core entering run loop");

        let ring_cap = self.state.mailboxes[slot].capacity();
        let mut scratch: Vec<EventBucket> = Vec::with_capacity(ring_cap);
        let mut self_scratch: Vec<EventBucket> = Vec::new();

        loop {
            let worked = self.tick(&mut scratch, &mut self_scratch);
            if shared.is_faulted() {
                break;
            }
            if shared.stop_requested() {
                shared.set_status(slot, CoreStatus::Draining);
                break;
            }
            if self.state.actors.is_empty() {
                debug!(core = %self.state.core, "no actors remain");
                break;
            }
            if worked {
                self.idle_ticks = 0;
            } else {
                self.idle_backoff();
            }
        }

        shared.set_status(slot, CoreStatus::Exited);
        info!(core = %self.state.core, "core exited");
    }

    fn init_seeds(&mut self) -> bool {
        if self.seeds.is_empty() {
            error!(core = %self.state.core, "no actor registered on core at startup");
            return false;
        }
        let seeds = std::mem::take(&mut self.seeds);
        for seed in seeds {
            let id = seed.id;
            if !self.state.install(id, seed.actor, seed.actor_type) {
                error!(actor = %id, "actor initialization failed; aborting startup");
                return false;
            }
        }
        true
    }

    /// One loop iteration. Returns whether any event was dispatched.
    fn tick(&mut self, scratch: &mut Vec<EventBucket>, self_scratch: &mut Vec<EventBucket>) -> bool {
        self.state.now_ns = self.state.shared.now_ns();

        self.run_callbacks();

        if let Some(driver) = self.io.as_mut() {
            let mut io = IoContext {
                state: &mut self.state,
            };
            driver.io_tick(&mut io);
        }

        // The first slot translates latched process signals into a
        // broadcast; delivery happens through the ordinary pipes.
        if self.state.slot == 0 {
            if let Some(signum) = signal::take() {
                debug!(signum, "translating process signal");
                let source = ActorId::new(self.state.core, 0);
                let cores = self.state.set.len();
                for slot in 0..cores {
                    let core = self.state.set.core_at(slot);
                    self.state
                        .push_event(ActorId::broadcast(core), source, SignalEvent { signum });
                }
            }
        }

        // Drain inbound: producer rings visited in slot order, per-producer
        // FIFO within each.
        let my_slot = self.state.slot;
        let mailboxes = Arc::clone(&self.state.mailboxes);
        let mut events = 0usize;
        // Consumer exclusivity: this thread is the core's only drainer.
        unsafe {
            mailboxes[my_slot].drain(scratch, |region| {
                self.dispatch_region(region);
                events += 1;
            });
        }

        self.state.reap();

        // Same-core events bypass the rings: dispatch one batch directly.
        let own = self.state.core.raw();
        if let Some(pipe) = self.state.pipes.get_mut(&own) {
            pipe.take_pending(self_scratch);
        }
        let mut offset = 0;
        while offset < self_scratch.len() {
            let span = {
                let header = self_scratch[offset..].as_ptr() as *const EventHeader;
                unsafe { ((*header).bucket_count as usize).max(1) }
            };
            self.dispatch_region(&mut self_scratch[offset..offset + span]);
            events += 1;
            offset += span;
        }
        self_scratch.clear();
        // Kills observed during same-core delivery are reaped in the same
        // tick as every other delivery path.
        self.state.reap();

        self.flush_remote();
        events > 0
    }

    fn run_callbacks(&mut self) {
        // Snapshot the length: registrations made during the walk start
        // next tick, removals are pruned afterwards.
        let count = self.state.callbacks.len();
        let mut index = 0;
        while index < count {
            let sid = self.state.callbacks[index];
            index += 1;
            let Some(mut slot) = self.state.actors.take(sid) else {
                continue;
            };
            if slot.alive && slot.callback {
                let aid = ActorId::new(self.state.core, sid);
                {
                    let Slot {
                        actor,
                        alive,
                        callback,
                        ..
                    } = &mut slot;
                    let mut ctx = Context::new(aid, alive, callback, &mut self.state);
                    actor.on_callback(&mut ctx);
                }
                self.state.apply_pending(&mut slot);
            }
            self.state.actors.restore(sid, slot);
        }
        let CoreState {
            callbacks, actors, ..
        } = &mut self.state;
        callbacks.retain(|sid| actors.get(*sid).map(|s| s.callback).unwrap_or(false));
    }

    /// Dispatch one event region to its destination.
    fn dispatch_region(&mut self, region: &mut [EventBucket]) {
        let header = region.as_mut_ptr() as *mut EventHeader;
        let (id, dest) = unsafe { ((*header).id, (*header).dest) };

        if id == self.spawn_id {
            return self.handle_spawn(header);
        }
        let Some(meta) = meta_by_id(id) else {
            warn!(event = %id, "event with unregistered type id, dropping");
            return;
        };
        debug_assert_eq!(dest.core(), self.state.core, "event routed to wrong core");

        // Service events are primed for their return trip before routing;
        // routing itself uses the pre-swap coordinates captured above.
        unsafe {
            if (*header).state.is_service() {
                service_received(header, meta);
            }
        }

        if id == self.require_id {
            return self.handle_require(header, meta);
        }

        if dest.sid() == BROADCAST_SID {
            self.dispatch_broadcast(header, meta, id);
        } else {
            self.dispatch_unicast(header, meta, id, dest);
        }
    }

    fn dispatch_unicast(
        &mut self,
        header: *mut EventHeader,
        meta: &'static EventMeta,
        id: EventId,
        dest: ActorId,
    ) {
        let sid = dest.sid();
        let Some(mut slot) = self.state.actors.take(sid) else {
            debug!(%dest, event = %id, "event for absent actor, dropping");
            unsafe { drop_payload(header) };
            return;
        };
        if slot.alive {
            self.deliver(&mut slot, dest, header, meta, id);
        }
        self.state.actors.restore(sid, slot);
        unsafe { drop_payload(header) };
    }

    fn dispatch_broadcast(&mut self, header: *mut EventHeader, meta: &'static EventMeta, id: EventId) {
        // Snapshot at dispatch entry: subscriptions made by the handlers
        // themselves do not see this event.
        let targets: Vec<u16> = self
            .state
            .subscriptions
            .get(&id)
            .cloned()
            .unwrap_or_default();
        let core = self.state.core;
        for sid in targets {
            let Some(mut slot) = self.state.actors.take(sid) else {
                continue;
            };
            if slot.alive {
                self.deliver(&mut slot, ActorId::new(core, sid), header, meta, id);
            }
            self.state.actors.restore(sid, slot);
        }
        // Consume-on-last-use; a no-subscriber broadcast still destroys the
        // payload exactly once.
        unsafe { drop_payload(header) };
    }

    /// Run one actor's handler for one event.
    fn deliver(
        &mut self,
        slot: &mut Slot,
        aid: ActorId,
        header: *mut EventHeader,
        meta: &'static EventMeta,
        id: EventId,
    ) {
        let handler = slot.handlers.get(id);
        let payload = unsafe { meta.payload_ptr(header) };
        {
            let Slot {
                actor,
                alive,
                callback,
                ..
            } = slot;
            let mut ctx = Context::new(aid, alive, callback, &mut self.state);
            ctx.current = Some(CurrentEvent { header, meta });
            match handler {
                Some(f) => unsafe { f(actor, payload, &mut ctx) },
                None => {
                    let view = unsafe { &*header };
                    actor.on_unhandled(view, &mut ctx);
                }
            }
        }
        self.state.apply_pending(slot);
    }

    fn handle_spawn(&mut self, header: *mut EventHeader) {
        let meta = meta_of::<SpawnRequest>();
        unsafe {
            let request = &mut *(meta.payload_ptr(header) as *mut SpawnRequest);
            if let Some(ctor) = request.ctor.take() {
                ctor(&mut self.state);
            }
            drop_payload(header);
        }
    }

    fn handle_require(&mut self, header: *mut EventHeader, meta: &'static EventMeta) {
        let (wanted, requester) = unsafe {
            let request = &*(meta.payload_ptr(header) as *const RequireEvent);
            (request.actor_type, (*header).source)
        };
        let matches: Vec<u16> = self
            .state
            .actors
            .iter()
            .filter(|(_, slot)| slot.alive && slot.actor_type == wanted)
            .map(|(sid, _)| sid)
            .collect();
        let core = self.state.core;
        for sid in matches {
            let source = ActorId::new(core, sid);
            self.state.push_event(
                requester,
                source,
                AvailableEvent {
                    actor_type: wanted,
                    actor: source,
                },
            );
        }
        unsafe { drop_payload(header) };
    }

    fn flush_remote(&mut self) {
        let own = self.state.core.raw();
        let my_slot = self.state.slot;
        let mailboxes = Arc::clone(&self.state.mailboxes);
        let dests: Vec<u16> = self
            .state
            .pipes
            .iter()
            .filter(|(raw, pipe)| **raw != own && !pipe.is_empty())
            .map(|(raw, _)| *raw)
            .collect();
        for raw in dests {
            let Some(dslot) = self.state.set.resolve(CoreId::new(raw)) else {
                error!(dest = raw, "events addressed outside the core set, dropping");
                self.state.pipes.remove(&raw);
                self.state.shared.misuse.store(true, Ordering::Release);
                continue;
            };
            if let Some(pipe) = self.state.pipes.get_mut(&raw) {
                // Producer slot exclusivity: this core owns `my_slot`.
                let report = unsafe { pipe.flush(&mailboxes[dslot], my_slot) };
                if report.oversize_dropped > 0 {
                    self.state.shared.misuse.store(true, Ordering::Release);
                }
            }
        }
    }

    fn idle_backoff(&mut self) {
        self.idle_ticks = self.idle_ticks.saturating_add(1);
        match self.wait_mode {
            WaitMode::LowLatency => std::hint::spin_loop(),
            WaitMode::Friendly => {
                if self.idle_ticks < 64 {
                    std::hint::spin_loop();
                } else if self.idle_ticks < 256 {
                    thread::yield_now();
                } else {
                    thread::sleep(Duration::from_micros(100));
                }
            }
        }
    }
}
