//! The process-wide engine controller.
//!
//! An [`Engine`] owns the configured core set, one mailbox per core, and
//! the OS threads the virtual cores run on. It seeds actors before start,
//! routes post-start construction requests through the mailboxes, and
//! aggregates fault state so `join` can report whether any core failed
//! init or panicked.

pub mod config;
pub mod errors;
pub(crate) mod shared;
pub(crate) mod signal;

// Layer 1: Standard library imports
use std::any::TypeId;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use rustc_hash::FxHashMap;
use tracing::{info, warn};

// Layer 3: Internal module imports
use crate::actor::service::service_sid;
use crate::actor::{Actor, ServiceTag};
use crate::core::scheduler::{CoreLaunch, CoreStatus, Seed, VirtualCore};
use crate::core::state::{CoreState, IdAlloc, SpawnRequest};
use crate::core::table::BoxedActor;
use crate::event::{drop_payload, EventHeader};
use crate::mailbox::Mailbox;
use crate::pipe::Pipe;
use crate::util::{ActorId, CoreId, CoreSet, SERVICE_RESERVED};
use shared::EngineShared;

pub use config::{EngineConfig, EngineConfigBuilder, WaitMode, DEFAULT_MAILBOX_CAPACITY};
pub use errors::EngineError;

/// The sharded actor engine.
///
/// # Example
///
/// ```rust,ignore
/// use weft_rt::prelude::*;
///
/// let mut engine = Engine::new([0u16, 1])?;
/// engine.add_actor(0, PingActor::new())?;
/// engine.add_actor(1, PongActor::new())?;
/// engine.start(true)?;
/// engine.join()?;
/// assert!(!engine.has_error());
/// ```
pub struct Engine {
    config: EngineConfig,
    set: Arc<CoreSet>,
    mailboxes: Arc<Vec<Mailbox>>,
    shared: Arc<EngineShared>,
    serials: Vec<Arc<AtomicU16>>,
    seeds: FxHashMap<u16, Vec<Seed>>,
    io_drivers: FxHashMap<u16, Box<dyn crate::io::IoDriver>>,
    threads: Vec<JoinHandle<()>>,
    started: bool,
}

impl Engine {
    /// Create an engine over the given core ids with default
    /// configuration.
    pub fn new<I>(cores: I) -> Result<Self, EngineError>
    where
        I: IntoIterator,
        I::Item: Into<CoreId>,
    {
        Self::with_config(cores, EngineConfig::default())
    }

    /// Create an engine with explicit configuration.
    ///
    /// Mailboxes are allocated here, one per core, each with one producer
    /// ring per peer core plus a reserved ring for the engine controller.
    pub fn with_config<I>(cores: I, config: EngineConfig) -> Result<Self, EngineError>
    where
        I: IntoIterator,
        I::Item: Into<CoreId>,
    {
        config.validate().map_err(EngineError::Config)?;
        let set = Arc::new(CoreSet::new(cores)?);
        let n = set.len();
        let mailboxes = Arc::new(
            (0..n)
                .map(|_| Mailbox::new(n + 1, config.mailbox_capacity))
                .collect::<Vec<_>>(),
        );
        let serials = (0..n)
            .map(|_| Arc::new(AtomicU16::new(SERVICE_RESERVED)))
            .collect();
        Ok(Self {
            config,
            shared: Arc::new(EngineShared::new(n)),
            set,
            mailboxes,
            serials,
            seeds: FxHashMap::default(),
            io_drivers: FxHashMap::default(),
            threads: Vec::new(),
            started: false,
        })
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The configured cores, in slot order.
    pub fn cores(&self) -> &[CoreId] {
        self.set.cores()
    }

    /// Current status of one core.
    pub fn core_status(&self, core: impl Into<CoreId>) -> Option<CoreStatus> {
        let slot = self.set.resolve(core.into())?;
        Some(self.shared.status(slot))
    }

    /// Add an actor to a core.
    ///
    /// Before `start`, construction is queued and runs on the host core
    /// during its init phase. After `start`, a construction request travels
    /// through the destination mailbox on the engine's reserved producer
    /// slot; the actor is still constructed and initialized on its host
    /// core. Either way the returned id is final.
    pub fn add_actor<A: Actor>(
        &mut self,
        core: impl Into<CoreId>,
        actor: A,
    ) -> Result<ActorId, EngineError> {
        let core = core.into();
        let slot = self
            .set
            .resolve(core)
            .ok_or(EngineError::UnknownCore(core))?;
        let sid =
            IdAlloc::alloc_shared(&self.serials[slot]).ok_or(EngineError::ActorLimit(core))?;
        let id = ActorId::new(core, sid);
        self.register(core, slot, id, Box::new(actor), TypeId::of::<A>())?;
        Ok(id)
    }

    /// Add a service actor under its tag-reserved id.
    ///
    /// At most one instance per (core, tag); the id is computable by
    /// anyone through [`service_id`](crate::actor::service_id).
    pub fn add_service<Tag: ServiceTag, A: Actor>(
        &mut self,
        core: impl Into<CoreId>,
        actor: A,
    ) -> Result<ActorId, EngineError> {
        let core = core.into();
        let slot = self
            .set
            .resolve(core)
            .ok_or(EngineError::UnknownCore(core))?;
        let sid = service_sid::<Tag>();
        let id = ActorId::new(core, sid);
        if let Some(seeds) = self.seeds.get(&core.raw()) {
            if seeds.iter().any(|s| s.id.sid() == sid) {
                return Err(EngineError::DuplicateService {
                    core,
                    service: std::any::type_name::<Tag>(),
                });
            }
        }
        self.register(core, slot, id, Box::new(actor), TypeId::of::<A>())?;
        Ok(id)
    }

    fn register(
        &mut self,
        core: CoreId,
        slot: usize,
        id: ActorId,
        actor: BoxedActor,
        actor_type: TypeId,
    ) -> Result<(), EngineError> {
        if !self.started {
            self.seeds.entry(core.raw()).or_default().push(Seed {
                id,
                actor,
                actor_type,
            });
            return Ok(());
        }
        if self.shared.status(slot) == CoreStatus::Exited {
            return Err(EngineError::CoreExited(core));
        }

        // Ship the construction to the host core as a spawn event.
        let request = SpawnRequest {
            ctor: Some(Box::new(move |state: &mut CoreState| {
                if !state.install(id, actor, actor_type) {
                    warn!(actor = %id, "runtime actor construction failed");
                }
            })),
        };
        let mut staging = Pipe::new(core);
        staging.allocate(request, ActorId::new(core, 0), ActorId::NOT_FOUND);
        let mut region = Vec::new();
        staging.take_pending(&mut region);

        let engine_slot = self.set.len();
        let deadline = Instant::now() + Duration::from_secs(1);
        loop {
            // Engine producer slot exclusivity: `&mut self` serializes
            // engine-side enqueues.
            match unsafe { self.mailboxes[slot].enqueue(engine_slot, &region) } {
                Ok(()) => return Ok(()),
                Err(_) if Instant::now() < deadline => thread::yield_now(),
                Err(_) => {
                    let header = region.as_mut_ptr() as *mut EventHeader;
                    unsafe { drop_payload(header) };
                    return Err(EngineError::MailboxFull(core));
                }
            }
        }
    }

    /// Fluent per-core actor addition.
    pub fn core(&mut self, core: impl Into<CoreId>) -> CoreBuilder<'_> {
        CoreBuilder {
            core: core.into(),
            engine: self,
            ids: Vec::new(),
            error: None,
        }
    }

    /// Attach the I/O driver of one core. Pre-start only.
    pub fn attach_io(
        &mut self,
        core: impl Into<CoreId>,
        driver: impl crate::io::IoDriver,
    ) -> Result<(), EngineError> {
        if self.started {
            return Err(EngineError::AlreadyStarted);
        }
        let core = core.into();
        if !self.set.contains(core) {
            return Err(EngineError::UnknownCore(core));
        }
        self.io_drivers.insert(core.raw(), Box::new(driver));
        Ok(())
    }

    /// Start the engine.
    ///
    /// Spawns one thread per core; with `async_mode` false the calling
    /// thread becomes the last core and `start` returns only once that
    /// core has exited. Cores run their actor inits, rendezvous on the
    /// startup barrier, and begin ticking.
    pub fn start(&mut self, async_mode: bool) -> Result<(), EngineError> {
        if self.started {
            return Err(EngineError::AlreadyStarted);
        }
        self.started = true;

        if !self.config.signals.is_empty() {
            signal::install(&self.config.signals)?;
        }
        info!(cores = self.set.len(), "engine starting");

        let n = self.set.len();
        let mut launches = Vec::with_capacity(n);
        for slot in 0..n {
            let core = self.set.core_at(slot);
            launches.push(CoreLaunch {
                core,
                slot,
                set: Arc::clone(&self.set),
                mailboxes: Arc::clone(&self.mailboxes),
                shared: Arc::clone(&self.shared),
                serial: Arc::clone(&self.serials[slot]),
                seeds: self.seeds.remove(&core.raw()).unwrap_or_default(),
                io: self.io_drivers.remove(&core.raw()),
                config: self.config.clone(),
            });
        }

        let inline = if async_mode { None } else { launches.pop() };
        for launch in launches {
            let name = format!("weft-core-{}", launch.core);
            match thread::Builder::new()
                .name(name)
                .spawn(move || VirtualCore::launch(launch))
            {
                Ok(handle) => self.threads.push(handle),
                Err(e) => {
                    // Cores already spinning on the barrier must not hang.
                    self.shared.fault.store(true, Ordering::Release);
                    return Err(EngineError::Spawn(e.to_string()));
                }
            }
        }
        if let Some(launch) = inline {
            VirtualCore::launch(launch);
        }
        Ok(())
    }

    /// Request cooperative shutdown: every core finishes its current tick
    /// and exits.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    /// Wait for every core thread and report aggregate state.
    ///
    /// After the threads are gone, events still sitting in the mailboxes
    /// are destroyed (their payload destructors run exactly once).
    pub fn join(&mut self) -> Result<(), EngineError> {
        if !self.started {
            return Err(EngineError::NotStarted);
        }
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                self.shared.fault.store(true, Ordering::Release);
            }
        }

        // Teardown order: actor tables and pipes died with their cores;
        // the engine-owned mailboxes are cleared last.
        let mut scratch = Vec::new();
        for mailbox in self.mailboxes.iter() {
            // Exclusive: every producer and the consumer have exited.
            unsafe { mailbox.drop_all(&mut scratch) };
        }

        if self.shared.is_faulted() {
            Err(EngineError::CoreFault)
        } else if self.shared.is_misused() {
            Err(EngineError::Misuse)
        } else {
            Ok(())
        }
    }

    /// Whether a structural anomaly was recorded: a core failed
    /// initialization or panicked, or an engine-misuse condition (such as
    /// an event larger than a mailbox ring) was detected.
    pub fn has_error(&self) -> bool {
        self.shared.is_faulted() || self.shared.is_misused()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.threads.is_empty() {
            self.stop();
            let _ = self.join();
        }
    }
}

/// Fluent builder adding several actors to one core.
///
/// ```rust,ignore
/// let ids = engine
///     .core(0)
///     .add_actor(WorkerActor::new())
///     .add_actor(WorkerActor::new())
///     .finish()?;
/// ```
pub struct CoreBuilder<'e> {
    engine: &'e mut Engine,
    core: CoreId,
    ids: Vec<ActorId>,
    error: Option<EngineError>,
}

impl CoreBuilder<'_> {
    /// Add one actor; errors are latched and reported by `finish`.
    pub fn add_actor<A: Actor>(mut self, actor: A) -> Self {
        if self.error.is_none() {
            match self.engine.add_actor(self.core, actor) {
                Ok(id) => self.ids.push(id),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Add a service actor; errors are latched and reported by `finish`.
    pub fn add_service<Tag: ServiceTag, A: Actor>(mut self, actor: A) -> Self {
        if self.error.is_none() {
            match self.engine.add_service::<Tag, A>(self.core, actor) {
                Ok(id) => self.ids.push(id),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// The collected ids, or the first latched error.
    pub fn finish(self) -> Result<Vec<ActorId>, EngineError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.ids),
        }
    }
}
