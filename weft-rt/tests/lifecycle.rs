//! Engine lifecycle: init failure abort, empty cores, kill-at-init,
//! runtime actor addition and id-space exhaustion.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use weft_rt::prelude::*;

#[derive(Clone, Copy)]
struct Nudge;

struct WellBehaved {
    peer: Option<ActorId>,
    handlers_run: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
}

impl Actor for WellBehaved {
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        ctx.subscribe::<Nudge, _>(self);
        if let Some(peer) = self.peer {
            ctx.push(peer, Nudge);
        }
        true
    }
}

impl Handle<Nudge> for WellBehaved {
    fn on(&mut self, _event: &mut Nudge, _ctx: &mut Context<'_>) {
        self.handlers_run.fetch_add(1, Ordering::Relaxed);
    }
}

impl Drop for WellBehaved {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

struct RefusesInit;

impl Actor for RefusesInit {
    fn on_init(&mut self, _ctx: &mut Context<'_>) -> bool {
        false
    }
}

#[test]
fn init_failure_aborts_engine() {
    let handlers_run = Arc::new(AtomicUsize::new(0));
    let dropped = Arc::new(AtomicUsize::new(0));

    let mut engine = Engine::new([0u16, 1]).unwrap();
    let target = engine
        .add_actor(
            0u16,
            WellBehaved {
                peer: None,
                handlers_run: Arc::clone(&handlers_run),
                dropped: Arc::clone(&dropped),
            },
        )
        .unwrap();
    engine
        .add_actor(
            0u16,
            WellBehaved {
                peer: Some(target),
                handlers_run: Arc::clone(&handlers_run),
                dropped: Arc::clone(&dropped),
            },
        )
        .unwrap();
    engine.add_actor(1u16, RefusesInit).unwrap();

    engine.start(false).unwrap();
    assert!(engine.join().is_err());
    assert!(engine.has_error());

    // The barrier never released: no event was ever delivered, and every
    // healthy actor was still destroyed on the way out.
    assert_eq!(handlers_run.load(Ordering::Relaxed), 0);
    assert_eq!(dropped.load(Ordering::Relaxed), 2);
}

#[test]
fn empty_core_aborts_engine() {
    let mut engine = Engine::new([0u16, 1]).unwrap();
    engine
        .add_actor(
            0u16,
            WellBehaved {
                peer: None,
                handlers_run: Arc::new(AtomicUsize::new(0)),
                dropped: Arc::new(AtomicUsize::new(0)),
            },
        )
        .unwrap();
    // Core 1 has nothing to run: starting is a configuration fault.
    engine.start(false).unwrap();
    assert!(engine.join().is_err());
    assert!(engine.has_error());
}

struct QuitsAtInit;

impl Actor for QuitsAtInit {
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        ctx.kill();
        true
    }
}

#[test]
fn kill_during_init_is_clean() {
    let mut engine = Engine::new([0u16]).unwrap();
    engine.add_actor(0u16, QuitsAtInit).unwrap();
    engine.start(false).unwrap();
    engine.join().unwrap();
    assert!(!engine.has_error());
}

struct Waiter;

impl Actor for Waiter {
    fn on_init(&mut self, _ctx: &mut Context<'_>) -> bool {
        true
    }
}

struct Stopper {
    target: ActorId,
}

impl Actor for Stopper {
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        ctx.push(self.target, KillEvent);
        ctx.kill();
        true
    }
}

#[test]
fn runtime_actor_addition() {
    let mut engine = Engine::new([0u16]).unwrap();
    let target = engine.add_actor(0u16, Waiter).unwrap();

    engine.start(true).unwrap();
    // Give the core a moment to enter its loop, then route a construction
    // request through the mailbox.
    std::thread::sleep(Duration::from_millis(50));
    engine.add_actor(0u16, Stopper { target }).unwrap();

    engine.join().unwrap();
    assert!(!engine.has_error());
}

#[test]
fn add_actor_to_unknown_core_fails() {
    let mut engine = Engine::new([0u16]).unwrap();
    let err = engine.add_actor(7u16, Waiter).unwrap_err();
    assert!(matches!(err, EngineError::UnknownCore(_)));
}

#[test]
fn add_actor_after_exit_fails() {
    let mut engine = Engine::new([0u16]).unwrap();
    engine.add_actor(0u16, QuitsAtInit).unwrap();
    engine.start(false).unwrap();
    engine.join().unwrap();

    let err = engine.add_actor(0u16, Waiter).unwrap_err();
    assert!(matches!(err, EngineError::CoreExited(_)));
}

#[derive(Clone, Copy)]
struct Oversized;

struct BigSender {
    peer: ActorId,
}

impl Actor for BigSender {
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        // Spans far more buckets than the 64-bucket ring can ever take;
        // dropped at flush with the misuse latch set. The kill behind it
        // still goes through.
        ctx.push_with_extra(self.peer, Oversized, &[0u8; 8192]);
        ctx.push(self.peer, KillEvent);
        ctx.kill();
        true
    }
}

#[test]
fn oversize_event_flags_misuse() {
    let config = EngineConfig::builder()
        .with_mailbox_capacity(64)
        .with_signals(Vec::new())
        .build()
        .unwrap();
    let mut engine = Engine::with_config([0u16, 1], config).unwrap();
    let peer = engine.add_actor(1u16, Waiter).unwrap();
    engine.add_actor(0u16, BigSender { peer }).unwrap();

    engine.start(true).unwrap();
    let joined = engine.join();

    // Misuse is a structural anomaly: visible through has_error itself,
    // not only through join's error value.
    assert!(engine.has_error());
    assert!(matches!(joined, Err(EngineError::Misuse)));
}

#[test]
fn serial_id_space_is_finite() {
    let mut engine = Engine::new([0u16]).unwrap();
    // Serials run from SERVICE_RESERVED up to (not including) the last id
    // before the broadcast sentinel.
    let capacity = (u16::MAX as usize - 1) - weft_rt::util::SERVICE_RESERVED as usize;
    for _ in 0..capacity {
        engine.add_actor(0u16, Waiter).unwrap();
    }
    let err = engine.add_actor(0u16, Waiter).unwrap_err();
    assert!(matches!(err, EngineError::ActorLimit(_)));
}

#[test]
fn core_builder_collects_ids() {
    let mut engine = Engine::new([0u16]).unwrap();
    let ids = engine
        .core(0u16)
        .add_actor(QuitsAtInit)
        .add_actor(QuitsAtInit)
        .add_actor(QuitsAtInit)
        .finish()
        .unwrap();
    assert_eq!(ids.len(), 3);
    assert!(ids.iter().all(|id| id.core() == CoreId::new(0)));

    engine.start(false).unwrap();
    engine.join().unwrap();
    assert!(!engine.has_error());
}
