//! Broadcast fan-out: per-receiver ordering, consume-on-last-use and the
//! zero-subscriber edge.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use weft_rt::prelude::*;

#[derive(Clone, Copy)]
struct Bump {
    value: u64,
}

#[derive(Clone, Copy)]
struct End;

struct ReceiverActor {
    next_expected: u64,
    sum: Arc<AtomicU64>,
    completed: Arc<AtomicUsize>,
}

impl Actor for ReceiverActor {
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        ctx.subscribe::<Bump, _>(self);
        ctx.subscribe::<End, _>(self);
        true
    }
}

impl Handle<Bump> for ReceiverActor {
    fn on(&mut self, event: &mut Bump, ctx: &mut Context<'_>) {
        let _ = ctx;
        assert_eq!(event.value, self.next_expected, "bumps observed out of order");
        self.next_expected += 1;
        self.sum.fetch_add(event.value, Ordering::Relaxed);
    }
}

impl Handle<End> for ReceiverActor {
    fn on(&mut self, _event: &mut End, ctx: &mut Context<'_>) {
        assert_eq!(self.next_expected, 11, "End arrived before all bumps");
        self.completed.fetch_add(1, Ordering::Relaxed);
        ctx.kill();
    }
}

struct BroadcasterActor;

impl Actor for BroadcasterActor {
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        for value in 1..=10u64 {
            ctx.broadcast(Bump { value });
        }
        ctx.broadcast(End);
        ctx.kill();
        true
    }
}

#[test]
fn broadcast_fan_out_in_order() {
    let sum = Arc::new(AtomicU64::new(0));
    let completed = Arc::new(AtomicUsize::new(0));

    let mut engine = Engine::new([0u16]).unwrap();
    for _ in 0..5 {
        engine
            .add_actor(
                0u16,
                ReceiverActor {
                    next_expected: 1,
                    sum: Arc::clone(&sum),
                    completed: Arc::clone(&completed),
                },
            )
            .unwrap();
    }
    engine.add_actor(0u16, BroadcasterActor).unwrap();

    engine.start(false).unwrap();
    engine.join().unwrap();

    assert_eq!(sum.load(Ordering::Relaxed), 5 * 55);
    assert_eq!(completed.load(Ordering::Relaxed), 5);
    assert!(!engine.has_error());
}

static LONER_DROPS: AtomicUsize = AtomicUsize::new(0);

struct LonerPayload;

impl Clone for LonerPayload {
    fn clone(&self) -> Self {
        LonerPayload
    }
}

impl Drop for LonerPayload {
    fn drop(&mut self) {
        LONER_DROPS.fetch_add(1, Ordering::Relaxed);
    }
}

struct LonerActor;

impl Actor for LonerActor {
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        // Nobody subscribes to LonerPayload anywhere.
        ctx.broadcast(LonerPayload);
        ctx.kill();
        true
    }
}

#[test]
fn broadcast_without_subscribers_destroys_payload() {
    let mut engine = Engine::new([0u16]).unwrap();
    engine.add_actor(0u16, LonerActor).unwrap();
    engine.start(false).unwrap();
    engine.join().unwrap();

    // One copy per core, destroyed exactly once despite zero deliveries.
    assert_eq!(LONER_DROPS.load(Ordering::Relaxed), 1);
    assert!(!engine.has_error());
}
