//! Four-core forward chain: destination rewrites at each hop, original
//! source preserved end to end.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use weft_rt::prelude::*;
use weft_rt::util::SERVICE_RESERVED;

const LAPS: u32 = 1000;

#[derive(Clone, Copy)]
struct ChainEvent {
    lap: u32,
}

/// First actor added to a core gets the first serial id.
fn first_on(core: u16) -> ActorId {
    ActorId::new(CoreId::new(core), SERVICE_RESERVED)
}

struct OriginActor {
    next_hop: ActorId,
    laps: Arc<AtomicU32>,
}

impl Actor for OriginActor {
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        ctx.subscribe::<ChainEvent, _>(self);
        ctx.push(self.next_hop, ChainEvent { lap: 0 });
        true
    }
}

impl Handle<ChainEvent> for OriginActor {
    fn on(&mut self, event: &mut ChainEvent, ctx: &mut Context<'_>) {
        // The event came the whole way around without losing its origin.
        assert_eq!(ctx.event_source().unwrap(), ctx.id());
        let laps = self.laps.fetch_add(1, Ordering::Relaxed) + 1;
        if laps == LAPS {
            for core in 1..4u16 {
                ctx.push(first_on(core), KillEvent);
            }
            ctx.kill();
        } else {
            event.lap += 1;
            ctx.forward(self.next_hop, event);
        }
    }
}

struct HopActor {
    next_hop: ActorId,
    origin: ActorId,
    hops: Arc<AtomicU32>,
}

impl Actor for HopActor {
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        ctx.subscribe::<ChainEvent, _>(self);
        true
    }
}

impl Handle<ChainEvent> for HopActor {
    fn on(&mut self, event: &mut ChainEvent, ctx: &mut Context<'_>) {
        // `forward` rewrote dest at every hop and never touched source.
        assert_eq!(ctx.event_dest().unwrap(), ctx.id());
        assert_eq!(ctx.event_source().unwrap(), self.origin);
        self.hops.fetch_add(1, Ordering::Relaxed);
        ctx.forward(self.next_hop, event);
    }
}

#[test]
fn chain_forward_thousand_laps() {
    let laps = Arc::new(AtomicU32::new(0));
    let hops: Vec<Arc<AtomicU32>> = (0..3).map(|_| Arc::new(AtomicU32::new(0))).collect();

    let mut engine = Engine::new([0u16, 1, 2, 3]).unwrap();
    let origin = first_on(0);
    for core in 1..4u16 {
        let next_hop = if core == 3 { origin } else { first_on(core + 1) };
        let id = engine
            .add_actor(
                core,
                HopActor {
                    next_hop,
                    origin,
                    hops: Arc::clone(&hops[core as usize - 1]),
                },
            )
            .unwrap();
        assert_eq!(id, first_on(core));
    }
    let id = engine
        .add_actor(
            0u16,
            OriginActor {
                next_hop: first_on(1),
                laps: Arc::clone(&laps),
            },
        )
        .unwrap();
    assert_eq!(id, origin);

    engine.start(true).unwrap();
    engine.join().unwrap();

    assert_eq!(laps.load(Ordering::Relaxed), LAPS);
    for hop in &hops {
        assert_eq!(hop.load(Ordering::Relaxed), LAPS);
    }
    assert!(!engine.has_error());
}
