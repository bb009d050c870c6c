//! Cross-core ping-pong: ordering, reply recycling and clean engine exit.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use weft_rt::prelude::*;

#[derive(Clone, Copy)]
struct Tiny {
    ttl: u32,
}

struct PingActor {
    peer: ActorId,
    round_trips: Arc<AtomicU32>,
}

impl Actor for PingActor {
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        ctx.subscribe::<Tiny, _>(self);
        ctx.push(self.peer, Tiny { ttl: 16 });
        true
    }
}

impl Handle<Tiny> for PingActor {
    fn on(&mut self, event: &mut Tiny, ctx: &mut Context<'_>) {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
        assert_eq!(ctx.event_source().unwrap(), self.peer);
        event.ttl -= 1;
        if event.ttl == 0 {
            ctx.push(self.peer, KillEvent);
            ctx.kill();
        } else {
            ctx.reply(event);
        }
    }
}

struct PongActor;

impl Actor for PongActor {
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        ctx.subscribe::<Tiny, _>(self);
        true
    }
}

impl Handle<Tiny> for PongActor {
    fn on(&mut self, event: &mut Tiny, ctx: &mut Context<'_>) {
        // Echo the same allocation back to its sender.
        ctx.reply(event);
    }
}

#[test]
fn ping_pong_sixteen_round_trips() {
    let round_trips = Arc::new(AtomicU32::new(0));

    let mut engine = Engine::new([0u16, 1]).unwrap();
    let pong = engine.add_actor(1u16, PongActor).unwrap();
    engine
        .add_actor(
            0u16,
            PingActor {
                peer: pong,
                round_trips: Arc::clone(&round_trips),
            },
        )
        .unwrap();

    engine.start(true).unwrap();
    engine.join().unwrap();

    assert_eq!(round_trips.load(Ordering::Relaxed), 16);
    assert!(!engine.has_error());
}
