//! Service actors: table-free id lookup and service event round-trips.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

// Layer 3: Internal module imports
use weft_rt::actor::service_sid;
use weft_rt::prelude::*;

struct TagA;
impl ServiceTag for TagA {}

#[derive(Clone, Copy)]
struct Ping;

struct LookupService {
    got_ping: Arc<AtomicBool>,
}

impl Actor for LookupService {
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        ctx.subscribe::<Ping, _>(self);
        true
    }
}

impl Handle<Ping> for LookupService {
    fn on(&mut self, _event: &mut Ping, ctx: &mut Context<'_>) {
        assert_eq!(ctx.id().sid(), service_sid::<TagA>());
        self.got_ping.store(true, Ordering::Relaxed);
        ctx.kill();
    }
}

struct CheckerActor;

impl Actor for CheckerActor {
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        // Resolve without any table search and fire.
        let service = service_id::<TagA>(CoreId::new(0));
        assert!(service.is_service());
        ctx.push(service, Ping);
        ctx.kill();
        true
    }
}

#[test]
fn service_lookup_across_cores() {
    let got_ping = Arc::new(AtomicBool::new(false));

    let mut engine = Engine::new([0u16, 1]).unwrap();
    engine
        .add_service::<TagA, _>(
            0u16,
            LookupService {
                got_ping: Arc::clone(&got_ping),
            },
        )
        .unwrap();
    engine.add_actor(1u16, CheckerActor).unwrap();

    engine.start(true).unwrap();
    engine.join().unwrap();

    assert!(got_ping.load(Ordering::Relaxed));
    assert!(!engine.has_error());
}

#[test]
fn duplicate_service_rejected() {
    let got_ping = Arc::new(AtomicBool::new(false));
    let mut engine = Engine::new([0u16]).unwrap();
    engine
        .add_service::<TagA, _>(
            0u16,
            LookupService {
                got_ping: Arc::clone(&got_ping),
            },
        )
        .unwrap();
    let err = engine
        .add_service::<TagA, _>(
            0u16,
            LookupService {
                got_ping: Arc::clone(&got_ping),
            },
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateService { .. }));
}

// --- service event round-trip -------------------------------------------

struct TagSum;
impl ServiceTag for TagSum {}

#[derive(Clone, Copy)]
struct SumBody {
    data: [u8; 32],
    sum: u32,
}

impl SumBody {
    fn new() -> Self {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let mut data = [0u8; 32];
        let mut sum = 0u32;
        for byte in data.iter_mut() {
            *byte = rng.gen::<u8>();
            sum += *byte as u32;
        }
        Self { data, sum }
    }

    fn checksum_ok(&self) -> bool {
        let computed: u32 = self.data.iter().map(|b| *b as u32).sum();
        computed == self.sum
    }
}

/// Return-leg tag of the sum round-trip; same layout as the request.
#[repr(transparent)]
struct SumReply(ServiceEvent<SumBody>);

struct SumService {
    served: Arc<AtomicU32>,
}

impl Actor for SumService {
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        ctx.subscribe::<ServiceEvent<SumBody>, _>(self);
        true
    }
}

impl Handle<ServiceEvent<SumBody>> for SumService {
    fn on(&mut self, event: &mut ServiceEvent<SumBody>, ctx: &mut Context<'_>) {
        assert!(event.body.checksum_ok());
        for byte in event.body.data.iter_mut() {
            *byte = byte.wrapping_mul(2);
        }
        event.body.sum = event.body.data.iter().map(|b| *b as u32).sum();
        self.served.fetch_add(1, Ordering::Relaxed);
        // The drain already primed the header for the return trip.
        ctx.reply(event);
        ctx.kill();
    }
}

struct SumRequester {
    answered: Arc<AtomicBool>,
}

impl Actor for SumRequester {
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        ctx.subscribe::<SumReply, _>(self);
        let service = service_id::<TagSum>(CoreId::new(0));
        ctx.push_service::<SumBody, SumReply>(service, SumBody::new());
        true
    }
}

impl Handle<SumReply> for SumRequester {
    fn on(&mut self, event: &mut SumReply, ctx: &mut Context<'_>) {
        assert!(event.0.body.checksum_ok());
        self.answered.store(true, Ordering::Relaxed);
        ctx.kill();
    }
}

#[test]
fn service_event_round_trip() {
    let served = Arc::new(AtomicU32::new(0));
    let answered = Arc::new(AtomicBool::new(false));

    let mut engine = Engine::new([0u16, 1]).unwrap();
    engine
        .add_service::<TagSum, _>(
            0u16,
            SumService {
                served: Arc::clone(&served),
            },
        )
        .unwrap();
    engine
        .add_actor(
            1u16,
            SumRequester {
                answered: Arc::clone(&answered),
            },
        )
        .unwrap();

    engine.start(true).unwrap();
    engine.join().unwrap();

    assert_eq!(served.load(Ordering::Relaxed), 1);
    assert!(answered.load(Ordering::Relaxed));
    assert!(!engine.has_error());
}
