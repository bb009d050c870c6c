//! Smallest complete engine: one actor that messages itself and leaves.
//!
//! Run with `cargo run --example starter`.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use tracing::info;

// Layer 3: Internal module imports
use weft_rt::prelude::*;

struct MyEvent {
    data: i32,
    container: Vec<i32>,
}

struct MyActor;

impl Actor for MyActor {
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        ctx.subscribe::<MyEvent, _>(self);
        ctx.register_callback();

        // Send an event to myself and keep the reference to finish
        // filling it in.
        let me = ctx.id();
        let event = ctx.push(
            me,
            MyEvent {
                data: 1337,
                container: Vec::new(),
            },
        );
        event.container.push(7331);

        // Chained pushes into the same pipe.
        ctx.to(me)
            .push(MyEvent {
                data: 0,
                container: Vec::new(),
            })
            .push(MyEvent {
                data: 7331,
                container: vec![1, 2, 3],
            });
        true
    }

    fn on_callback(&mut self, ctx: &mut Context<'_>) {
        let _ = ctx; // runs once per core tick
    }
}

impl Handle<MyEvent> for MyActor {
    fn on(&mut self, event: &mut MyEvent, ctx: &mut Context<'_>) {
        info!(
            actor = %ctx.id(),
            data = event.data,
            dynamic = ?event.container,
            "received MyEvent"
        );
        if event.data == 7331 {
            // Last of the three: time to go.
            ctx.kill();
        }
    }
}

fn main() -> Result<(), EngineError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut engine = Engine::new([0u16])?;
    engine.add_actor(0u16, MyActor)?;

    engine.start(false)?; // the calling thread becomes core 0
    engine.join()
}
