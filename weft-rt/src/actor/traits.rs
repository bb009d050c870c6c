//! Core actor traits.

// Layer 1: Standard library imports
use std::any::Any;

// Layer 2: Third-party crate imports
use tracing::warn;

// Layer 3: Internal module imports
use super::context::Context;
use crate::event::{EventHeader, Payload};

/// A unit of state owned by exactly one virtual core.
///
/// Actors never run concurrently with themselves: every lifecycle method
/// and event handler executes on the hosting core's thread, to completion,
/// with exclusive access to the actor's state. All interaction with the
/// rest of the runtime goes through the [`Context`] passed into each call.
///
/// Implement [`Handle<E>`](super::Handle) for every event type the actor
/// consumes and subscribe to it in [`Actor::on_init`].
///
/// # Example
///
/// ```rust,ignore
/// use weft_rt::prelude::*;
///
/// #[derive(Clone, Copy)]
/// struct Ping { ttl: u32 }
///
/// struct PingActor { peer: ActorId }
///
/// impl Actor for PingActor {
///     fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
///         ctx.subscribe::<Ping, _>(self);
///         ctx.push(self.peer, Ping { ttl: 16 });
///         true
///     }
/// }
///
/// impl Handle<Ping> for PingActor {
///     fn on(&mut self, event: &mut Ping, ctx: &mut Context<'_>) {
///         if event.ttl == 0 {
///             ctx.kill();
///         } else {
///             ctx.reply(event);
///         }
///     }
/// }
/// ```
pub trait Actor: Any + Send {
    /// Called once, on the hosting core, before the actor receives any
    /// event. Returning `false` aborts the addition: the actor is dropped
    /// and, during engine startup, the whole engine faults.
    ///
    /// This is the place to subscribe to events, register the per-tick
    /// callback, and seed initial traffic.
    fn on_init(&mut self, ctx: &mut Context<'_>) -> bool {
        let _ = ctx;
        true
    }

    /// Invoked once per scheduler tick, but only after
    /// [`Context::register_callback`] was called.
    fn on_callback(&mut self, ctx: &mut Context<'_>) {
        let _ = ctx;
    }

    /// Fallback for events with no registered handler.
    ///
    /// The default logs and drops; the payload destructor is run by the
    /// dispatcher afterwards.
    fn on_unhandled(&mut self, header: &EventHeader, ctx: &mut Context<'_>) {
        warn!(
            actor = %ctx.id(),
            event = %header.id,
            source = %header.source,
            "received event with no registered handler"
        );
    }
}

/// Typed event sink of an actor.
///
/// The dispatcher recovers `E` from the raw event region and borrows it to
/// the handler; the region itself stays owned by the runtime. To pass the
/// event on, use [`Context::reply`] or [`Context::forward`] from inside the
/// handler.
pub trait Handle<E: Payload>: Actor {
    /// Deliver one event.
    fn on(&mut self, event: &mut E, ctx: &mut Context<'_>);
}
