//! Convenience re-exports for actor authors.

pub use crate::actor::{service_id, Actor, Context, Handle, ServiceTag};
pub use crate::engine::{Engine, EngineConfig, EngineError, WaitMode};
pub use crate::event::{
    AvailableEvent, KillEvent, Payload, RequireEvent, ServiceEvent, SignalEvent, TimerEvent,
};
pub use crate::io::{IoDriver, TimerDriver, TimerHandle};
pub use crate::util::{ActorId, CoreId, EventId};
