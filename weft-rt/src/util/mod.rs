//! Identifier types and core-set resolution.
//!
//! Everything in the runtime is addressed by small, copyable ids:
//! [`CoreId`] names a scheduler, [`ActorId`] names an actor on a scheduler,
//! and [`EventId`] names an event payload type. [`CoreSet`] maps the sparse
//! user-chosen core ids onto dense slot indexes used by mailboxes and pipes.

pub mod core_set;
pub mod ids;

pub use core_set::{CoreSet, CoreSetError};
pub use ids::{ActorId, CoreId, EventId, BROADCAST_SID, SERVICE_RESERVED};
