//! The actor abstraction: traits, the runtime handle, and service tags.

pub mod context;
pub mod service;
pub mod traits;

pub use context::{Context, EventBuilder};
pub use service::{service_id, service_sid, ServiceTag};
pub use traits::{Actor, Handle};
