//! Event storage layout and the process-wide event type registry.
//!
//! Every event travels as a contiguous run of cache-line [`EventBucket`]s:
//! a fixed [`EventHeader`] followed by the typed payload at a per-type
//! offset. The registry assigns each payload type a stable [`EventId`],
//! records its layout, and keeps the erased destructor used when an event is
//! consumed or dropped without static knowledge of its type.

pub mod bucket;
pub mod header;
pub mod registry;
pub mod service;
pub mod types;

pub use bucket::{buckets_for, EventBucket, BUCKET_BYTES};
pub use header::{EventHeader, EventState, HEADER_BYTES};
pub use registry::{drop_payload, event_id, meta_by_id, meta_of, EventMeta};
pub use service::ServiceEvent;
pub use types::{
    AvailableEvent, DisconnectedEvent, FileEvent, KillEvent, RequireEvent, SignalEvent,
    TimerEvent,
};

/// Marker for types that may be carried as event payloads.
///
/// Payloads move between cores as raw bytes inside bucket rings, so they must
/// be [`Send`] and own their data (`'static`). Every such type qualifies; the
/// runtime distinguishes trivially-destructible payloads from owning ones at
/// registration time via [`std::mem::needs_drop`].
pub trait Payload: Send + 'static {}

impl<T: Send + 'static> Payload for T {}
