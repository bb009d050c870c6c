//! Process-wide registry mapping payload types to event ids and layout.
//!
//! Ids are assigned lazily: the first time a payload type is pushed,
//! registered or subscribed to, it receives the next free 16-bit tag. The
//! mapping is deterministic for the lifetime of the process and collision
//! free by construction. The registry also records everything the runtime
//! needs to handle an event without its static type: payload offset and
//! size, trivial-destructibility, and the erased destructor.

// Layer 1: Standard library imports
use std::any::TypeId;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::LazyLock;

// Layer 2: Third-party crate imports
use dashmap::DashMap;

// Layer 3: Internal module imports
use super::bucket::{buckets_for, BUCKET_BYTES};
use super::header::{EventHeader, HEADER_BYTES};
use super::Payload;
use crate::util::EventId;

static NEXT_ID: AtomicU16 = AtomicU16::new(1);

static BY_TYPE: LazyLock<DashMap<TypeId, &'static EventMeta>> = LazyLock::new(DashMap::new);
static BY_ID: LazyLock<DashMap<u16, &'static EventMeta>> = LazyLock::new(DashMap::new);

/// Layout and lifecycle facts about one registered payload type.
#[derive(Debug)]
pub struct EventMeta {
    /// The assigned type tag.
    pub id: EventId,
    /// Byte offset of the payload from the start of the event region.
    pub payload_offset: usize,
    /// Size of the payload in bytes.
    pub payload_size: usize,
    /// Whether the payload has no destructor.
    pub trivial: bool,
    /// Payload type name, for diagnostics only.
    pub type_name: &'static str,
    drop_fn: Option<unsafe fn(*mut u8)>,
}

impl EventMeta {
    /// Buckets occupied by an event of this type with `extra` trailing bytes.
    pub fn bucket_count(&self, extra: usize) -> usize {
        buckets_for(self.payload_offset + self.payload_size + extra)
    }

    /// Pointer to the payload of an event region starting at `header`.
    ///
    /// # Safety
    /// `header` must point at the start of a live event region of this type.
    pub unsafe fn payload_ptr(&self, header: *mut EventHeader) -> *mut u8 {
        (header as *mut u8).add(self.payload_offset)
    }

    pub(crate) unsafe fn drop_payload_in_place(&self, header: *mut EventHeader) {
        if let Some(f) = self.drop_fn {
            f(self.payload_ptr(header));
        }
    }
}

unsafe fn drop_erased<E>(payload: *mut u8) {
    ptr::drop_in_place(payload as *mut E);
}

/// Registry entry for a payload type, created on first use.
pub fn meta_of<E: Payload>() -> &'static EventMeta {
    let key = TypeId::of::<E>();
    if let Some(meta) = BY_TYPE.get(&key) {
        return *meta;
    }
    *BY_TYPE.entry(key).or_insert_with(|| {
        let align = mem::align_of::<E>().max(1);
        assert!(
            align <= BUCKET_BYTES,
            "event payload alignment exceeds the bucket size"
        );
        let raw = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        assert!(raw != u16::MAX, "event type id space exhausted");

        let trivial = !mem::needs_drop::<E>();
        let meta: &'static EventMeta = Box::leak(Box::new(EventMeta {
            id: EventId::from_raw(raw),
            payload_offset: HEADER_BYTES.next_multiple_of(align),
            payload_size: mem::size_of::<E>(),
            trivial,
            type_name: std::any::type_name::<E>(),
            drop_fn: if trivial { None } else { Some(drop_erased::<E>) },
        }));
        BY_ID.insert(raw, meta);
        meta
    })
}

/// The event id of a payload type, registering it if necessary.
pub fn event_id<E: Payload>() -> EventId {
    meta_of::<E>().id
}

/// Look up a registered type by id.
pub fn meta_by_id(id: EventId) -> Option<&'static EventMeta> {
    BY_ID.get(&id.raw()).map(|m| *m)
}

/// Destroy the payload of a raw event region, if it is still owned.
///
/// Runs the payload destructor when the event is alive and not trivially
/// destructible, then clears the alive flag. Calling this on an event whose
/// ownership has already been transferred (alive cleared) is a no-op, which
/// is what makes "exactly once" easy to uphold at every consumption site.
///
/// # Safety
/// `header` must point at the start of a valid event region, and no live
/// reference into the payload may exist.
pub unsafe fn drop_payload(header: *mut EventHeader) {
    let state = (*header).state;
    if !state.is_alive() {
        return;
    }
    if !state.is_trivial() {
        if let Some(meta) = meta_by_id((*header).id) {
            meta.drop_payload_in_place(header);
        }
    }
    (*header).state.set_alive(false);
}
