//! Service actors: well-known singletons with tag-derived ids.

// Layer 1: Standard library imports
use std::any::TypeId;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::LazyLock;

// Layer 2: Third-party crate imports
use dashmap::DashMap;

// Layer 3: Internal module imports
use crate::util::{ActorId, CoreId, SERVICE_RESERVED};

static NEXT_SID: AtomicU16 = AtomicU16::new(1);
static TAGS: LazyLock<DashMap<TypeId, u16>> = LazyLock::new(DashMap::new);

/// Compile-time tag naming one service.
///
/// A tag is an empty marker type; its first use allocates a service id in
/// the reserved low range, stable for the process lifetime. At most one
/// actor per (core, tag) may be registered, which makes
/// [`service_id`] a table-free lookup: anybody who knows the tag and the
/// core knows the actor id.
///
/// # Example
/// ```rust
/// use weft_rt::actor::{service_id, ServiceTag};
/// use weft_rt::util::CoreId;
///
/// struct Resolver;
/// impl ServiceTag for Resolver {}
///
/// let a = service_id::<Resolver>(CoreId::new(0));
/// let b = service_id::<Resolver>(CoreId::new(1));
/// assert_eq!(a.sid(), b.sid());
/// assert_ne!(a, b);
/// ```
pub trait ServiceTag: 'static {}

/// The reserved service id of a tag, allocating it on first use.
pub fn service_sid<Tag: ServiceTag>() -> u16 {
    let key = TypeId::of::<Tag>();
    if let Some(sid) = TAGS.get(&key) {
        return *sid;
    }
    *TAGS.entry(key).or_insert_with(|| {
        let sid = NEXT_SID.fetch_add(1, Ordering::Relaxed);
        assert!(
            sid < SERVICE_RESERVED,
            "service tag space exhausted"
        );
        sid
    })
}

/// The actor id of the tagged service on a given core.
///
/// Pure arithmetic, no table search; the id is valid as long as the
/// service instance lives on that core.
pub fn service_id<Tag: ServiceTag>(core: CoreId) -> ActorId {
    ActorId::new(core, service_sid::<Tag>())
}
