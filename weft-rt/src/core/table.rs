//! Actor slots and the per-core actor table.
//!
//! This is the multi-event/multi-handler topology specialized for boxed
//! actors: each slot carries its own event-id dispatch table (a
//! [`Mesh`] instantiated with the context-threaded [`CoreHandler`] form),
//! the table selects slots by service-or-serial id, and broadcast walks
//! the subscription lists kept in the core state. Slots are taken out of
//! the table for the duration of a dispatch so handlers can freely spawn
//! and kill through their [`Context`].

// Layer 1: Standard library imports
use std::any::{Any, TypeId};

// Layer 2: Third-party crate imports
use rustc_hash::FxHashMap;
use tracing::error;

// Layer 3: Internal module imports
use crate::actor::context::Context;
use crate::actor::traits::{Actor, Handle};
use crate::event::{meta_of, KillEvent, Payload};
use crate::router::Mesh;

pub(crate) type BoxedActor = Box<dyn Actor>;

/// Type-erased delivery function: recovers the concrete actor and payload
/// types and invokes the typed handler.
pub(crate) type CoreHandler = unsafe fn(&mut BoxedActor, *mut u8, &mut Context<'_>);

/// Per-actor event routing: the scheduler-side instantiation of the
/// multi-event/single-handler topology.
pub(crate) type DispatchTable = Mesh<BoxedActor, CoreHandler>;

/// Monomorphized bridge from the raw dispatch path into `Handle<E>::on`.
///
/// # Safety
/// `payload` must point at a live payload of type `E`, and `actor` must hold
/// an `A` (checked, with a diagnostic on mismatch).
pub(crate) unsafe fn dispatch_trampoline<A: Handle<E>, E: Payload>(
    actor: &mut BoxedActor,
    payload: *mut u8,
    ctx: &mut Context<'_>,
) {
    let any: &mut dyn Any = &mut **actor;
    match any.downcast_mut::<A>() {
        Some(a) => a.on(&mut *(payload as *mut E), ctx),
        None => error!(
            actor = %ctx.id(),
            expected = std::any::type_name::<A>(),
            "dispatch table points at a different actor type"
        ),
    }
}

/// Default `KillEvent` handler installed into every slot.
unsafe fn kill_trampoline(_actor: &mut BoxedActor, _payload: *mut u8, ctx: &mut Context<'_>) {
    ctx.kill();
}

/// One resident actor with its dispatch state.
pub(crate) struct Slot {
    pub actor: BoxedActor,
    pub handlers: DispatchTable,
    pub alive: bool,
    pub callback: bool,
    pub actor_type: TypeId,
}

impl Slot {
    pub(crate) fn new(actor: BoxedActor, actor_type: TypeId) -> Self {
        let mut handlers = DispatchTable::new();
        handlers.subscribe_with(meta_of::<KillEvent>().id, kill_trampoline as CoreHandler);
        Self {
            actor,
            handlers,
            alive: true,
            callback: false,
            actor_type,
        }
    }
}

/// Slot storage keyed by service-or-serial id.
///
/// `take`/`restore` implement the out-of-table dispatch protocol: a taken
/// slot leaves its key behind, so the actor still counts as resident (and
/// its id stays reserved) while its handler runs.
#[derive(Default)]
pub(crate) struct ActorTable {
    slots: FxHashMap<u16, Option<Slot>>,
}

impl ActorTable {
    pub(crate) fn insert(&mut self, sid: u16, slot: Slot) -> bool {
        match self.slots.entry(sid) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(v) => {
                v.insert(Some(slot));
                true
            }
        }
    }

    pub(crate) fn take(&mut self, sid: u16) -> Option<Slot> {
        self.slots.get_mut(&sid).and_then(Option::take)
    }

    pub(crate) fn restore(&mut self, sid: u16, slot: Slot) {
        if let Some(cell) = self.slots.get_mut(&sid) {
            *cell = Some(slot);
        }
    }

    pub(crate) fn remove(&mut self, sid: u16) -> Option<Slot> {
        self.slots.remove(&sid).flatten()
    }

    pub(crate) fn contains(&self, sid: u16) -> bool {
        self.slots.contains_key(&sid)
    }

    pub(crate) fn get(&self, sid: u16) -> Option<&Slot> {
        self.slots.get(&sid).and_then(Option::as_ref)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Present (not taken) slots, in table order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (u16, &Slot)> {
        self.slots
            .iter()
            .filter_map(|(sid, slot)| slot.as_ref().map(|s| (*sid, s)))
    }
}
