//! Dense resolution of the configured core ids.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use super::ids::CoreId;

const INVALID_SLOT: u16 = u16::MAX;

/// Errors raised while validating a requested core set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreSetError {
    /// No core ids were supplied.
    #[error("core set is empty")]
    Empty,

    /// The reserved broadcast id was supplied as a physical core.
    #[error("core id {0} is reserved")]
    Reserved(CoreId),
}

/// The fixed set of active cores, with raw-id to slot resolution.
///
/// User code picks arbitrary (possibly sparse) core ids; mailboxes, producer
/// slots and thread handles are indexed densely. `CoreSet` owns that mapping:
/// slot `i` is the `i`-th configured core in ascending id order, and
/// [`CoreSet::resolve`] turns a raw id back into its slot.
#[derive(Debug, Clone)]
pub struct CoreSet {
    ordered: Vec<CoreId>,
    slots: Vec<u16>,
}

impl CoreSet {
    /// Build a set from the requested ids, deduplicating and ordering them.
    pub fn new<I>(cores: I) -> Result<Self, CoreSetError>
    where
        I: IntoIterator,
        I::Item: Into<CoreId>,
    {
        let mut ordered: Vec<CoreId> = cores.into_iter().map(Into::into).collect();
        ordered.sort_unstable();
        ordered.dedup();
        if ordered.is_empty() {
            return Err(CoreSetError::Empty);
        }
        if let Some(&reserved) = ordered.iter().find(|c| c.is_broadcast()) {
            return Err(CoreSetError::Reserved(reserved));
        }

        let span = ordered[ordered.len() - 1].raw() as usize + 1;
        let mut slots = vec![INVALID_SLOT; span];
        for (slot, core) in ordered.iter().enumerate() {
            slots[core.raw() as usize] = slot as u16;
        }
        Ok(Self { ordered, slots })
    }

    /// Number of configured cores.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Whether the set is empty (never true for a constructed set).
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Slot index of a core, or `None` if the core is not configured.
    pub fn resolve(&self, core: CoreId) -> Option<usize> {
        match self.slots.get(core.raw() as usize) {
            Some(&slot) if slot != INVALID_SLOT => Some(slot as usize),
            _ => None,
        }
    }

    /// The core occupying a slot.
    ///
    /// Callers must pass `slot < len()`.
    pub fn core_at(&self, slot: usize) -> CoreId {
        self.ordered[slot]
    }

    /// Whether a core belongs to the set.
    pub fn contains(&self, core: CoreId) -> bool {
        self.resolve(core).is_some()
    }

    /// The configured cores in slot order.
    pub fn cores(&self) -> &[CoreId] {
        &self.ordered
    }
}
