//! Engine-level error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::util::{CoreId, CoreSetError};

/// Errors surfaced by the engine controller.
///
/// Runtime anomalies that recover by retry (a full mailbox) stay local to
/// the pipes and never appear here; what does appear is structural: bad
/// configuration, misuse of the lifecycle, or a core that failed.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The requested core set was invalid.
    #[error("invalid core set: {0}")]
    CoreSet(#[from] CoreSetError),

    /// The named core is not part of this engine.
    #[error("core {0} is not part of this engine")]
    UnknownCore(CoreId),

    /// Start was called twice, or a pre-start operation after start.
    #[error("engine already started")]
    AlreadyStarted,

    /// A join-like operation before start.
    #[error("engine not started")]
    NotStarted,

    /// The serial id space of a core is exhausted.
    #[error("actor id space exhausted on core {0}")]
    ActorLimit(CoreId),

    /// A second service actor with the same tag on the same core.
    #[error("service {service} already registered on core {core}")]
    DuplicateService {
        /// The hosting core.
        core: CoreId,
        /// Type name of the duplicate tag.
        service: &'static str,
    },

    /// Runtime actor addition targeted a core that already exited.
    #[error("core {0} has already exited")]
    CoreExited(CoreId),

    /// A runtime construction request could not be enqueued.
    #[error("mailbox of core {0} is full")]
    MailboxFull(CoreId),

    /// A core failed initialization or panicked; see the logs.
    #[error("a core failed initialization or panicked")]
    CoreFault,

    /// An engine-misuse condition was detected while running (for example
    /// an event larger than a mailbox ring); see the logs.
    #[error("engine misuse detected")]
    Misuse,

    /// Configuration validation failed.
    #[error("configuration error: {0}")]
    Config(String),

    /// An OS thread could not be spawned.
    #[error("thread spawn failed: {0}")]
    Spawn(String),
}

impl EngineError {
    /// Whether retrying the operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::MailboxFull(_))
    }
}
