//! Process signal latch.
//!
//! Signal handlers may do almost nothing safely, so the handler only
//! stores the signal number into an atomic. The first core slot picks the
//! latch up once per tick and turns it into a `SignalEvent` broadcast.
//! The latch is necessarily process-global (signals are), but it is inert
//! unless an engine installed handlers.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicI32, Ordering};

// Layer 2: Third-party crate imports
// (none here; nix under cfg below)

// Layer 3: Internal module imports
use super::errors::EngineError;

static PENDING: AtomicI32 = AtomicI32::new(0);

#[cfg(unix)]
extern "C" fn latch_signal(signum: nix::libc::c_int) {
    PENDING.store(signum, Ordering::Relaxed);
}

/// Install the latch handler for each requested signal.
#[cfg(unix)]
pub(crate) fn install(signals: &[i32]) -> Result<(), EngineError> {
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

    for &signum in signals {
        let signal = Signal::try_from(signum)
            .map_err(|_| EngineError::Config(format!("invalid signal number {signum}")))?;
        let action = SigAction::new(
            SigHandler::Handler(latch_signal),
            SaFlags::empty(),
            SigSet::empty(),
        );
        // Installing a handler is process-global by nature.
        unsafe { sigaction(signal, &action) }
            .map_err(|e| EngineError::Config(format!("sigaction({signal}) failed: {e}")))?;
    }
    Ok(())
}

/// No signal routing off Unix.
#[cfg(not(unix))]
pub(crate) fn install(_signals: &[i32]) -> Result<(), EngineError> {
    Ok(())
}

/// Take the latched signal, if any.
pub(crate) fn take() -> Option<i32> {
    let signum = PENDING.swap(0, Ordering::Relaxed);
    (signum != 0).then_some(signum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch_take_clears() {
        PENDING.store(2, Ordering::Relaxed);
        assert_eq!(take(), Some(2));
        assert_eq!(take(), None);
    }
}
