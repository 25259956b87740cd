//! SIGWINCH handling. The signal handler itself may only touch
//! async-signal-safe state, so it sets a flag; the main loop polls and
//! clears it once per iteration (matching `handleSigWinCh`'s role of
//! scheduling a `updateWindowSize` refresh rather than doing it inline).

use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::TermError;

static RESIZE_PENDING: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigwinch(_: libc::c_int) {
    RESIZE_PENDING.store(true, Ordering::SeqCst);
}

/// Install the SIGWINCH handler. Safe to call more than once.
pub fn install_resize_handler() -> Result<(), TermError> {
    let action = SigAction::new(
        SigHandler::Handler(on_sigwinch),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: `on_sigwinch` only stores to an atomic, which is
    // async-signal-safe.
    unsafe { signal::sigaction(Signal::SIGWINCH, &action) }.map_err(TermError::Signal)?;
    Ok(())
}

/// Return `true` and clear the flag if a resize was observed since the
/// last call.
pub fn take_resize_pending() -> bool {
    RESIZE_PENDING.swap(false, Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_resize_pending_clears_flag() {
        RESIZE_PENDING.store(true, Ordering::SeqCst);
        assert!(take_resize_pending());
        assert!(!take_resize_pending());
    }
}
