//! Raw-mode enable/disable, matching the historic
//! `enableRawMode`/`disableRawMode` contract: disable input break,
//! CR-to-NL translation, parity checking and stripping, and
//! start/stop flow control; disable output post-processing; force
//! 8-bit characters; disable echo, canonical mode, extended
//! functions, and signal characters; read with a 0-byte minimum and a
//! 100ms inter-byte timer.

use std::os::fd::BorrowedFd;

use nix::sys::termios::{self, SetArg, SpecialCharacterIndices, Termios};

use crate::TermError;

/// Tracks whether raw mode is active and what to restore it to.
pub struct RawMode {
    original: Option<Termios>,
}

impl RawMode {
    #[must_use]
    pub const fn new() -> Self {
        Self { original: None }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.original.is_some()
    }

    /// Put `fd` (stdin) into raw mode. Idempotent: a second call while
    /// already enabled is a no-op. Fails if `fd` is not a terminal.
    pub fn enable(&mut self, fd: BorrowedFd<'_>) -> Result<(), TermError> {
        if self.is_enabled() {
            return Ok(());
        }
        // SAFETY: `fd` is borrowed for the duration of this isatty check only.
        if unsafe { libc::isatty(std::os::fd::AsRawFd::as_raw_fd(&fd)) } == 0 {
            return Err(TermError::NotATerminal);
        }

        let original = termios::tcgetattr(fd).map_err(TermError::Termios)?;
        let mut raw = original.clone();

        raw.input_flags.remove(
            termios::InputFlags::BRKINT
                | termios::InputFlags::ICRNL
                | termios::InputFlags::INPCK
                | termios::InputFlags::ISTRIP
                | termios::InputFlags::IXON,
        );
        raw.output_flags.remove(termios::OutputFlags::OPOST);
        raw.control_flags.insert(termios::ControlFlags::CS8);
        raw.local_flags.remove(
            termios::LocalFlags::ECHO
                | termios::LocalFlags::ICANON
                | termios::LocalFlags::IEXTEN
                | termios::LocalFlags::ISIG,
        );
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 1;

        termios::tcsetattr(fd, SetArg::TCSAFLUSH, &raw).map_err(TermError::Termios)?;
        self.original = Some(original);
        Ok(())
    }

    /// Restore the original terminal attributes. Idempotent.
    pub fn disable(&mut self, fd: BorrowedFd<'_>) {
        if let Some(original) = self.original.take() {
            let _ = termios::tcsetattr(fd, SetArg::TCSAFLUSH, &original);
        }
    }
}

impl Default for RawMode {
    fn default() -> Self {
        Self::new()
    }
}
