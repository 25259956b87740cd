//! Ties raw mode, window-size tracking, resize signal handling, and
//! batched output writes into a single owner whose `Drop` always
//! restores the terminal, matching the original's at-exit hook that
//! ran on every exit path.

use std::os::fd::BorrowedFd;

use crate::raw_mode::RawMode;
use crate::{resize, window, TermError};

const STDIN_FD: i32 = libc::STDIN_FILENO;
const STDOUT_FD: i32 = libc::STDOUT_FILENO;

/// Owns the raw-mode/restore lifecycle and the cached usable terminal
/// dimensions (rows minus the one row reserved for the status line).
pub struct Presenter {
    raw: RawMode,
    screenrows: u16,
    screencols: u16,
}

impl Presenter {
    /// Enable raw mode, install the resize handler, and take an
    /// initial window-size reading. Fails if stdin is not a terminal
    /// or both size-detection strategies fail.
    pub fn new() -> Result<Self, TermError> {
        let mut raw = RawMode::new();
        // SAFETY: STDIN_FILENO is valid for the process lifetime.
        let stdin = unsafe { BorrowedFd::borrow_raw(STDIN_FD) };
        raw.enable(stdin)?;

        resize::install_resize_handler()?;

        let (rows, cols) = window::query_window_size(STDIN_FD, STDOUT_FD)?;
        Ok(Self {
            raw,
            screenrows: rows.saturating_sub(1),
            screencols: cols,
        })
    }

    /// Usable rows: physical rows minus the status line.
    #[must_use]
    pub const fn screen_rows(&self) -> u16 {
        self.screenrows
    }

    #[must_use]
    pub const fn screen_cols(&self) -> u16 {
        self.screencols
    }

    /// If a SIGWINCH arrived since the last call, re-query the window
    /// size and return `true`.
    pub fn refresh_if_resized(&mut self) -> Result<bool, TermError> {
        if !resize::take_resize_pending() {
            return Ok(false);
        }
        let (rows, cols) = window::query_window_size(STDIN_FD, STDOUT_FD)?;
        self.screenrows = rows.saturating_sub(1);
        self.screencols = cols;
        Ok(true)
    }

    /// Write every byte of `bytes` to stdout in as few `write` calls
    /// as the kernel allows, looping only on short writes.
    pub fn write_batch(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut written = 0;
        while written < bytes.len() {
            // SAFETY: `bytes[written..]` is a valid buffer for the call.
            let n = unsafe {
                libc::write(
                    STDOUT_FD,
                    bytes[written..].as_ptr().cast(),
                    bytes.len() - written,
                )
            };
            if n < 0 {
                return Err(std::io::Error::last_os_error());
            }
            written += n as usize;
        }
        Ok(())
    }
}

impl Drop for Presenter {
    fn drop(&mut self) {
        // SAFETY: STDIN_FILENO is valid for the process lifetime.
        let stdin = unsafe { BorrowedFd::borrow_raw(STDIN_FD) };
        self.raw.disable(stdin);
        let _ = self.write_batch(b"\x1b[?25h");
    }
}

