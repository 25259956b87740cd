//! Terminal presenter: raw mode, window-size detection, resize
//! signal handling, and single-syscall batched writes.
//!
//! Everything here is Unix-specific and intentionally thin — the
//! rasterizer and protocol crates never touch a file descriptor
//! directly, so this is the only place that does.

mod presenter;
mod raw_mode;
mod resize;
mod window;

pub use presenter::Presenter;
pub use raw_mode::RawMode;
pub use resize::{install_resize_handler, take_resize_pending};
pub use window::query_window_size;

#[derive(Debug, thiserror::Error)]
pub enum TermError {
    #[error("standard input is not a terminal")]
    NotATerminal,
    #[error("terminal attribute call failed: {0}")]
    Termios(#[source] nix::errno::Errno),
    #[error("failed to install resize signal handler: {0}")]
    Signal(#[source] nix::errno::Errno),
    #[error("window size could not be determined")]
    WindowSizeUnavailable,
}
