//! Bridges blocking, raw-mode stdin (VMIN=0, VTIME=100ms per
//! `picturephone_term::RawMode`) into an async channel, so the
//! session and mirror loops can `select!` over it like any other
//! async source instead of polling a file descriptor by hand.

use tokio::sync::mpsc;

/// Spawn a background thread that reads stdin one byte at a time and
/// forwards each to the returned channel. The thread exits once the
/// receiver is dropped or a read error occurs.
pub fn spawn() -> mpsc::Receiver<u8> {
    let (tx, rx) = mpsc::channel(256);
    std::thread::Builder::new()
        .name("stdin-bridge".into())
        .spawn(move || {
            let mut byte = [0u8; 1];
            loop {
                // SAFETY: `byte` is a valid 1-byte buffer for the call.
                let n = unsafe { libc::read(libc::STDIN_FILENO, byte.as_mut_ptr().cast(), 1) };
                match n {
                    1 => {
                        if tx.blocking_send(byte[0]).is_err() {
                            break;
                        }
                    }
                    0 => {
                        // VTIME timeout elapsed with nothing read; loop again.
                    }
                    _ => break,
                }
            }
        })
        .expect("failed to spawn stdin bridge thread");
    rx
}
