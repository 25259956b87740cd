//! Window size detection: an ioctl first, falling back to the
//! cursor-position-report dance when the ioctl is unavailable (e.g.
//! stdout redirected to a pipe that still has a controlling tty on
//! stdin).

use std::os::fd::RawFd;

use crate::TermError;

/// Query the terminal's (rows, cols). `ifd`/`ofd` are typically stdin
/// and stdout.
pub fn query_window_size(ifd: RawFd, ofd: RawFd) -> Result<(u16, u16), TermError> {
    if let Some(size) = query_via_ioctl(ofd) {
        return Ok(size);
    }
    query_via_cursor_report(ifd, ofd)
}

fn query_via_ioctl(ofd: RawFd) -> Option<(u16, u16)> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    // SAFETY: `ws` is a valid, correctly sized out-parameter for TIOCGWINSZ.
    let rc = unsafe { libc::ioctl(ofd, libc::TIOCGWINSZ, std::ptr::addr_of_mut!(ws)) };
    if rc == -1 || ws.ws_col == 0 {
        None
    } else {
        Some((ws.ws_row, ws.ws_col))
    }
}

/// Report cursor position via `ESC[6n`, parse the `ESC[row;colR`
/// response from `ifd`.
fn get_cursor_position(ifd: RawFd, ofd: RawFd) -> Result<(u16, u16), TermError> {
    write_all(ofd, b"\x1b[6n")?;

    let mut buf = [0u8; 32];
    let mut len = 0usize;
    while len < buf.len() - 1 {
        let mut byte = [0u8; 1];
        // SAFETY: `byte` is a valid 1-byte out-buffer for the duration of the call.
        let n = unsafe { libc::read(ifd, byte.as_mut_ptr().cast(), 1) };
        if n != 1 {
            break;
        }
        buf[len] = byte[0];
        len += 1;
        if byte[0] == b'R' {
            break;
        }
    }

    let text = std::str::from_utf8(&buf[..len]).map_err(|_| TermError::WindowSizeUnavailable)?;
    let rest = text
        .strip_prefix("\x1b[")
        .ok_or(TermError::WindowSizeUnavailable)?;
    let rest = rest.trim_end_matches('R');
    let mut parts = rest.splitn(2, ';');
    let rows: u16 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or(TermError::WindowSizeUnavailable)?;
    let cols: u16 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or(TermError::WindowSizeUnavailable)?;
    Ok((rows, cols))
}

fn query_via_cursor_report(ifd: RawFd, ofd: RawFd) -> Result<(u16, u16), TermError> {
    let (orig_row, orig_col) = get_cursor_position(ifd, ofd)?;
    write_all(ofd, b"\x1b[999C\x1b[999B")?;
    let size = get_cursor_position(ifd, ofd)?;
    let restore = format!("\x1b[{orig_row};{orig_col}H");
    let _ = write_all(ofd, restore.as_bytes());
    Ok(size)
}

fn write_all(fd: RawFd, bytes: &[u8]) -> Result<(), TermError> {
    let mut written = 0;
    while written < bytes.len() {
        // SAFETY: `bytes[written..]` is a valid buffer for the duration of the call.
        let n = unsafe {
            libc::write(
                fd,
                bytes[written..].as_ptr().cast(),
                bytes.len() - written,
            )
        };
        if n < 0 {
            return Err(TermError::WindowSizeUnavailable);
        }
        written += n as usize;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ioctl_query_rejects_zero_columns() {
        // /dev/null is not a tty; the ioctl should fail or report no columns.
        let file = std::fs::File::open("/dev/null").unwrap();
        assert!(query_via_ioctl(std::os::fd::AsRawFd::as_raw_fd(&file)).is_none());
    }
}
