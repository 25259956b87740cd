//! Composes one append buffer per displayed frame: hide cursor, home,
//! rendered glyphs, then the status row — written to the terminal in
//! a single `write_batch` call to avoid tearing.

use picturephone_capture::Frame;
use picturephone_ramp::DensityRamp;

use crate::config::View;
use crate::status::StatusMessage;

const HIDE_CURSOR: &[u8] = b"\x1b[?25l";
const CURSOR_HOME: &[u8] = b"\x1b[H";

/// A previously received peer frame: dimensions plus luminance bytes,
/// row-major, one byte per cell.
#[derive(Debug, Clone)]
pub struct PeerFrame {
    pub width: u8,
    pub height: u8,
    pub luma: Vec<u8>,
}

impl PeerFrame {
    #[must_use]
    pub fn from_picture(width: u8, height: u8, luma: Vec<u8>) -> Self {
        Self {
            width,
            height,
            luma,
        }
    }
}

fn append_status(out: &mut Vec<u8>, status: &StatusMessage, row_1based: i32, cols: u16) {
    out.extend_from_slice(format!("\x1b[{row_1based};1H\x1b[0K").as_bytes());
    let text = status.text();
    let max = usize::from(cols);
    let end = text
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= max)
        .last()
        .unwrap_or(0);
    out.extend_from_slice(text[..end].as_bytes());
}

/// Compose a mirror-mode frame: the local camera only, mirrored,
/// filling the whole usable screen.
pub fn compose_mirror(
    ramp: &DensityRamp,
    frame: &Frame,
    screencols: u16,
    screenrows: u16,
    status: &StatusMessage,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(HIDE_CURSOR);
    out.extend_from_slice(CURSOR_HOME);
    if screencols > 0 && screenrows > 0 {
        picturephone_raster::render_bgra(
            &mut out,
            ramp,
            &frame.pixels,
            frame.width,
            frame.height,
            0,
            0,
            i32::from(screencols),
            i32::from(screenrows),
            true,
        );
    }
    append_status(&mut out, status, i32::from(screenrows) + 1, screencols);
    out
}

/// Compose a network-session frame combining the peer's luminance
/// frame and the local camera, laid out per `view`.
#[allow(clippy::too_many_arguments)]
pub fn compose_session(
    ramp: &DensityRamp,
    view: View,
    peer: Option<&PeerFrame>,
    local: Option<&Frame>,
    screencols: u16,
    screenrows: u16,
    status: &StatusMessage,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(HIDE_CURSOR);
    out.extend_from_slice(CURSOR_HOME);

    if screencols > 0 && screenrows > 0 {
        match view {
            View::Pip => compose_pip(&mut out, ramp, peer, local, screencols, screenrows),
            View::Split => compose_split(&mut out, ramp, peer, local, screencols, screenrows),
        }
    }

    append_status(&mut out, status, i32::from(screenrows) + 1, screencols);
    out
}

fn compose_pip(
    out: &mut Vec<u8>,
    ramp: &DensityRamp,
    peer: Option<&PeerFrame>,
    local: Option<&Frame>,
    screencols: u16,
    screenrows: u16,
) {
    if let Some(peer) = peer {
        picturephone_raster::render_luma(
            out,
            ramp,
            &peer.luma,
            u32::from(peer.width),
            u32::from(peer.height),
            0,
            0,
            i32::from(screencols),
            i32::from(screenrows),
            true,
        );
    }
    if let Some(local) = local {
        let pip_w = (screencols / 4).max(10);
        let pip_h = (screenrows / 4).max(5);
        let pip_x = i32::from(screencols) - i32::from(pip_w) - 2;
        let pip_y = i32::from(screenrows) - i32::from(pip_h) - 2;
        picturephone_raster::render_bgra(
            out,
            ramp,
            &local.pixels,
            local.width,
            local.height,
            pip_x,
            pip_y,
            i32::from(pip_w),
            i32::from(pip_h),
            true,
        );
    }
}

fn compose_split(
    out: &mut Vec<u8>,
    ramp: &DensityRamp,
    peer: Option<&PeerFrame>,
    local: Option<&Frame>,
    screencols: u16,
    screenrows: u16,
) {
    let left_w = screencols / 2;
    let right_w = screencols - left_w;

    if let Some(peer) = peer {
        picturephone_raster::render_luma(
            out,
            ramp,
            &peer.luma,
            u32::from(peer.width),
            u32::from(peer.height),
            0,
            0,
            i32::from(left_w),
            i32::from(screenrows),
            true,
        );
    }
    if let Some(local) = local {
        picturephone_raster::render_bgra(
            out,
            ramp,
            &local.pixels,
            local.width,
            local.height,
            i32::from(left_w),
            0,
            i32::from(right_w),
            i32::from(screenrows),
            true,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> DensityRamp {
        DensityRamp::parse("ascii-default").unwrap()
    }

    #[test]
    fn compose_mirror_skips_render_on_zero_size() {
        let frame = Frame::blank(4, 4);
        let status = StatusMessage::new("hi");
        let out = compose_mirror(&ramp(), &frame, 0, 10, &status);
        // Hide cursor + home + status row only, no glyph rows.
        assert!(out.starts_with(HIDE_CURSOR));
    }

    #[test]
    fn compose_session_includes_status_text() {
        let status = StatusMessage::new("connected");
        let out = compose_session(&ramp(), View::Pip, None, None, 20, 10, &status);
        assert!(out
            .windows(b"connected".len())
            .any(|w| w == b"connected"));
    }

    #[test]
    fn status_truncation_does_not_split_a_multibyte_char() {
        // "█" is 3 bytes; a column budget landing mid-glyph must not panic
        // and must not emit a truncated byte sequence.
        let mut out = Vec::new();
        let status = StatusMessage::new("██");
        append_status(&mut out, &status, 1, 4);
        assert!(std::str::from_utf8(&out).is_ok());
    }
}
