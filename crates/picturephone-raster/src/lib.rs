//! Nearest-neighbor rasterizer.
//!
//! Resamples an arbitrary source frame onto an arbitrary terminal
//! region, converts to luminance, normalizes contrast per frame against
//! the destination grid's own min/max, and maps each sample to a glyph
//! from a [`DensityRamp`]. Output is appended to a caller-owned buffer
//! as one batch of cursor-move-and-glyph bytes, never written directly
//! to a terminal — the presenter flushes it in one `write`.

use picturephone_ramp::DensityRamp;

/// Luminance from a BGRA pixel: byte 0 = B, 1 = G, 2 = R, 3 = A.
#[inline]
#[must_use]
pub fn luminance_bgra(pixel: &[u8]) -> u8 {
    let b = u32::from(pixel[0]);
    let g = u32::from(pixel[1]);
    let r = u32::from(pixel[2]);
    (((r * 77) + (g * 150) + (b * 29)) >> 8) as u8
}

/// Append `bytes` to `buf`, reserving capacity first. If the
/// reservation fails, the buffer is left exactly as it was and the
/// append is dropped — callers render a partial or skipped frame
/// rather than aborting the session.
fn try_append(buf: &mut Vec<u8>, bytes: &[u8]) -> bool {
    if buf.try_reserve(bytes.len()).is_err() {
        return false;
    }
    buf.extend_from_slice(bytes);
    true
}

fn cursor_move(buf: &mut Vec<u8>, row_1based: i32, col_1based: i32) -> bool {
    try_append(buf, format!("\x1b[{row_1based};{col_1based}H").as_bytes())
}

/// Destination-grid nearest-neighbor sample index for one axis.
#[inline]
fn sample_index(dst: usize, dst_len: usize, src_len: usize, mirror_this_axis: bool) -> usize {
    let raw = if mirror_this_axis {
        (dst_len - 1 - dst) * src_len / dst_len
    } else {
        dst * src_len / dst_len
    };
    raw.min(src_len - 1)
}

/// Two-pass normalize-and-emit shared by [`render_luma`] and
/// [`render_bgra`]. `sample` returns the luminance at a given source
/// `(ix, iy)`.
fn render_with<F: Fn(usize, usize) -> u8>(
    out: &mut Vec<u8>,
    ramp: &DensityRamp,
    sw: u32,
    sh: u32,
    dst_x: i32,
    dst_y: i32,
    dw: i32,
    dh: i32,
    mirror: bool,
    sample: F,
) {
    if dw <= 0 || dh <= 0 {
        return;
    }
    let dw = dw as usize;
    let dh = dh as usize;
    let sw = sw as usize;
    let sh = sh as usize;
    if sw == 0 || sh == 0 {
        return;
    }

    // First pass: per-frame min/max over the destination grid.
    let mut min = u8::MAX;
    let mut max = 0u8;
    for y in 0..dh {
        let iy = sample_index(y, dh, sh, false);
        for x in 0..dw {
            let ix = sample_index(x, dw, sw, mirror);
            let v = sample(ix, iy);
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
    }
    let range: u32 = if max == min { 1 } else { u32::from(max - min) };
    let ramp_len = ramp.len();

    // Second pass: emit one cursor move per row, then glyphs.
    for y in 0..dh {
        let iy = sample_index(y, dh, sh, false);
        let row = (y as i32) + dst_y + 1;
        let col = dst_x + 1;
        if !cursor_move(out, row, col) {
            return;
        }
        for x in 0..dw {
            let ix = sample_index(x, dw, sw, mirror);
            let v = sample(ix, iy);
            let idx = (u32::from(v) - u32::from(min)) * (ramp_len as u32 - 1) / range;
            let idx = (idx as usize).min(ramp_len - 1);
            if !try_append(out, ramp.glyph(idx)) {
                return;
            }
        }
    }
}

/// Render a single-channel luminance source (one byte per cell, no
/// alpha) onto the destination region, appending to `out`.
pub fn render_luma(
    out: &mut Vec<u8>,
    ramp: &DensityRamp,
    source_luma: &[u8],
    sw: u32,
    sh: u32,
    dst_x: i32,
    dst_y: i32,
    dw: i32,
    dh: i32,
    mirror: bool,
) {
    let sw_u = sw as usize;
    render_with(
        out, ramp, sw, sh, dst_x, dst_y, dw, dh, mirror,
        |ix, iy| source_luma[iy * sw_u + ix],
    );
}

/// Render a BGRA source onto the destination region, computing
/// luminance per sample, appending to `out`.
pub fn render_bgra(
    out: &mut Vec<u8>,
    ramp: &DensityRamp,
    source_bgra: &[u8],
    sw: u32,
    sh: u32,
    dst_x: i32,
    dst_y: i32,
    dw: i32,
    dh: i32,
    mirror: bool,
) {
    let sw_u = sw as usize;
    render_with(out, ramp, sw, sh, dst_x, dst_y, dw, dh, mirror, |ix, iy| {
        let offset = (iy * sw_u + ix) * 4;
        luminance_bgra(&source_bgra[offset..offset + 4])
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> DensityRamp {
        let s: String = (b'0'..b'0' + n as u8).map(char::from).collect();
        DensityRamp::parse(&s).unwrap()
    }

    fn count_cursor_moves(buf: &[u8]) -> usize {
        buf.windows(2).filter(|w| w == b"\x1b[").count()
    }

    /// Split a rendered buffer into the glyph bytes of each row, skipping
    /// the `ESC[row;colH` prefixes.
    fn extract_rows(buf: &[u8]) -> Vec<&[u8]> {
        let mut rows = Vec::new();
        let mut pos = 0;
        while let Some(rel) = buf[pos..].iter().position(|&b| b == 0x1b) {
            let start = pos + rel;
            let h = buf[start..].iter().position(|&b| b == b'H').unwrap() + start;
            let next_esc = buf[h + 1..]
                .iter()
                .position(|&b| b == 0x1b)
                .map(|r| h + 1 + r)
                .unwrap_or(buf.len());
            rows.push(&buf[h + 1..next_esc]);
            pos = next_esc;
        }
        rows
    }

    #[test]
    fn zero_or_negative_dims_emit_nothing() {
        let ramp = ramp(4);
        let src = vec![0u8; 16];
        let mut out = Vec::new();
        render_luma(&mut out, &ramp, &src, 4, 4, 0, 0, 0, 5, false);
        assert!(out.is_empty());
        render_luma(&mut out, &ramp, &src, 4, 4, 0, 0, 5, -1, false);
        assert!(out.is_empty());
    }

    #[test]
    fn property_one_shape_and_range() {
        let ramp = ramp(6);
        // 4x4 gradient source, increasing left to right and top to bottom.
        let sw = 4u32;
        let sh = 4u32;
        let mut src = vec![0u8; 16];
        for y in 0..4 {
            for x in 0..4 {
                src[y * 4 + x] = ((x + y) * 20) as u8;
            }
        }
        for mirror in [false, true] {
            let mut out = Vec::new();
            render_luma(&mut out, &ramp, &src, sw, sh, 0, 0, 10, 5, mirror);
            assert_eq!(count_cursor_moves(&out), 5);
            let rows = extract_rows(&out);
            assert_eq!(rows.len(), 5);
            for row in rows {
                assert_eq!(row.len(), 10);
            }
        }
    }

    #[test]
    fn uniform_source_yields_index_zero() {
        let ramp = ramp(6);
        let src = vec![128u8; 16];
        let mut out = Vec::new();
        render_luma(&mut out, &ramp, &src, 4, 4, 0, 0, 3, 3, false);
        // All glyphs should be ramp.glyph(0) since max == min.
        let expected_glyph = ramp.glyph(0)[0];
        for row in extract_rows(&out) {
            assert!(row.iter().all(|&b| b == expected_glyph));
        }
    }

    #[test]
    fn mirror_symmetry_on_symmetric_source() {
        let ramp = ramp(6);
        // Horizontally symmetric 4x2 source: row is a palindrome.
        let src: Vec<u8> = vec![10, 50, 50, 10, 20, 90, 90, 20];
        let mut normal = Vec::new();
        let mut mirrored = Vec::new();
        render_luma(&mut normal, &ramp, &src, 4, 2, 0, 0, 4, 2, false);
        render_luma(&mut mirrored, &ramp, &src, 4, 2, 0, 0, 4, 2, true);
        assert_eq!(normal, mirrored);
    }

    #[test]
    fn mirror_flips_bright_dark_on_asymmetric_source() {
        let ramp = ramp(6);
        // Left bright (high luminance), right dark (low), single row.
        let src: Vec<u8> = vec![250, 200, 50, 0];
        let mut out = Vec::new();
        render_luma(&mut out, &ramp, &src, 4, 1, 0, 0, 4, 1, true);
        // With mirror, the rightmost destination column samples the
        // leftmost (bright) source column.
        let rows = extract_rows(&out);
        let row = rows[0];
        assert!(row[row.len() - 1] >= row[0]);
    }

    #[test]
    fn luminance_formula_known_values() {
        // r=255,g=0,b=0 (BGRA: B=0,G=0,R=255,A=255) -> (255*77)>>8 = 76
        assert_eq!(luminance_bgra(&[0, 0, 255, 255]), 76);
        // Pure white
        assert_eq!(luminance_bgra(&[255, 255, 255, 255]), 255);
        // Pure black
        assert_eq!(luminance_bgra(&[0, 0, 0, 255]), 0);
    }

    proptest::proptest! {
        #[test]
        fn sample_index_always_in_bounds(dst in 0usize..200, dst_len in 1usize..200, src_len in 1usize..200, mirror in proptest::bool::ANY) {
            let dst = dst % dst_len;
            let idx = sample_index(dst, dst_len, src_len, mirror);
            proptest::prop_assert!(idx < src_len);
        }
    }
}
