//! Density ramp parsing.
//!
//! A density ramp is an ordered sequence of glyphs from darkest to
//! lightest, used by the rasterizer to map a luminance sample to
//! something printable. Glyphs may be multi-byte UTF-8 scalars; the
//! parser segments a spec string by leading-byte pattern rather than
//! relying on the spec string already being validated UTF-8, so it
//! tolerates a stray invalid lead byte by treating it as its own
//! one-byte glyph.

use thiserror::Error;

/// The built-in ASCII density ramp: `" .x?A@"`.
pub const ASCII_DEFAULT: &str = " .x?A@";

/// The built-in Unicode density ramp: `" .x?▂▄▆█"`.
pub const UNICODE_DEFAULT: &str = " .x?▂▄▆█";

const ASCII_SENTINEL: &str = "ascii-default";
const UNICODE_SENTINEL: &str = "unicode-default";

/// Errors from parsing a density ramp spec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RampError {
    /// The spec produced zero glyphs.
    #[error("density ramp spec produced no glyphs")]
    Empty,
}

/// An ordered, immutable sequence of glyphs from darkest (index 0) to
/// lightest (last index).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DensityRamp {
    glyphs: Vec<Box<[u8]>>,
}

impl DensityRamp {
    /// Number of glyphs in the ramp.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Never empty for a successfully parsed ramp, but implemented for
    /// clippy's `len_without_is_empty`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// The glyph bytes at `index`.
    #[must_use]
    pub fn glyph(&self, index: usize) -> &[u8] {
        &self.glyphs[index]
    }

    /// Parse a density ramp spec.
    ///
    /// `spec` may be the sentinel `"ascii-default"`, the sentinel
    /// `"unicode-default"`, or a literal glyph string.
    ///
    /// # Errors
    ///
    /// Returns [`RampError::Empty`] if the spec parses to zero glyphs
    /// (only possible for an empty literal string).
    pub fn parse(spec: &str) -> Result<Self, RampError> {
        let literal = match spec {
            ASCII_SENTINEL => ASCII_DEFAULT,
            UNICODE_SENTINEL => UNICODE_DEFAULT,
            other => other,
        };

        let glyphs = segment_utf8_tolerant(literal.as_bytes());
        if glyphs.is_empty() {
            return Err(RampError::Empty);
        }

        Ok(Self { glyphs })
    }

    /// Pick [`UNICODE_DEFAULT`] if `LANG` or `LC_ALL` contains `UTF-8`
    /// or `utf8` (case-sensitive substring match), else [`ASCII_DEFAULT`].
    #[must_use]
    pub fn auto_detect() -> Self {
        let is_utf8 = |v: &str| v.contains("UTF-8") || v.contains("utf8");
        let lang_utf8 = std::env::var("LANG").map(|v| is_utf8(&v)).unwrap_or(false);
        let lc_all_utf8 = std::env::var("LC_ALL")
            .map(|v| is_utf8(&v))
            .unwrap_or(false);

        let spec = if lang_utf8 || lc_all_utf8 {
            UNICODE_SENTINEL
        } else {
            ASCII_SENTINEL
        };

        // Both defaults are non-empty literals; this can never fail.
        Self::parse(spec).expect("built-in density ramp default must parse")
    }
}

/// Segment a byte string into glyphs by leading-byte pattern,
/// tolerating an invalid lead byte by treating it as a one-byte glyph.
fn segment_utf8_tolerant(bytes: &[u8]) -> Vec<Box<[u8]>> {
    let mut glyphs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let lead = bytes[i];
        let width = if lead & 0x80 == 0 {
            1
        } else if lead & 0xE0 == 0xC0 {
            2
        } else if lead & 0xF0 == 0xE0 {
            3
        } else if lead & 0xF8 == 0xF0 {
            4
        } else {
            1
        };
        let end = (i + width).min(bytes.len());
        glyphs.push(bytes[i..end].to_vec().into_boxed_slice());
        i = end;
    }
    glyphs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_default_sentinel() {
        let ramp = DensityRamp::parse("ascii-default").unwrap();
        assert_eq!(ramp.len(), 6);
        assert_eq!(ramp.glyph(0), b" ");
        assert_eq!(ramp.glyph(5), b"@");
    }

    #[test]
    fn unicode_default_sentinel() {
        let ramp = DensityRamp::parse("unicode-default").unwrap();
        assert_eq!(ramp.len(), 8);
        assert_eq!(ramp.glyph(0), b" ");
        assert_eq!(ramp.glyph(7), "█".as_bytes());
    }

    #[test]
    fn literal_ascii_glyphs() {
        let ramp = DensityRamp::parse(".:-=+*#%@").unwrap();
        assert_eq!(ramp.len(), 9);
    }

    #[test]
    fn literal_with_multibyte_glyphs() {
        let ramp = DensityRamp::parse(" ░▒▓█").unwrap();
        assert_eq!(ramp.len(), 5);
        assert_eq!(ramp.glyph(0), b" ");
        assert_eq!(ramp.glyph(1), "░".as_bytes());
        assert_eq!(ramp.glyph(4), "█".as_bytes());
    }

    #[test]
    fn empty_spec_is_error() {
        assert_eq!(DensityRamp::parse(""), Err(RampError::Empty));
    }

    #[test]
    fn invalid_lead_byte_is_tolerated_as_one_byte() {
        let glyphs = segment_utf8_tolerant(&[0xFF, b'a']);
        assert_eq!(glyphs.len(), 2);
        assert_eq!(&*glyphs[0], &[0xFF]);
        assert_eq!(&*glyphs[1], b"a");
    }

    // Property 3: concatenating all parsed glyphs in order yields the
    // original input byte sequence.
    proptest::proptest! {
        #[test]
        fn round_trip_concatenation(s in "\\PC{1,40}") {
            if s.is_empty() || s == ASCII_SENTINEL || s == UNICODE_SENTINEL {
                return Ok(());
            }
            let ramp = DensityRamp::parse(&s).unwrap();
            let mut joined = Vec::new();
            for i in 0..ramp.len() {
                joined.extend_from_slice(ramp.glyph(i));
            }
            proptest::prop_assert_eq!(joined, s.into_bytes());
        }
    }
}
