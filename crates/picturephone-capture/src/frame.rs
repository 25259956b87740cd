/// A captured frame: width, height, and a BGRA pixel buffer (4 bytes
/// per pixel, B,G,R,A order, rows contiguous, no row padding).
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub fn expected_len(width: u32, height: u32) -> usize {
        (width as usize) * (height as usize) * 4
    }

    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; Self::expected_len(width, height)],
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == Self::expected_len(self.width, self.height)
    }
}
