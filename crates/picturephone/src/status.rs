use std::time::Instant;

/// A status line shown on the last row of every composed frame. Kept
/// until replaced by the next `set`; there is no timer-based
/// expiry — `set_at` is recorded for completeness but nothing reads
/// it for a TTL since no scenario exercises one.
pub struct StatusMessage {
    text: String,
    set_at: Instant,
}

impl StatusMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            set_at: Instant::now(),
        }
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.set_at = Instant::now();
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn age(&self) -> std::time::Duration {
        self.set_at.elapsed()
    }
}

impl Default for StatusMessage {
    fn default() -> Self {
        Self::new("")
    }
}
