use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Period of the progress animation.
pub const FRAME_PERIOD: Duration = Duration::from_millis(10);
const FRAME_MS: u64 = 10;

/// Cosmetic countdown through one practice interval.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub elapsed_ms: u64,
    pub interval_ms: u64,
    pub per_mille: u16,
}

impl Progress {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            elapsed_ms: 0,
            interval_ms,
            per_mille: 0,
        }
    }

    pub fn reset(&mut self) {
        self.elapsed_ms = 0;
        self.per_mille = 0;
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed_ms >= self.interval_ms
    }

    /// Advances one frame, snapped to the frame grid at `since_announce` when
    /// that is further along, so frames a busy runtime skipped are caught up.
    /// Returns the new per-mille value, or `None` once the interval has been
    /// fully covered and the animation should stop.
    pub fn advance_frame(&mut self, since_announce: Duration) -> Option<u16> {
        if self.is_complete() {
            return None;
        }
        let on_grid = (since_announce.as_millis() as u64 + FRAME_MS / 2) / FRAME_MS * FRAME_MS;
        self.elapsed_ms = on_grid
            .max(self.elapsed_ms + FRAME_MS)
            .min(self.interval_ms);
        let ratio = self.elapsed_ms as f64 / self.interval_ms as f64;
        self.per_mille = (ratio * 1000.0).round() as u16;
        Some(self.per_mille)
    }
}
