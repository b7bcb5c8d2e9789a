use std::time::{Duration, Instant};

use crate::config::ProgressMode;

/// Rate limit for progress events within one attempt.
#[derive(Debug, Clone)]
pub struct ProgressGate {
    mode: ProgressMode,
    interval: Duration,
    last: Instant,
}

impl ProgressGate {
    pub fn new(mode: ProgressMode, interval: Duration) -> Self {
        Self::starting_at(mode, interval, Instant::now())
    }

    pub fn starting_at(mode: ProgressMode, interval: Duration, start: Instant) -> Self {
        Self {
            mode,
            interval,
            last: start,
        }
    }

    /// Whether a progress event should go out after a chunk. `changed` says
    /// whether the integer percentage moved.
    pub fn admit(&mut self, changed: bool, now: Instant) -> bool {
        match self.mode {
            ProgressMode::Percentage => changed,
            ProgressMode::Interval => {
                if now.duration_since(self.last) >= self.interval {
                    self.last = now;
                    true
                } else {
                    false
                }
            }
        }
    }
}
