//! Consecutive-failure counter that pauses a worker during failure storms.

use std::time::Duration;

/// Default number of consecutive failures that triggers a cooldown.
pub const DEFAULT_TRIGGER: u32 = 5;
/// Default cooldown length.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// Per-worker failure tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureCooldown {
    trigger: u32,
    cooldown: Duration,
    consecutive: u32,
}

impl Default for FailureCooldown {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGGER, DEFAULT_COOLDOWN)
    }
}

impl FailureCooldown {
    /// Tracker that cools down for `cooldown` after `trigger` failures in a row.
    #[must_use]
    pub fn new(trigger: u32, cooldown: Duration) -> Self {
        Self {
            trigger: trigger.max(1),
            cooldown,
            consecutive: 0,
        }
    }

    /// Failures seen since the last success or cooldown.
    #[must_use]
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Reset after a successful item.
    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    /// Count a failure. Returns the sleep to take when the trigger is reached;
    /// the counter resets at that point.
    pub fn record_failure(&mut self) -> Option<Duration> {
        self.consecutive += 1;
        if self.consecutive >= self.trigger {
            self.consecutive = 0;
            Some(self.cooldown)
        } else {
            None
        }
    }
}
