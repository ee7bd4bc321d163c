use crate::time::format_countdown;

/// Remaining seconds at or below which the countdown is flagged as urgent.
pub const WARNING_THRESHOLD_SECS: u32 = 10;

/// Client-local decision countdown, decremented once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Countdown {
    remaining_secs: u32,
    active: bool,
}

impl Countdown {
    /// Arm the countdown. Re-arming while active restarts it.
    pub fn start(&mut self, seconds: u32) {
        self.remaining_secs = seconds;
        self.active = seconds > 0;
    }

    pub fn stop(&mut self) {
        self.remaining_secs = 0;
        self.active = false;
    }

    /// Advance by one second. Returns true if the state changed.
    pub fn tick(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.active = false;
        }
        true
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_warning(&self) -> bool {
        self.active && self.remaining_secs <= WARNING_THRESHOLD_SECS
    }

    pub fn display(&self) -> String {
        format_countdown(self.remaining_secs)
    }
}
