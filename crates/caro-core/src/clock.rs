/// Outcome of advancing the countdown by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Countdown is still live; payload is the value to announce.
    Counting(u32),
    /// Countdown hit zero on this tick and stopped.
    Expired,
}

/// Per-turn countdown. Purely synchronous: the owner calls [`TurnClock::tick`]
/// once per second while the clock runs, and decides what expiry means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnClock {
    remaining_secs: u32,
    running: bool,
}

impl TurnClock {
    /// A stopped clock showing `duration_secs`.
    pub fn new(duration_secs: u32) -> Self {
        Self {
            remaining_secs: duration_secs,
            running: false,
        }
    }

    /// Begin a fresh countdown, replacing any countdown in flight.
    /// Returns the starting value so callers can announce it.
    pub fn start(&mut self, duration_secs: u32) -> u32 {
        self.remaining_secs = duration_secs;
        self.running = true;
        duration_secs
    }

    /// Halt the countdown, keeping the displayed value. Idempotent.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Halt the countdown and reload the displayed value.
    pub fn reset(&mut self, duration_secs: u32) {
        self.remaining_secs = duration_secs;
        self.running = false;
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance one second. Returns `None` when the clock is stopped.
    pub fn tick(&mut self) -> Option<Tick> {
        if !self.running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.running = false;
            Some(Tick::Expired)
        } else {
            Some(Tick::Counting(self.remaining_secs))
        }
    }
}
