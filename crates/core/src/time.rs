use chrono::{DateTime, Duration, Utc};

/// Length of a quiz attempt, in seconds.
pub const EXAM_DURATION_SECS: u32 = 300;

/// Wall-clock source for session timestamps, swappable for tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    /// Returns a clock frozen at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Moves a fixed clock forward. A system clock is left alone.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Countdown of the seconds left in an attempt.
///
/// The remaining time only ever goes down, one second per tick, and stops at
/// zero. The only way back up is `reset`, which starts a new attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClock {
    duration: u32,
    remaining: u32,
}

impl SessionClock {
    #[must_use]
    pub fn new(duration_secs: u32) -> Self {
        Self {
            duration: duration_secs,
            remaining: duration_secs,
        }
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn duration(&self) -> u32 {
        self.duration
    }

    #[must_use]
    pub fn elapsed(&self) -> u32 {
        self.duration - self.remaining
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    /// Count down one second. Returns true on the tick that reaches zero.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }

    pub fn reset(&mut self) {
        self.remaining = self.duration;
    }

    /// Remaining time as `m:ss`, the way the countdown is shown to students.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}:{:02}", self.remaining / 60, self.remaining % 60)
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new(EXAM_DURATION_SECS)
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_clock_runs_five_minutes() {
        let clock = SessionClock::default();
        assert_eq!(clock.remaining(), 300);
        assert_eq!(clock.display(), "5:00");
    }

    #[test]
    fn tick_reports_expiry_once_and_floors_at_zero() {
        let mut clock = SessionClock::new(2);
        assert!(!clock.tick());
        assert!(clock.tick());
        assert!(clock.is_expired());
        assert!(!clock.tick());
        assert_eq!(clock.remaining(), 0);
        assert_eq!(clock.elapsed(), 2);
    }

    #[test]
    fn reset_restores_full_duration() {
        let mut clock = SessionClock::new(90);
        for _ in 0..31 {
            clock.tick();
        }
        assert_eq!(clock.display(), "0:59");
        clock.reset();
        assert_eq!(clock.remaining(), 90);
    }

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        clock.advance(Duration::seconds(5));
        assert_eq!(clock.now(), fixed_now() + Duration::seconds(5));
    }
}
