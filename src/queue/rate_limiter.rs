use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::QUEUE;

/// Trailing window the provider counts calls over.
pub const WINDOW: Duration = Duration::from_secs(QUEUE.rate.window_secs);

/// Result of asking the limiter for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Call recorded, go ahead
    Granted,
    /// The trailing window is full
    WindowFull(Duration),
    /// Too soon after the previous call
    Pacing(Duration),
}

/// Sliding-window limiter over the timestamps of issued calls.
///
/// Unlike a fixed minute bucket, the window slides with each call, so a burst
/// straddling a minute boundary still cannot exceed `max_per_window`.
/// A timestamp is only recorded when a call is actually about to be issued.
#[derive(Debug)]
pub struct RateLimiter {
    history: VecDeque<Instant>,
    max_per_window: u32,
    interval: Duration,
    margin: Duration,
    last_call: Option<Instant>,
}

impl RateLimiter {
    pub fn new(max_per_window: u32, interval: Duration) -> Self {
        Self {
            history: VecDeque::with_capacity(max_per_window as usize),
            max_per_window: max_per_window.max(1),
            interval,
            margin: Duration::from_millis(QUEUE.rate.wait_margin_ms),
            last_call: None,
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.history.front() {
            if now.saturating_duration_since(oldest) > WINDOW {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }

    /// True iff fewer than `max_per_window` calls remain in the trailing window.
    pub fn can_proceed(&mut self, now: Instant) -> bool {
        self.prune(now);
        self.history.len() < self.max_per_window as usize
    }

    /// Time until the oldest call leaves the window (plus margin), or zero
    /// when a slot is already free.
    pub fn wait_time(&mut self, now: Instant) -> Duration {
        if self.can_proceed(now) {
            return Duration::ZERO;
        }
        match self.history.front() {
            Some(&oldest) => {
                WINDOW.saturating_sub(now.saturating_duration_since(oldest)) + self.margin
            }
            None => Duration::ZERO,
        }
    }

    /// Time still owed to the pacing interval since the last admitted call.
    pub fn pacing_wait(&self, now: Instant) -> Duration {
        self.last_call
            .map(|last| self.interval.saturating_sub(now.saturating_duration_since(last)))
            .unwrap_or(Duration::ZERO)
    }

    /// Check both constraints and, if they pass, record `now` as an issued call.
    pub fn try_admit(&mut self, now: Instant) -> Admission {
        if !self.can_proceed(now) {
            return Admission::WindowFull(self.wait_time(now));
        }
        let pacing = self.pacing_wait(now);
        if !pacing.is_zero() {
            return Admission::Pacing(pacing);
        }
        self.record_call(now);
        Admission::Granted
    }

    pub fn record_call(&mut self, now: Instant) {
        self.history.push_back(now);
        self.last_call = Some(now);
    }

    pub fn calls_in_window(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.history.len()
    }

    pub fn max_per_window(&self) -> u32 {
        self.max_per_window
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let mut limiter = RateLimiter::new(3, Duration::ZERO);
        let now = Instant::now();

        for _ in 0..3 {
            assert_eq!(limiter.try_admit(now), Admission::Granted);
        }
        assert!(!limiter.can_proceed(now));
        assert_eq!(limiter.calls_in_window(now), 3);
    }

    #[test]
    fn test_wait_time_tracks_oldest_call() {
        let mut limiter = RateLimiter::new(2, Duration::ZERO);
        let start = Instant::now();

        limiter.record_call(start);
        limiter.record_call(start + Duration::from_secs(10));

        let now = start + Duration::from_secs(15);
        assert_eq!(
            limiter.wait_time(now),
            Duration::from_secs(45) + Duration::from_millis(100)
        );
        assert!(matches!(limiter.try_admit(now), Admission::WindowFull(_)));
    }

    #[test]
    fn test_wait_time_zero_when_free() {
        let mut limiter = RateLimiter::new(2, Duration::ZERO);
        let now = Instant::now();
        limiter.record_call(now);
        assert_eq!(limiter.wait_time(now), Duration::ZERO);
    }

    #[test]
    fn test_entries_pruned_after_window() {
        let mut limiter = RateLimiter::new(1, Duration::ZERO);
        let start = Instant::now();
        limiter.record_call(start);

        // exactly 60s old still counts
        assert!(!limiter.can_proceed(start + WINDOW));
        assert!(limiter.can_proceed(start + WINDOW + Duration::from_millis(1)));
        assert_eq!(
            limiter.calls_in_window(start + WINDOW + Duration::from_millis(1)),
            0
        );
    }

    #[test]
    fn test_waiting_the_reported_time_frees_a_slot() {
        let mut limiter = RateLimiter::new(1, Duration::ZERO);
        let start = Instant::now();
        limiter.record_call(start);

        let now = start + Duration::from_secs(20);
        let wait = limiter.wait_time(now);
        assert_eq!(limiter.try_admit(now + wait), Admission::Granted);
    }

    #[test]
    fn test_pacing_interval_enforced() {
        let mut limiter = RateLimiter::new(10, Duration::from_millis(1500));
        let start = Instant::now();

        assert_eq!(limiter.try_admit(start), Admission::Granted);
        assert_eq!(
            limiter.try_admit(start + Duration::from_millis(500)),
            Admission::Pacing(Duration::from_millis(1000))
        );
        assert_eq!(
            limiter.try_admit(start + Duration::from_millis(1500)),
            Admission::Granted
        );
    }

    #[test]
    fn test_denied_admission_records_nothing() {
        let mut limiter = RateLimiter::new(1, Duration::ZERO);
        let now = Instant::now();
        limiter.try_admit(now);
        limiter.try_admit(now);
        limiter.try_admit(now);
        assert_eq!(limiter.calls_in_window(now), 1);
    }
}
