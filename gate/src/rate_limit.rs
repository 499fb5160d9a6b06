use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use common::clock::Clock;

const WINDOW_SECONDS: i64 = 60;

/// Per-user sliding-window limiter for tutor requests.
///
/// A true sliding window, not fixed buckets: each user's recent request
/// timestamps are kept and anything older than the trailing 60 seconds
/// is dropped before counting, so there are no burst artifacts at bucket
/// boundaries. Memory per user is bounded by the quota.
///
/// Two requests from the same user serialize on the map's per-key entry
/// guard, so concurrent calls cannot both claim the last slot.
pub struct SlidingWindowLimiter {
    clock: Arc<dyn Clock>,
    max_per_window: u32,
    window: Duration,
    requests: DashMap<Uuid, VecDeque<DateTime<Utc>>>,
}

impl SlidingWindowLimiter {
    pub fn new(clock: Arc<dyn Clock>, max_per_window: u32) -> Self {
        Self {
            clock,
            max_per_window,
            window: Duration::seconds(WINDOW_SECONDS),
            requests: DashMap::new(),
        }
    }

    /// Returns whether this request fits the user's quota, recording it
    /// if so. A denied request is not recorded, so it does not extend
    /// the window.
    pub fn allow(&self, user_id: Uuid) -> bool {
        let now = self.clock.now();
        let cutoff = now - self.window;

        let mut window = self.requests.entry(user_id).or_default();
        while window.front().is_some_and(|t| *t <= cutoff) {
            window.pop_front();
        }

        if (window.len() as u32) < self.max_per_window {
            window.push_back(now);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::clock::ManualClock;

    fn limiter(quota: u32) -> (Arc<ManualClock>, SlidingWindowLimiter) {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let limiter = SlidingWindowLimiter::new(clock.clone(), quota);
        (clock, limiter)
    }

    #[test]
    fn quota_is_exact_within_a_window() {
        let (_, limiter) = limiter(10);
        let user = Uuid::new_v4();

        for _ in 0..10 {
            assert!(limiter.allow(user));
        }
        assert!(!limiter.allow(user));
    }

    #[test]
    fn window_frees_up_after_it_slides_past() {
        let (clock, limiter) = limiter(10);
        let user = Uuid::new_v4();

        for _ in 0..10 {
            assert!(limiter.allow(user));
        }
        assert!(!limiter.allow(user));

        clock.advance(Duration::seconds(61));
        assert!(limiter.allow(user));
    }

    #[test]
    fn window_slides_rather_than_resets() {
        let (clock, limiter) = limiter(2);
        let user = Uuid::new_v4();

        assert!(limiter.allow(user)); // t = 0
        clock.advance(Duration::seconds(40));
        assert!(limiter.allow(user)); // t = 40
        assert!(!limiter.allow(user));

        // t = 65: the t=0 stamp has left the window, the t=40 one has not
        clock.advance(Duration::seconds(25));
        assert!(limiter.allow(user));
        assert!(!limiter.allow(user));
    }

    #[test]
    fn denied_requests_do_not_extend_the_window() {
        let (clock, limiter) = limiter(1);
        let user = Uuid::new_v4();

        assert!(limiter.allow(user));
        for _ in 0..5 {
            assert!(!limiter.allow(user));
            clock.advance(Duration::seconds(10));
        }
        // 61s after the only recorded request, despite the denials in between
        clock.advance(Duration::seconds(11));
        assert!(limiter.allow(user));
    }

    #[test]
    fn users_are_limited_independently() {
        let (_, limiter) = limiter(1);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        assert!(limiter.allow(first));
        assert!(!limiter.allow(first));
        assert!(limiter.allow(second));
    }
}
