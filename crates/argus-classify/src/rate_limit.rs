//! Sliding-window rate limiting for provider calls.
//!
//! All classification callers share one limiter. The capacity check and the
//! request recording happen inside a single critical section, so concurrent
//! callers cannot burst past the cap. A fixed inter-request spacing applies
//! even when under the cap to smooth burstiness.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(60);

/// Sliding 60-second-window limiter with fixed inter-request spacing.
pub struct RateLimiter {
    window: Duration,
    max_in_window: usize,
    spacing: Duration,
    state: Mutex<State>,
}

struct State {
    /// Dispatch instants still inside the window, oldest first.
    sent: VecDeque<Instant>,
    last_dispatch: Option<Instant>,
}

impl RateLimiter {
    /// Creates a limiter admitting at most `max_per_minute` requests per
    /// rolling 60 seconds, with `spacing` enforced between consecutive
    /// requests.
    #[must_use]
    pub fn new(max_per_minute: usize, spacing: Duration) -> Self {
        Self::with_window(WINDOW, max_per_minute, spacing)
    }

    /// Creates a limiter with an explicit window length.
    #[must_use]
    pub fn with_window(window: Duration, max_in_window: usize, spacing: Duration) -> Self {
        Self {
            window,
            max_in_window,
            spacing,
            state: Mutex::new(State {
                sent: VecDeque::new(),
                last_dispatch: None,
            }),
        }
    }

    /// Suspends until the caller is admitted, then records the dispatch.
    ///
    /// Waits until the oldest request in the window ages out when at
    /// capacity, and always honors the inter-request spacing. May suspend
    /// for up to roughly one full window.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();

                while state
                    .sent
                    .front()
                    .is_some_and(|&t| now.duration_since(t) >= self.window)
                {
                    state.sent.pop_front();
                }

                let spacing_wait = state
                    .last_dispatch
                    .map_or(Duration::ZERO, |t| (t + self.spacing).saturating_duration_since(now));

                if state.sent.len() < self.max_in_window && spacing_wait.is_zero() {
                    state.sent.push_back(now);
                    state.last_dispatch = Some(now);
                    return;
                }

                let window_wait = if state.sent.len() >= self.max_in_window {
                    state.sent.front().map_or(Duration::ZERO, |&t| {
                        (t + self.window).saturating_duration_since(now)
                    })
                } else {
                    Duration::ZERO
                };

                spacing_wait.max(window_wait)
            };

            // Lock released while sleeping; re-check on wake since another
            // caller may have taken the slot.
            tokio::time::sleep(wait.max(Duration::from_millis(10))).await;
        }
    }

    /// Number of dispatches currently inside the window.
    pub async fn in_flight_window(&self) -> usize {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        while state
            .sent
            .front()
            .is_some_and(|&t| now.duration_since(t) >= self.window)
        {
            state.sent.pop_front();
        }
        state.sent.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn spacing_applies_under_the_cap() {
        let limiter = RateLimiter::new(10, Duration::from_millis(1200));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(2400),
            "three spaced requests need at least 2.4s, took {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn first_acquire_is_immediate() {
        let limiter = RateLimiter::new(10, Duration::from_millis(1200));
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn fourth_and_fifth_submissions_wait_for_the_window() {
        // Cap of 3 per minute, no spacing: 5 rapid submissions — the 4th
        // and 5th must wait until the window admits them.
        let limiter = RateLimiter::new(3, Duration::ZERO);
        let start = Instant::now();

        let mut admit_times = Vec::new();
        for _ in 0..5 {
            limiter.acquire().await;
            admit_times.push(start.elapsed());
        }

        assert!(admit_times[2] < Duration::from_secs(1), "first three admit immediately");
        assert!(
            admit_times[3] >= Duration::from_secs(59),
            "4th must wait for the window, admitted at {:?}",
            admit_times[3]
        );
        assert!(
            admit_times[4] >= Duration::from_secs(59),
            "5th must wait for the window, admitted at {:?}",
            admit_times[4]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn never_more_than_cap_in_any_rolling_window() {
        let limiter = RateLimiter::new(3, Duration::ZERO);
        let start = Instant::now();

        let mut admit_times = Vec::new();
        for _ in 0..7 {
            limiter.acquire().await;
            admit_times.push(start.elapsed());
        }

        // Slide a 60s window over the admission times and count occupants.
        for &t in &admit_times {
            let in_window = admit_times
                .iter()
                .filter(|&&u| u >= t && u < t + Duration::from_secs(60))
                .count();
            assert!(
                in_window <= 3,
                "found {in_window} dispatches in the window starting at {t:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_cannot_burst_past_the_cap() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(3, Duration::ZERO));
        let start = Instant::now();

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire().await;
                    start.elapsed()
                })
            })
            .collect();

        let mut admit_times = Vec::new();
        for handle in handles {
            admit_times.push(handle.await.expect("task should not panic"));
        }
        admit_times.sort();

        let immediate = admit_times
            .iter()
            .filter(|&&t| t < Duration::from_secs(59))
            .count();
        assert_eq!(immediate, 3, "only the cap may be admitted immediately");
    }
}
