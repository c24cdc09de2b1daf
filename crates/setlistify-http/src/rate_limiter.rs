// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Sliding-window rate limiter.
///
/// Admits at most `max_requests` calls within any trailing `time_window`.
/// The window ledger is held locked while a caller waits, so concurrent
/// callers are admitted one at a time in arrival order and can never jointly
/// exceed the cap.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_requests: usize,
    time_window: Duration,
    window: Arc<Mutex<VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Create a limiter admitting `max_requests` per `time_window`.
    ///
    /// # Arguments
    /// * `max_requests` - Cap per window (values below 1 are raised to 1).
    /// * `time_window` - Length of the trailing window.
    pub fn new(max_requests: usize, time_window: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            max_requests,
            time_window,
            window: Arc::new(Mutex::new(VecDeque::with_capacity(max_requests))),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn time_window(&self) -> Duration {
        self.time_window
    }

    /// Wait until another request fits in the window, then record it.
    pub async fn wait_if_needed(&self) {
        let mut window = self.window.lock().await;

        loop {
            let now = Instant::now();
            while window
                .front()
                .is_some_and(|oldest| now.duration_since(*oldest) >= self.time_window)
            {
                window.pop_front();
            }

            if window.len() < self.max_requests {
                break;
            }

            if let Some(oldest) = window.front() {
                let wait = (*oldest + self.time_window).saturating_duration_since(now);
                tracing::trace!(target: "http", "rate limiting: waiting {:?}", wait);
                sleep(wait).await;
            }
        }

        window.push_back(Instant::now());
    }

    /// Number of requests recorded in the current window.
    pub async fn in_flight(&self) -> usize {
        let now = Instant::now();
        self.window
            .lock()
            .await
            .iter()
            .filter(|at| now.duration_since(**at) < self.time_window)
            .count()
    }
}

impl Default for RateLimiter {
    /// Two requests per second.
    fn default() -> Self {
        Self::new(2, Duration::from_secs(1))
    }
}
