use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::clock::Clock;

/// Minimum-interval throttle for outbound feed requests.
///
/// Keeps only the time the previous `throttle` returned. The lock is held
/// across the wait, so concurrent callers queue up behind each other.
pub struct RateLimiter<C: Clock> {
    clock: Arc<C>,
    min_interval: Duration,
    last_call: Mutex<Option<DateTime<Utc>>>,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(clock: Arc<C>, min_interval: Duration) -> Self {
        Self {
            clock,
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// One request per second.
    pub fn per_second(clock: Arc<C>) -> Self {
        Self::new(clock, Duration::from_secs(1))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until at least `min_interval` has passed since the previous call
    /// returned. Never fails.
    pub async fn throttle(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(previous) = *last_call {
            // A clock that went backwards counts as no time elapsed.
            let elapsed = (self.clock.now() - previous)
                .to_std()
                .unwrap_or(Duration::ZERO);

            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!(wait_ms = wait.as_millis() as u64, "Rate limiter: delaying feed request");
                metrics::histogram!("feed_throttle_wait_seconds").record(wait.as_secs_f64());
                self.clock.sleep(wait).await;
            }
        }

        *last_call = Some(self.clock.now());
    }
}
