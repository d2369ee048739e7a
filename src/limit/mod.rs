//! Outbound call discipline: a shared rate ceiling plus bounded
//! exponential-backoff retry.
//!
//! The two policies are orthogonal. The limiter is acquired before every
//! attempt, so retries respect the shared ceiling too. A final failure is
//! re-raised to the caller; per-meeting handling decides what it means.

use anyhow::Result;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Cooperative rate ceiling: at most `max_calls` admissions per sliding
/// `window`. Excess callers block until the window admits them.
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    admissions: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            window,
            admissions: Mutex::new(VecDeque::new()),
        }
    }

    /// Block until the window admits one more call.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut admissions = self.admissions.lock().await;
                let now = Instant::now();

                while let Some(front) = admissions.front() {
                    if now.duration_since(*front) >= self.window {
                        admissions.pop_front();
                    } else {
                        break;
                    }
                }

                if admissions.len() < self.max_calls {
                    admissions.push_back(now);
                    return;
                }

                // Oldest admission leaving the window frees a slot.
                self.window - now.duration_since(*admissions.front().expect("non-empty"))
            };

            debug!("Rate ceiling reached, waiting {:?}", wait);
            sleep(wait).await;
        }
    }
}

/// Bounded exponential backoff: `max_attempts` total tries, delays of
/// `base * multiplier^n` capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier: 2.0,
            max_delay,
        }
    }

    /// Backoff before retry number `attempt` (0-based count of failures so far).
    fn delay_for(&self, attempt: usize) -> Duration {
        let scaled = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }
}

/// Wraps any outbound call with the shared rate ceiling and retry.
pub struct RateLimitedInvoker {
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl RateLimitedInvoker {
    pub fn new(limiter: Arc<RateLimiter>, retry: RetryPolicy) -> Self {
        Self { limiter, retry }
    }

    /// Run `op` under both policies. Each attempt waits on the limiter
    /// first; the error from the last attempt propagates.
    pub async fn invoke<T, F, Fut>(&self, op_name: &str, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_err = None;

        for attempt in 0..self.retry.max_attempts {
            self.limiter.acquire().await;

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        "{} failed (attempt {}/{}): {}",
                        op_name,
                        attempt + 1,
                        self.retry.max_attempts,
                        e
                    );
                    last_err = Some(e);

                    if attempt + 1 < self.retry.max_attempts {
                        sleep(self.retry.delay_for(attempt)).await;
                    }
                }
            }
        }

        Err(last_err.expect("at least one attempt"))
    }
}
