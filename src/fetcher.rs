//! Route fetching with per-attempt timeout and bounded retry.

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::FetchError;
use crate::route::FetchResult;
use crate::traits::{RouteSource, RouteTransport};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per route, including the first one.
    pub max_attempts: u32,
    /// Backoff unit. The wait before attempt `n + 1` is `n * base_delay`.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Wait after the `attempt`th failed attempt, saturating instead of
    /// overflowing for absurd base delays.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.checked_mul(attempt).unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

/// Retrying [`RouteSource`] over a single-shot [`RouteTransport`].
///
/// Only timeouts are retried. Error statuses, "no route" answers, malformed
/// bodies and connection failures give up on the route immediately.
#[derive(Debug, Clone)]
pub struct RouteFetcher<T> {
    transport: T,
    retry: RetryPolicy,
}

impl<T: RouteTransport> RouteFetcher<T> {
    pub fn new(transport: T, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Requests a route through `waypoints`, returning the last error when no
    /// attempt succeeds.
    pub fn try_fetch(&self, waypoints: &[(f64, f64)]) -> Result<FetchResult, FetchError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.transport.route(waypoints) {
                Ok(result) => {
                    debug!(attempt, points = result.path.len(), "route fetched");
                    return Ok(result);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "routing request timed out, retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl<T: RouteTransport> RouteSource for RouteFetcher<T> {
    fn fetch(
        &self,
        source: (f64, f64),
        via: (f64, f64),
        destination: (f64, f64),
    ) -> Option<FetchResult> {
        match self.try_fetch(&[source, via, destination]) {
            Ok(result) => Some(result),
            Err(err) => {
                warn!(error = %err, "route unavailable, keeping straight line");
                None
            }
        }
    }
}
