//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::error::ApiError;

const MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Extra attempts after the first one
  pub retries: u32,
  /// Delay before the first retry; doubles on each subsequent one
  pub base_delay: Duration,
}

impl RetryPolicy {
  pub const fn new(retries: u32, base_delay: Duration) -> Self {
    Self {
      retries,
      base_delay,
    }
  }

  /// A policy that never retries.
  pub const fn none() -> Self {
    Self::new(0, Duration::ZERO)
  }

  /// Delay before retry number `attempt` (0-based).
  pub fn delay_for(&self, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    self.base_delay.saturating_mul(factor).min(MAX_DELAY)
  }

  /// Run `op` until it succeeds, the error is not retryable, or retries run out.
  ///
  /// The last error is returned.
  pub async fn run<T, F, Fut>(
    &self,
    mut op: F,
    should_retry: impl Fn(&ApiError) -> bool,
  ) -> Result<T, ApiError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
  {
    let mut attempt = 0;
    loop {
      match op().await {
        Ok(value) => return Ok(value),
        Err(err) if attempt < self.retries && should_retry(&err) => {
          let delay = self.delay_for(attempt);
          debug!(attempt = attempt + 1, ?delay, error = %err, "retrying request");
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(err) => return Err(err),
      }
    }
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::new(2, Duration::from_secs(1))
  }
}
