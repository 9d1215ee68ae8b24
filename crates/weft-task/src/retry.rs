//! Exponential backoff around fallible async work.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
  /// Total attempts including the first one.
  pub max_attempts: u32,
  pub initial_delay_ms: u64,
  pub max_delay_ms: u64,
  pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      initial_delay_ms: 1000,
      max_delay_ms: 30_000,
      backoff_multiplier: 2.0,
    }
  }
}

impl RetryPolicy {
  /// A policy that makes exactly one attempt.
  pub fn none() -> Self {
    Self {
      max_attempts: 1,
      ..Self::default()
    }
  }

  /// Delay to wait after the given (1-based) attempt failed.
  pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let raw = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
    let capped = if raw.is_finite() {
      raw.min(self.max_delay_ms as f64).max(0.0)
    } else {
      self.max_delay_ms as f64
    };
    Duration::from_millis(capped as u64)
  }

  /// Every delay the policy would sleep for, in order.
  pub fn delays(&self) -> Vec<Duration> {
    (1..self.max_attempts.max(1))
      .map(|attempt| self.delay_for_attempt(attempt))
      .collect()
  }
}

/// Retry `operation` on any error until the policy is exhausted.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: Display,
{
  with_retry_if(policy, |_| true, operation).await
}

/// Retry `operation` while `should_retry` approves the error.
///
/// The operation receives the 1-based attempt number. The last error is
/// returned unchanged once attempts run out or the predicate refuses.
pub async fn with_retry_if<T, E, F, Fut, P>(
  policy: &RetryPolicy,
  should_retry: P,
  operation: F,
) -> Result<T, E>
where
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<T, E>>,
  P: FnMut(&E) -> bool,
  E: Display,
{
  retry_loop(policy, None, should_retry, operation).await
}

/// Like [`with_retry_if`], but a cancelled `cancel` cuts the backoff short.
///
/// No attempt starts once the token is cancelled; the error of the last
/// attempt is returned instead.
pub async fn with_retry_until<T, E, F, Fut, P>(
  policy: &RetryPolicy,
  cancel: &CancellationToken,
  should_retry: P,
  operation: F,
) -> Result<T, E>
where
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<T, E>>,
  P: FnMut(&E) -> bool,
  E: Display,
{
  retry_loop(policy, Some(cancel), should_retry, operation).await
}

async fn retry_loop<T, E, F, Fut, P>(
  policy: &RetryPolicy,
  cancel: Option<&CancellationToken>,
  mut should_retry: P,
  mut operation: F,
) -> Result<T, E>
where
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<T, E>>,
  P: FnMut(&E) -> bool,
  E: Display,
{
  let max_attempts = policy.max_attempts.max(1);
  let mut attempt = 1;
  loop {
    match operation(attempt).await {
      Ok(value) => return Ok(value),
      Err(err) => {
        if attempt >= max_attempts || !should_retry(&err) {
          return Err(err);
        }
        let delay = policy.delay_for_attempt(attempt);
        warn!(
          attempt,
          max_attempts,
          delay_ms = delay.as_millis() as u64,
          error = %err,
          "attempt failed, retrying"
        );
        match cancel {
          Some(cancel) => {
            tokio::select! {
              biased;
              _ = cancel.cancelled() => {
                debug!(attempt, "retry cancelled during backoff");
                return Err(err);
              }
              _ = tokio::time::sleep(delay) => {}
            }
          }
          None => tokio::time::sleep(delay).await,
        }
        attempt += 1;
      }
    }
  }
}
