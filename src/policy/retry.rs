// Copyright (c) 2025 - Cowboy AI, Inc.
//! Retry policy
//!
//! Re-runs a deferred computation while it yields a failure, up to
//! `max_attempts` runs in total, sleeping between runs according to the
//! configured `Backoff`.
//!
//! # Last failure wins
//!
//! When every attempt fails, the outcome of the *last* attempt is returned.
//!
//! ```text
//! attempt 1 ──✗── sleep(delay(1)) ── attempt 2 ──✗── sleep(delay(2)) ── attempt 3 ──✗──> Failure₃
//! attempt 1 ──✗── sleep(delay(1)) ── attempt 2 ──✓──> Success₂
//! ```
//!
//! A `Cancelled` failure is never retried.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::StepError;
use crate::outcome::{Outcome, StepOutcome};

/// Delay schedule between attempts
///
/// `delay(n)` is the pause after the `n`-th failed attempt (1-indexed).
#[derive(Clone)]
pub enum Backoff {
    /// Retry right away
    Immediate,
    /// Same pause after every failure
    Fixed(Duration),
    /// `initial * multiplier^(n-1)`, capped at `max`
    Exponential {
        initial: Duration,
        multiplier: f64,
        max: Duration,
    },
    /// Caller-supplied schedule
    Custom(Arc<dyn Fn(u32) -> Duration + Send + Sync>),
}

impl Backoff {
    /// Build a custom schedule from a function of the attempt number
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Backoff::Custom(Arc::new(f))
    }

    /// Pause after the given failed attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        match self {
            Backoff::Immediate => Duration::ZERO,
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential {
                initial,
                multiplier,
                max,
            } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let nanos = initial.as_nanos() as f64 * multiplier.max(1.0).powi(exponent);
                let capped = nanos.min(max.as_nanos() as f64);
                Duration::from_nanos(capped as u64)
            }
            Backoff::Custom(f) => f(attempt),
        }
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backoff::Immediate => write!(f, "Immediate"),
            Backoff::Fixed(delay) => f.debug_tuple("Fixed").field(delay).finish(),
            Backoff::Exponential {
                initial,
                multiplier,
                max,
            } => f
                .debug_struct("Exponential")
                .field("initial", initial)
                .field("multiplier", multiplier)
                .field("max", max)
                .finish(),
            Backoff::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Bounded retry with backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total runs including the first one (at least 1)
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Retry up to `max_attempts` runs with no pause in between
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Immediate,
        }
    }

    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts)
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts).with_backoff(Backoff::Fixed(delay))
    }

    /// Doubling backoff starting at `initial`, capped at `max`
    pub fn exponential(max_attempts: u32, initial: Duration, max: Duration) -> Self {
        Self::new(max_attempts).with_backoff(Backoff::Exponential {
            initial,
            multiplier: 2.0,
            max,
        })
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Check the descriptor for values `retry` would silently adjust
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1");
        }
        if let Backoff::Exponential { multiplier, .. } = self.backoff {
            if multiplier.is_nan() || multiplier < 1.0 {
                return Err("multiplier must be at least 1.0");
            }
        }
        Ok(())
    }

    /// Pause after the given failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

impl Default for RetryPolicy {
    /// Three attempts, 100ms doubling backoff capped at 5s
    fn default() -> Self {
        Self::exponential(3, Duration::from_millis(100), Duration::from_secs(5))
    }
}

/// Run `op` under `policy`, retrying every failure except cancellation
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, op: F) -> StepOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StepOutcome<T, E>>,
{
    retry_when(policy, |error: &StepError<E>| !error.is_cancelled(), op).await
}

/// Run `op` under `policy`, retrying only failures accepted by `should_retry`
pub async fn retry_when<T, E, P, F, Fut>(
    policy: &RetryPolicy,
    should_retry: P,
    mut op: F,
) -> StepOutcome<T, E>
where
    P: Fn(&StepError<E>) -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = StepOutcome<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = op().await;

        let retryable = match &outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(error) => Some(should_retry(error)),
        };

        match retryable {
            None => {
                if attempt > 1 {
                    debug!(attempt, "Retry succeeded");
                }
                return outcome;
            }
            Some(false) => {
                debug!(attempt, "Failure is not retryable");
                return outcome;
            }
            Some(true) if attempt >= max_attempts => {
                warn!(attempts = attempt, "Retry attempts exhausted");
                return outcome;
            }
            Some(true) => {}
        }

        let delay = policy.delay_for(attempt);
        debug!(
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Attempt failed, retrying"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use test_case::test_case;

    fn flaky(
        calls: Arc<AtomicU32>,
        succeed_on: u32,
    ) -> impl FnMut() -> std::future::Ready<StepOutcome<u32, String>> {
        move || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if attempt >= succeed_on {
                Outcome::success(attempt)
            } else {
                Outcome::failure(StepError::Domain(format!("attempt {attempt} failed")))
            })
        }
    }

    #[test_case(Backoff::Immediate, 3 => Duration::ZERO ; "immediate")]
    #[test_case(Backoff::Fixed(Duration::from_millis(50)), 4 => Duration::from_millis(50) ; "fixed")]
    #[test_case(Backoff::Exponential { initial: Duration::from_millis(10), multiplier: 2.0, max: Duration::from_secs(1) }, 1 => Duration::from_millis(10) ; "exponential first")]
    #[test_case(Backoff::Exponential { initial: Duration::from_millis(10), multiplier: 2.0, max: Duration::from_secs(1) }, 4 => Duration::from_millis(80) ; "exponential fourth")]
    #[test_case(Backoff::Exponential { initial: Duration::from_millis(10), multiplier: 2.0, max: Duration::from_millis(50) }, 10 => Duration::from_millis(50) ; "exponential capped")]
    fn test_backoff_delay(backoff: Backoff, attempt: u32) -> Duration {
        backoff.delay(attempt)
    }

    #[test]
    fn test_custom_backoff() {
        let backoff = Backoff::custom(|n| Duration::from_millis(u64::from(n) * 7));
        assert_eq!(backoff.delay(3), Duration::from_millis(21));
        assert_eq!(backoff.delay(0), Duration::ZERO);
    }

    #[test]
    fn test_validate() {
        assert!(RetryPolicy::default().validate().is_ok());

        let zero = RetryPolicy {
            max_attempts: 0,
            backoff: Backoff::Immediate,
        };
        assert!(zero.validate().is_err());

        let shrinking = RetryPolicy::new(3).with_backoff(Backoff::Exponential {
            initial: Duration::from_millis(1),
            multiplier: 0.5,
            max: Duration::from_secs(1),
        });
        assert!(shrinking.validate().is_err());
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let outcome = retry(&RetryPolicy::new(3), flaky(calls.clone(), 3)).await;

        assert_eq!(outcome, Outcome::success(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_last_failure_wins() {
        let calls = Arc::new(AtomicU32::new(0));
        let outcome = retry(&RetryPolicy::new(2), flaky(calls.clone(), 3)).await;

        assert_eq!(
            outcome,
            Outcome::failure(StepError::Domain("attempt 2 failed".to_string()))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let outcome: StepOutcome<(), String> = retry(&RetryPolicy::new(5), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Outcome::failure(StepError::cancelled("shutdown")))
        })
        .await;

        assert!(outcome.unwrap_error().is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_when_predicate() {
        let calls = Arc::new(AtomicU32::new(0));
        let outcome = retry_when(
            &RetryPolicy::new(5),
            |error: &StepError<String>| error.is_timeout(),
            flaky(calls.clone(), 4),
        )
        .await;

        assert!(outcome.is_failure());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleeps_between_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::fixed(3, Duration::from_secs(10));
        let started = tokio::time::Instant::now();

        let outcome = retry(&policy, flaky(calls, 3)).await;

        assert!(outcome.is_success());
        assert!(started.elapsed() >= Duration::from_secs(20));
        assert!(started.elapsed() < Duration::from_secs(21));
    }
}
