// Copyright (c) 2025 - Cowboy AI, Inc.
//! Timeout policy
//!
//! Races a computation against a deadline. If the deadline elapses first,
//! the computation is dropped (its eventual result is never observed) and a
//! `Failure(StepError::Timeout)` recording the configured duration is
//! returned instead.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::deferred::Deferred;
use crate::errors::TimeoutExceeded;
use crate::outcome::{Outcome, StepOutcome};

/// Deadline descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub deadline: Duration,
}

impl TimeoutPolicy {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    /// Race `future` against this deadline
    pub async fn apply<T, E, Fut>(&self, future: Fut) -> StepOutcome<T, E>
    where
        Fut: Future<Output = StepOutcome<T, E>>,
    {
        with_timeout(self.deadline, future).await
    }

    /// Run a deferred operation once under this deadline
    pub async fn run<T, E, D>(&self, deferred: &D) -> StepOutcome<T, E>
    where
        D: Deferred<T, E> + ?Sized,
    {
        with_timeout(self.deadline, async {
            deferred.run().await.into_step_outcome()
        })
        .await
    }
}

/// Race `future` against `deadline`
pub async fn with_timeout<T, E, Fut>(deadline: Duration, future: Fut) -> StepOutcome<T, E>
where
    Fut: Future<Output = StepOutcome<T, E>>,
{
    match tokio::time::timeout(deadline, future).await {
        Ok(outcome) => outcome,
        Err(_elapsed) => {
            debug!(deadline_ms = deadline.as_millis() as u64, "Deadline exceeded");
            Outcome::Failure(TimeoutExceeded::new(deadline).into())
        }
    }
}
