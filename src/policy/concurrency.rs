// Copyright (c) 2025 - Cowboy AI, Inc.
//! Bounded-concurrency execution
//!
//! `BoundedExecutor` runs a batch of jobs with at most `max_in_flight` of
//! them outstanding at any instant. Each job is admitted only after it has
//! acquired a permit from a counting semaphore, runs on its own tokio task,
//! and gives the permit back on every exit path (success, failure, panic,
//! abort).
//!
//! ```text
//! submission:  j1 j2 j3 j4 j5           bound = 2
//!
//! permits:     [j1][j2]                  j3..j5 queued
//!              [j3][j2]                  j1 done → j3 admitted
//!              [j3][j4]                  j2 done → j4 admitted
//!              ...
//! output:      o1 o2 o3 o4 o5           (Submission ordering)
//! ```
//!
//! An executor can be shared between batches; its semaphore then bounds the
//! total across all of them.

use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinHandle};
use tracing::trace;

use crate::boundary::into_fault;
use crate::errors::StepError;
use crate::outcome::{Outcome, StepOutcome};

/// Maximum number of simultaneously in-flight operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConcurrencyBound {
    max_in_flight: usize,
}

impl ConcurrencyBound {
    /// Create a bound; zero is raised to one
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Run one operation at a time
    pub fn sequential() -> Self {
        Self::new(1)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}

impl Default for ConcurrencyBound {
    fn default() -> Self {
        Self::new(8)
    }
}

impl From<usize> for ConcurrencyBound {
    fn from(max_in_flight: usize) -> Self {
        Self::new(max_in_flight)
    }
}

/// Order in which outcomes are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultOrdering {
    /// Same order the jobs were submitted in
    #[default]
    Submission,
    /// Order in which the jobs completed (merge mode)
    Completion,
}

/// What a failing job does to its siblings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Failures never affect other jobs
    #[default]
    Isolate,
    /// After the first failure, abort in-flight siblings and skip queued ones
    CancelSiblings,
}

/// Per-batch execution options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionOptions {
    pub ordering: ResultOrdering,
    pub failure_policy: FailurePolicy,
}

impl ExecutionOptions {
    pub fn unordered() -> Self {
        Self {
            ordering: ResultOrdering::Completion,
            ..Self::default()
        }
    }

    pub fn cancel_on_failure() -> Self {
        Self {
            failure_policy: FailurePolicy::CancelSiblings,
            ..Self::default()
        }
    }

    pub fn with_ordering(mut self, ordering: ResultOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }
}

/// Executor admitting at most `bound` jobs at a time
#[derive(Debug, Clone)]
pub struct BoundedExecutor {
    bound: ConcurrencyBound,
    permits: Arc<Semaphore>,
}

impl BoundedExecutor {
    pub fn new(bound: ConcurrencyBound) -> Self {
        Self {
            bound,
            permits: Arc::new(Semaphore::new(bound.max_in_flight())),
        }
    }

    pub fn bound(&self) -> ConcurrencyBound {
        self.bound
    }

    /// Permits not currently held by a running job
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run every job and report one outcome per job
    ///
    /// Must be called from within a tokio runtime.
    pub async fn execute<T, E, Fut>(
        &self,
        jobs: Vec<Fut>,
        options: ExecutionOptions,
    ) -> Vec<StepOutcome<T, E>>
    where
        T: Send + 'static,
        E: Send + 'static,
        Fut: Future<Output = StepOutcome<T, E>> + Send + 'static,
    {
        let width = self.bound.max_in_flight();
        let (tripped, _) = watch::channel(false);
        let tripped = Arc::new(tripped);

        let admitted = jobs.into_iter().enumerate().map(|(index, job)| {
            let permits = self.permits.clone();
            let tripped = tripped.clone();
            admit(index, job, permits, tripped, options.failure_policy)
        });

        let mut outcomes: Vec<(usize, StepOutcome<T, E>)> = stream::iter(admitted)
            .buffer_unordered(width)
            .collect()
            .await;

        if options.ordering == ResultOrdering::Submission {
            outcomes.sort_by_key(|(index, _)| *index);
        }
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

/// Aborts the task when dropped, so a dropped batch never leaks work
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn admit<T, E, Fut>(
    index: usize,
    job: Fut,
    permits: Arc<Semaphore>,
    tripped: Arc<watch::Sender<bool>>,
    failure_policy: FailurePolicy,
) -> (usize, StepOutcome<T, E>)
where
    T: Send + 'static,
    E: Send + 'static,
    Fut: Future<Output = StepOutcome<T, E>> + Send + 'static,
{
    let outcome = run_admitted(index, job, permits, tripped, failure_policy).await;
    (index, outcome)
}

async fn run_admitted<T, E, Fut>(
    index: usize,
    job: Fut,
    permits: Arc<Semaphore>,
    tripped: Arc<watch::Sender<bool>>,
    failure_policy: FailurePolicy,
) -> StepOutcome<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    Fut: Future<Output = StepOutcome<T, E>> + Send + 'static,
{
    let _permit = match permits.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return Outcome::Failure(StepError::cancelled("executor closed")),
    };

    let cancel_siblings = failure_policy == FailurePolicy::CancelSiblings;
    if cancel_siblings && *tripped.borrow() {
        trace!(index, "Skipping job after sibling failure");
        return Outcome::Failure(StepError::cancelled("sibling failed"));
    }

    trace!(index, "Job admitted");
    let mut handle = AbortOnDrop(tokio::spawn(job));

    if !cancel_siblings {
        return joined(index, (&mut handle.0).await);
    }

    let mut watcher = tripped.subscribe();
    let outcome = tokio::select! {
        result = &mut handle.0 => joined(index, result),
        _ = watcher.wait_for(|failed| *failed) => {
            trace!(index, "Aborting job after sibling failure");
            return Outcome::Failure(StepError::cancelled("sibling failed"));
        }
    };

    if outcome.is_failure() {
        tripped.send_replace(true);
    }
    outcome
}

fn joined<T, E>(index: usize, result: Result<StepOutcome<T, E>, JoinError>) -> StepOutcome<T, E> {
    match result {
        Ok(outcome) => outcome,
        Err(err) if err.is_panic() => {
            Outcome::Failure(into_fault(err.into_panic()).into())
        }
        Err(_) => {
            trace!(index, "Job task was cancelled");
            Outcome::Failure(StepError::cancelled("task aborted"))
        }
    }
}
