// Copyright (c) 2025 - Cowboy AI, Inc.
//! FluxResult - an ordered batch of outcomes
//!
//! A `FluxResult<T, E>` is an immutable, ordered collection of
//! `StepOutcome<T, E>` values. It is built either from outcomes that already
//! exist, or by resolving a list of `MonoResult`s through the bounded
//! executor:
//!
//! ```text
//! [m1, m2, m3, m4]  ──BoundedExecutor(k = 2)──>  [r1, r2, r3, r4]
//!   submission order     completion order varies    submission order
//! ```
//!
//! Every query below is a pure function of the wrapped list; nothing is
//! re-resolved.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::StepError;
use crate::mono::MonoResult;
use crate::outcome::{Outcome, StepOutcome};
use crate::policy::{BoundedExecutor, ConcurrencyBound, ExecutionOptions};

/// Snapshot of a batch's success/failure counts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FluxStatistics {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    /// `successes / total`, or `0.0` for an empty batch
    pub success_rate: f64,
}

/// Ordered, immutable collection of step outcomes
#[derive(Debug, Clone, PartialEq)]
pub struct FluxResult<T, E> {
    outcomes: Vec<StepOutcome<T, E>>,
}

impl<T, E> FluxResult<T, E> {
    /// Wrap already-computed domain outcomes
    pub fn from_results(results: Vec<Outcome<T, E>>) -> Self {
        results
            .into_iter()
            .map(Outcome::into_step_outcome)
            .collect()
    }

    /// Wrap already-lifted pipeline outcomes
    pub fn from_step_outcomes(outcomes: Vec<StepOutcome<T, E>>) -> Self {
        Self { outcomes }
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    pub fn count_total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn count_success(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn count_failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// Fraction of successes in `[0, 1]`; `0.0` when the batch is empty
    pub fn success_rate(&self) -> f64 {
        let total = self.count_total();
        if total == 0 {
            return 0.0;
        }
        self.count_success() as f64 / total as f64
    }

    /// True when no element failed (vacuously true for an empty batch)
    pub fn is_all_success(&self) -> bool {
        self.outcomes.iter().all(Outcome::is_success)
    }

    pub fn is_any_failure(&self) -> bool {
        self.outcomes.iter().any(Outcome::is_failure)
    }

    pub fn statistics(&self) -> FluxStatistics {
        let total = self.count_total();
        let successes = self.count_success();
        FluxStatistics {
            total,
            successes,
            failures: total - successes,
            success_rate: self.success_rate(),
        }
    }

    // ------------------------------------------------------------------
    // Sequence combinators
    // ------------------------------------------------------------------

    /// Keep the elements matching `predicate`, in order
    pub fn filter_by<P>(self, mut predicate: P) -> Self
    where
        P: FnMut(&StepOutcome<T, E>) -> bool,
    {
        self.outcomes
            .into_iter()
            .filter(|outcome| predicate(outcome))
            .collect()
    }

    /// Stable sort; equal elements keep their submission order
    pub fn sort_by<C>(mut self, compare: C) -> Self
    where
        C: FnMut(&StepOutcome<T, E>, &StepOutcome<T, E>) -> Ordering,
    {
        self.outcomes.sort_by(compare);
        self
    }

    /// The first `n` elements
    pub fn take(mut self, n: usize) -> Self {
        self.outcomes.truncate(n);
        self
    }

    pub fn limit(self, n: usize) -> Self {
        self.take(n)
    }

    /// Split into groups by `key`; each group keeps submission order
    pub fn group_by<K, F>(self, mut key: F) -> HashMap<K, FluxResult<T, E>>
    where
        K: Eq + Hash,
        F: FnMut(&StepOutcome<T, E>) -> K,
    {
        let mut groups: HashMap<K, FluxResult<T, E>> = HashMap::new();
        for outcome in self.outcomes {
            groups
                .entry(key(&outcome))
                .or_insert_with(|| FluxResult {
                    outcomes: Vec::new(),
                })
                .outcomes
                .push(outcome);
        }
        groups
    }

    /// Transform every success payload; a panic fails only that element
    pub fn map_success<U, F>(self, mut f: F) -> FluxResult<U, E>
    where
        F: FnMut(T) -> U,
    {
        self.outcomes
            .into_iter()
            .map(|outcome| outcome.map(&mut f))
            .collect()
    }

    /// Success payloads and errors, each in submission order
    pub fn partition(self) -> (Vec<T>, Vec<StepError<E>>) {
        let mut successes = Vec::new();
        let mut failures = Vec::new();
        for outcome in self.outcomes {
            match outcome {
                Outcome::Success(value) => successes.push(value),
                Outcome::Failure(error) => failures.push(error),
            }
        }
        (successes, failures)
    }

    /// Error of the first failing element in submission order
    pub fn first_failure(&self) -> Option<&StepError<E>> {
        self.outcomes.iter().find_map(Outcome::as_failure)
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    pub fn outcomes(&self) -> &[StepOutcome<T, E>] {
        &self.outcomes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StepOutcome<T, E>> {
        self.outcomes.iter()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn into_outcomes(self) -> Vec<StepOutcome<T, E>> {
        self.outcomes
    }
}

impl<T, E> FluxResult<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Resolve `monos` with at most `bound` in flight, in submission order
    ///
    /// Failures are isolated: a failing element never cancels its siblings.
    pub async fn from_mono_results(
        monos: Vec<MonoResult<T, E>>,
        bound: impl Into<ConcurrencyBound>,
    ) -> Self {
        let executor = BoundedExecutor::new(bound.into());
        Self::from_mono_results_with(monos, &executor, ExecutionOptions::default()).await
    }

    /// Resolve `monos` on a shared executor with explicit ordering and
    /// failure policy
    pub async fn from_mono_results_with(
        monos: Vec<MonoResult<T, E>>,
        executor: &BoundedExecutor,
        options: ExecutionOptions,
    ) -> Self {
        let jobs: Vec<_> = monos.iter().map(MonoResult::to_result).collect();
        let flux = Self::from_step_outcomes(executor.execute(jobs, options).await);

        debug!(
            total = flux.count_total(),
            successes = flux.count_success(),
            failures = flux.count_failures(),
            max_in_flight = executor.bound().max_in_flight(),
            "Resolved batch"
        );
        flux
    }

    /// All success payloads, or the first failure in submission order
    pub fn collect_success_values(&self) -> MonoResult<Vec<T>, E> {
        let collected: StepOutcome<Vec<T>, E> = self
            .outcomes
            .iter()
            .map(|outcome| outcome.clone().into_result())
            .collect::<Result<Vec<T>, StepError<E>>>()
            .into();
        MonoResult::from_outcome(collected)
    }

    /// Every error payload in submission order; never fails
    pub fn collect_error_values(&self) -> MonoResult<Vec<StepError<E>>, E> {
        let errors = self
            .outcomes
            .iter()
            .filter_map(|outcome| outcome.as_failure().cloned())
            .collect();
        MonoResult::from_value(errors)
    }
}

impl<T, E> Default for FluxResult<T, E> {
    fn default() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }
}

impl<T, E> FromIterator<StepOutcome<T, E>> for FluxResult<T, E> {
    fn from_iter<I: IntoIterator<Item = StepOutcome<T, E>>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}

impl<T, E> IntoIterator for FluxResult<T, E> {
    type Item = StepOutcome<T, E>;
    type IntoIter = std::vec::IntoIter<StepOutcome<T, E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}

impl<'a, T, E> IntoIterator for &'a FluxResult<T, E> {
    type Item = &'a StepOutcome<T, E>;
    type IntoIter = std::slice::Iter<'a, StepOutcome<T, E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}

impl<T, E> From<Vec<StepOutcome<T, E>>> for FluxResult<T, E> {
    fn from(outcomes: Vec<StepOutcome<T, E>>) -> Self {
        Self::from_step_outcomes(outcomes)
    }
}
