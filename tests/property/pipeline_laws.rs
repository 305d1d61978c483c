// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Pipeline Laws
//!
//! This module uses proptest to verify the properties every pipeline must
//! satisfy regardless of input: batch order preservation, consistent
//! statistics, short-circuiting and at-most-once resolution.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cim_pipeline::{
    ConcurrencyBound, FluxResult, MonoResult, Outcome, RetryPolicy, StepError, StepOutcome,
};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

/// Current-thread runtime on a paused clock, so delays cost no real time
fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("Failed to build test runtime")
}

fn delayed_value(value: usize, delay_ms: u64) -> MonoResult<usize, String> {
    MonoResult::from_async_result(move || async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Outcome::success(value)
    })
}

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate per-item latencies for a batch
fn latencies() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..50, 1..20)
}

/// Generate a batch of latencies together with a bound in `[1, len]`
fn batch_with_bound() -> impl Strategy<Value = (Vec<u64>, usize)> {
    latencies().prop_flat_map(|delays| {
        let len = delays.len();
        (Just(delays), 1..=len)
    })
}

/// Generate a success/failure pattern
fn outcome_pattern() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 0..64)
}

fn flux_from_pattern(pattern: &[bool]) -> FluxResult<usize, String> {
    pattern
        .iter()
        .enumerate()
        .map(|(index, ok)| {
            if *ok {
                Outcome::success(index)
            } else {
                Outcome::failure(StepError::Domain(format!("item {index}")))
            }
        })
        .collect()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: Batch output follows submission order
    ///
    /// For any completion timing and any bound in `[1, N]`, the outcomes
    /// come back in the order the MonoResults were submitted.
    #[test]
    fn prop_submission_order_preserved((delays, bound) in batch_with_bound()) {
        let runtime = paused_runtime();

        let values = runtime.block_on(async {
            let monos: Vec<_> = delays
                .iter()
                .enumerate()
                .map(|(index, delay)| delayed_value(index, *delay))
                .collect();

            FluxResult::from_mono_results(monos, ConcurrencyBound::new(bound))
                .await
                .partition()
                .0
        });

        let expected: Vec<usize> = (0..delays.len()).collect();
        prop_assert_eq!(values, expected, "Output must follow submission order");
    }

    /// Property: Never more than `bound` resolutions in flight
    #[test]
    fn prop_bound_is_respected((delays, bound) in batch_with_bound()) {
        let runtime = paused_runtime();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        runtime.block_on(async {
            let monos: Vec<MonoResult<u64, String>> = delays
                .iter()
                .map(|&delay| {
                    let in_flight = in_flight.clone();
                    let peak = peak.clone();
                    MonoResult::from_async_result(move || async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Outcome::success(delay)
                    })
                })
                .collect();

            FluxResult::from_mono_results(monos, ConcurrencyBound::new(bound)).await
        });

        prop_assert!(peak.load(Ordering::SeqCst) <= bound, "In-flight count exceeded bound");
    }

    /// Property: Statistics are consistent with the wrapped list
    #[test]
    fn prop_statistics_consistent(pattern in outcome_pattern()) {
        let flux = flux_from_pattern(&pattern);
        let stats = flux.statistics();

        prop_assert_eq!(stats.successes + stats.failures, stats.total);
        prop_assert_eq!(stats.total, pattern.len());
        prop_assert_eq!(stats.successes, pattern.iter().filter(|ok| **ok).count());

        if stats.total == 0 {
            prop_assert_eq!(stats.success_rate, 0.0);
        } else {
            let expected = stats.successes as f64 / stats.total as f64;
            prop_assert!((stats.success_rate - expected).abs() < f64::EPSILON);
        }
        prop_assert!((0.0..=1.0).contains(&stats.success_rate));
    }

    /// Property: Collectors filter without reordering
    ///
    /// `collect_success_values` fails with the first failure in submission
    /// order; `collect_error_values` always succeeds with every error.
    #[test]
    fn prop_collectors_filter_without_reordering(pattern in outcome_pattern()) {
        let flux = flux_from_pattern(&pattern);

        let (successes, errors) = tokio_test::block_on(async {
            (
                flux.collect_success_values().to_result().await,
                flux.collect_error_values().to_result().await,
            )
        });

        match pattern.iter().position(|ok| !ok) {
            Some(first) => prop_assert_eq!(
                successes,
                Outcome::failure(StepError::Domain(format!("item {first}")))
            ),
            None => prop_assert_eq!(
                successes,
                Outcome::success((0..pattern.len()).collect::<Vec<_>>())
            ),
        }

        let expected_errors: Vec<StepError<String>> = pattern
            .iter()
            .enumerate()
            .filter(|(_, ok)| !**ok)
            .map(|(index, _)| StepError::Domain(format!("item {index}")))
            .collect();
        prop_assert_eq!(errors, Outcome::success(expected_errors));
    }

    /// Property: A failing step short-circuits the rest of the chain
    ///
    /// In a chain of `len` steps where step `fail_at` fails, exactly
    /// `fail_at + 1` steps run and the failure is that step's error.
    #[test]
    fn prop_short_circuit((len, fail_at) in (1usize..16).prop_flat_map(|len| (Just(len), 0..len))) {
        let invoked = Arc::new(AtomicUsize::new(0));

        let mut chain = MonoResult::<usize, String>::from_value(0);
        for step in 0..len {
            let invoked = invoked.clone();
            chain = chain.bind_result(move |value| {
                invoked.fetch_add(1, Ordering::SeqCst);
                if step == fail_at {
                    Outcome::failure(format!("step {step}"))
                } else {
                    Outcome::success(value + 1)
                }
            });
        }

        let outcome = tokio_test::block_on(chain.to_result());

        prop_assert_eq!(outcome, Outcome::failure(StepError::Domain(format!("step {fail_at}"))));
        prop_assert_eq!(invoked.load(Ordering::SeqCst), fail_at + 1);
    }

    /// Property: Retry runs `min(max_attempts, succeed_on)` attempts
    #[test]
    fn prop_retry_attempt_count(max_attempts in 1u32..8, succeed_on in 1u32..12) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let policy = RetryPolicy::new(max_attempts);

        let outcome: StepOutcome<u32, String> = tokio_test::block_on(cim_pipeline::retry(&policy, || {
            let attempt = seen.fetch_add(1, Ordering::SeqCst) as u32 + 1;
            std::future::ready(if attempt >= succeed_on {
                Outcome::success(attempt)
            } else {
                Outcome::failure(StepError::Domain(format!("attempt {attempt}")))
            })
        }));

        let expected_runs = max_attempts.min(succeed_on);
        prop_assert_eq!(calls.load(Ordering::SeqCst) as u32, expected_runs);

        if succeed_on <= max_attempts {
            prop_assert_eq!(outcome, Outcome::success(succeed_on));
        } else {
            // Last failure wins
            prop_assert_eq!(
                outcome,
                Outcome::failure(StepError::Domain(format!("attempt {max_attempts}")))
            );
        }
    }

    /// Property: Resolution is at-most-once
    ///
    /// However many times (and through however many clones) a MonoResult is
    /// resolved, the underlying computation runs exactly once.
    #[test]
    fn prop_resolves_at_most_once(resolutions in 1usize..10) {
        let runs = Arc::new(AtomicUsize::new(0));
        let seen = runs.clone();
        let mono = MonoResult::<usize, String>::from_async_result(move || async move {
            Outcome::success(seen.fetch_add(1, Ordering::SeqCst))
        })
        .map(|run| run * 10);

        let outcomes: Vec<_> = tokio_test::block_on(async {
            let mut outcomes = Vec::new();
            for _ in 0..resolutions {
                outcomes.push(mono.clone().await);
            }
            outcomes
        });

        prop_assert!(outcomes.iter().all(|o| *o == Outcome::success(0)));
        prop_assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
