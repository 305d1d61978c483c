// Copyright (c) 2025 - Cowboy AI, Inc.
//! MonoResult - a deferred, at-most-once asynchronous Outcome
//!
//! A `MonoResult<T, E>` wraps a computation that eventually yields a
//! `StepOutcome<T, E>`. Nothing runs until the outcome is requested with
//! `to_result()` (or by awaiting the `MonoResult` directly).
//!
//! # At-most-once resolution
//!
//! The computation is driven at most once per instance. Every clone of a
//! `MonoResult` shares the same one-shot latch, so concurrent resolvers all
//! wait on the single in-flight computation and then observe the identical
//! cached outcome:
//!
//! ```text
//!             ┌──────────── to_result() ──┐
//! MonoResult ─┼──────────── to_result() ──┼──> one execution ──> cached StepOutcome
//!             └──────────── to_result() ──┘
//! ```
//!
//! # Chaining
//!
//! Every operator returns a *new* `MonoResult` whose computation resolves
//! the upstream instance and then applies its transformation:
//!
//! ```text
//! from_value(5) ──map(x*2)──> ──bind_result(x+1)──> ──timeout(1s)──> to_result()
//!                                                                   Success(11)
//! ```
//!
//! Failures short-circuit: once an upstream step fails, downstream `map` /
//! `bind_*` callbacks are never invoked. A panic inside any callback becomes
//! `Failure(StepError::Fault)`.
//!
//! # Example
//!
//! ```rust
//! use cim_pipeline::{MonoResult, Outcome};
//!
//! # tokio_test::block_on(async {
//! let outcome = MonoResult::<i32, String>::from_value(5)
//!     .map(|x| x * 2)
//!     .bind_result(|x| {
//!         if x > 0 {
//!             Outcome::success(x + 1)
//!         } else {
//!             Outcome::failure("neg".to_string())
//!         }
//!     })
//!     .to_result()
//!     .await;
//!
//! assert_eq!(outcome, Outcome::success(11));
//! # });
//! ```

use std::fmt;
use std::future::{Future, IntoFuture};
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::warn;

use crate::boundary::{guard, guard_future};
use crate::deferred::Deferred;
use crate::errors::StepError;
use crate::observe::{PipelineContext, StepEventKind};
use crate::outcome::{Outcome, StepOutcome};
use crate::policy::{retry, with_timeout, RetryPolicy};

/// The shared, cached future behind a `MonoResult`
pub type MonoFuture<T, E> = Shared<BoxFuture<'static, StepOutcome<T, E>>>;

/// Deferred, at-most-once asynchronous computation yielding a `StepOutcome`
#[derive(Clone)]
pub struct MonoResult<T, E> {
    future: MonoFuture<T, E>,
    context: PipelineContext,
}

impl<T, E> MonoResult<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn from_future<Fut>(future: Fut, context: PipelineContext) -> Self
    where
        Fut: Future<Output = StepOutcome<T, E>> + Send + 'static,
    {
        Self {
            future: future.boxed().shared(),
            context,
        }
    }

    fn derive<U, F, Fut>(context: PipelineContext, future: Fut) -> MonoResult<U, F>
    where
        U: Clone + Send + Sync + 'static,
        F: Clone + Send + Sync + 'static,
        Fut: Future<Output = StepOutcome<U, F>> + Send + 'static,
    {
        MonoResult::from_future(future, context)
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Already-resolved success
    pub fn from_value(value: T) -> Self {
        Self::from_outcome(Outcome::Success(value))
    }

    /// Already-resolved domain failure
    pub fn from_error(error: E) -> Self {
        Self::from_outcome(Outcome::Failure(StepError::Domain(error)))
    }

    /// Already-resolved outcome
    pub fn from_outcome(outcome: StepOutcome<T, E>) -> Self {
        Self::from_future(future::ready(outcome), PipelineContext::default())
    }

    /// Wrap an asynchronous step; it is not invoked until resolution
    pub fn from_async_result<F, Fut>(step: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Outcome<T, E>> + Send + 'static,
    {
        Self::from_future(
            async move {
                match guard_future(async move { step().await }).await {
                    Ok(outcome) => outcome.into_step_outcome(),
                    Err(fault) => Outcome::Failure(fault.into()),
                }
            },
            PipelineContext::default(),
        )
    }

    /// Wrap a re-runnable deferred operation (run once per instance)
    pub fn from_deferred<D>(deferred: D) -> Self
    where
        D: Deferred<T, E> + 'static,
    {
        Self::from_async_result(move || async move { deferred.run().await })
    }

    /// Resolve fresh instances from `factory` under `policy`
    ///
    /// Each attempt builds a new `MonoResult`, so every retry re-invokes the
    /// underlying computation. The returned instance itself still resolves
    /// at most once.
    pub fn retrying<F>(policy: RetryPolicy, factory: F) -> Self
    where
        F: Fn() -> MonoResult<T, E> + Send + Sync + 'static,
    {
        Self::from_future(
            async move {
                retry(&policy, || {
                    let attempt = guard(&factory);
                    async move {
                        match attempt {
                            Ok(mono) => mono.to_result().await,
                            Err(fault) => Outcome::Failure(fault.into()),
                        }
                    }
                })
                .await
            },
            PipelineContext::default(),
        )
    }

    // ------------------------------------------------------------------
    // Transformation
    // ------------------------------------------------------------------

    /// Transform the success payload
    pub fn map<U, F>(self, f: F) -> MonoResult<U, E>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let upstream = self.future;
        Self::derive(self.context, async move { upstream.await.map(f) })
    }

    /// Transform the domain error; structural failures pass through
    pub fn map_error<F, G>(self, f: G) -> MonoResult<T, F>
    where
        F: Clone + Send + Sync + 'static,
        G: FnOnce(E) -> F + Send + 'static,
    {
        let upstream = self.future;
        Self::derive(self.context, async move {
            upstream.await.map_error(|error| error.map_domain(f))
        })
    }

    /// Chain a synchronous fallible step
    pub fn bind_result<U, F>(self, f: F) -> MonoResult<U, E>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Outcome<U, E> + Send + 'static,
    {
        let upstream = self.future;
        Self::derive(self.context, async move {
            upstream
                .await
                .bind(|value| f(value).into_step_outcome())
        })
    }

    /// Chain an asynchronous fallible step
    ///
    /// `f` is never invoked when the upstream outcome is a failure.
    pub fn bind_async_result<U, F, Fut>(self, f: F) -> MonoResult<U, E>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = Outcome<U, E>> + Send + 'static,
    {
        let upstream = self.future;
        Self::derive(self.context, async move {
            match upstream.await {
                Outcome::Success(value) => {
                    match guard_future(async move { f(value).await }).await {
                        Ok(outcome) => outcome.into_step_outcome(),
                        Err(fault) => Outcome::Failure(fault.into()),
                    }
                }
                Outcome::Failure(error) => Outcome::Failure(error),
            }
        })
    }

    /// Chain a step that itself produces a `MonoResult`
    pub fn flat_map<U, F>(self, f: F) -> MonoResult<U, E>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> MonoResult<U, E> + Send + 'static,
    {
        let upstream = self.future;
        Self::derive(self.context, async move {
            match upstream.await {
                Outcome::Success(value) => match guard(|| f(value)) {
                    Ok(next) => next.to_result().await,
                    Err(fault) => Outcome::Failure(fault.into()),
                },
                Outcome::Failure(error) => Outcome::Failure(error),
            }
        })
    }

    /// Recover from any failure
    ///
    /// `f` sees the full `StepError`, so it can recover from timeouts and
    /// faults as well as domain errors. It may produce a success or a
    /// different domain failure.
    pub fn on_error_return_result<F>(self, f: F) -> Self
    where
        F: FnOnce(StepError<E>) -> Outcome<T, E> + Send + 'static,
    {
        let upstream = self.future;
        Self::derive(self.context, async move {
            upstream
                .await
                .recover(|error| f(error).into_step_outcome())
        })
    }

    /// Replace any failure with a fallback value
    pub fn on_error_return(self, fallback: T) -> Self {
        self.on_error_return_result(move |_| Outcome::Success(fallback))
    }

    /// Resolve both instances concurrently and pair their payloads
    ///
    /// If both fail, the failure of `self` is reported.
    pub fn zip<U>(self, other: MonoResult<U, E>) -> MonoResult<(T, U), E>
    where
        U: Clone + Send + Sync + 'static,
    {
        let left = self.future;
        let right = other.future;
        Self::derive(self.context, async move {
            match future::join(left, right).await {
                (Outcome::Success(a), Outcome::Success(b)) => Outcome::Success((a, b)),
                (Outcome::Failure(error), _) | (_, Outcome::Failure(error)) => {
                    Outcome::Failure(error)
                }
            }
        })
    }

    // ------------------------------------------------------------------
    // Policies
    // ------------------------------------------------------------------

    /// Race resolution against a deadline
    ///
    /// On expiry the upstream computation is dropped and this instance is
    /// permanently resolved to `Failure(StepError::Timeout)`.
    pub fn timeout(self, duration: Duration) -> Self {
        let upstream = self.future;
        Self::derive(self.context, with_timeout(duration, upstream))
    }

    /// Explicit marker for the default at-most-once behaviour
    pub fn cache(self) -> Self {
        self
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Report every resolution of this step to the context's observer
    pub fn log_step(self, name: impl Into<String>) -> Self
    where
        E: fmt::Debug,
    {
        let name = name.into();
        self.observe(move |context, outcome, elapsed| {
            context.emit(
                &name,
                StepEventKind::Step,
                outcome.kind(),
                elapsed,
                describe(outcome),
            );
        })
    }

    /// Report failed resolutions to the context's observer
    pub fn log_error(self, error_context: impl Into<String>) -> Self
    where
        E: fmt::Debug,
    {
        let error_context = error_context.into();
        self.observe(move |context, outcome, elapsed| {
            if outcome.is_failure() {
                context.emit(
                    &error_context,
                    StepEventKind::Error,
                    outcome.kind(),
                    elapsed,
                    describe(outcome),
                );
            }
        })
    }

    /// Report resolution time, flagging resolutions slower than `threshold`
    pub fn log_performance(self, threshold: Duration) -> Self
    where
        E: fmt::Debug,
    {
        self.observe(move |context, outcome, elapsed| {
            context.emit(
                "performance",
                StepEventKind::Performance {
                    threshold,
                    exceeded: elapsed > threshold,
                },
                outcome.kind(),
                elapsed,
                describe(outcome),
            );
        })
    }

    fn observe<F>(self, report: F) -> Self
    where
        F: FnOnce(&PipelineContext, &StepOutcome<T, E>, Duration) + Send + 'static,
    {
        let upstream = self.future;
        let context = self.context.clone();
        Self::derive(self.context, async move {
            let started = Instant::now();
            let outcome = upstream.await;
            let elapsed = started.elapsed();

            if let Err(fault) = guard(|| report(&context, &outcome, elapsed)) {
                warn!(
                    operation = context.operation(),
                    fault = fault.message(),
                    "Pipeline observer panicked"
                );
            }
            outcome
        })
    }

    // ------------------------------------------------------------------
    // Context and resolution
    // ------------------------------------------------------------------

    /// Attach a correlation context; derived instances inherit it
    pub fn with_context(self, context: PipelineContext) -> Self {
        Self {
            future: self.future,
            context,
        }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// True once the outcome has been computed and cached
    pub fn is_resolved(&self) -> bool {
        self.future.peek().is_some()
    }

    /// The cached outcome, without driving the computation
    pub fn peek(&self) -> Option<StepOutcome<T, E>> {
        self.future.peek().cloned()
    }

    /// Resolve the pipeline
    ///
    /// The first call drives the whole chain; every later call, on this
    /// instance or any clone, yields the cached outcome.
    pub fn to_result(&self) -> MonoFuture<T, E> {
        self.future.clone()
    }
}

impl<T, E> IntoFuture for MonoResult<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Output = StepOutcome<T, E>;
    type IntoFuture = MonoFuture<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        self.future
    }
}

impl<T, E> fmt::Debug for MonoResult<T, E>
where
    T: Clone + fmt::Debug,
    E: Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonoResult")
            .field("resolved", &self.future.peek())
            .field("context", &self.context)
            .finish()
    }
}

fn describe<T, E: fmt::Debug>(outcome: &StepOutcome<T, E>) -> Option<String> {
    outcome.as_failure().map(|error| match error {
        StepError::Domain(e) => format!("{e:?}"),
        StepError::Fault(fault) => fault.to_string(),
        StepError::Timeout(timeout) => timeout.to_string(),
        StepError::Cancelled(reason) => format!("Operation cancelled: {reason}"),
    })
}
