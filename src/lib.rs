// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reactive Result pipelines for the Composable Information Machine
//!
//! This crate composes long chains of fallible asynchronous steps with
//! explicit error propagation:
//!
//! - `Outcome<T, E>` - the success/failure value every step produces
//! - `MonoResult<T, E>` - a lazy, at-most-once asynchronous `Outcome`
//! - `FluxResult<T, E>` - an ordered batch of outcomes with statistics
//! - `policy` - retry, timeout and bounded concurrency shared by both
//!
//! ```text
//! Outcome ◄── MonoResult ◄── FluxResult
//!                 ▲              ▲
//!                 └─── policy ───┘
//! ```
//!
//! Failures flow through `StepError<E>`, which carries the caller's domain
//! error next to the faults, timeouts and cancellations the pipeline itself
//! produces.

mod boundary;

pub mod config;
pub mod deferred;
pub mod errors;
pub mod flux;
pub mod mono;
pub mod observe;
pub mod outcome;
pub mod policy;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use deferred::Deferred;
pub use errors::{ConfigError, ConfigResult, Fault, Misuse, StepError, TimeoutExceeded};
pub use flux::{FluxResult, FluxStatistics};
pub use mono::{MonoFuture, MonoResult};
pub use observe::{
    CollectingObserver, PipelineContext, PipelineObserver, StepEvent, StepEventKind,
    TracingObserver,
};
pub use outcome::{failure, success, Outcome, OutcomeKind, StepOutcome};
pub use policy::{
    retry, retry_when, with_timeout, Backoff, BoundedExecutor, ConcurrencyBound,
    ExecutionOptions, FailurePolicy, ResultOrdering, RetryPolicy, TimeoutPolicy,
};
