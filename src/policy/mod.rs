// Copyright (c) 2025 - Cowboy AI, Inc.
//! Retry / Timeout / Concurrency Policies
//!
//! Cross-cutting combinators shared by `MonoResult` and `FluxResult`.
//!
//! # Descriptors
//!
//! The policy descriptors are plain immutable values. They carry no runtime
//! state of their own:
//!
//! - `RetryPolicy` - attempt limit and `Backoff` schedule
//! - `TimeoutPolicy` - deadline duration
//! - `ConcurrencyBound` - maximum in-flight operations
//!
//! # Execution
//!
//! - `retry` / `retry_when` - re-run a deferred computation on failure
//! - `with_timeout` - race any computation against a deadline
//! - `BoundedExecutor` - semaphore-gated fan-out used by `FluxResult`
//!
//! The executor's semaphore is the only shared mutable resource in the
//! pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use cim_pipeline::policy::*;
//!
//! let policy = RetryPolicy::exponential(4, Duration::from_millis(50), Duration::from_secs(2));
//! let outcome = retry(&policy, || fetch_inventory(host)).await;
//!
//! let bounded = with_timeout(Duration::from_secs(1), fetch_inventory(host)).await;
//! ```

pub mod concurrency;
pub mod retry;
pub mod timeout;

pub use concurrency::{
    BoundedExecutor, ConcurrencyBound, ExecutionOptions, FailurePolicy, ResultOrdering,
};
pub use retry::{retry, retry_when, Backoff, RetryPolicy};
pub use timeout::{with_timeout, TimeoutPolicy};
