// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deferred operations
//!
//! A `Deferred<T, E>` is the shape upstream producers hand to the pipeline:
//! a zero-argument asynchronous operation yielding an `Outcome<T, E>`. Unlike
//! a `MonoResult`, a deferred operation may be run any number of times, which
//! is what the retry and timeout policies need.
//!
//! Any `Fn() -> impl Future<Output = Outcome<T, E>>` closure is a `Deferred`:
//!
//! ```rust,ignore
//! let fetch = move || async move { repository.load(id).await.into() };
//! let user = MonoResult::from_deferred(fetch);
//! ```

use std::future::Future;

use async_trait::async_trait;

use crate::outcome::Outcome;

/// Re-runnable asynchronous operation yielding an `Outcome`
#[async_trait]
pub trait Deferred<T, E>: Send + Sync {
    /// Run the operation once
    async fn run(&self) -> Outcome<T, E>;
}

#[async_trait]
impl<T, E, F, Fut> Deferred<T, E> for F
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Outcome<T, E>> + Send + 'static,
{
    async fn run(&self) -> Outcome<T, E> {
        (self)().await
    }
}
