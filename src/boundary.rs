// Copyright (c) 2025 - Cowboy AI, Inc.
//! Callback boundaries
//!
//! Every user-supplied callback runs inside one of these guards. A panic
//! raised by the callback is captured and handed back as a `Fault`, except a
//! `Misuse` panic, which is resumed unchanged.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;

use crate::errors::{Fault, Misuse};

/// Run a synchronous callback, capturing any panic as a `Fault`
pub(crate) fn guard<R, F>(f: F) -> Result<R, Fault>
where
    F: FnOnce() -> R,
{
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(into_fault)
}

/// Drive a future to completion, capturing any panic raised while polling
pub(crate) async fn guard_future<Fut>(future: Fut) -> Result<Fut::Output, Fault>
where
    Fut: Future,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(into_fault)
}

/// Convert a panic payload into a `Fault`, resuming `Misuse` panics
pub(crate) fn into_fault(payload: Box<dyn std::any::Any + Send>) -> Fault {
    if payload.is::<Misuse>() {
        panic::resume_unwind(payload);
    }
    Fault::from_panic(payload)
}
