// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-pipeline
//!
//! Provides deterministic pipeline sources shared by the integration tests.
//!
//! # Design Principles
//! - Correlation ids are fixed constants, never `Uuid::now_v7()`
//! - Delays are expressed in milliseconds and meant for a paused clock
//! - Call counters are returned alongside sources so tests can assert how
//!   often a computation actually ran
#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use cim_pipeline::{CollectingObserver, MonoResult, Outcome, PipelineContext};

pub const CORRELATION_ID_1: &str = "01934f4a-c001-7000-8000-00000000c001";

/// Domain error used throughout the integration tests
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("Host not found: {0}")]
    NotFound(String),

    #[error("Inventory unavailable (attempt {0})")]
    Unavailable(u32),
}

pub type Lookup = MonoResult<u64, InventoryError>;

/// Parse the fixed correlation id
pub fn correlation_id() -> Uuid {
    Uuid::parse_str(CORRELATION_ID_1).expect("Invalid UUID in test fixture")
}

/// Context with the fixed correlation id, recording every event
pub fn recorded_context(operation: &str) -> (PipelineContext, Arc<CollectingObserver>) {
    let observer = Arc::new(CollectingObserver::new());
    let context = PipelineContext::new(operation)
        .with_correlation_id(correlation_id())
        .with_observer(observer.clone());
    (context, observer)
}

/// Lookup that succeeds with `value` after `delay_ms`
pub fn delayed(value: u64, delay_ms: u64) -> Lookup {
    MonoResult::from_async_result(move || async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Outcome::success(value)
    })
}

/// Lookup that fails with `NotFound(host)` after `delay_ms`
pub fn missing(host: &str, delay_ms: u64) -> Lookup {
    let host = host.to_string();
    MonoResult::from_async_result(move || async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Outcome::failure(InventoryError::NotFound(host))
    })
}

/// Factory whose lookups fail until the `succeed_on`-th invocation
///
/// Each produced lookup records one invocation in the returned counter.
pub fn flaky_factory(succeed_on: u32) -> (impl Fn() -> Lookup + Send + Sync + 'static, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = calls.clone();

    let factory = move || {
        let seen = seen.clone();
        MonoResult::from_async_result(move || async move {
            let attempt = seen.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt >= succeed_on {
                Outcome::success(u64::from(attempt))
            } else {
                Outcome::failure(InventoryError::Unavailable(attempt))
            }
        })
    };

    (factory, calls)
}

/// Read a call counter
pub fn calls(counter: &AtomicU32) -> u32 {
    counter.load(Ordering::SeqCst)
}
