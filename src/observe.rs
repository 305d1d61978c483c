// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pipeline Observation
//!
//! The logging hooks on `MonoResult` (`log_step`, `log_error`,
//! `log_performance`) never alter an outcome. They report what they saw to a
//! `PipelineObserver` as a `StepEvent`.
//!
//! # Context
//!
//! Correlation data travels with the pipeline as an explicit
//! `PipelineContext` value rather than through thread-local state:
//!
//! ```text
//! PipelineContext { operation, correlation_id, observer }
//!        │
//!        ▼
//! MonoResult ──map──> MonoResult ──log_step──> MonoResult
//!   (ctx)               (ctx)          │          (ctx)
//!                                      ▼
//!                              observer.on_event(StepEvent)
//! ```
//!
//! # Observers
//!
//! - `TracingObserver` (default): forwards events to `tracing`
//! - `CollectingObserver`: keeps events in memory

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::outcome::OutcomeKind;

/// What produced a `StepEvent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepEventKind {
    /// Emitted by `log_step` for every resolution
    Step,
    /// Emitted by `log_error` for failed resolutions only
    Error,
    /// Emitted by `log_performance`
    Performance {
        threshold: Duration,
        exceeded: bool,
    },
}

/// A single observation of a resolved step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    /// Operation the pipeline belongs to
    pub operation: String,
    /// Correlation id shared by every step of the pipeline
    pub correlation_id: Uuid,
    /// Step name (or error context for `log_error`)
    pub step: String,
    pub kind: StepEventKind,
    pub outcome: OutcomeKind,
    /// Time from the start of this step's resolution to its outcome
    pub elapsed: Duration,
    /// Rendered error, if the outcome was a failure
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Sink for step events
///
/// Implementations must not block for long; they run inline with the
/// resolving task.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &StepEvent);
}

/// Observer that forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &StepEvent) {
        let elapsed_ms = event.elapsed.as_millis() as u64;

        match (&event.kind, event.outcome) {
            (StepEventKind::Step, OutcomeKind::Success) => debug!(
                operation = %event.operation,
                correlation_id = %event.correlation_id,
                step = %event.step,
                elapsed_ms,
                "Step succeeded"
            ),
            (StepEventKind::Step, OutcomeKind::Failure) => warn!(
                operation = %event.operation,
                correlation_id = %event.correlation_id,
                step = %event.step,
                elapsed_ms,
                error = event.error.as_deref().unwrap_or_default(),
                "Step failed"
            ),
            (StepEventKind::Error, _) => error!(
                operation = %event.operation,
                correlation_id = %event.correlation_id,
                context = %event.step,
                elapsed_ms,
                error = event.error.as_deref().unwrap_or_default(),
                "Pipeline error"
            ),
            (StepEventKind::Performance { threshold, exceeded: true }, _) => warn!(
                operation = %event.operation,
                correlation_id = %event.correlation_id,
                step = %event.step,
                elapsed_ms,
                threshold_ms = threshold.as_millis() as u64,
                "Slow operation"
            ),
            (StepEventKind::Performance { .. }, _) => debug!(
                operation = %event.operation,
                correlation_id = %event.correlation_id,
                step = %event.step,
                elapsed_ms,
                "Operation within threshold"
            ),
        }
    }
}

/// Observer that records every event in memory
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<StepEvent>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<StepEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Take all recorded events, leaving the collector empty
    pub fn take_events(&self) -> Vec<StepEvent> {
        std::mem::take(
            &mut *self
                .events
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PipelineObserver for CollectingObserver {
    fn on_event(&self, event: &StepEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

/// Correlation context carried by every `MonoResult`
#[derive(Clone)]
pub struct PipelineContext {
    operation: Arc<str>,
    correlation_id: Uuid,
    observer: Arc<dyn PipelineObserver>,
}

impl PipelineContext {
    /// Create a context with a fresh correlation id and the tracing observer
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Arc::from(operation.into()),
            correlation_id: Uuid::now_v7(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the observer
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replace the correlation id (e.g. one received from an upstream caller)
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub(crate) fn emit(
        &self,
        step: &str,
        kind: StepEventKind,
        outcome: OutcomeKind,
        elapsed: Duration,
        error: Option<String>,
    ) {
        let event = StepEvent {
            operation: self.operation.to_string(),
            correlation_id: self.correlation_id,
            step: step.to_string(),
            kind,
            outcome,
            elapsed,
            error,
            recorded_at: Utc::now(),
        };
        self.observer.on_event(&event);
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new("pipeline")
    }
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineContext")
            .field("operation", &self.operation)
            .field("correlation_id", &self.correlation_id)
            .finish_non_exhaustive()
    }
}
