// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for pipeline operations
//!
//! The pipeline carries failures through a single channel, `StepError<E>`,
//! which wraps the caller's domain error `E` alongside the structural
//! failures the pipeline itself can produce:
//!
//! ```text
//! StepError<E>
//!   ├── Domain(E)                  produced deliberately by a business step
//!   ├── Fault(Fault)               a panic caught at a callback boundary
//!   ├── Timeout(TimeoutExceeded)   injected when a deadline elapses
//!   └── Cancelled(String)          a sibling failed under CancelSiblings
//! ```
//!
//! `Misuse` is deliberately not part of that channel. It is the payload of
//! the panic raised by `Outcome::unwrap` on a failure (and its mirror image),
//! and the pipeline re-raises it instead of converting it into a value.

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

/// Failure channel of every pipeline step
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError<E> {
    /// Error produced deliberately by a business step
    #[error("{0}")]
    Domain(E),

    /// Unexpected fault raised inside a user callback
    #[error("{0}")]
    Fault(Fault),

    /// Deadline elapsed before the step resolved
    #[error("{0}")]
    Timeout(TimeoutExceeded),

    /// Step was cancelled before it could resolve
    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

impl<E> StepError<E> {
    /// Wrap a domain error
    pub fn domain_error(error: E) -> Self {
        StepError::Domain(error)
    }

    /// Build a cancellation error with the given reason
    pub fn cancelled(reason: impl Into<String>) -> Self {
        StepError::Cancelled(reason.into())
    }

    /// True if this is a domain error
    pub fn is_domain(&self) -> bool {
        matches!(self, StepError::Domain(_))
    }

    /// True if this is a caught fault
    pub fn is_fault(&self) -> bool {
        matches!(self, StepError::Fault(_))
    }

    /// True if a deadline elapsed
    pub fn is_timeout(&self) -> bool {
        matches!(self, StepError::Timeout(_))
    }

    /// True if the step was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StepError::Cancelled(_))
    }

    /// Borrow the domain error, if any
    pub fn domain(&self) -> Option<&E> {
        match self {
            StepError::Domain(e) => Some(e),
            _ => None,
        }
    }

    /// Take the domain error, if any
    pub fn into_domain(self) -> Option<E> {
        match self {
            StepError::Domain(e) => Some(e),
            _ => None,
        }
    }

    /// Transform the domain error, leaving structural failures untouched
    pub fn map_domain<F, G>(self, f: G) -> StepError<F>
    where
        G: FnOnce(E) -> F,
    {
        match self {
            StepError::Domain(e) => StepError::Domain(f(e)),
            StepError::Fault(fault) => StepError::Fault(fault),
            StepError::Timeout(timeout) => StepError::Timeout(timeout),
            StepError::Cancelled(reason) => StepError::Cancelled(reason),
        }
    }
}

impl<E> From<Fault> for StepError<E> {
    fn from(fault: Fault) -> Self {
        StepError::Fault(fault)
    }
}

impl<E> From<TimeoutExceeded> for StepError<E> {
    fn from(timeout: TimeoutExceeded) -> Self {
        StepError::Timeout(timeout)
    }
}

/// A panic captured at a callback boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unexpected fault: {message}")]
pub struct Fault {
    message: String,
}

impl Fault {
    /// Create a fault with an explicit message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Recover a message from a panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };

        Self { message }
    }

    /// The captured panic message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A deadline elapsed before the wrapped computation resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Operation timed out after {duration:?}")]
pub struct TimeoutExceeded {
    /// The configured deadline
    pub duration: Duration,
}

impl TimeoutExceeded {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

/// Programmer error raised by unwrapping the wrong variant
///
/// Raised with `std::panic::panic_any`, so callers can downcast the panic
/// payload to this type. The pipeline never converts it into a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Misuse {
    /// `unwrap` called on a failure
    #[error("UnwrapOnFailure: called `Outcome::unwrap()` on a Failure")]
    UnwrapOnFailure,

    /// `unwrap_error` called on a success
    #[error("UnwrapOnSuccess: called `Outcome::unwrap_error()` on a Success")]
    UnwrapOnSuccess,
}

/// Errors that can occur while loading pipeline configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// Parsed values are inconsistent with each other
    #[error("Configuration error: {0}")]
    Inconsistent(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Deserialization(err.to_string())
    }
}
