// Copyright (c) 2025 - Cowboy AI, Inc.
//! Outcome - the immutable success/failure value
//!
//! An `Outcome<T, E>` holds exactly one of a success payload or an error
//! payload. Combinators never mutate; each returns a new `Outcome`.
//!
//! # Catch-and-wrap
//!
//! `map`, `map_error`, `bind` and `recover` run their callback inside a panic
//! boundary. A panic becomes a `Failure` carrying a `Fault`, so these
//! combinators require an error type that can hold one (`E: From<Fault>`).
//! `StepError<_>` is such a type:
//!
//! ```rust
//! use cim_pipeline::{Outcome, StepError};
//!
//! let parsed: Outcome<u32, StepError<String>> = Outcome::success("42")
//!     .map(|s: &str| s.parse::<u32>().expect("numeric"));
//! assert_eq!(parsed, Outcome::success(42));
//!
//! let broken: Outcome<u32, StepError<String>> = Outcome::success("x")
//!     .map(|s: &str| s.parse::<u32>().expect("numeric"));
//! assert!(broken.unwrap_error().is_fault());
//! ```
//!
//! # Misuse
//!
//! `unwrap` on a failure and `unwrap_error` on a success are programmer
//! errors. They panic with a `Misuse` payload, which no boundary converts.

use std::panic;

use serde::{Deserialize, Serialize};

use crate::boundary::guard;
use crate::errors::{Fault, Misuse, StepError};

/// Outcome as seen by pipeline consumers: domain errors plus structural failures
pub type StepOutcome<T, E> = Outcome<T, StepError<E>>;

/// Which variant an outcome holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Failure,
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeKind::Success => write!(f, "success"),
            OutcomeKind::Failure => write!(f, "failure"),
        }
    }
}

/// A success payload or an error payload, never both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome<T, E> {
    /// Success payload
    Success(T),
    /// Error payload
    Failure(E),
}

impl<T, E> Outcome<T, E> {
    /// Construct a success
    pub fn success(value: T) -> Self {
        Outcome::Success(value)
    }

    /// Construct a failure
    pub fn failure(error: E) -> Self {
        Outcome::Failure(error)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success(_) => OutcomeKind::Success,
            Outcome::Failure(_) => OutcomeKind::Failure,
        }
    }

    /// Take the success payload
    ///
    /// # Panics
    ///
    /// Panics with `Misuse::UnwrapOnFailure` if this is a failure.
    #[track_caller]
    pub fn unwrap(self) -> T {
        match self {
            Outcome::Success(value) => value,
            Outcome::Failure(_) => panic::panic_any(Misuse::UnwrapOnFailure),
        }
    }

    /// Take the error payload
    ///
    /// # Panics
    ///
    /// Panics with `Misuse::UnwrapOnSuccess` if this is a success.
    #[track_caller]
    pub fn unwrap_error(self) -> E {
        match self {
            Outcome::Success(_) => panic::panic_any(Misuse::UnwrapOnSuccess),
            Outcome::Failure(error) => error,
        }
    }

    pub fn as_success(&self) -> Option<&T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&E> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(error) => Some(error),
        }
    }

    /// Consume into the success payload, discarding any error
    pub fn into_success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    /// Consume into the error payload, discarding any success
    pub fn into_failure(self) -> Option<E> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(error) => Some(error),
        }
    }

    /// Convert into a standard library `Result`
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(error) => Err(error),
        }
    }

    /// Lift a domain outcome into the pipeline channel
    pub fn into_step_outcome(self) -> StepOutcome<T, E> {
        match self {
            Outcome::Success(value) => Outcome::Success(value),
            Outcome::Failure(error) => Outcome::Failure(StepError::Domain(error)),
        }
    }
}

impl<T, E: From<Fault>> Outcome<T, E> {
    /// Apply `f` to a success payload
    ///
    /// A panic inside `f` yields a `Failure` holding the captured `Fault`.
    pub fn map<U, F>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Success(value) => match guard(|| f(value)) {
                Ok(mapped) => Outcome::Success(mapped),
                Err(fault) => Outcome::Failure(fault.into()),
            },
            Outcome::Failure(error) => Outcome::Failure(error),
        }
    }

    /// Chain a fallible step, short-circuiting on failure
    pub fn bind<U, F>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(T) -> Outcome<U, E>,
    {
        match self {
            Outcome::Success(value) => {
                guard(|| f(value)).unwrap_or_else(|fault| Outcome::Failure(fault.into()))
            }
            Outcome::Failure(error) => Outcome::Failure(error),
        }
    }

    /// Replace a failure with the outcome produced by `f`
    pub fn recover<F>(self, f: F) -> Outcome<T, E>
    where
        F: FnOnce(E) -> Outcome<T, E>,
    {
        match self {
            Outcome::Success(value) => Outcome::Success(value),
            Outcome::Failure(error) => {
                guard(|| f(error)).unwrap_or_else(|fault| Outcome::Failure(fault.into()))
            }
        }
    }
}

impl<T, E> Outcome<T, E> {
    /// Apply `f` to an error payload
    ///
    /// A panic inside `f` yields a `Failure` holding the captured `Fault`.
    pub fn map_error<F, G>(self, f: G) -> Outcome<T, F>
    where
        F: From<Fault>,
        G: FnOnce(E) -> F,
    {
        match self {
            Outcome::Success(value) => Outcome::Success(value),
            Outcome::Failure(error) => match guard(|| f(error)) {
                Ok(mapped) => Outcome::Failure(mapped),
                Err(fault) => Outcome::Failure(fault.into()),
            },
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(error) => Outcome::Failure(error),
        }
    }
}

impl<T, E> From<Outcome<T, E>> for Result<T, E> {
    fn from(outcome: Outcome<T, E>) -> Self {
        outcome.into_result()
    }
}

/// Construct a success
pub fn success<T, E>(value: T) -> Outcome<T, E> {
    Outcome::Success(value)
}

/// Construct a failure
pub fn failure<T, E>(error: E) -> Outcome<T, E> {
    Outcome::Failure(error)
}
