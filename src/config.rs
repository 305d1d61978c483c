// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pipeline configuration
//!
//! Default policy values for a pipeline, loaded from the environment or
//! from JSON.
//!
//! | Variable                            | Default |
//! |-------------------------------------|---------|
//! | `PIPELINE_CONCURRENCY`              | 8       |
//! | `PIPELINE_TIMEOUT_MS`               | 30000   |
//! | `PIPELINE_RETRY_ATTEMPTS`           | 3       |
//! | `PIPELINE_RETRY_INITIAL_BACKOFF_MS` | 100     |
//! | `PIPELINE_RETRY_MAX_BACKOFF_MS`     | 5000    |

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, ConfigResult};
use crate::policy::{ConcurrencyBound, RetryPolicy, TimeoutPolicy};

pub const ENV_CONCURRENCY: &str = "PIPELINE_CONCURRENCY";
pub const ENV_TIMEOUT_MS: &str = "PIPELINE_TIMEOUT_MS";
pub const ENV_RETRY_ATTEMPTS: &str = "PIPELINE_RETRY_ATTEMPTS";
pub const ENV_RETRY_INITIAL_BACKOFF_MS: &str = "PIPELINE_RETRY_INITIAL_BACKOFF_MS";
pub const ENV_RETRY_MAX_BACKOFF_MS: &str = "PIPELINE_RETRY_MAX_BACKOFF_MS";

/// Policy defaults for a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum in-flight resolutions for batch execution
    pub concurrency: usize,
    /// Per-step deadline in milliseconds
    pub timeout_ms: u64,
    /// Total attempts per step, including the first
    pub retry_attempts: u32,
    pub retry_initial_backoff_ms: u64,
    pub retry_max_backoff_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            timeout_ms: 30_000,
            retry_attempts: 3,
            retry_initial_backoff_ms: 100,
            retry_max_backoff_ms: 5_000,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables keep their defaults; set but unparsable ones are an
    /// error.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            concurrency: parse_var(&lookup, ENV_CONCURRENCY, defaults.concurrency)?,
            timeout_ms: parse_var(&lookup, ENV_TIMEOUT_MS, defaults.timeout_ms)?,
            retry_attempts: parse_var(&lookup, ENV_RETRY_ATTEMPTS, defaults.retry_attempts)?,
            retry_initial_backoff_ms: parse_var(
                &lookup,
                ENV_RETRY_INITIAL_BACKOFF_MS,
                defaults.retry_initial_backoff_ms,
            )?,
            retry_max_backoff_ms: parse_var(
                &lookup,
                ENV_RETRY_MAX_BACKOFF_MS,
                defaults.retry_max_backoff_ms,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.concurrency == 0 {
            return Err(ConfigError::Inconsistent(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Inconsistent(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::Inconsistent(
                "retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry_initial_backoff_ms > self.retry_max_backoff_ms {
            return Err(ConfigError::Inconsistent(format!(
                "retry_initial_backoff_ms ({}) exceeds retry_max_backoff_ms ({})",
                self.retry_initial_backoff_ms, self.retry_max_backoff_ms
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Exponential retry policy built from the retry settings
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.retry_attempts,
            Duration::from_millis(self.retry_initial_backoff_ms),
            Duration::from_millis(self.retry_max_backoff_ms),
        )
    }

    pub fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(self.timeout())
    }

    pub fn concurrency_bound(&self) -> ConcurrencyBound {
        ConcurrencyBound::new(self.concurrency)
    }
}

fn parse_var<F, V>(lookup: &F, key: &str, default: V) -> ConfigResult<V>
where
    F: Fn(&str) -> Option<String>,
    V: FromStr,
    V::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|err: V::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
            reason: err.to_string(),
        }),
    }
}
