// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pipeline Demo
//!
//! Resolves a batch of simulated inventory lookups through the pipeline:
//! each lookup is a `MonoResult` with retry, timeout and logging, and the
//! batch runs through the bounded executor as a `FluxResult`.
//!
//! Run with: cargo run --bin pipeline-demo
//!
//! Tuning (all optional):
//! - PIPELINE_CONCURRENCY, PIPELINE_TIMEOUT_MS (default 200 here)
//! - PIPELINE_RETRY_ATTEMPTS, PIPELINE_RETRY_INITIAL_BACKOFF_MS,
//!   PIPELINE_RETRY_MAX_BACKOFF_MS
//! - DEMO_HOSTS (number of simulated lookups, default 20)

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cim_pipeline::config::ENV_TIMEOUT_MS;
use cim_pipeline::{
    FluxResult, FluxStatistics, MonoResult, Outcome, PipelineConfig, PipelineContext, StepError,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
struct HostRecord {
    host: String,
    rack: u32,
    attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
enum LookupError {
    #[error("Host not found: {0}")]
    NotFound(String),
    #[error("Inventory unavailable: {0}")]
    Unavailable(String),
}

#[derive(Serialize)]
struct Report<'a> {
    config: &'a PipelineConfig,
    statistics: FluxStatistics,
    failures: Vec<String>,
}

/// Simulated inventory service
///
/// Every 4th host is flaky on its first attempt, every 9th overruns `stall`
/// on its first attempt, and every 11th does not exist.
async fn lookup_host(
    index: u32,
    attempts: Arc<AtomicU32>,
    stall: Duration,
) -> Outcome<HostRecord, LookupError> {
    let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
    let host = format!("host-{index:03}");

    tokio::time::sleep(Duration::from_millis(5 + u64::from(index % 3) * 5)).await;

    if index % 11 == 10 {
        return Outcome::failure(LookupError::NotFound(host));
    }
    if index % 9 == 8 && attempt == 1 {
        tokio::time::sleep(stall).await;
    }
    if index % 4 == 3 && attempt == 1 {
        return Outcome::failure(LookupError::Unavailable(host));
    }

    Outcome::success(HostRecord {
        host,
        rack: index / 8,
        attempts: attempt,
    })
}

fn lookup_pipeline(
    index: u32,
    config: &PipelineConfig,
    context: &PipelineContext,
) -> MonoResult<HostRecord, LookupError> {
    let attempts = Arc::new(AtomicU32::new(0));
    let timeout = config.timeout();
    let stall = timeout + Duration::from_millis(50);

    MonoResult::retrying(config.retry_policy(), move || {
        let attempts = attempts.clone();
        MonoResult::from_async_result(move || lookup_host(index, attempts, stall)).timeout(timeout)
    })
    .with_context(context.clone())
    .log_step(format!("lookup host-{index:03}"))
    .on_error_return_result(|error| match error {
        StepError::Domain(LookupError::NotFound(host)) => Outcome::success(HostRecord {
            host,
            rack: 0,
            attempts: 0,
        }),
        StepError::Domain(other) => Outcome::failure(other),
        other => Outcome::failure(LookupError::Unavailable(other.to_string())),
    })
    .log_error("inventory lookup")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("🚀 Starting pipeline demo");

    // Load configuration (short default deadline so stalled lookups fail fast)
    let config = PipelineConfig::from_lookup(|key| {
        std::env::var(key)
            .ok()
            .or_else(|| (key == ENV_TIMEOUT_MS).then(|| "200".to_string()))
    })
    .context("Invalid pipeline configuration")?;
    let hosts: u32 = std::env::var("DEMO_HOSTS")
        .ok()
        .map(|raw| raw.parse())
        .transpose()
        .context("DEMO_HOSTS must be a number")?
        .unwrap_or(20);

    info!("📋 Configuration loaded:");
    info!("  - Concurrency: {}", config.concurrency);
    info!("  - Timeout: {:?}", config.timeout());
    info!("  - Retry attempts: {}", config.retry_attempts);
    info!("  - Hosts: {}", hosts);

    let context = PipelineContext::new("inventory-sync");
    info!("🔗 Correlation id: {}", context.correlation_id());

    let lookups: Vec<_> = (0..hosts)
        .map(|index| lookup_pipeline(index, &config, &context))
        .collect();

    let flux = FluxResult::from_mono_results(lookups, config.concurrency_bound()).await;

    let failures: Vec<String> = flux
        .iter()
        .filter_map(Outcome::as_failure)
        .map(|error| format!("{error:?}"))
        .collect();
    for failure in &failures {
        warn!("❌ {}", failure);
    }

    let retried = flux
        .iter()
        .filter_map(Outcome::as_success)
        .filter(|record| record.attempts > 1)
        .count();
    info!("🔁 Hosts that needed a retry: {}", retried);

    let report = Report {
        config: &config,
        statistics: flux.statistics(),
        failures,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to render report")?
    );

    info!(
        "✅ Resolved {} lookups ({:.0}% successful)",
        flux.count_total(),
        flux.success_rate() * 100.0
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cim_pipeline::config::ENV_RETRY_ATTEMPTS;

    fn single_attempt_config() -> PipelineConfig {
        PipelineConfig::from_lookup(|key| match key {
            k if k == ENV_TIMEOUT_MS => Some("20".to_string()),
            k if k == ENV_RETRY_ATTEMPTS => Some("1".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_lookup_reports_unavailable() {
        let config = single_attempt_config();
        let context = PipelineContext::new("inventory-test");

        let outcome = lookup_pipeline(8, &config, &context).to_result().await;

        assert_eq!(
            outcome.unwrap_error(),
            StepError::Domain(LookupError::Unavailable(
                "Operation timed out after 20ms".to_string()
            ))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_host_falls_back_to_placeholder() {
        let config = single_attempt_config();
        let context = PipelineContext::new("inventory-test");

        let record = lookup_pipeline(10, &config, &context)
            .to_result()
            .await
            .unwrap();

        assert_eq!(record.host, "host-010");
        assert_eq!(record.attempts, 0);
    }
}
