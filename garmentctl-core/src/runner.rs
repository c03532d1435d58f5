//! Run orchestration: fixture reset, then the step pipeline, under one
//! wall-clock budget and one store handle that is always closed at the end.

use std::time::Duration;

use sqlx::PgPool;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::fixture;
use crate::report::{RunReport, StepOutcome, StepReport};
use crate::seed::SeedScript;
use crate::steps::{suite, Snapshot, Step};
use crate::store::{create_pool_with_options, GarmentRepo, GarmentStore, MemoryStore};

/// Run the steps in order, threading the row-count snapshot through them.
///
/// A failed step is recorded and the pipeline continues. A step whose
/// failure left the store unusable stops the pipeline with `Aborted`.
pub async fn run_pipeline(
    store: &dyn GarmentStore,
    steps: &[Step],
    report: &mut RunReport,
) -> Result<()> {
    let mut snapshot = Snapshot::capture(store).await?;

    for (i, step) in steps.iter().enumerate() {
        let started = Instant::now();
        let result = step.run(store, &snapshot).await;

        let fatal = match &result {
            Err(failure) if failure.is_fatal() => Some(failure.to_string()),
            _ => None,
        };
        match &result {
            Ok(()) => info!(step = step.name, "passed"),
            Err(failure) => warn!(step = step.name, %failure, "failed"),
        }

        let (after, capture_err) = if step.mutates() && fatal.is_none() {
            match Snapshot::capture(store).await {
                Ok(after) => (after, None),
                Err(err) => (snapshot.clone(), Some(err)),
            }
        } else {
            (snapshot.clone(), None)
        };

        report.steps.push(StepReport::new(
            i + 1,
            step,
            StepOutcome::from(result),
            snapshot,
            after.clone(),
            started.elapsed(),
        ));

        if let Some(reason) = fatal {
            return Err(HarnessError::aborted(step.name, reason));
        }
        if let Some(err) = capture_err {
            return Err(err.into());
        }
        snapshot = after;
    }

    Ok(())
}

async fn connect(config: &HarnessConfig, deadline: Instant) -> Result<PgPool> {
    let database_url = config.require_database_url()?;
    let remaining = deadline.saturating_duration_since(Instant::now());
    let connecting =
        create_pool_with_options(database_url, config.max_connections, Some(remaining));

    match tokio::time::timeout_at(deadline, connecting).await {
        Ok(Ok(pool)) => Ok(pool),
        Ok(Err(err)) => Err(HarnessError::Store(err.into())),
        Err(_) => Err(HarnessError::timeout(config.timeout)),
    }
}

/// Reset the fixture and run the full suite against PostgreSQL.
///
/// Connecting counts against the same deadline as the run itself.
pub async fn run_suite(config: &HarnessConfig) -> Result<RunReport> {
    config.require_database_url()?;
    let seed = SeedScript::load(&config.seed_path).await?;

    let deadline = Instant::now() + config.timeout;
    let pool = connect(config, deadline).await?;
    let repo = GarmentRepo::new(&pool);

    let result = execute_until(&repo, &seed, config.timeout, deadline, "postgres").await;
    repo.close().await;
    info!("connection pool closed");
    result
}

/// Run only the fixture loader against PostgreSQL, returning the row count.
pub async fn reset_database(config: &HarnessConfig) -> Result<i64> {
    config.require_database_url()?;
    let seed = SeedScript::load(&config.seed_path).await?;

    let deadline = Instant::now() + config.timeout;
    let pool = connect(config, deadline).await?;
    let repo = GarmentRepo::new(&pool);
    let result = tokio::time::timeout_at(deadline, fixture::reset(&repo, &seed))
        .await
        .unwrap_or_else(|_| Err(HarnessError::timeout(config.timeout)));
    repo.close().await;
    result
}

/// Create the `garment` table from the configured schema script.
pub async fn create_schema(config: &HarnessConfig) -> Result<()> {
    let deadline = Instant::now() + config.timeout;
    let pool = connect(config, deadline).await?;
    let repo = GarmentRepo::new(&pool);
    let result = tokio::time::timeout_at(
        deadline,
        fixture::apply_schema(&repo, &config.schema_path),
    )
    .await
    .unwrap_or_else(|_| Err(HarnessError::timeout(config.timeout)));
    repo.close().await;
    result
}

/// Same run against an in-memory table loaded from the seed script.
pub async fn run_suite_in_memory(config: &HarnessConfig) -> Result<RunReport> {
    let seed = SeedScript::load(&config.seed_path).await?;
    let store = MemoryStore::new();

    let result = execute(&store, &seed, config.timeout, "memory").await;
    store.close().await;
    result
}

/// Errors before the pipeline starts (reset, timeout during reset) are
/// returned; anything after is recorded on the report so partial results
/// survive.
pub async fn execute(
    store: &dyn GarmentStore,
    seed: &SeedScript,
    timeout: Duration,
    backend: &str,
) -> Result<RunReport> {
    execute_until(store, seed, timeout, Instant::now() + timeout, backend).await
}

/// `execute` against a deadline that may already be partly spent.
async fn execute_until(
    store: &dyn GarmentStore,
    seed: &SeedScript,
    timeout: Duration,
    deadline: Instant,
    backend: &str,
) -> Result<RunReport> {
    let mut report = RunReport::new(backend);
    let steps = suite();
    let started = Instant::now();
    info!(run_id = %report.run_id, backend, ?timeout, "starting run");

    let outcome = tokio::time::timeout_at(deadline, async {
        report.baseline = Some(fixture::reset(store, seed).await?);
        run_pipeline(store, &steps, &mut report).await
    })
    .await;
    report.elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) if report.baseline.is_some() => report.error = Some(err.to_string()),
        Ok(Err(err)) => return Err(err),
        Err(_) if report.baseline.is_some() => {
            report.error = Some(HarnessError::timeout(timeout).to_string())
        }
        Err(_) => return Err(HarnessError::timeout(timeout)),
    }

    info!(
        passed = report.passed(),
        failed = report.failed(),
        elapsed_ms = report.elapsed_ms,
        "run finished"
    );
    Ok(report)
}
