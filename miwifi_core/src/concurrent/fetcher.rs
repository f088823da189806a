//! Concurrent fetch of the four router artifacts
//!
//! One fetch round submits a task per [`RouterField`] to a worker pool, gives
//! each task its own retry loop, and aggregates whatever comes back within the
//! timeout into a [`RouterDataSnapshot`].

use crate::client::{RouterClient, fetch_field};
use crate::concurrent::retry::{RetryPolicy, fetch_with_retry};
use crate::concurrent::worker_pool::{Task, execute_with_timeout};
use crate::context::FetchContext;
use crate::error::{Error, PartialFetch};
use crate::logging::{LogReporter, Reporter};
use crate::snapshot::{RouterArtifact, RouterDataSnapshot, RouterField};
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Fetcher tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Bound on a whole round, retries included
    pub timeout: Duration,
    /// Attempts per operation including the first
    pub max_retries: u32,
    /// Pause between attempts
    pub retry_delay: Duration,
    /// Upper bound on concurrent operations
    pub max_workers: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            max_workers: 4,
        }
    }
}

impl FetcherConfig {
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            delay: self.retry_delay,
        }
    }
}

/// Task bookkeeping for one round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchProgress {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub started: Instant,
    pub finished: Instant,
}

/// Everything known about a finished round
#[derive(Debug)]
pub struct FetchReport {
    /// Fields that arrived
    pub snapshot: RouterDataSnapshot,
    /// Wall time of the round
    pub duration: Duration,
    /// True when the round hit its timeout
    pub timed_out: bool,
    /// Timeout, cancellation, or the first per-item error by completion order
    pub error: Option<Error>,
    pub progress: FetchProgress,
}

impl FetchReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Collapse into the result shape of [`DataFetcher::fetch_data`]
    pub fn into_result(self) -> Result<RouterDataSnapshot, PartialFetch> {
        match self.error {
            None => Ok(self.snapshot),
            Some(error) => Err(PartialFetch::new(self.snapshot, error)),
        }
    }
}

/// Fans the four router operations out over a bounded worker pool
pub struct DataFetcher {
    config: FetcherConfig,
    reporter: Arc<dyn Reporter>,
}

impl DataFetcher {
    /// Create a fetcher that reports through the `log` facade
    pub fn new(config: FetcherConfig) -> Self {
        Self::with_reporter(config, LogReporter::shared())
    }

    pub fn with_reporter(config: FetcherConfig, reporter: Arc<dyn Reporter>) -> Self {
        Self { config, reporter }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch all four artifacts concurrently
    ///
    /// Returns the complete snapshot only when every operation succeeded. On a
    /// timeout the error is the timeout kind carrying received/total counts;
    /// otherwise it is the first per-item failure. Fields that did arrive are
    /// always in the [`PartialFetch`] snapshot.
    pub async fn fetch_data(
        &self,
        ctx: &FetchContext,
        client: Arc<dyn RouterClient>,
    ) -> Result<RouterDataSnapshot, PartialFetch> {
        self.timed_fetch(ctx, client).await.into_result()
    }

    /// Fetch all four artifacts and describe how the round went
    pub async fn timed_fetch(&self, ctx: &FetchContext, client: Arc<dyn RouterClient>) -> FetchReport {
        self.reporter.fetch_started();
        let started = Instant::now();

        let round_ctx = ctx.with_timeout(self.config.timeout);
        let tasks = RouterField::ALL
            .into_iter()
            .map(|field| self.field_task(&round_ctx, &client, field))
            .collect();

        let collected = execute_with_timeout(
            &round_ctx,
            tasks,
            self.config.timeout,
            self.config.max_workers,
        )
        .await;

        let interruption = collected.interruption_error();
        let total_tasks = collected.total;
        let mut snapshot = RouterDataSnapshot::new();
        let mut first_error = None;
        let mut completed_tasks = 0;
        let mut failed_tasks = 0;

        for result in collected.results {
            match result.outcome {
                Ok(artifact) if artifact.field().id() == result.id => {
                    completed_tasks += 1;
                    snapshot.insert(artifact);
                }
                Ok(artifact) => {
                    debug!(
                        "Discarding {} returned for task {}",
                        artifact.field(),
                        result.id
                    );
                }
                Err(error) => {
                    failed_tasks += 1;
                    first_error.get_or_insert(error);
                }
            }
        }

        let timed_out = interruption
            .as_ref()
            .is_some_and(|error| error.is_timeout());
        let error = interruption.map(Error::from).or(first_error);

        let finished = Instant::now();
        let report = FetchReport {
            snapshot,
            duration: finished - started,
            timed_out,
            error,
            progress: FetchProgress {
                total_tasks,
                completed_tasks,
                failed_tasks,
                started,
                finished,
            },
        };
        self.reporter.fetch_completed(&report);
        report
    }

    fn field_task(
        &self,
        ctx: &FetchContext,
        client: &Arc<dyn RouterClient>,
        field: RouterField,
    ) -> Task<RouterArtifact> {
        let ctx = ctx.clone();
        let client = client.clone();
        let reporter = self.reporter.clone();
        let policy = self.config.retry_policy();

        Task::new(field.id(), async move {
            fetch_with_retry(
                &ctx,
                policy,
                field.operation(),
                |attempt, error| reporter.retry_scheduled(field, attempt, error),
                || fetch_field(&client, &ctx, field),
            )
            .await
        })
    }
}
