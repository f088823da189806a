//! Injected logging capability
//!
//! The fetcher, the router cache and its background refresher report through a
//! [`Reporter`] handed to them at construction instead of a process-wide
//! logger. [`LogReporter`] forwards to the `log` facade.

use crate::concurrent::fetcher::FetchReport;
use crate::error::Error;
use crate::snapshot::RouterField;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

const LOG_TARGET: &str = "miwifi_core";

/// Sink for fetch and refresh events
pub trait Reporter: Send + Sync {
    /// A fetch round is starting
    fn fetch_started(&self) {}

    /// A fetch round finished, successfully or not
    fn fetch_completed(&self, _report: &FetchReport) {}

    /// An operation failed and will be attempted again
    fn retry_scheduled(&self, _field: RouterField, _attempt: u32, _error: &Error) {}

    /// A background refresh round had at least one failure
    fn refresh_failed(&self, _error: &Error) {}

    /// A background refresh round finished without errors
    fn refresh_completed(&self, _duration: Duration) {}
}

/// Reporter that writes to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl LogReporter {
    pub fn shared() -> Arc<dyn Reporter> {
        Arc::new(Self)
    }
}

impl Reporter for LogReporter {
    fn fetch_started(&self) {
        debug!(target: LOG_TARGET, "Fetching router data");
    }

    fn fetch_completed(&self, report: &FetchReport) {
        match &report.error {
            None => debug!(
                target: LOG_TARGET,
                "Fetched all router data in {:?}", report.duration
            ),
            Some(error) if report.timed_out => warn!(
                target: LOG_TARGET,
                "Router fetch timed out after {:?} with {}/{} fields: {error}",
                report.duration,
                report.progress.completed_tasks,
                report.progress.total_tasks
            ),
            Some(error) => warn!(
                target: LOG_TARGET,
                "Router fetch finished with {}/{} fields: {error}",
                report.progress.completed_tasks,
                report.progress.total_tasks
            ),
        }
    }

    fn retry_scheduled(&self, field: RouterField, attempt: u32, error: &Error) {
        debug!(
            target: LOG_TARGET,
            "{} attempt {attempt} failed (transient: {}): {error}",
            field.operation(),
            error.is_transient()
        );
    }

    fn refresh_failed(&self, error: &Error) {
        warn!(target: LOG_TARGET, "Background refresh failed: {error}");
    }

    fn refresh_completed(&self, duration: Duration) {
        debug!(target: LOG_TARGET, "Background refresh completed in {duration:?}");
    }
}

/// Reporter that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {}
