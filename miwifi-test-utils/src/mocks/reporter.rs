//! Reporter that records every event

use miwifi_core::concurrent::FetchReport;
use miwifi_core::{Error, Reporter, RouterField};
use std::sync::Mutex;
use std::time::Duration;

/// One recorded reporter call
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    FetchStarted,
    FetchCompleted {
        timed_out: bool,
        completed_tasks: usize,
        failed: bool,
    },
    RetryScheduled {
        field: RouterField,
        attempt: u32,
    },
    RefreshFailed(String),
    RefreshCompleted(Duration),
}

/// Collects reporter events for later assertions
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn retries(&self) -> Vec<(RouterField, u32)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::RetryScheduled { field, attempt } => Some((field, attempt)),
                _ => None,
            })
            .collect()
    }

    pub fn refresh_completed_count(&self) -> usize {
        self.count(|event| matches!(event, ReportEvent::RefreshCompleted(_)))
    }

    pub fn refresh_failed_count(&self) -> usize {
        self.count(|event| matches!(event, ReportEvent::RefreshFailed(_)))
    }

    fn count(&self, predicate: impl Fn(&ReportEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }

    fn record(&self, event: ReportEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Reporter for RecordingReporter {
    fn fetch_started(&self) {
        self.record(ReportEvent::FetchStarted);
    }

    fn fetch_completed(&self, report: &FetchReport) {
        self.record(ReportEvent::FetchCompleted {
            timed_out: report.timed_out,
            completed_tasks: report.progress.completed_tasks,
            failed: report.error.is_some(),
        });
    }

    fn retry_scheduled(&self, field: RouterField, attempt: u32, _error: &Error) {
        self.record(ReportEvent::RetryScheduled { field, attempt });
    }

    fn refresh_failed(&self, error: &Error) {
        self.record(ReportEvent::RefreshFailed(error.to_string()));
    }

    fn refresh_completed(&self, duration: Duration) {
        self.record(ReportEvent::RefreshCompleted(duration));
    }
}
