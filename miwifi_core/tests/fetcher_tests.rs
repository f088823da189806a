//! Integration tests for the concurrent data fetcher
//!
//! Time is paused in every test, so delays are simulated and deterministic.

use miwifi_core::concurrent::{DataFetcher, FetcherConfig};
use miwifi_core::error::FetchError;
use miwifi_core::{Error, FetchContext, RouterField};
use miwifi_test_utils::{MockRouterClient, RecordingReporter, ReportEvent};
use std::sync::Arc;
use std::time::Duration;

fn fetcher(timeout: Duration, reporter: Arc<RecordingReporter>) -> DataFetcher {
    DataFetcher::with_reporter(
        FetcherConfig {
            timeout,
            max_retries: 3,
            retry_delay: Duration::from_millis(10),
            max_workers: 4,
        },
        reporter,
    )
}

#[cfg(test)]
mod fetch_round_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_all_operations_succeed() {
        let reporter = Arc::new(RecordingReporter::new());
        let client = Arc::new(MockRouterClient::new().with_delays_ms([5, 10, 15, 20]));

        let snapshot = fetcher(Duration::from_secs(30), reporter.clone())
            .fetch_data(&FetchContext::background(), client.clone())
            .await
            .unwrap();

        assert!(snapshot.is_complete());
        assert_eq!(snapshot.device_list.unwrap().list.len(), 3);
        assert_eq!(client.total_calls(), 4);
        assert_eq!(
            reporter.events(),
            vec![
                ReportEvent::FetchStarted,
                ReportEvent::FetchCompleted {
                    timed_out: false,
                    completed_tasks: 4,
                    failed: false,
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_arrived_fields() {
        let reporter = Arc::new(RecordingReporter::new());
        let client = Arc::new(MockRouterClient::new().with_delays_ms([10, 20, 30, 1_000]));

        let partial = fetcher(Duration::from_millis(50), reporter)
            .fetch_data(&FetchContext::background(), client)
            .await
            .unwrap_err();

        assert!(partial.is_timeout());
        assert!(matches!(
            partial.error,
            Error::Fetch(FetchError::Timeout {
                received: 3,
                total: 4,
                ..
            })
        ));
        assert_eq!(partial.snapshot.populated_count(), 3);
        assert_eq!(
            partial.snapshot.missing_fields(),
            vec![RouterField::WifiDetails]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_takes_about_the_timeout() {
        let client = Arc::new(MockRouterClient::new().with_delays_ms([10, 20, 30, 1_000]));
        let fetcher = fetcher(Duration::from_millis(50), Arc::new(RecordingReporter::new()));

        let report = fetcher
            .timed_fetch(&FetchContext::background(), client)
            .await;

        assert!(report.timed_out);
        assert!(report.duration >= Duration::from_millis(50));
        assert!(report.duration < Duration::from_millis(1_000));
        assert_eq!(report.progress.total_tasks, 4);
        assert_eq!(report.progress.completed_tasks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_operation_yields_aggregate_error() {
        let reporter = Arc::new(RecordingReporter::new());
        let client = Arc::new(MockRouterClient::new().failing(RouterField::DeviceList));

        let partial = fetcher(Duration::from_secs(30), reporter.clone())
            .fetch_data(&FetchContext::background(), client.clone())
            .await
            .unwrap_err();

        assert!(!partial.is_timeout());
        assert_eq!(partial.snapshot.populated_count(), 3);
        assert!(!partial.snapshot.contains(RouterField::DeviceList));
        assert_eq!(client.calls(RouterField::DeviceList), 3);
        assert_eq!(
            reporter.retries(),
            vec![(RouterField::DeviceList, 1), (RouterField::DeviceList, 2)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_recovers_within_retries() {
        let client = Arc::new(MockRouterClient::new().failing_times(RouterField::WanInfo, 2));

        let snapshot = fetcher(Duration::from_secs(30), Arc::new(RecordingReporter::new()))
            .fetch_data(&FetchContext::background(), client.clone())
            .await
            .unwrap();

        assert!(snapshot.is_complete());
        assert_eq!(client.calls(RouterField::WanInfo), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_cancellation_stops_round() {
        let client = Arc::new(MockRouterClient::new().with_delays_ms([5, 5_000, 5_000, 5_000]));
        let (ctx, handle) = FetchContext::background().with_cancel();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        let partial = fetcher(Duration::from_secs(30), Arc::new(RecordingReporter::new()))
            .fetch_data(&ctx, client)
            .await
            .unwrap_err();

        assert!(matches!(partial.error, Error::Fetch(FetchError::Cancelled)));
        assert!(partial.snapshot.contains(RouterField::SystemStatus));
        assert_eq!(partial.snapshot.populated_count(), 1);
        canceller.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_worker_still_fetches_everything() {
        let client = Arc::new(MockRouterClient::new().with_delays_ms([5, 5, 5, 5]));
        let fetcher = DataFetcher::with_reporter(
            FetcherConfig {
                max_workers: 1,
                ..FetcherConfig::default()
            },
            Arc::new(RecordingReporter::new()),
        );

        let report = fetcher
            .timed_fetch(&FetchContext::background(), client)
            .await;
        assert!(report.is_success());
        // four sequential calls on one worker
        assert!(report.duration >= Duration::from_millis(20));
    }
}
