//! Bounded concurrency for router fetches
//!
//! - [`worker_pool`]: fixed-width pool executing fallible tasks
//! - [`retry`]: per-operation retry with a cancellable fixed delay
//! - [`fetcher`]: four-way fan-out/fan-in producing a [`RouterDataSnapshot`](crate::snapshot::RouterDataSnapshot)

pub mod fetcher;
pub mod retry;
pub mod worker_pool;

pub use fetcher::{DataFetcher, FetchProgress, FetchReport, FetcherConfig};
pub use retry::{RetryPolicy, fetch_with_retry};
pub use worker_pool::{Collected, Interruption, Task, TaskResult, WorkerPool, execute_with_timeout};
