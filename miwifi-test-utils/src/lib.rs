//! Test utilities for the MiWiFi core
//!
//! Mock router clients with scripted latency and failures, a reporter that
//! records events, and builders for realistic router payloads.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::RouterDataBuilder;
pub use mocks::{MockRouterClient, RecordingReporter, ReportEvent};
