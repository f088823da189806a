//! Mock implementations for testing

mod client;
mod reporter;

pub use client::MockRouterClient;
pub use reporter::{RecordingReporter, ReportEvent};
