//! Background refresher for the router cache

use crate::cache::router_cache::RouterStore;
use crate::client::DataLoader;
use crate::context::{FetchContext, wait_stopped};
use crate::logging::Reporter;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Periodically repopulates a [`RouterStore`] from a loader
///
/// The first round runs one `interval` after spawning. Round failures go to
/// the reporter and never stop the schedule.
pub struct Refresher {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
    interval: Duration,
}

impl Refresher {
    /// Start refreshing on `runtime`; `interval` must be non-zero
    pub fn spawn(
        runtime: &Handle,
        store: RouterStore,
        loader: Arc<DataLoader>,
        interval: Duration,
        round_timeout: Duration,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let handle = runtime.spawn(run_refresher(
            store,
            loader,
            interval,
            round_timeout,
            reporter,
            rx,
        ));
        debug!("Background refresher started, interval {interval:?}");

        Self {
            shutdown,
            handle,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signal the refresher to stop without waiting for it
    pub fn cancel(&self) {
        self.shutdown.send_replace(true);
    }

    /// Stop the refresher and wait for its task to exit
    ///
    /// A round in progress is abandoned; fields it already wrote stay cached.
    pub async fn shutdown(self) {
        self.cancel();
        if let Err(e) = self.handle.await {
            debug!("Background refresher ended abnormally: {e}");
        }
        debug!("Background refresher stopped");
    }
}

async fn run_refresher(
    store: RouterStore,
    loader: Arc<DataLoader>,
    interval: Duration,
    round_timeout: Duration,
    reporter: Arc<dyn Reporter>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = wait_stopped(&mut shutdown) => break,
            _ = ticker.tick() => {}
        }

        let started = Instant::now();
        let ctx = FetchContext::background().with_timeout(round_timeout);

        tokio::select! {
            biased;
            _ = wait_stopped(&mut shutdown) => break,
            result = store.preload_data(&ctx, loader.clone()) => match result {
                Ok(()) => reporter.refresh_completed(started.elapsed()),
                Err(e) => reporter.refresh_failed(&e),
            },
        }
    }
}
