//! Fixed-width worker pool
//!
//! Workers pull [`Task`]s from one shared queue and push a [`TaskResult`] per
//! task onto the result channel, in completion order. A task's error travels
//! inside its result and never affects other tasks. Every task accepted into
//! the queue of a started pool yields exactly one result before the result
//! channel closes.

use crate::context::{FetchContext, wait_stopped};
use crate::error::{Error, FetchError, Result};
use futures::future::BoxFuture;
use log::{debug, trace, warn};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A unit of work identified by its position in the submitted batch
pub struct Task<T> {
    pub id: usize,
    work: BoxFuture<'static, Result<T>>,
}

impl<T> Task<T> {
    /// Wrap a future as a task; it does not run until a worker picks it up
    pub fn new<F>(id: usize, work: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            id,
            work: Box::pin(work),
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("id", &self.id).finish()
    }
}

/// Outcome of one task
#[derive(Debug)]
pub struct TaskResult<T> {
    pub id: usize,
    pub outcome: Result<T>,
    pub elapsed: Duration,
}

impl<T> TaskResult<T> {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Pool of `workers` tasks sharing one queue
pub struct WorkerPool<T> {
    workers: usize,
    task_tx: StdMutex<Option<mpsc::Sender<Task<T>>>>,
    task_rx: Arc<Mutex<mpsc::Receiver<Task<T>>>>,
    result_tx: StdMutex<Option<mpsc::UnboundedSender<TaskResult<T>>>>,
    result_rx: mpsc::UnboundedReceiver<TaskResult<T>>,
    shutdown: watch::Sender<bool>,
    handles: StdMutex<Vec<JoinHandle<()>>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Create a pool with a queue of `workers * 2` pending tasks
    pub fn new(workers: usize) -> Self {
        Self::with_capacity(workers, workers.max(1) * 2)
    }

    /// Create a pool with an explicit queue capacity
    ///
    /// Results are buffered without bound until read.
    pub fn with_capacity(workers: usize, capacity: usize) -> Self {
        let workers = workers.max(1);
        let capacity = capacity.max(1);
        let (task_tx, task_rx) = mpsc::channel(capacity);
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);

        Self {
            workers,
            task_tx: StdMutex::new(Some(task_tx)),
            task_rx: Arc::new(Mutex::new(task_rx)),
            result_tx: StdMutex::new(Some(result_tx)),
            result_rx,
            shutdown,
            handles: StdMutex::new(Vec::new()),
        }
    }

    /// Number of worker loops
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Launch the worker loops; calling it again while running is a no-op
    ///
    /// Outside a tokio runtime nothing is started.
    pub fn start(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime, worker pool not started");
            return;
        };

        let result_tx = lock(&self.result_tx).clone();
        let Some(result_tx) = result_tx else {
            debug!("Worker pool already stopped, not starting");
            return;
        };

        let mut handles = lock(&self.handles);
        if !handles.is_empty() {
            return;
        }

        for worker_id in 0..self.workers {
            handles.push(runtime.spawn(run_worker(
                worker_id,
                self.task_rx.clone(),
                result_tx.clone(),
            )));
        }
        debug!("Started worker pool with {} workers", self.workers);
    }

    /// Enqueue a task
    ///
    /// Waits while the queue is full. Once the pool is stopping the task is
    /// dropped without running.
    pub async fn submit(&self, task: Task<T>) {
        let task_tx = lock(&self.task_tx).clone();
        let Some(task_tx) = task_tx else {
            trace!("Worker pool stopping, dropping task {}", task.id);
            return;
        };

        let mut shutdown = self.shutdown.subscribe();
        tokio::select! {
            sent = task_tx.send(task) => {
                if let Err(rejected) = sent {
                    trace!("Worker pool queue closed, dropping task {}", rejected.0.id);
                }
            }
            _ = wait_stopped(&mut shutdown) => {
                trace!("Worker pool stopping, submit abandoned");
            }
        }
    }

    /// Result channel, in completion order
    ///
    /// The channel closes once the pool is stopped and every worker has exited.
    pub fn results(&mut self) -> &mut mpsc::UnboundedReceiver<TaskResult<T>> {
        &mut self.result_rx
    }

    /// Stop the pool
    ///
    /// Signals cancellation, which rejects further submits and releases any
    /// submit still waiting for queue space. Then closes the queue, waits for
    /// the workers to run every task already queued, and only then closes the
    /// result channel. Tasks that need to end early must watch their own
    /// cancellation signal.
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);
        self.shutdown_and_join().await;
    }

    /// Graceful stop: close the queue, let workers drain it, then close results
    ///
    /// Unlike [`stop`](Self::stop), submits already waiting for queue space are
    /// still accepted.
    pub async fn close(&self) {
        self.shutdown_and_join().await;
    }

    async fn shutdown_and_join(&self) {
        drop(lock(&self.task_tx).take());

        let handles = std::mem::take(&mut *lock(&self.handles));
        for handle in handles {
            if let Err(e) = handle.await {
                debug!("Worker task ended abnormally: {e}");
            }
        }

        drop(lock(&self.result_tx).take());
        debug!("Worker pool stopped");
    }
}

impl<T> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        // The queue and result channel close with the pool; workers exit after
        // their current task
        self.shutdown.send_replace(true);
    }
}

fn lock<V>(mutex: &StdMutex<V>) -> std::sync::MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn run_worker<T: Send + 'static>(
    worker_id: usize,
    queue: Arc<Mutex<mpsc::Receiver<Task<T>>>>,
    results: mpsc::UnboundedSender<TaskResult<T>>,
) {
    trace!("Worker {worker_id} started");

    loop {
        let next = queue.lock().await.recv().await;
        let Some(Task { id, work }) = next else {
            break;
        };
        if results.is_closed() {
            trace!("Worker {worker_id} dropping task {id}, nobody reads results");
            break;
        }

        let start = Instant::now();
        let outcome = work.await;
        let result = TaskResult {
            id,
            outcome,
            elapsed: start.elapsed(),
        };
        trace!("Worker {worker_id} finished task {id} in {:?}", result.elapsed);

        if results.send(result).is_err() {
            break;
        }
    }

    trace!("Worker {worker_id} exited");
}

/// Why result collection stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    /// The timeout or the context deadline elapsed
    TimedOut,
    /// The context was cancelled explicitly
    Cancelled,
}

/// Results gathered by [`execute_with_timeout`]
#[derive(Debug)]
pub struct Collected<T> {
    /// Results in arrival order
    pub results: Vec<TaskResult<T>>,
    /// Number of tasks submitted
    pub total: usize,
    /// Collection timeout that was applied
    pub timeout: Duration,
    /// Set when collection ended before every result arrived
    pub interruption: Option<Interruption>,
}

impl<T> Collected<T> {
    /// Number of results received
    pub fn received(&self) -> usize {
        self.results.len()
    }

    /// Round-level error, if collection was interrupted
    pub fn interruption_error(&self) -> Option<FetchError> {
        match self.interruption? {
            Interruption::TimedOut => Some(FetchError::timeout(
                self.received(),
                self.total,
                self.timeout,
            )),
            Interruption::Cancelled => Some(FetchError::Cancelled),
        }
    }

    /// Results placed at their task id
    pub fn into_slots(self) -> Vec<Option<TaskResult<T>>> {
        let mut slots: Vec<Option<TaskResult<T>>> = (0..self.total).map(|_| None).collect();
        for result in self.results {
            if let Some(slot) = slots.get_mut(result.id) {
                *slot = Some(result);
            }
        }
        slots
    }
}

/// Run `tasks` on a pool of `min(tasks, max_workers)` workers and collect
/// results until all arrive, `timeout` elapses, or `ctx` fires
///
/// Task ids are reassigned to their position in `tasks`. Results that did
/// arrive are always returned.
pub async fn execute_with_timeout<T: Send + 'static>(
    ctx: &FetchContext,
    tasks: Vec<Task<T>>,
    timeout: Duration,
    max_workers: usize,
) -> Collected<T> {
    let total = tasks.len();
    let mut collected = Collected {
        results: Vec::with_capacity(total),
        total,
        timeout,
        interruption: None,
    };
    if total == 0 {
        return collected;
    }

    // Tasks run under a round context so leftovers end as soon as
    // collection stops
    let (round_ctx, abort) = ctx.with_timeout(timeout).with_cancel();

    let mut pool = WorkerPool::with_capacity(total.min(max_workers.max(1)), total);
    pool.start();

    for (index, task) in tasks.into_iter().enumerate() {
        let task_ctx = round_ctx.clone();
        let work = task.work;
        pool.submit(Task::new(index, async move { task_ctx.run(work).await }))
            .await;
    }

    let mut seen = vec![false; total];

    while collected.received() < total {
        tokio::select! {
            biased;
            _ = round_ctx.cancelled() => {
                collected.interruption = Some(interruption_for(&round_ctx));
                break;
            }
            next = pool.results().recv() => {
                let Some(result) = next else {
                    break;
                };
                // A task cut short by the round context is not a real result
                if round_ctx.is_cancelled()
                    && result.outcome.as_ref().err().is_some_and(Error::is_cancellation)
                {
                    collected.interruption = Some(interruption_for(&round_ctx));
                    break;
                }
                match seen.get_mut(result.id) {
                    Some(seen_id) if !*seen_id => {
                        *seen_id = true;
                        collected.results.push(result);
                    }
                    _ => debug!("Ignoring unexpected result for task {}", result.id),
                }
            }
        }
    }

    abort.cancel();
    pool.stop().await;
    collected
}

fn interruption_for(ctx: &FetchContext) -> Interruption {
    match ctx.cancellation_error() {
        FetchError::Cancelled => Interruption::Cancelled,
        _ => Interruption::TimedOut,
    }
}
