//! Worker pool dispatcher
//!
//! One dispatcher task owns the source and a fixed set of worker tasks.
//!
//! Flow:
//! 1. A worker announces itself on the shared idle channel
//! 2. The dispatcher takes that worker id, then pulls the next item
//! 3. The item goes down the worker's single-slot channel
//! 4. The worker runs the consumer and reports the outcome to the coordinator
//! 5. The worker announces itself idle again
//!
//! Because an item is only pulled after a worker is known to be idle, at most
//! `pool_size` items are ever in flight and the source is never drained ahead
//! of the consumers.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::consumer::WorkConsumer;
use super::coordinator::Coordinator;
use super::error::{PoolError, ProductionError, Result};
use super::factory::WorkFactory;
use super::outcome::WorkOutcome;
use super::source::WorkSource;
use super::state::{PoolSnapshot, RunSummary, StopReason, WorkerId};

const DEFAULT_MAX_FAILURE_RECORDS: usize = 100;

/// Pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub pool_size: usize,
    /// Per-item consumer timeout. Without one a hanging consumer blocks its
    /// worker indefinitely.
    pub item_timeout: Option<Duration>,
    /// Stop dispatching once this many items have failed
    pub failure_threshold: Option<u64>,
    pub max_failure_records: usize,
}

impl PoolConfig {
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            ..Self::default()
        }
    }

    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = Some(timeout);
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u64) -> Self {
        self.failure_threshold = Some(threshold);
        self
    }

    pub fn with_max_failure_records(mut self, max: usize) -> Self {
        self.max_failure_records = max;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size < 1 {
            return Err(PoolError::Config(format!(
                "pool_size must be at least 1, got {}",
                self.pool_size
            )));
        }

        if self.item_timeout.is_some_and(|t| t.is_zero()) {
            return Err(PoolError::Config(
                "item_timeout must be greater than zero".to_string(),
            ));
        }

        if self.failure_threshold == Some(0) {
            return Err(PoolError::Config(
                "failure_threshold must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            item_timeout: None,
            failure_threshold: None,
            max_failure_records: DEFAULT_MAX_FAILURE_RECORDS,
        }
    }
}

/// Cancellation controls for a running pool
#[derive(Debug, Clone)]
pub struct PoolCanceller {
    cancel: CancellationToken,
    hard_stop: CancellationToken,
}

impl PoolCanceller {
    fn new() -> Self {
        let hard_stop = CancellationToken::new();
        // Hard stop implies cancel, not the other way round
        let cancel = hard_stop.child_token();
        Self { cancel, hard_stop }
    }

    /// Stop dispatching; in-flight items run to completion.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop dispatching and abandon in-flight items, recording them as
    /// `Failure("cancelled")`.
    pub fn hard_stop(&self) {
        self.hard_stop.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_hard_stopped(&self) -> bool {
        self.hard_stop.is_cancelled()
    }
}

/// Handle to a started pool
pub struct PoolHandle {
    coordinator: Arc<Coordinator>,
    canceller: PoolCanceller,
    task: JoinHandle<Result<RunSummary>>,
}

impl PoolHandle {
    pub fn canceller(&self) -> PoolCanceller {
        self.canceller.clone()
    }

    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    pub fn hard_stop(&self) {
        self.canceller.hard_stop();
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        self.coordinator.snapshot()
    }

    pub fn is_done(&self) -> bool {
        self.coordinator.is_done()
    }

    /// Wait for the pool to terminate.
    ///
    /// Returns the summary, or the production error that aborted the run.
    pub async fn join(self) -> Result<RunSummary> {
        self.task.await?
    }
}

/// Runs a consumer over a source with a fixed pool of workers
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    config: PoolConfig,
}

impl Dispatcher {
    pub fn new(config: PoolConfig) -> Self {
        Self { config }
    }

    pub fn with_pool_size(pool_size: usize) -> Self {
        Self::new(PoolConfig::new(pool_size))
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Spawn the workers and the dispatch loop. Must be called within a
    /// tokio runtime.
    pub fn start<S, C>(&self, source: S, consumer: C) -> Result<PoolHandle>
    where
        S: WorkSource + 'static,
        S::Item: Debug,
        C: WorkConsumer<S::Item>,
    {
        self.config.validate()?;

        let canceller = PoolCanceller::new();
        let coordinator = Arc::new(Coordinator::new(
            self.config.pool_size,
            source.size_hint(),
            self.config.max_failure_records,
            self.config.failure_threshold,
            canceller.cancel.clone(),
        ));

        info!(
            pool_size = self.config.pool_size,
            expected = ?source.size_hint(),
            item_timeout_ms = ?self.config.item_timeout.map(|t| t.as_millis()),
            "Starting worker pool"
        );

        let task = tokio::spawn(dispatch(
            source,
            Arc::new(consumer),
            self.config.clone(),
            coordinator.clone(),
            canceller.clone(),
        ));

        Ok(PoolHandle {
            coordinator,
            canceller,
            task,
        })
    }

    /// Start the pool and wait for it to terminate
    pub async fn run<S, C>(&self, source: S, consumer: C) -> Result<RunSummary>
    where
        S: WorkSource + 'static,
        S::Item: Debug,
        C: WorkConsumer<S::Item>,
    {
        self.start(source, consumer)?.join().await
    }

    pub fn start_factory<F: WorkFactory>(&self, factory: &F) -> Result<PoolHandle> {
        self.start(factory.create_source(), factory.create_consumer())
    }

    pub async fn run_factory<F: WorkFactory>(&self, factory: &F) -> Result<RunSummary> {
        self.start_factory(factory)?.join().await
    }
}

async fn dispatch<S, C>(
    mut source: S,
    consumer: Arc<C>,
    config: PoolConfig,
    coordinator: Arc<Coordinator>,
    canceller: PoolCanceller,
) -> Result<RunSummary>
where
    S: WorkSource,
    S::Item: Debug,
    C: WorkConsumer<S::Item>,
{
    let (idle_tx, mut idle_rx) = mpsc::channel::<WorkerId>(config.pool_size);
    let mut senders = Vec::with_capacity(config.pool_size);
    let mut workers = JoinSet::new();

    for index in 0..config.pool_size {
        let (tx, rx) = mpsc::channel::<S::Item>(1);
        senders.push(tx);
        workers.spawn(worker_loop(
            WorkerId(index),
            rx,
            idle_tx.clone(),
            consumer.clone(),
            coordinator.clone(),
            config.item_timeout,
            canceller.hard_stop.clone(),
        ));
    }
    drop(idle_tx);

    let mut production_error: Option<ProductionError> = None;

    let stop_reason = loop {
        let worker = tokio::select! {
            biased;
            _ = canceller.cancel.cancelled() => break cancel_reason(&canceller),
            next = idle_rx.recv() => match next {
                Some(worker) => worker,
                None => {
                    error!("All workers exited before the source was exhausted");
                    break StopReason::Cancelled;
                }
            },
        };

        let next = tokio::select! {
            biased;
            _ = canceller.cancel.cancelled() => break cancel_reason(&canceller),
            next = source.next_item() => next,
        };

        let item = match next {
            Ok(Some(item)) => item,
            Ok(None) => {
                debug!("Source exhausted");
                break StopReason::Exhausted;
            }
            Err(e) => {
                error!(error = %e, "Source failed, aborting run");
                production_error = Some(e);
                break StopReason::ProductionFailed;
            }
        };

        if canceller.is_cancelled() {
            coordinator.record_discard(format!("{:?}", item));
            break cancel_reason(&canceller);
        }

        let label = format!("{:?}", item);
        let dispatched = coordinator.record_dispatch(worker, label);
        debug!(%worker, dispatched, "Item dispatched");

        // The slot is free: the worker only announces itself when its
        // channel is empty.
        if let Err(mpsc::error::SendError(item)) = senders[worker.0].send(item).await {
            warn!(%worker, item = ?item, "Worker gone, item not delivered");
            coordinator.record_outcome(worker, WorkOutcome::failure("worker unavailable"));
        }
    };

    coordinator.close_dispatch(stop_reason);
    info!(?stop_reason, "Dispatch closed, draining workers");

    // Closing the item channels lets idle workers exit; busy ones exit after
    // their current item.
    drop(senders);
    drop(idle_rx);

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "Worker task failed");
        }
    }

    coordinator.mark_finished();
    let summary = coordinator.summary();
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        dispatched = summary.dispatched,
        "Worker pool terminated"
    );

    match production_error {
        Some(e) => Err(PoolError::Production(e)),
        None => Ok(summary),
    }
}

fn cancel_reason(canceller: &PoolCanceller) -> StopReason {
    if canceller.is_hard_stopped() {
        StopReason::HardStopped
    } else {
        StopReason::Cancelled
    }
}

async fn worker_loop<T, C>(
    id: WorkerId,
    mut items: mpsc::Receiver<T>,
    idle: mpsc::Sender<WorkerId>,
    consumer: Arc<C>,
    coordinator: Arc<Coordinator>,
    item_timeout: Option<Duration>,
    hard_stop: CancellationToken,
) where
    T: Send + 'static,
    C: WorkConsumer<T>,
{
    loop {
        coordinator.worker_idle(id);
        if idle.send(id).await.is_err() {
            break;
        }

        let Some(item) = items.recv().await else {
            break;
        };

        coordinator.worker_running(id);
        let outcome = run_item(consumer.clone(), item, item_timeout, &hard_stop).await;
        // Outcome is recorded before the worker reports idle, so a threshold
        // stop is visible to the dispatcher before it can hand out more work.
        coordinator.record_outcome(id, outcome);
    }

    coordinator.worker_terminated(id);
    debug!(worker = %id, "Worker terminated");
}

/// Run one consumer call on its own task so panics, timeouts and hard stops
/// all end up as a [`WorkOutcome`].
async fn run_item<T, C>(
    consumer: Arc<C>,
    item: T,
    item_timeout: Option<Duration>,
    hard_stop: &CancellationToken,
) -> WorkOutcome
where
    T: Send + 'static,
    C: WorkConsumer<T>,
{
    let mut task = tokio::spawn(async move { consumer.consume(item).await });

    let joined = async {
        match item_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => Some(joined),
                Err(_) => None,
            },
            None => Some((&mut task).await),
        }
    };

    tokio::select! {
        biased;
        _ = hard_stop.cancelled() => {
            task.abort();
            WorkOutcome::cancelled()
        }
        joined = joined => match joined {
            Some(Ok(result)) => WorkOutcome::from(result),
            Some(Err(e)) if e.is_panic() => WorkOutcome::failure(format!("consumer panicked: {}", e)),
            Some(Err(e)) => WorkOutcome::failure(format!("consumer task failed: {}", e)),
            None => {
                task.abort();
                WorkOutcome::failure(format!(
                    "timed out after {}ms",
                    item_timeout.map(|t| t.as_millis()).unwrap_or_default()
                ))
            }
        },
    }
}
