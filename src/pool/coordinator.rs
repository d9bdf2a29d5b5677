//! Completion coordinator
//!
//! Collects one outcome per dispatched item and decides when a run is done.
//! Counters live in [`Metrics`]; worker states, the in-flight map and the
//! failure log sit behind a single mutex that is only held for bookkeeping,
//! never across an await point.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::outcome::WorkOutcome;
use super::state::{
    FailureRecord, PoolSnapshot, RunSummary, StopReason, WorkerId, WorkerState,
};
use crate::observability::{Metrics, MetricsSnapshot};

#[derive(Debug)]
struct PoolState {
    workers: Vec<WorkerState>,
    in_flight: BTreeMap<WorkerId, String>,
    failures: Vec<FailureRecord>,
    failures_truncated: u64,
    discarded: u64,
    stop_reason: Option<StopReason>,
    finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct Coordinator {
    metrics: Metrics,
    state: Mutex<PoolState>,
    dispatch_closed: AtomicBool,
    expected: Option<u64>,
    max_failure_records: usize,
    failure_threshold: Option<u64>,
    stop: CancellationToken,
    done: Notify,
    started_at: DateTime<Utc>,
}

impl Coordinator {
    /// `stop` is cancelled when the failure threshold is reached.
    pub fn new(
        pool_size: usize,
        expected: Option<u64>,
        max_failure_records: usize,
        failure_threshold: Option<u64>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            metrics: Metrics::new(),
            state: Mutex::new(PoolState {
                workers: vec![WorkerState::Idle; pool_size],
                in_flight: BTreeMap::new(),
                failures: Vec::new(),
                failures_truncated: 0,
                discarded: 0,
                stop_reason: None,
                finished_at: None,
            }),
            dispatch_closed: AtomicBool::new(false),
            expected,
            max_failure_records,
            failure_threshold,
            stop,
            done: Notify::new(),
            started_at: Utc::now(),
        }
    }

    fn state(&self) -> MutexGuard<'_, PoolState> {
        // Bookkeeping stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_worker(&self, worker: WorkerId, next: WorkerState) {
        if let Some(slot) = self.state().workers.get_mut(worker.0) {
            *slot = next;
        }
    }

    pub(crate) fn worker_idle(&self, worker: WorkerId) {
        self.set_worker(worker, WorkerState::Idle);
    }

    pub(crate) fn worker_running(&self, worker: WorkerId) {
        self.set_worker(worker, WorkerState::Running);
    }

    pub(crate) fn worker_terminated(&self, worker: WorkerId) {
        self.set_worker(worker, WorkerState::Terminated);
    }

    /// Record that `item` was handed to `worker`. Returns the dispatch count.
    pub(crate) fn record_dispatch(&self, worker: WorkerId, item: String) -> u64 {
        {
            let mut state = self.state();
            if let Some(slot) = state.workers.get_mut(worker.0) {
                *slot = WorkerState::Assigned;
            }
            state.in_flight.insert(worker, item);
        }
        self.metrics.item_dispatched()
    }

    /// Record the terminal outcome of the item currently held by `worker`.
    pub(crate) fn record_outcome(&self, worker: WorkerId, outcome: WorkOutcome) {
        let item = self.state().in_flight.remove(&worker).unwrap_or_default();

        match outcome {
            WorkOutcome::Success => {
                let succeeded = self.metrics.item_succeeded();
                debug!(%worker, item = %item, succeeded, "Item succeeded");
            }
            WorkOutcome::Failure(reason) => {
                let cancelled = reason == super::outcome::CANCELLED_REASON;
                let failed = self.metrics.item_failed(cancelled);
                warn!(%worker, item = %item, reason = %reason, failed, "Item failed");

                {
                    let mut state = self.state();
                    if state.failures.len() < self.max_failure_records {
                        state.failures.push(FailureRecord {
                            worker,
                            item,
                            reason,
                        });
                    } else {
                        state.failures_truncated += 1;
                    }
                }

                self.check_threshold(failed);
            }
        }

        self.done.notify_waiters();
    }

    /// Record an item the source produced after dispatch was cancelled.
    pub(crate) fn record_discard(&self, item: String) {
        let discarded = {
            let mut state = self.state();
            state.discarded += 1;
            state.discarded
        };
        debug!(item = %item, discarded, "Item produced after cancellation, not dispatched");
    }

    fn check_threshold(&self, failed: u64) {
        let Some(threshold) = self.failure_threshold else {
            return;
        };

        if failed >= threshold && !self.stop.is_cancelled() {
            warn!(failed, threshold, "Failure threshold reached, stopping dispatch");
            self.state().stop_reason.get_or_insert(StopReason::FailureThreshold);
            self.stop.cancel();
        }
    }

    /// Mark that no further items will be dispatched.
    ///
    /// The first recorded reason wins, so a threshold stop is not overwritten
    /// by the cancellation it triggered.
    pub(crate) fn close_dispatch(&self, reason: StopReason) {
        self.state().stop_reason.get_or_insert(reason);
        self.dispatch_closed.store(true, Ordering::SeqCst);
        self.done.notify_waiters();
    }

    pub(crate) fn mark_finished(&self) {
        self.state().finished_at = Some(Utc::now());
        self.done.notify_waiters();
    }

    /// True once dispatch is closed and every dispatched item has a terminal
    /// outcome. For a run that was not stopped early this means
    /// `dispatched == expected`.
    pub fn is_done(&self) -> bool {
        if !self.dispatch_closed.load(Ordering::SeqCst) {
            return false;
        }
        let metrics = self.metrics.snapshot();
        metrics.terminal() == metrics.items_dispatched
    }

    /// Resolve once [`is_done`](Self::is_done) holds
    pub async fn wait_done(&self) {
        loop {
            let notified = self.done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_done() {
                return;
            }
            notified.await;
        }
    }

    pub fn succeeded(&self) -> u64 {
        self.metrics.snapshot().items_succeeded
    }

    pub fn failed(&self) -> u64 {
        self.metrics.snapshot().items_failed
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.state().stop_reason
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.state();
        PoolSnapshot {
            workers: state.workers.clone(),
            in_flight: state
                .in_flight
                .iter()
                .map(|(worker, item)| (*worker, item.clone()))
                .collect(),
            metrics: self.metrics.snapshot(),
        }
    }

    pub fn summary(&self) -> RunSummary {
        let metrics = self.metrics.snapshot();
        let state = self.state();

        RunSummary {
            succeeded: metrics.items_succeeded,
            failed: metrics.items_failed,
            cancelled: metrics.items_cancelled,
            dispatched: metrics.items_dispatched,
            discarded: state.discarded,
            expected: self.expected,
            stop_reason: state.stop_reason,
            failures: state.failures.clone(),
            failures_truncated: state.failures_truncated,
            started_at: self.started_at,
            finished_at: state.finished_at,
        }
    }
}
