use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::observability::MetricsSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Lifecycle of a single worker: `Idle -> Assigned -> Running -> Idle`,
/// ending in `Terminated` once the pool shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Idle,
    Assigned,
    Running,
    Terminated,
}

/// Why the dispatcher stopped pulling from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Source signaled exhaustion
    Exhausted,
    /// Graceful cancellation; in-flight items were drained
    Cancelled,
    /// Hard stop; in-flight items were abandoned
    HardStopped,
    /// Failure threshold reached
    FailureThreshold,
    /// Source returned an error
    ProductionFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub worker: WorkerId,
    pub item: String,
    pub reason: String,
}

/// Point-in-time view of the pool
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pub workers: Vec<WorkerState>,
    pub in_flight: Vec<(WorkerId, String)>,
    pub metrics: MetricsSnapshot,
}

impl PoolSnapshot {
    pub fn idle_workers(&self) -> usize {
        self.workers
            .iter()
            .filter(|state| **state == WorkerState::Idle)
            .count()
    }
}

/// Final tally of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub succeeded: u64,
    pub failed: u64,
    /// Subset of `failed` abandoned by a hard stop
    pub cancelled: u64,
    pub dispatched: u64,
    /// Items produced after cancellation and never dispatched
    pub discarded: u64,
    /// Item count announced by the source, when known
    pub expected: Option<u64>,
    pub stop_reason: Option<StopReason>,
    pub failures: Vec<FailureRecord>,
    /// Failures beyond the record cap, counted but not kept
    pub failures_truncated: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    pub fn total(&self) -> u64 {
        self.succeeded + self.failed
    }

    pub fn elapsed(&self) -> Option<chrono::TimeDelta> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "succeeded={} failed={} dispatched={}",
            self.succeeded, self.failed, self.dispatched
        )?;
        if self.cancelled > 0 {
            write!(f, " cancelled={}", self.cancelled)?;
        }
        if self.discarded > 0 {
            write!(f, " discarded={}", self.discarded)?;
        }
        if let Some(elapsed) = self.elapsed() {
            write!(f, " elapsed={}ms", elapsed.num_milliseconds())?;
        }
        Ok(())
    }
}
