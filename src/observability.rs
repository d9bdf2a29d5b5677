//! Observability: tracing setup and pool counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "fetchpool=info";

/// Install the global tracing subscriber.
///
/// Honours `RUST_LOG`; falls back to `fetchpool=info`.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Counters for one pool run
#[derive(Debug, Default)]
pub struct Metrics {
    items_dispatched: AtomicU64,
    items_succeeded: AtomicU64,
    items_failed: AtomicU64,
    items_cancelled: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item_dispatched(&self) -> u64 {
        tracing::trace!(counter = "items_dispatched", "Metric incremented");
        self.items_dispatched.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn item_succeeded(&self) -> u64 {
        tracing::trace!(counter = "items_succeeded", "Metric incremented");
        self.items_succeeded.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Count a failure; `cancelled` additionally bumps the cancellation counter
    pub fn item_failed(&self, cancelled: bool) -> u64 {
        if cancelled {
            self.items_cancelled.fetch_add(1, Ordering::SeqCst);
        }
        tracing::trace!(counter = "items_failed", cancelled, "Metric incremented");
        self.items_failed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_dispatched: self.items_dispatched.load(Ordering::SeqCst),
            items_succeeded: self.items_succeeded.load(Ordering::SeqCst),
            items_failed: self.items_failed.load(Ordering::SeqCst),
            items_cancelled: self.items_cancelled.load(Ordering::SeqCst),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub items_dispatched: u64,
    pub items_succeeded: u64,
    pub items_failed: u64,
    pub items_cancelled: u64,
}

impl MetricsSnapshot {
    pub fn terminal(&self) -> u64 {
        self.items_succeeded + self.items_failed
    }

    pub fn in_flight(&self) -> u64 {
        self.items_dispatched.saturating_sub(self.terminal())
    }
}
