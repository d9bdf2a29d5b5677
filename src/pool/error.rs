use thiserror::Error;

/// Errors surfaced to the caller of the dispatcher.
///
/// Per-item failures never show up here; they are tallied by the
/// coordinator as [`WorkOutcome::Failure`](super::WorkOutcome::Failure).
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("invalid pool configuration: {0}")]
    Config(String),

    #[error("work source failed: {0}")]
    Production(#[from] ProductionError),

    #[error("dispatcher task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Raised by a [`WorkSource`](super::WorkSource) that cannot produce its next item.
/// Fatal for the run.
#[derive(Debug, Error)]
pub enum ProductionError {
    #[error("failed to produce work item: {0}")]
    Failed(String),
}

/// Raised by a [`WorkConsumer`](super::WorkConsumer) for a single item.
/// Recovered at the worker boundary.
#[derive(Debug, Error)]
pub enum ConsumptionError {
    #[error("{0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PoolError>;
