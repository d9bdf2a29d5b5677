//! Bounded producer/consumer work distribution
//!
//! A [`Dispatcher`] pulls items lazily from a [`WorkSource`] and runs a
//! [`WorkConsumer`] over them on a fixed pool of tokio tasks. A
//! [`Coordinator`] tallies the outcomes and decides when the run is done.
//!
//! ## Guarantees
//!
//! - Items are pulled in source order and each is dispatched exactly once
//! - At most `pool_size` items are in flight
//! - Consumer errors, panics and timeouts become [`WorkOutcome::Failure`];
//!   only configuration and production errors reach the caller
//!
//! ## Example
//!
//! ```rust,ignore
//! use fetchpool::pool::{consumer_fn, Dispatcher, GeneratorSource};
//!
//! let summary = Dispatcher::with_pool_size(4)
//!     .run(
//!         GeneratorSource::new(10, |i| Ok(i)),
//!         consumer_fn(|i: u64| async move { process(i).await }),
//!     )
//!     .await?;
//! println!("{} ok, {} failed", summary.succeeded, summary.failed);
//! ```

mod consumer;
mod coordinator;
mod dispatcher;
mod error;
mod factory;
mod outcome;
mod source;
mod state;

pub use consumer::{FnConsumer, WorkConsumer, consumer_fn};
pub use coordinator::Coordinator;
pub use dispatcher::{Dispatcher, PoolCanceller, PoolConfig, PoolHandle};
pub use error::{ConsumptionError, PoolError, ProductionError};
pub use factory::WorkFactory;
pub use outcome::WorkOutcome;
pub use source::{GeneratorSource, IterSource, WorkSource};
pub use state::{FailureRecord, PoolSnapshot, RunSummary, StopReason, WorkerId, WorkerState};
