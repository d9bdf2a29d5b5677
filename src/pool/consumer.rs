use async_trait::async_trait;
use std::future::Future;

use super::error::ConsumptionError;

/// Per-item work executed by pool workers.
///
/// Implementations are shared by every worker and called concurrently with
/// different items, so any state they hold must be read-only or internally
/// synchronized.
#[async_trait]
pub trait WorkConsumer<T: Send + 'static>: Send + Sync + 'static {
    async fn consume(&self, item: T) -> Result<(), ConsumptionError>;
}

/// Adapter turning an async closure into a [`WorkConsumer`]
#[derive(Debug, Clone)]
pub struct FnConsumer<F> {
    f: F,
}

/// Wrap `f` as a consumer
pub fn consumer_fn<T, F, Fut>(f: F) -> FnConsumer<F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ConsumptionError>> + Send + 'static,
{
    FnConsumer { f }
}

#[async_trait]
impl<T, F, Fut> WorkConsumer<T> for FnConsumer<F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ConsumptionError>> + Send + 'static,
{
    async fn consume(&self, item: T) -> Result<(), ConsumptionError> {
        (self.f)(item).await
    }
}
