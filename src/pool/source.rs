//! Lazy, finite sources of work items
//!
//! A source is pulled by exactly one dispatcher task, so implementations may
//! keep plain mutable counters. Nothing is produced ahead of demand: item N+1
//! is only computed once the dispatcher has an idle worker for it.

use async_trait::async_trait;
use std::marker::PhantomData;

use super::error::ProductionError;

/// Lazy producer of work items
#[async_trait]
pub trait WorkSource: Send {
    type Item: Send + 'static;

    /// Produce the next item, or `Ok(None)` once the source is exhausted.
    ///
    /// Once `None` has been returned the source is never polled again.
    async fn next_item(&mut self) -> Result<Option<Self::Item>, ProductionError>;

    /// Total number of items this source will produce, if known up front
    fn size_hint(&self) -> Option<u64> {
        None
    }
}

/// Source backed by any iterator
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I>
where
    I: Iterator + Send,
    I::Item: Send + 'static,
{
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            iter: iter.into_iter(),
        }
    }
}

#[async_trait]
impl<I> WorkSource for IterSource<I>
where
    I: Iterator + Send,
    I::Item: Send + 'static,
{
    type Item = I::Item;

    async fn next_item(&mut self) -> Result<Option<Self::Item>, ProductionError> {
        Ok(self.iter.next())
    }

    fn size_hint(&self) -> Option<u64> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper as u64),
            _ => None,
        }
    }
}

/// Source that calls a generator closure with the item index, exactly
/// `limit` times.
///
/// Every `GeneratorSource` starts counting at zero; it is not restartable.
pub struct GeneratorSource<F, T> {
    generate: F,
    produced: u64,
    limit: u64,
    _item: PhantomData<fn() -> T>,
}

impl<F, T> GeneratorSource<F, T>
where
    F: FnMut(u64) -> Result<T, ProductionError> + Send,
    T: Send + 'static,
{
    pub fn new(limit: u64, generate: F) -> Self {
        Self {
            generate,
            produced: 0,
            limit,
            _item: PhantomData,
        }
    }

    pub fn produced(&self) -> u64 {
        self.produced
    }
}

#[async_trait]
impl<F, T> WorkSource for GeneratorSource<F, T>
where
    F: FnMut(u64) -> Result<T, ProductionError> + Send,
    T: Send + 'static,
{
    type Item = T;

    async fn next_item(&mut self) -> Result<Option<T>, ProductionError> {
        if self.produced >= self.limit {
            return Ok(None);
        }

        let item = (self.generate)(self.produced)?;
        self.produced += 1;
        Ok(Some(item))
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.limit)
    }
}
