use std::fmt::Debug;

use super::consumer::WorkConsumer;
use super::source::WorkSource;

/// Pairs a work source with the consumer that processes its items.
///
/// Each call to [`create_source`](Self::create_source) yields a fresh
/// source whose counter starts from zero.
pub trait WorkFactory {
    type Item: Debug + Send + 'static;
    type Source: WorkSource<Item = Self::Item> + 'static;
    type Consumer: WorkConsumer<Self::Item>;

    fn create_source(&self) -> Self::Source;

    fn create_consumer(&self) -> Self::Consumer;
}
