//! The pricing coordinator of the aggregator: fans identifier and quote
//! requests out across venue adapters with per-call deadlines, isolates
//! venue failures, applies the rollup gas overlay and validates quotes.
//! Also home of the adapter lifecycle manager driving initialization and
//! teardown with unbounded, de-duplicated retries.

pub mod arguments;
pub mod cache;
pub mod coordinator;
pub mod lifecycle;
#[cfg(test)]
pub(crate) mod testutil;

pub use {
    arguments::Arguments,
    cache::{CacheStoring, InMemoryCache},
    coordinator::{Config, PriceAggregator, QuoteError},
    lifecycle::LifecycleManager,
};

#[cfg(any(test, feature = "test-util"))]
pub use cache::MockCacheStoring;
