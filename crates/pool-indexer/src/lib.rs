//! Event-backed pool state for constant-product pairs.
//!
//! Pools are warmed once with a batched snapshot read at a block and then
//! kept current by applying the pair contract's `Sync` events. Every state
//! is indexed by the block it was committed at; pricing reads only see
//! states committed strictly before their block reference so that a quote
//! at block N is based exclusively on logs up to N − 1.

pub mod events;
pub mod history;
pub mod indexer;
pub mod reading;

pub use {
    events::{LogRetrieving, PoolLog},
    history::{History, PoolState},
    indexer::PoolIndexer,
    reading::{PoolReading, PoolSnapshot},
};

#[cfg(any(test, feature = "test-util"))]
pub use {events::MockLogRetrieving, reading::MockPoolReading};
