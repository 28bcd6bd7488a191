use {alloy_primitives::{Address, U256}, anyhow::Result};

/// Fee assumed for pools whose snapshot does not report one, matching the
/// canonical 0.3% pair contracts.
pub const DEFAULT_POOL_FEE: u32 = 30;

/// A pool's balances as returned by the batched snapshot call.
#[derive(Clone, Copy, Debug)]
pub struct PoolSnapshot {
    pub reserve0: U256,
    pub reserve1: U256,
    /// Swap fee in basis points; `None` for venues with a fixed fee.
    pub fee: Option<u32>,
}

/// Batched on-chain state reader, typically backed by a multicall
/// aggregator so all pools are observed at the same block.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait PoolReading: Send + Sync + 'static {
    /// Reads the state of every pool at the given block. The result is
    /// aligned with `pools`; an entry is `None` when the pool does not
    /// exist (yet) at that block.
    async fn read_states(&self, pools: &[Address], block: u64)
    -> Result<Vec<Option<PoolSnapshot>>>;
}
