use {alloy_primitives::U256, std::collections::BTreeMap};

/// Reserves and fee of a constant-product pool, valid at exactly one block
/// height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolState {
    pub reserve0: U256,
    pub reserve1: U256,
    /// Swap fee in basis points.
    pub fee: u32,
}

/// Block-indexed state snapshots of a single pool.
///
/// States are only ever appended (by the warm-up snapshot and by `Sync`
/// events) and never removed until the owning adapter releases its
/// resources, so a reader always observes a state that was consistent at
/// some block at or before its query block.
#[derive(Clone, Debug, Default)]
pub struct History(BTreeMap<u64, PoolState>);

impl History {
    pub fn insert(&mut self, block: u64, state: PoolState) {
        self.0.insert(block, state);
    }

    /// Returns the latest state committed strictly before `block`.
    ///
    /// Events indexed at block N become visible to queries at N + 1, which
    /// keeps pricing from racing updates of the block it is quoting for.
    pub fn state_before(&self, block: u64) -> Option<&PoolState> {
        self.0.range(..block).next_back().map(|(_, state)| state)
    }

    /// The most recent state regardless of block, used as the base state
    /// when applying a new log.
    pub fn latest(&self) -> Option<&PoolState> {
        self.0.last_key_value().map(|(_, state)| state)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
