use {
    crate::history::PoolState,
    alloy_primitives::{Address, LogData},
    alloy_sol_types::SolEvent,
    anyhow::Result,
};

mod pair {
    alloy_sol_types::sol! {
        /// Emitted by pair contracts after every reserve-changing
        /// operation.
        event Sync(uint112 reserve0, uint112 reserve1);
    }

    pub use self::Sync as SyncEvent;
}

/// A raw log emitted by a tracked pool.
#[derive(Clone, Debug)]
pub struct PoolLog {
    pub pool: Address,
    pub block_number: u64,
    pub data: LogData,
}

/// Derives a pool's next state from one of its logs. Logs that are not a
/// `Sync` event don't affect reserves and yield `None`.
pub fn process_log(state: &PoolState, log: &PoolLog) -> Option<PoolState> {
    let event = pair::SyncEvent::decode_log_data(&log.data).ok()?;
    Some(PoolState {
        reserve0: event.reserve0.to(),
        reserve1: event.reserve1.to(),
        fee: state.fee,
    })
}

/// Source of historic logs for a set of pool addresses, typically backed
/// by an `eth_getLogs` subscription.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait LogRetrieving: Send + Sync + 'static {
    /// Returns all logs emitted by `pools` in the inclusive block range,
    /// ordered by block number.
    async fn logs(&self, from_block: u64, to_block: u64, pools: &[Address]) -> Result<Vec<PoolLog>>;
}

#[cfg(test)]
pub(crate) fn sync_log(pool: Address, block_number: u64, reserve0: u64, reserve1: u64) -> PoolLog {
    use alloy_primitives::U256;
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(&U256::from(reserve0).to_be_bytes::<32>());
    data[32..].copy_from_slice(&U256::from(reserve1).to_be_bytes::<32>());
    PoolLog {
        pool,
        block_number,
        data: LogData::new_unchecked(vec![pair::SyncEvent::SIGNATURE_HASH], data.to_vec().into()),
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy_primitives::{B256, Bytes, U256},
    };

    #[test]
    fn decodes_sync_events() {
        let state = PoolState {
            reserve0: U256::from(1),
            reserve1: U256::from(2),
            fee: 25,
        };
        let log = sync_log(Address::repeat_byte(1), 7, 1_000, 2_000);
        let next = process_log(&state, &log).unwrap();
        assert_eq!(next.reserve0, U256::from(1_000));
        assert_eq!(next.reserve1, U256::from(2_000));
        // The fee is not part of the event and carries over.
        assert_eq!(next.fee, 25);
    }

    #[test]
    fn ignores_unrelated_events() {
        let state = PoolState {
            reserve0: U256::from(1),
            reserve1: U256::from(2),
            fee: 30,
        };
        let log = PoolLog {
            pool: Address::repeat_byte(1),
            block_number: 7,
            data: LogData::new_unchecked(vec![B256::repeat_byte(0xab)], Bytes::new()),
        };
        assert_eq!(process_log(&state, &log), None);
    }
}
