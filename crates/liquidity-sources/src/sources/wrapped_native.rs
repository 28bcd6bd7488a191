//! 1:1 bridge between the chain's native token and its canonical wrapped
//! form. Quotes are the identity map and independent of the amount.

use {
    crate::{
        model::{DexKey, GasCost, PoolId, PoolPrices, Side, Token},
        source::{Capabilities, LiquiditySource, PricesQuery},
    },
    anyhow::Result,
};

/// Execution gas of a deposit/withdraw call on the wrapped-token contract.
pub const GAS_COST_WRAP: u64 = 50_000;

pub struct WrappedNativeSource {
    key: DexKey,
    wrapped: Token,
}

impl WrappedNativeSource {
    pub fn new(key: DexKey, wrapped: Token) -> Self {
        Self { key, wrapped }
    }

    fn pool_id(&self) -> PoolId {
        PoolId(format!("{}_{:#x}", self.key, self.wrapped.address))
    }

    /// The bridge only serves native ↔ wrapped, in either direction.
    fn serves(&self, from: &Token, to: &Token) -> bool {
        (from.is_native() && to.address == self.wrapped.address)
            || (to.is_native() && from.address == self.wrapped.address)
    }
}

#[async_trait::async_trait]
impl LiquiditySource for WrappedNativeSource {
    fn key(&self) -> &DexKey {
        &self.key
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            constant_price_large_amounts: true,
            need_wrap_native: false,
            fee_on_transfer: false,
            pricing_lifecycle: false,
            cache_state_key: None,
        }
    }

    async fn pool_identifiers(
        &self,
        from: &Token,
        to: &Token,
        _side: Side,
        _block: u64,
    ) -> Result<Vec<PoolId>> {
        Ok(if self.serves(from, to) {
            vec![self.pool_id()]
        } else {
            vec![]
        })
    }

    async fn prices_volume(&self, query: &PricesQuery<'_>) -> Result<Option<Vec<PoolPrices>>> {
        if !self.serves(query.from, query.to) {
            return Ok(None);
        }
        let operation = if query.from.is_native() {
            "wrap"
        } else {
            "unwrap"
        };
        let fixed_token = match query.side {
            Side::Sell => query.from,
            Side::Buy => query.to,
        };
        Ok(Some(vec![PoolPrices {
            prices: query.amounts.to_vec(),
            unit: fixed_token.one_unit(),
            gas_cost: GasCost::Scalar(GAS_COST_WRAP),
            gas_cost_l2: None,
            exchange: self.key.clone(),
            pool_identifier: Some(self.pool_id()),
            pool_addresses: vec![self.wrapped.address],
            data: serde_json::json!({ "operation": operation }),
        }]))
    }

    fn calldata_gas_cost(&self, _prices: &PoolPrices) -> GasCost {
        GasCost::Scalar(10_000)
    }
}
