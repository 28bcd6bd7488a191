//! Adapter for venues whose prices come from an out-of-band rate feed
//! instead of warm on-chain state. Quotes are linear in the amount.

use {
    crate::{
        model::{DexKey, GasCost, PoolId, PoolPrices, Side, Token},
        source::{Capabilities, LiquiditySource, PricesQuery},
    },
    alloy_primitives::U256,
    anyhow::Result,
    std::sync::Arc,
};

/// Execution gas of a swap against the venue's settlement contract.
pub const GAS_COST_EXTERNAL_SWAP: u64 = 150_000;

/// Price of the destination token in source-token units, as an integer
/// ratio in smallest denominations.
#[derive(Clone, Copy, Debug)]
pub struct Rate {
    pub numerator: U256,
    pub denominator: U256,
}

/// Out-of-band price feed of an external venue, e.g. an RFQ HTTP API.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait RateFetching: Send + Sync + 'static {
    /// The venue's current `from` → `to` rate, or `None` when the venue
    /// does not serve the pair.
    async fn rate(&self, from: &Token, to: &Token, block: u64) -> Result<Option<Rate>>;
}

pub struct ExternalRateSource {
    key: DexKey,
    fetcher: Arc<dyn RateFetching>,
}

impl ExternalRateSource {
    pub fn new(key: DexKey, fetcher: Arc<dyn RateFetching>) -> Self {
        Self { key, fetcher }
    }

    fn pool_id(&self, from: &Token, to: &Token) -> PoolId {
        PoolId(format!(
            "{}_{}",
            self.key,
            PoolId::pair_payload(from.address, to.address),
        ))
    }
}

fn mul_div(amount: U256, numerator: U256, denominator: U256) -> U256 {
    if denominator.is_zero() {
        return U256::ZERO;
    }
    amount
        .checked_mul(numerator)
        .map(|scaled| scaled / denominator)
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl LiquiditySource for ExternalRateSource {
    fn key(&self) -> &DexKey {
        &self.key
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            constant_price_large_amounts: true,
            need_wrap_native: true,
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
        Ok(vec![self.pool_id(from, to)])
    }

    async fn prices_volume(&self, query: &PricesQuery<'_>) -> Result<Option<Vec<PoolPrices>>> {
        let Some(rate) = self
            .fetcher
            .rate(query.from, query.to, query.block)
            .await?
        else {
            return Ok(None);
        };

        let quote_one = |amount: U256| match query.side {
            Side::Sell => mul_div(amount, rate.numerator, rate.denominator),
            Side::Buy => mul_div(amount, rate.denominator, rate.numerator),
        };
        let fixed_token = match query.side {
            Side::Sell => query.from,
            Side::Buy => query.to,
        };

        Ok(Some(vec![PoolPrices {
            prices: query.amounts.iter().copied().map(quote_one).collect(),
            unit: quote_one(fixed_token.one_unit()),
            gas_cost: GasCost::Scalar(GAS_COST_EXTERNAL_SWAP),
            gas_cost_l2: None,
            exchange: self.key.clone(),
            pool_identifier: Some(self.pool_id(query.from, query.to)),
            pool_addresses: vec![],
            data: serde_json::json!({
                "rate": {
                    "numerator": rate.numerator.to_string(),
                    "denominator": rate.denominator.to_string(),
                },
            }),
        }]))
    }

    fn calldata_gas_cost(&self, _prices: &PoolPrices) -> GasCost {
        GasCost::Scalar(40_000)
    }
}
