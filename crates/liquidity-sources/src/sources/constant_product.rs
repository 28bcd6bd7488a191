//! Adapter for Uniswap-V2-like constant-product venues, including the
//! derivation of virtual pools for pairs without a direct pool.

use {
    crate::{
        model::{DexKey, GasCost, PoolId, PoolPrices, Side, Token, TransferFeeParams},
        source::{Capabilities, LiquiditySource, PricesQuery},
    },
    alloy_primitives::{Address, U256},
    amm::{
        constant_product::FEE_DENOMINATOR,
        virtual_pool::{Leg, VirtualPool},
    },
    anyhow::Result,
    pool_indexer::{PoolIndexer, PoolState},
    std::sync::Arc,
};

/// Execution gas for one constant-product swap hop.
pub const GAS_COST_SWAP: u64 = 90_000;

/// L1 calldata gas attributable to one swap hop, before the rollup ratio
/// is applied.
const CALLDATA_GAS_PER_POOL: u64 = 30_000;

/// A pool this venue trades, from static configuration. `token0` and
/// `token1` follow the pair contract's sorted order.
#[derive(Clone, Copy, Debug)]
pub struct PoolConfig {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
}

impl PoolConfig {
    pub fn new(address: Address, a: Address, b: Address) -> Self {
        let (token0, token1) = if a <= b { (a, b) } else { (b, a) };
        Self {
            address,
            token0,
            token1,
        }
    }

    fn trades(&self, token: Address) -> bool {
        self.token0 == token || self.token1 == token
    }

    fn other(&self, token: Address) -> Address {
        if self.token0 == token {
            self.token1
        } else {
            self.token0
        }
    }
}

pub struct ConstantProductSource {
    key: DexKey,
    pools: Vec<PoolConfig>,
    indexer: Arc<PoolIndexer>,
    virtual_pools: bool,
}

impl ConstantProductSource {
    pub fn new(key: DexKey, pools: Vec<PoolConfig>, indexer: Arc<PoolIndexer>) -> Self {
        Self {
            key,
            pools,
            indexer,
            virtual_pools: false,
        }
    }

    /// Also quotes pairs without a direct pool through a synthetic pool
    /// derived from two pools sharing a common token.
    pub fn with_virtual_pools(mut self) -> Self {
        self.virtual_pools = true;
        self
    }

    fn pool_id(&self, payload: &str) -> PoolId {
        PoolId(format!("{}_{payload}", self.key))
    }

    fn direct_pools(&self, a: Address, b: Address) -> impl Iterator<Item = &PoolConfig> {
        self.pools
            .iter()
            .filter(move |pool| pool.trades(a) && pool.trades(b))
    }

    /// All (jk, ik) pool combinations connecting `from` (`i`) to `to`
    /// (`j`) through a common token `k`.
    fn virtual_legs(&self, from: Address, to: Address) -> Vec<(&PoolConfig, &PoolConfig)> {
        let mut legs = Vec::new();
        for jk in self.pools.iter().filter(|pool| pool.trades(to)) {
            let common = jk.other(to);
            if common == from {
                continue;
            }
            for ik in self
                .pools
                .iter()
                .filter(|pool| pool.trades(from) && pool.other(from) == common)
            {
                legs.push((jk, ik));
            }
        }
        legs
    }

    fn virtual_pool_id(&self, jk: &PoolConfig, ik: &PoolConfig) -> PoolId {
        self.pool_id(&format!(
            "{}_{}",
            PoolId::pair_payload(jk.token0, jk.token1),
            PoolId::pair_payload(ik.token0, ik.token1),
        ))
    }

    /// Quotes all request amounts plus the unit amount against oriented
    /// reserves, applying any transfer fees of the traded tokens.
    fn quote_amounts(
        query: &PricesQuery<'_>,
        reserve_in: U256,
        reserve_out: U256,
        fee: u32,
    ) -> (Vec<U256>, U256) {
        let quote_one = |amount: U256| -> U256 {
            match query.side {
                Side::Sell => {
                    let amount = discount(amount, src_fee_bps(&query.transfer_fees));
                    let out = amm::get_amount_out(amount, reserve_in, reserve_out, fee);
                    discount(out, dest_fee_bps(&query.transfer_fees))
                }
                Side::Buy => {
                    let amount = gross_up(amount, dest_fee_bps(&query.transfer_fees));
                    let amount_in = amm::get_amount_in(amount, reserve_in, reserve_out, fee);
                    gross_up(amount_in, src_fee_bps(&query.transfer_fees))
                }
            }
        };
        let prices = query.amounts.iter().copied().map(quote_one).collect();
        let fixed_token = match query.side {
            Side::Sell => query.from,
            Side::Buy => query.to,
        };
        let unit = quote_one(fixed_token.one_unit());
        (prices, unit)
    }

    fn pool_prices(
        &self,
        query: &PricesQuery<'_>,
        id: PoolId,
        pool_addresses: Vec<Address>,
        reserve_in: U256,
        reserve_out: U256,
        fee: u32,
        data: serde_json::Value,
    ) -> PoolPrices {
        let (prices, unit) = Self::quote_amounts(query, reserve_in, reserve_out, fee);
        PoolPrices {
            prices,
            unit,
            gas_cost: GasCost::Scalar(GAS_COST_SWAP * pool_addresses.len() as u64),
            gas_cost_l2: None,
            exchange: self.key.clone(),
            pool_identifier: Some(id),
            pool_addresses,
            data,
        }
    }
}

/// Total source-side transfer fee in basis points.
fn src_fee_bps(fees: &TransferFeeParams) -> u32 {
    u32::from(fees.src_fee) + u32::from(fees.src_dex_fee)
}

fn dest_fee_bps(fees: &TransferFeeParams) -> u32 {
    u32::from(fees.dest_fee) + u32::from(fees.dest_dex_fee)
}

/// Reduces `amount` by a transfer fee taken on the way in or out.
fn discount(amount: U256, fee_bps: u32) -> U256 {
    if fee_bps == 0 {
        return amount;
    }
    if fee_bps >= FEE_DENOMINATOR {
        return U256::ZERO;
    }
    amount * U256::from(FEE_DENOMINATOR - fee_bps) / U256::from(FEE_DENOMINATOR)
}

/// Inflates `amount` so that the desired amount survives the transfer fee.
fn gross_up(amount: U256, fee_bps: u32) -> U256 {
    if fee_bps == 0 {
        return amount;
    }
    if fee_bps >= FEE_DENOMINATOR {
        return U256::ZERO;
    }
    amount
        .checked_mul(U256::from(FEE_DENOMINATOR))
        .map(|scaled| scaled / U256::from(FEE_DENOMINATOR - fee_bps))
        .unwrap_or_default()
}

fn oriented(state: &PoolState, pool: &PoolConfig, token_in: Address) -> (U256, U256) {
    if pool.token0 == token_in {
        (state.reserve0, state.reserve1)
    } else {
        (state.reserve1, state.reserve0)
    }
}

#[async_trait::async_trait]
impl LiquiditySource for ConstantProductSource {
    fn key(&self) -> &DexKey {
        &self.key
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            constant_price_large_amounts: false,
            need_wrap_native: true,
            fee_on_transfer: true,
            pricing_lifecycle: true,
            cache_state_key: Some(format!("{}_pool_state", self.key)),
        }
    }

    async fn initialize_pricing(&self, block: u64) -> Result<()> {
        let pools: Vec<_> = self.pools.iter().map(|pool| pool.address).collect();
        self.indexer.warm(&pools, block).await
    }

    async fn release_resources(&self) -> Result<()> {
        self.indexer.release().await;
        Ok(())
    }

    async fn pool_identifiers(
        &self,
        from: &Token,
        to: &Token,
        _side: Side,
        _block: u64,
    ) -> Result<Vec<PoolId>> {
        let mut ids: Vec<PoolId> = self
            .direct_pools(from.address, to.address)
            .map(|pool| self.pool_id(&PoolId::pair_payload(pool.token0, pool.token1)))
            .collect();
        if self.virtual_pools {
            ids.extend(
                self.virtual_legs(from.address, to.address)
                    .into_iter()
                    .map(|(jk, ik)| self.virtual_pool_id(jk, ik)),
            );
        }
        Ok(ids)
    }

    async fn prices_volume(&self, query: &PricesQuery<'_>) -> Result<Option<Vec<PoolPrices>>> {
        let wanted = |id: &PoolId| query.limit_pools.is_none_or(|limit| limit.contains(id));
        let mut quotes = Vec::new();

        for pool in self.direct_pools(query.from.address, query.to.address) {
            let id = self.pool_id(&PoolId::pair_payload(pool.token0, pool.token1));
            if !wanted(&id) {
                continue;
            }
            // Missing state is not an error; the pool just has no quote at
            // this block.
            let Some(state) = self.indexer.pool_state(pool.address, query.block).await else {
                tracing::debug!(pool = ?pool.address, block = query.block, "no pool state");
                continue;
            };
            let (reserve_in, reserve_out) = oriented(&state, pool, query.from.address);
            quotes.push(self.pool_prices(
                query,
                id,
                vec![pool.address],
                reserve_in,
                reserve_out,
                state.fee,
                serde_json::json!({
                    "pools": [{
                        "address": format!("{:#x}", pool.address),
                        "direction": pool.token0 == query.from.address,
                        "fee": state.fee,
                    }],
                }),
            ));
        }

        if self.virtual_pools {
            for (jk, ik) in self.virtual_legs(query.from.address, query.to.address) {
                let id = self.virtual_pool_id(jk, ik);
                if !wanted(&id) {
                    continue;
                }
                // Both legs must have state at the same block reference;
                // otherwise this virtual pool is silently skipped.
                let (Some(jk_state), Some(ik_state)) = (
                    self.indexer.pool_state(jk.address, query.block).await,
                    self.indexer.pool_state(ik.address, query.block).await,
                ) else {
                    continue;
                };
                let (jk_base, jk_common) = oriented(&jk_state, jk, query.to.address);
                let (ik_base, ik_common) = oriented(&ik_state, ik, query.from.address);
                let Some(pool) = VirtualPool::derive(
                    &Leg {
                        base: jk_base,
                        common: jk_common,
                        fee: jk_state.fee,
                    },
                    &Leg {
                        base: ik_base,
                        common: ik_common,
                        fee: ik_state.fee,
                    },
                ) else {
                    tracing::debug!(%id, "virtual pool not derivable");
                    continue;
                };
                quotes.push(self.pool_prices(
                    query,
                    id,
                    vec![ik.address, jk.address],
                    pool.reserve_in,
                    pool.reserve_out,
                    pool.fee,
                    serde_json::json!({
                        "pools": [
                            {
                                "address": format!("{:#x}", ik.address),
                                "direction": ik.token0 == query.from.address,
                                "fee": ik_state.fee,
                            },
                            {
                                "address": format!("{:#x}", jk.address),
                                "direction": jk.token1 == query.to.address,
                                "fee": jk_state.fee,
                            },
                        ],
                    }),
                ));
            }
        }

        Ok(Some(quotes))
    }

    fn calldata_gas_cost(&self, prices: &PoolPrices) -> GasCost {
        GasCost::Scalar(CALLDATA_GAS_PER_POOL * prices.pool_addresses.len().max(1) as u64)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        pool_indexer::{MockLogRetrieving, MockPoolReading, PoolSnapshot},
        std::collections::HashMap,
    };

    const TOKEN_A: Address = Address::repeat_byte(0x0a);
    const TOKEN_B: Address = Address::repeat_byte(0x0b);
    const TOKEN_K: Address = Address::repeat_byte(0x0c);
    const WARM_BLOCK: u64 = 100;

    fn token(address: Address) -> Token {
        Token::new(address, 0)
    }

    fn snapshot(reserve0: u64, reserve1: u64) -> PoolSnapshot {
        PoolSnapshot {
            reserve0: U256::from(reserve0),
            reserve1: U256::from(reserve1),
            fee: None,
        }
    }

    /// Indexer answering snapshot reads from a fixed address → reserves
    /// map, warmed for all of `pools` at `WARM_BLOCK`.
    async fn warmed_source(
        pools: Vec<PoolConfig>,
        reserves: HashMap<Address, PoolSnapshot>,
        virtual_pools: bool,
    ) -> ConstantProductSource {
        let mut reader = MockPoolReading::new();
        reader.expect_read_states().returning(move |pools, _| {
            Ok(pools.iter().map(|pool| reserves.get(pool).copied()).collect())
        });
        let indexer = Arc::new(PoolIndexer::new(
            Arc::new(reader),
            Arc::new(MockLogRetrieving::new()),
        ));
        let source = ConstantProductSource::new("swapline".into(), pools, indexer);
        let source = if virtual_pools {
            source.with_virtual_pools()
        } else {
            source
        };
        source.initialize_pricing(WARM_BLOCK).await.unwrap();
        source
    }

    fn query<'a>(from: &'a Token, to: &'a Token, amounts: &'a [U256]) -> PricesQuery<'a> {
        PricesQuery {
            from,
            to,
            amounts,
            side: Side::Sell,
            block: WARM_BLOCK + 1,
            limit_pools: None,
            transfer_fees: Default::default(),
        }
    }

    #[tokio::test]
    async fn quotes_direct_pool() {
        let pool = PoolConfig::new(Address::repeat_byte(1), TOKEN_A, TOKEN_B);
        let source = warmed_source(
            vec![pool],
            maplit::hashmap! { pool.address => snapshot(1_000_000, 2_000_000) },
            false,
        )
        .await;

        let (from, to) = (token(TOKEN_A), token(TOKEN_B));
        let amounts = [U256::ZERO, U256::from(1_000)];
        let quotes = source
            .prices_volume(&query(&from, &to, &amounts))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].prices, vec![U256::ZERO, U256::from(1_993)]);
        assert_eq!(quotes[0].unit, U256::from(1));
        assert_eq!(quotes[0].gas_cost, GasCost::Scalar(GAS_COST_SWAP));
        assert_eq!(
            quotes[0].pool_identifier,
            Some(PoolId::for_pair(source.key(), TOKEN_A, TOKEN_B)),
        );
        assert_eq!(quotes[0].pool_addresses, vec![pool.address]);
    }

    #[tokio::test]
    async fn buy_side_rounds_up() {
        let pool = PoolConfig::new(Address::repeat_byte(1), TOKEN_A, TOKEN_B);
        let source = warmed_source(
            vec![pool],
            maplit::hashmap! { pool.address => snapshot(1_000_000, 2_000_000) },
            false,
        )
        .await;

        let (from, to) = (token(TOKEN_A), token(TOKEN_B));
        let amounts = [U256::from(1_993)];
        let mut query = query(&from, &to, &amounts);
        query.side = Side::Buy;
        let quotes = source.prices_volume(&query).await.unwrap().unwrap();

        // Selling the quoted input must cover the requested output.
        let required = quotes[0].prices[0];
        assert!(
            amm::get_amount_out(required, U256::from(1_000_000), U256::from(2_000_000), 30)
                >= U256::from(1_993),
        );
    }

    #[tokio::test]
    async fn missing_state_yields_no_quote_for_the_pool() {
        let pool = PoolConfig::new(Address::repeat_byte(1), TOKEN_A, TOKEN_B);
        let source = warmed_source(
            vec![pool],
            maplit::hashmap! { pool.address => snapshot(1_000_000, 2_000_000) },
            false,
        )
        .await;

        let (from, to) = (token(TOKEN_A), token(TOKEN_B));
        let amounts = [U256::from(1_000)];
        let mut query = query(&from, &to, &amounts);
        // At the warm block itself no state is visible yet.
        query.block = WARM_BLOCK;
        let quotes = source.prices_volume(&query).await.unwrap().unwrap();
        assert!(quotes.is_empty());
    }

    #[tokio::test]
    async fn respects_limit_pools() {
        let pool = PoolConfig::new(Address::repeat_byte(1), TOKEN_A, TOKEN_B);
        let source = warmed_source(
            vec![pool],
            maplit::hashmap! { pool.address => snapshot(1_000_000, 2_000_000) },
            false,
        )
        .await;

        let (from, to) = (token(TOKEN_A), token(TOKEN_B));
        let amounts = [U256::from(1_000)];

        let id = PoolId::for_pair(source.key(), TOKEN_A, TOKEN_B);
        // Pool ids match case-insensitively.
        let limit = [PoolId(id.0.to_uppercase())];
        let mut limited = query(&from, &to, &amounts);
        limited.limit_pools = Some(&limit);
        assert_eq!(source.prices_volume(&limited).await.unwrap().unwrap().len(), 1);

        let limit = [PoolId::from("swapline_other")];
        let mut limited = query(&from, &to, &amounts);
        limited.limit_pools = Some(&limit);
        assert!(source.prices_volume(&limited).await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn applies_source_transfer_fee() {
        let pool = PoolConfig::new(Address::repeat_byte(1), TOKEN_A, TOKEN_B);
        let source = warmed_source(
            vec![pool],
            maplit::hashmap! { pool.address => snapshot(1_000_000, 2_000_000) },
            false,
        )
        .await;

        let (from, to) = (token(TOKEN_A), token(TOKEN_B));
        let amounts = [U256::from(1_000)];
        let mut taxed = query(&from, &to, &amounts);
        taxed.transfer_fees = TransferFeeParams {
            src_fee: 100,
            ..Default::default()
        };
        let quotes = source.prices_volume(&taxed).await.unwrap().unwrap();
        // 1% skimmed on the way in: quoting 990 instead of 1000.
        assert_eq!(
            quotes[0].prices[0],
            amm::get_amount_out(
                U256::from(990),
                U256::from(1_000_000),
                U256::from(2_000_000),
                30,
            ),
        );
    }

    #[tokio::test]
    async fn derives_virtual_pools() {
        let jk = PoolConfig::new(Address::repeat_byte(1), TOKEN_B, TOKEN_K);
        let ik = PoolConfig::new(Address::repeat_byte(2), TOKEN_A, TOKEN_K);
        let source = warmed_source(
            vec![jk, ik],
            maplit::hashmap! {
                // (B, K) with B = token0.
                jk.address => snapshot(2_000_000, 1_000_000),
                // (A, K) with A = token0.
                ik.address => snapshot(500_000, 250_000),
            },
            true,
        )
        .await;

        let (from, to) = (token(TOKEN_A), token(TOKEN_B));
        let ids = source
            .pool_identifiers(&from, &to, Side::Sell, WARM_BLOCK + 1)
            .await
            .unwrap();
        assert_eq!(ids, vec![source.virtual_pool_id(&jk, &ik)]);

        let amounts = [U256::from(1_000)];
        let quotes = source
            .prices_volume(&query(&from, &to, &amounts))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(quotes.len(), 1);
        // Scaled synthetic reserves are (2_000_000, 2_000_000) at 30 bps.
        assert_eq!(quotes[0].prices[0], U256::from(996));
        assert_eq!(quotes[0].pool_addresses, vec![ik.address, jk.address]);
    }

    #[tokio::test]
    async fn virtual_pool_with_missing_leg_is_skipped() {
        let jk = PoolConfig::new(Address::repeat_byte(1), TOKEN_B, TOKEN_K);
        let ik = PoolConfig::new(Address::repeat_byte(2), TOKEN_A, TOKEN_K);
        let source = warmed_source(
            vec![jk, ik],
            // Only the jk leg has state.
            maplit::hashmap! { jk.address => snapshot(2_000_000, 1_000_000) },
            true,
        )
        .await;

        let (from, to) = (token(TOKEN_A), token(TOKEN_B));
        let amounts = [U256::from(1_000)];
        let quotes = source
            .prices_volume(&query(&from, &to, &amounts))
            .await
            .unwrap()
            .unwrap();
        assert!(quotes.is_empty());
    }
}
