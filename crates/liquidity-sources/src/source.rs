use {
    crate::model::{DexKey, GasCost, PoolId, PoolPrices, Side, Token, TransferFeeParams},
    alloy_primitives::U256,
    anyhow::Result,
};

/// Capability record of a venue adapter. Optional operations are tagged
/// with explicit presence flags instead of being discovered by probing.
#[derive(Clone, Debug, Default)]
pub struct Capabilities {
    /// Quotes are linear in the amount; such venues may be filtered out
    /// of identifier discovery for large-amount requests.
    pub constant_price_large_amounts: bool,
    /// Whether native-token requests must be rewritten to the wrapped
    /// token before this venue is queried.
    pub need_wrap_native: bool,
    /// Whether the venue models fee-on-transfer source tokens. If not,
    /// requests with a source transfer fee skip it with a diagnostic.
    pub fee_on_transfer: bool,
    /// Whether `initialize_pricing` / `release_resources` do real work
    /// and should be driven by the lifecycle manager.
    pub pricing_lifecycle: bool,
    /// Cache namespace to invalidate when this venue (re)initializes;
    /// `None` for venues without shared cached state.
    pub cache_state_key: Option<String>,
}

/// One pricing request as seen by an adapter.
#[derive(Clone, Copy, Debug)]
pub struct PricesQuery<'a> {
    pub from: &'a Token,
    pub to: &'a Token,
    pub amounts: &'a [U256],
    pub side: Side,
    pub block: u64,
    /// Restricts quoting to these pools. `None` means all pools the venue
    /// knows for the pair.
    pub limit_pools: Option<&'a [PoolId]>,
    pub transfer_fees: TransferFeeParams,
}

/// The uniform capability surface every venue implements.
///
/// Instances are constructed once at registry load, stay immutable
/// afterwards (apart from internal state behind their own
/// synchronization) and are invoked from many concurrent requests. Any
/// method may be abandoned at a deadline, so implementations must not
/// leave non-idempotent side effects half-applied across await points.
#[async_trait::async_trait]
pub trait LiquiditySource: Send + Sync {
    fn key(&self) -> &DexKey;

    fn capabilities(&self) -> Capabilities;

    /// Warms caches and subscribes to events. Retried by the lifecycle
    /// manager on failure, therefore idempotent.
    async fn initialize_pricing(&self, _block: u64) -> Result<()> {
        Ok(())
    }

    /// Idempotent teardown counterpart of `initialize_pricing`.
    async fn release_resources(&self) -> Result<()> {
        Ok(())
    }

    /// All venue-scoped pool identifiers applicable to the pair at the
    /// block.
    async fn pool_identifiers(
        &self,
        from: &Token,
        to: &Token,
        side: Side,
        block: u64,
    ) -> Result<Vec<PoolId>>;

    /// Quotes the requested amounts. `Ok(None)` signals "no quote" for a
    /// known reason and is canonicalized into a diagnostic envelope.
    async fn prices_volume(&self, query: &PricesQuery<'_>) -> Result<Option<Vec<PoolPrices>>>;

    /// L1 calldata gas attributable to executing this quote, used by the
    /// rollup gas overlay. The shape must match the quote's `gas_cost`.
    fn calldata_gas_cost(&self, prices: &PoolPrices) -> GasCost;
}
