//! Canonical shapes for tokens, pool identifiers and quotes shared by all
//! venue adapters and the pricing coordinator.

use {
    alloy_primitives::{Address, U256},
    std::hash::{Hash, Hasher},
};

/// ERC20 token address used by convention whenever the chain's native
/// token is treated like an ERC20 token. Requests quoting it are rewritten
/// to the canonical wrapped token before venues that require wrapping are
/// queried.
pub const NATIVE_TOKEN: Address = Address::repeat_byte(0xee);

/// Pool id reported when a venue is skipped because the source token
/// carries a transfer fee the venue cannot model.
pub const SRC_TOKEN_TRANSFER_FEE_POOL: &str = "isSrcTokenTransferFeeToBeExchanged_pool";

/// A token is identified by its address alone; the decimal precision only
/// affects unit-quote scaling.
#[derive(Clone, Copy, Debug)]
pub struct Token {
    pub address: Address,
    pub decimals: u8,
}

impl Token {
    pub fn new(address: Address, decimals: u8) -> Self {
        Self { address, decimals }
    }

    pub fn is_native(&self) -> bool {
        self.address == NATIVE_TOKEN
    }

    /// One whole unit of this token in its smallest denomination.
    pub fn one_unit(&self) -> U256 {
        U256::from(10).pow(U256::from(self.decimals))
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

/// Which side of the trade is fixed: SELL fixes the input amount, BUY the
/// output amount.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Side {
    Sell,
    Buy,
}

/// Basis-point transfer fees of fee-on-transfer tokens, each in
/// `[0, 10_000]`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TransferFeeParams {
    pub src_fee: u16,
    pub dest_fee: u16,
    pub src_dex_fee: u16,
    pub dest_dex_fee: u16,
}

impl TransferFeeParams {
    /// Whether the source token skims a fee on the way into the venue.
    /// Venues that cannot model this are skipped with a diagnostic quote.
    pub fn src_fee_in_play(&self) -> bool {
        self.src_fee > 0 || self.src_dex_fee > 0
    }
}

/// Key identifying one venue adapter, e.g. `"swapline"`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, derive_more::Display)]
pub struct DexKey(pub String);

impl From<&str> for DexKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Opaque pool identifier of the form `<venueKey>_<payload>`, unique
/// across venues. Compared and hashed case-insensitively.
#[derive(Clone, Debug, Default, derive_more::Display)]
pub struct PoolId(pub String);

impl PoolId {
    /// Identifier payload for a token pair: the sorted pair of addresses.
    pub fn pair_payload(a: Address, b: Address) -> String {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        format!("{lo:#x}_{hi:#x}")
    }

    pub fn for_pair(key: &DexKey, a: Address, b: Address) -> Self {
        Self(format!("{key}_{}", Self::pair_payload(a, b)))
    }
}

impl From<&str> for PoolId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl PartialEq for PoolId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for PoolId {}

impl Hash for PoolId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            byte.to_ascii_lowercase().hash(state);
        }
    }
}

/// Gas cost of executing a swap, either one figure for all amount chunks
/// or one figure per chunk.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GasCost {
    Scalar(u64),
    PerChunk(Vec<u64>),
}

/// A quote for one pool. `prices[i]` is the output amount for
/// `amounts[i]` (SELL) or the required input for it (BUY); 0 means "no
/// quote for that chunk".
#[derive(Clone, Debug)]
pub struct PoolPrices {
    pub prices: Vec<U256>,
    /// Quote for one whole unit of the fixed-decimal token, used for
    /// price-impact baselining downstream.
    pub unit: U256,
    pub gas_cost: GasCost,
    /// The plain execution cost before the rollup overlay added the
    /// amortized L1 calldata cost to `gas_cost`.
    pub gas_cost_l2: Option<GasCost>,
    pub exchange: DexKey,
    pub pool_identifier: Option<PoolId>,
    pub pool_addresses: Vec<Address>,
    /// Venue-opaque payload consumed by transaction encoding.
    pub data: serde_json::Value,
}

/// Reasons the validation gate drops a quote.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum QuoteShapeError {
    #[error("price count does not match amount count")]
    PriceCountMismatch,
    #[error("gas cost count does not match amount count")]
    GasCostCountMismatch,
    #[error("nonzero price for zero amount")]
    NonZeroPriceForZeroAmount,
    #[error("nonzero gas cost for zero amount")]
    NonZeroGasCostForZeroAmount,
    #[error("all prices are zero")]
    AllPricesZero,
}

impl QuoteShapeError {
    /// Stable label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::PriceCountMismatch => "price_count",
            Self::GasCostCountMismatch => "gas_cost_count",
            Self::NonZeroPriceForZeroAmount => "price_for_zero_amount",
            Self::NonZeroGasCostForZeroAmount => "gas_for_zero_amount",
            Self::AllPricesZero => "all_prices_zero",
        }
    }
}

impl PoolPrices {
    /// Checks the cross-adapter output invariants against the request's
    /// amounts. Quotes failing any check are dropped by the coordinator.
    pub fn validate(&self, amounts: &[U256]) -> Result<(), QuoteShapeError> {
        if self.prices.len() != amounts.len() {
            return Err(QuoteShapeError::PriceCountMismatch);
        }
        if let GasCost::PerChunk(gas) = &self.gas_cost {
            if gas.len() != amounts.len() {
                return Err(QuoteShapeError::GasCostCountMismatch);
            }
            if amounts
                .iter()
                .zip(gas)
                .any(|(amount, gas)| amount.is_zero() && *gas != 0)
            {
                return Err(QuoteShapeError::NonZeroGasCostForZeroAmount);
            }
        }
        if amounts
            .iter()
            .zip(&self.prices)
            .any(|(amount, price)| amount.is_zero() && !price.is_zero())
        {
            return Err(QuoteShapeError::NonZeroPriceForZeroAmount);
        }
        if self.prices.iter().all(U256::is_zero) {
            return Err(QuoteShapeError::AllPricesZero);
        }
        Ok(())
    }
}

/// A quote envelope: either a full `PoolPrices` or a diagnostic `None`
/// with the reason recorded in `pool_id`.
#[derive(Clone, Debug)]
pub struct ImprovedPoolPrice {
    pub dex_key: DexKey,
    pub pool_id: PoolId,
    pub prices: Option<PoolPrices>,
}

/// Canonicalizes an adapter's answer into envelopes. An absent or empty
/// answer still contributes one (diagnostic) envelope so that every
/// adapter invocation is traceable in the result.
pub fn to_improved_pool_prices(
    dex_key: &DexKey,
    prices: Option<Vec<PoolPrices>>,
) -> Vec<ImprovedPoolPrice> {
    match prices {
        Some(prices) if !prices.is_empty() => prices
            .into_iter()
            .map(|prices| ImprovedPoolPrice {
                dex_key: dex_key.clone(),
                pool_id: prices.pool_identifier.clone().unwrap_or_default(),
                prices: Some(prices),
            })
            .collect(),
        _ => vec![ImprovedPoolPrice {
            dex_key: dex_key.clone(),
            pool_id: PoolId::default(),
            prices: None,
        }],
    }
}
