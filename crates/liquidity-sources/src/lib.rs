//! Venue adapters ("liquidity sources") for the pricing aggregator, the
//! capability contract they implement, and the registry that owns them.

pub mod model;
pub mod optimizer;
pub mod registry;
pub mod source;
pub mod sources;

pub use {
    model::{
        DexKey, GasCost, ImprovedPoolPrice, NATIVE_TOKEN, PoolId, PoolPrices, QuoteShapeError,
        SRC_TOKEN_TRANSFER_FEE_POOL, Side, Token, TransferFeeParams, to_improved_pool_prices,
    },
    optimizer::{RateTransform, UnoptimizedRate},
    registry::{InvalidDexKey, Registry},
    source::{Capabilities, LiquiditySource, PricesQuery},
};
