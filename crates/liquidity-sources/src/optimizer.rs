use {
    crate::model::{ImprovedPoolPrice, Side, Token},
    alloy_primitives::U256,
};

/// A routing decision before optimization: the raw quote set for a
/// request. Downstream route optimization consumes this; the core only
/// funnels it through the registered transform pipeline.
#[derive(Clone, Debug)]
pub struct UnoptimizedRate {
    pub src_token: Token,
    pub dest_token: Token,
    pub side: Side,
    pub amounts: Vec<U256>,
    pub quotes: Vec<ImprovedPoolPrice>,
}

/// A pure transform over an unoptimized rate. Transforms are composed by
/// left-fold in registration order.
pub type RateTransform = Box<dyn Fn(UnoptimizedRate) -> UnoptimizedRate + Send + Sync>;
