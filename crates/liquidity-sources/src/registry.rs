use {
    crate::{
        model::DexKey,
        optimizer::{RateTransform, UnoptimizedRate},
        source::LiquiditySource,
    },
    indexmap::IndexMap,
    std::sync::Arc,
};

/// Lookup of an unregistered venue key. The pricing coordinator recovers
/// from this locally; it only surfaces through [`Registry::dex_by_key`].
#[derive(Clone, Debug, thiserror::Error)]
#[error("invalid DEX key: {0}")]
pub struct InvalidDexKey(pub DexKey);

/// All venue adapters available on a network, one instance per process.
pub struct Registry {
    sources: IndexMap<DexKey, Arc<dyn LiquiditySource>>,
    rate_transforms: Vec<RateTransform>,
}

impl Registry {
    /// Adapters are registered in iteration order; that order is also the
    /// order of [`Registry::all_dex_keys`]. Rate transforms are applied
    /// left to right by [`Registry::optimize_rate`].
    pub fn new(
        sources: Vec<Arc<dyn LiquiditySource>>,
        rate_transforms: Vec<RateTransform>,
    ) -> Self {
        Self {
            sources: sources
                .into_iter()
                .map(|source| (source.key().clone(), source))
                .collect(),
            rate_transforms,
        }
    }

    pub fn all_dex_keys(&self) -> Vec<DexKey> {
        self.sources.keys().cloned().collect()
    }

    pub fn dex_by_key(&self, key: &DexKey) -> Result<Arc<dyn LiquiditySource>, InvalidDexKey> {
        self.sources
            .get(key)
            .cloned()
            .ok_or_else(|| InvalidDexKey(key.clone()))
    }

    /// Filters `keys` down to venues that can model fee-on-transfer
    /// tokens. Unknown keys are silently ignored.
    pub fn dexes_supporting_fee_on_transfer(&self, keys: &[DexKey]) -> Vec<DexKey> {
        keys.iter()
            .filter(|key| {
                self.sources
                    .get(*key)
                    .is_some_and(|source| source.capabilities().fee_on_transfer)
            })
            .cloned()
            .collect()
    }

    /// Applies the registered route transforms to an unoptimized routing
    /// decision, left to right. An empty pipeline is the identity.
    pub fn optimize_rate(&self, rate: UnoptimizedRate) -> UnoptimizedRate {
        self.rate_transforms
            .iter()
            .fold(rate, |rate, transform| transform(rate))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("rate_transforms", &self.rate_transforms.len())
            .finish()
    }
}
