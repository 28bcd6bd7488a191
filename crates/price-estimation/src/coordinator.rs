use {
    alloy_primitives::U256,
    futures::future::join_all,
    indexmap::IndexMap,
    liquidity_sources::{
        Capabilities, DexKey, GasCost, ImprovedPoolPrice, LiquiditySource, PoolId, PoolPrices,
        PricesQuery, Registry, SRC_TOKEN_TRANSFER_FEE_POOL, Side, Token, TransferFeeParams,
        to_improved_pool_prices,
    },
    prometheus::IntCounterVec,
    std::{collections::HashMap, sync::Arc, time::Duration},
    tracing::instrument,
};

#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub fetch_pool_identifier_timeout: Duration,
    pub fetch_pool_prices_timeout: Duration,
}

/// Why one venue's contribution to a request failed. The display string
/// doubles as the pool id of the error envelope, which keeps venues
/// traceable in the result without leaking error chains downstream.
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("Timeout")]
    Timeout,
    #[error("{0}")]
    Adapter(anyhow::Error),
    #[error("InvalidCalldataGasCost")]
    InvalidCalldataGasCost,
}

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "pricing")]
struct Metrics {
    /// Identifier discovery failures per venue.
    #[metric(labels("dex"))]
    identifier_errors: IntCounterVec,

    /// Quote failures per venue, including timeouts.
    #[metric(labels("dex", "kind"))]
    price_errors: IntCounterVec,

    /// Quotes dropped by the validation gate.
    #[metric(labels("dex", "reason"))]
    validation_rejections: IntCounterVec,
}

/// Fans pricing work out across venue adapters.
///
/// Every per-adapter call runs under its own deadline and failures stay
/// contained: a venue that errors or times out contributes a diagnostic
/// envelope (or an empty identifier list), never an aggregate failure.
pub struct PriceAggregator {
    registry: Arc<Registry>,
    /// The canonical wrapped form the native-token sentinel is rewritten
    /// to for venues that require wrapping.
    wrapped_native: Token,
    config: Config,
    metrics: &'static Metrics,
}

impl PriceAggregator {
    pub fn new(registry: Arc<Registry>, wrapped_native: Token, config: Config) -> Self {
        Self {
            registry,
            wrapped_native,
            config,
            metrics: Metrics::instance(observe::metrics::get_storage_registry()).unwrap(),
        }
    }

    /// Discovers applicable pool identifiers per venue. The result
    /// preserves the order of `keys`; unknown keys are silently excluded.
    /// A `None` entry marks a venue that opted out because its prices are
    /// constant and `filter_constant_price` was requested.
    #[instrument(skip_all, fields(block, ?side))]
    pub async fn pool_identifiers(
        &self,
        from: &Token,
        to: &Token,
        side: Side,
        block: u64,
        keys: &[DexKey],
        filter_constant_price: bool,
    ) -> IndexMap<DexKey, Option<Vec<PoolId>>> {
        let sources = self.resolve(keys);
        if from == to {
            return sources
                .into_iter()
                .map(|(key, _)| (key, Some(vec![])))
                .collect();
        }

        join_all(sources.into_iter().map(|(key, source)| async move {
            let capabilities = source.capabilities();
            if filter_constant_price && capabilities.constant_price_large_amounts {
                return (key, None);
            }
            let (from, to) = self.wrap_native(&capabilities, from, to);
            let identifiers = tokio::time::timeout(
                self.config.fetch_pool_identifier_timeout,
                source.pool_identifiers(&from, &to, side, block),
            )
            .await;
            let identifiers = match identifiers {
                Ok(Ok(identifiers)) => identifiers,
                Ok(Err(err)) => {
                    tracing::warn!(dex = %key, ?err, "pool identifier discovery failed");
                    self.metrics
                        .identifier_errors
                        .with_label_values(&[&key.0])
                        .inc();
                    vec![]
                }
                Err(_) => {
                    tracing::warn!(dex = %key, "pool identifier discovery timed out");
                    self.metrics
                        .identifier_errors
                        .with_label_values(&[&key.0])
                        .inc();
                    vec![]
                }
            };
            (key, Some(identifiers))
        }))
        .await
        .into_iter()
        .collect()
    }

    /// Quotes the requested amounts across venues. The flattened result
    /// is ordered by `keys` first and by each venue's pool order second;
    /// quotes failing validation are dropped, diagnostic envelopes pass
    /// through untouched.
    #[instrument(skip_all, fields(block, ?side))]
    pub async fn pool_prices(
        &self,
        from: &Token,
        to: &Token,
        amounts: &[U256],
        side: Side,
        block: u64,
        keys: &[DexKey],
        limit_pools: Option<&HashMap<DexKey, Vec<PoolId>>>,
        transfer_fees: &TransferFeeParams,
        rollup_l1_to_l2_gas_ratio: Option<f64>,
    ) -> Vec<ImprovedPoolPrice> {
        if from == to {
            return vec![];
        }

        let sources = self.resolve(keys);
        let envelopes = join_all(sources.into_iter().map(|(key, source)| {
            self.prices_for_dex(
                key,
                source,
                from,
                to,
                amounts,
                side,
                block,
                limit_pools,
                transfer_fees,
                rollup_l1_to_l2_gas_ratio,
            )
        }))
        .await;

        envelopes
            .into_iter()
            .flatten()
            .filter(|envelope| self.passes_validation(envelope, amounts))
            .collect()
    }

    /// One venue's contribution, bounded by the quote deadline. Work
    /// still pending at the deadline is abandoned, not awaited.
    #[allow(clippy::too_many_arguments)]
    async fn prices_for_dex(
        &self,
        key: DexKey,
        source: Arc<dyn LiquiditySource>,
        from: &Token,
        to: &Token,
        amounts: &[U256],
        side: Side,
        block: u64,
        limit_pools: Option<&HashMap<DexKey, Vec<PoolId>>>,
        transfer_fees: &TransferFeeParams,
        rollup_l1_to_l2_gas_ratio: Option<f64>,
    ) -> Vec<ImprovedPoolPrice> {
        let limit = limit_pools.and_then(|limits| limits.get(&key));
        if limit.is_some_and(|limit| limit.is_empty()) {
            // The caller explicitly ruled out every pool of this venue.
            return vec![];
        }

        let capabilities = source.capabilities();
        if transfer_fees.src_fee_in_play() && !capabilities.fee_on_transfer {
            return vec![ImprovedPoolPrice {
                dex_key: key,
                pool_id: PoolId::from(SRC_TOKEN_TRANSFER_FEE_POOL),
                prices: None,
            }];
        }

        let query = self.query_adapter(
            &key,
            &source,
            &capabilities,
            from,
            to,
            amounts,
            side,
            block,
            limit,
            transfer_fees,
            rollup_l1_to_l2_gas_ratio,
        );
        match tokio::time::timeout(self.config.fetch_pool_prices_timeout, query).await {
            Ok(Ok(envelopes)) => envelopes,
            Ok(Err(err)) => {
                tracing::warn!(dex = %key, %err, "quoting failed");
                self.metrics
                    .price_errors
                    .with_label_values(&[&key.0, "error"])
                    .inc();
                vec![error_envelope(key, &err)]
            }
            Err(_) => {
                tracing::warn!(dex = %key, "quoting timed out");
                self.metrics
                    .price_errors
                    .with_label_values(&[&key.0, "timeout"])
                    .inc();
                vec![error_envelope(key, &QuoteError::Timeout)]
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn query_adapter(
        &self,
        key: &DexKey,
        source: &Arc<dyn LiquiditySource>,
        capabilities: &Capabilities,
        from: &Token,
        to: &Token,
        amounts: &[U256],
        side: Side,
        block: u64,
        limit_pools: Option<&Vec<PoolId>>,
        transfer_fees: &TransferFeeParams,
        rollup_l1_to_l2_gas_ratio: Option<f64>,
    ) -> Result<Vec<ImprovedPoolPrice>, QuoteError> {
        let (from, to) = self.wrap_native(capabilities, from, to);
        let prices = source
            .prices_volume(&PricesQuery {
                from: &from,
                to: &to,
                amounts,
                side,
                block,
                limit_pools: limit_pools.map(Vec::as_slice),
                transfer_fees: *transfer_fees,
            })
            .await
            .map_err(QuoteError::Adapter)?;

        let mut envelopes = to_improved_pool_prices(key, prices);
        if let Some(ratio) = rollup_l1_to_l2_gas_ratio {
            for envelope in &mut envelopes {
                if let Some(prices) = &mut envelope.prices {
                    let l1 = source.calldata_gas_cost(prices);
                    apply_rollup_overlay(prices, l1, ratio, amounts.len()).map_err(|err| {
                        tracing::warn!(dex = %key, %err, "invalid calldata gas cost");
                        QuoteError::InvalidCalldataGasCost
                    })?;
                }
            }
        }
        Ok(envelopes)
    }

    fn passes_validation(&self, envelope: &ImprovedPoolPrice, amounts: &[U256]) -> bool {
        let Some(prices) = &envelope.prices else {
            // Diagnostic envelopes carry the failure lineage and are kept.
            return true;
        };
        match prices.validate(amounts) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(exchange = %prices.exchange, %err, "dropping invalid quote");
                self.metrics
                    .validation_rejections
                    .with_label_values(&[&prices.exchange.0, err.reason()])
                    .inc();
                false
            }
        }
    }

    /// Resolves keys to adapters, preserving order. Unknown keys are
    /// recovered locally: logged and excluded from this call.
    fn resolve(&self, keys: &[DexKey]) -> Vec<(DexKey, Arc<dyn LiquiditySource>)> {
        keys.iter()
            .filter_map(|key| match self.registry.dex_by_key(key) {
                Ok(source) => Some((key.clone(), source)),
                Err(err) => {
                    tracing::debug!(%err, "venue excluded from request");
                    None
                }
            })
            .collect()
    }

    fn wrap_native(
        &self,
        capabilities: &Capabilities,
        from: &Token,
        to: &Token,
    ) -> (Token, Token) {
        if !capabilities.need_wrap_native {
            return (*from, *to);
        }
        let wrap = |token: &Token| {
            if token.is_native() {
                self.wrapped_native
            } else {
                *token
            }
        };
        (wrap(from), wrap(to))
    }
}

fn error_envelope(dex_key: DexKey, err: &QuoteError) -> ImprovedPoolPrice {
    ImprovedPoolPrice {
        dex_key,
        pool_id: PoolId(err.to_string()),
        prices: None,
    }
}

#[derive(Debug, thiserror::Error)]
#[error("calldata gas cost shape does not match the quote's gas cost")]
struct OverlayShapeMismatch;

/// Folds the venue's L1 calldata gas, scaled by the rollup ratio, into
/// the execution gas cost. The plain L2 figure is preserved alongside.
fn apply_rollup_overlay(
    prices: &mut PoolPrices,
    l1: GasCost,
    ratio: f64,
    chunks: usize,
) -> Result<(), OverlayShapeMismatch> {
    prices.gas_cost_l2 = Some(prices.gas_cost.clone());
    match (&mut prices.gas_cost, l1) {
        (GasCost::Scalar(gas), GasCost::Scalar(l1)) => *gas += amortized(l1, ratio),
        (GasCost::PerChunk(gas), GasCost::PerChunk(l1))
            if gas.len() == chunks && l1.len() == chunks =>
        {
            for (gas, l1) in gas.iter_mut().zip(l1) {
                *gas += amortized(l1, ratio);
            }
        }
        _ => return Err(OverlayShapeMismatch),
    }
    Ok(())
}

fn amortized(l1_gas: u64, ratio: f64) -> u64 {
    (ratio * l1_gas as f64).ceil() as u64
}
