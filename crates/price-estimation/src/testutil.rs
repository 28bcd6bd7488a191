//! Scriptable venue adapter for exercising the coordinator and the
//! lifecycle manager.

use {
    anyhow::{Result, bail},
    liquidity_sources::{
        Capabilities, DexKey, GasCost, LiquiditySource, PoolId, PoolPrices, PricesQuery, Side,
        Token,
    },
    std::{
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    },
};

pub enum QuoteBehavior {
    Quotes(Vec<PoolPrices>),
    NoQuote,
    Fail(String),
    Hang,
}

pub struct FakeSource {
    key: DexKey,
    capabilities: Capabilities,
    identifiers: Vec<PoolId>,
    identifiers_hang: bool,
    behavior: QuoteBehavior,
    calldata_gas: GasCost,
    /// Last `(from, to, limit_pools)` this venue was quoted with.
    pub seen_query: Mutex<Option<(Token, Token, Option<Vec<PoolId>>)>>,
    pub init_attempts: AtomicUsize,
    init_failures_remaining: AtomicUsize,
    pub release_attempts: AtomicUsize,
    release_failures_remaining: AtomicUsize,
}

impl FakeSource {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.into(),
            capabilities: Capabilities {
                fee_on_transfer: true,
                ..Default::default()
            },
            identifiers: vec![],
            identifiers_hang: false,
            behavior: QuoteBehavior::NoQuote,
            calldata_gas: GasCost::Scalar(0),
            seen_query: Default::default(),
            init_attempts: Default::default(),
            init_failures_remaining: Default::default(),
            release_attempts: Default::default(),
            release_failures_remaining: Default::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_identifiers(mut self, identifiers: Vec<PoolId>) -> Self {
        self.identifiers = identifiers;
        self
    }

    pub fn with_quotes(mut self, quotes: Vec<PoolPrices>) -> Self {
        self.behavior = QuoteBehavior::Quotes(quotes);
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.behavior = QuoteBehavior::Fail(message.to_string());
        self
    }

    /// Both identifier discovery and quoting block far beyond any
    /// reasonable deadline.
    pub fn hanging(mut self) -> Self {
        self.behavior = QuoteBehavior::Hang;
        self.identifiers_hang = true;
        self
    }

    pub fn with_calldata_gas(mut self, gas: GasCost) -> Self {
        self.calldata_gas = gas;
        self
    }

    /// Enables the pricing lifecycle with the first `failures` attempts
    /// of each operation failing.
    pub fn with_lifecycle(self, failures: usize) -> Self {
        self.init_failures_remaining.store(failures, Ordering::SeqCst);
        self.release_failures_remaining
            .store(failures, Ordering::SeqCst);
        let capabilities = Capabilities {
            pricing_lifecycle: true,
            ..self.capabilities.clone()
        };
        self.with_capabilities(capabilities)
    }
}

#[async_trait::async_trait]
impl LiquiditySource for FakeSource {
    fn key(&self) -> &DexKey {
        &self.key
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities.clone()
    }

    async fn initialize_pricing(&self, _block: u64) -> Result<()> {
        self.init_attempts.fetch_add(1, Ordering::SeqCst);
        if decrement(&self.init_failures_remaining) {
            bail!("initialization failed");
        }
        Ok(())
    }

    async fn release_resources(&self) -> Result<()> {
        self.release_attempts.fetch_add(1, Ordering::SeqCst);
        if decrement(&self.release_failures_remaining) {
            bail!("release failed");
        }
        Ok(())
    }

    async fn pool_identifiers(
        &self,
        _from: &Token,
        _to: &Token,
        _side: Side,
        _block: u64,
    ) -> Result<Vec<PoolId>> {
        if self.identifiers_hang {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
        }
        Ok(self.identifiers.clone())
    }

    async fn prices_volume(&self, query: &PricesQuery<'_>) -> Result<Option<Vec<PoolPrices>>> {
        *self.seen_query.lock().unwrap() = Some((
            *query.from,
            *query.to,
            query.limit_pools.map(<[PoolId]>::to_vec),
        ));
        match &self.behavior {
            QuoteBehavior::Quotes(quotes) => Ok(Some(quotes.clone())),
            QuoteBehavior::NoQuote => Ok(None),
            QuoteBehavior::Fail(message) => bail!("{message}"),
            QuoteBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Ok(None)
            }
        }
    }

    fn calldata_gas_cost(&self, _prices: &PoolPrices) -> GasCost {
        self.calldata_gas.clone()
    }
}

/// Returns whether the counter was still positive, decrementing it.
fn decrement(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |failures| {
            failures.checked_sub(1)
        })
        .is_ok()
}
