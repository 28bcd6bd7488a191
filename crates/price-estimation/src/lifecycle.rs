use {
    crate::cache::CacheStoring,
    anyhow::Result,
    futures::future::join_all,
    liquidity_sources::{DexKey, LiquiditySource, Registry},
    prometheus::IntCounterVec,
    std::{
        collections::HashSet,
        sync::{Arc, Mutex},
        time::Duration,
    },
    tracing::instrument,
};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum Operation {
    Initialize,
    Release,
}

impl Operation {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Release => "release",
        }
    }
}

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "lifecycle")]
struct Metrics {
    /// Failed lifecycle operations per venue.
    #[metric(labels("operation", "dex"))]
    failures: IntCounterVec,

    /// Background retries of failed lifecycle operations.
    #[metric(labels("operation", "dex"))]
    retries: IntCounterVec,
}

/// Drives adapter initialization and teardown.
///
/// The inbound calls never fail: a venue whose operation errors gets an
/// unbounded background retry loop, de-duplicated per (operation, venue).
/// Masters additionally invalidate a venue's advertised shared-cache key
/// before initializing it so replicas rebuild from fresh state.
#[derive(Clone)]
pub struct LifecycleManager {
    registry: Arc<Registry>,
    cache: Arc<dyn CacheStoring>,
    retry_timeout: Duration,
    is_slave: bool,
    scheduled_retries: Arc<Mutex<HashSet<(Operation, DexKey)>>>,
    metrics: &'static Metrics,
}

impl LifecycleManager {
    pub fn new(
        registry: Arc<Registry>,
        cache: Arc<dyn CacheStoring>,
        retry_timeout: Duration,
        is_slave: bool,
    ) -> Self {
        Self {
            registry,
            cache,
            retry_timeout,
            is_slave,
            scheduled_retries: Default::default(),
            metrics: Metrics::instance(observe::metrics::get_storage_registry()).unwrap(),
        }
    }

    /// Initializes pricing on all venues concurrently. Completes after
    /// the first attempt round; failed venues keep retrying in the
    /// background.
    #[instrument(skip_all, fields(block))]
    pub async fn initialize(&self, block: u64, keys: &[DexKey]) {
        join_all(
            keys.iter()
                .map(|key| self.run(Operation::Initialize, key.clone(), block)),
        )
        .await;
    }

    /// Releases all venues' resources, mirroring [`Self::initialize`].
    #[instrument(skip_all)]
    pub async fn release_resources(&self, keys: &[DexKey]) {
        join_all(
            keys.iter()
                .map(|key| self.run(Operation::Release, key.clone(), 0)),
        )
        .await;
    }

    async fn run(&self, operation: Operation, key: DexKey, block: u64) {
        let Ok(source) = self.registry.dex_by_key(&key) else {
            tracing::debug!(dex = %key, "unknown venue, skipping lifecycle operation");
            return;
        };
        if !source.capabilities().pricing_lifecycle {
            return;
        }
        match self.attempt(operation, &source, block).await {
            Ok(()) => {
                tracing::debug!(dex = %key, operation = operation.as_str(), "lifecycle operation done");
            }
            Err(err) => {
                tracing::warn!(
                    dex = %key,
                    operation = operation.as_str(),
                    ?err,
                    "lifecycle operation failed, scheduling retry",
                );
                self.metrics
                    .failures
                    .with_label_values(&[operation.as_str(), &key.0])
                    .inc();
                self.schedule_retry(operation, key, block);
            }
        }
    }

    async fn attempt(
        &self,
        operation: Operation,
        source: &Arc<dyn LiquiditySource>,
        block: u64,
    ) -> Result<()> {
        match operation {
            Operation::Initialize => {
                if !self.is_slave {
                    if let Some(cache_key) = source.capabilities().cache_state_key {
                        // The cache is a hint, not correctness-critical;
                        // a failed invalidation must not block the init.
                        if let Err(err) = self.cache.rawdel(&cache_key).await {
                            tracing::warn!(cache_key, ?err, "cache invalidation failed");
                        }
                    }
                }
                source.initialize_pricing(block).await
            }
            Operation::Release => source.release_resources().await,
        }
    }

    /// Spawns the retry loop for a failed operation unless one is already
    /// running for the same (operation, venue).
    fn schedule_retry(&self, operation: Operation, key: DexKey, block: u64) {
        {
            let mut scheduled = self.scheduled_retries.lock().unwrap();
            if !scheduled.insert((operation, key.clone())) {
                return;
            }
        }
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(this.retry_timeout).await;
                this.metrics
                    .retries
                    .with_label_values(&[operation.as_str(), &key.0])
                    .inc();
                let Ok(source) = this.registry.dex_by_key(&key) else {
                    break;
                };
                match this.attempt(operation, &source, block).await {
                    Ok(()) => {
                        tracing::info!(
                            dex = %key,
                            operation = operation.as_str(),
                            "lifecycle operation succeeded after retry",
                        );
                        break;
                    }
                    Err(err) => {
                        tracing::warn!(
                            dex = %key,
                            operation = operation.as_str(),
                            ?err,
                            "lifecycle retry failed",
                        );
                    }
                }
            }
            this.scheduled_retries
                .lock()
                .unwrap()
                .remove(&(operation, key));
        });
    }
}
