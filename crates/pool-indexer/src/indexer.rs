use {
    crate::{
        events::{self, LogRetrieving, PoolLog},
        history::{History, PoolState},
        reading::{DEFAULT_POOL_FEE, PoolReading},
    },
    alloy_primitives::Address,
    anyhow::{Context, Result},
    prometheus::{IntCounter, IntGauge},
    std::{
        collections::{HashMap, HashSet},
        sync::{Arc, Mutex},
    },
    tokio::sync::RwLock,
};

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "pool_indexer")]
struct Metrics {
    /// Number of pools with at least one indexed state.
    pools_tracked: IntGauge,

    /// Total `Sync` events applied to pool histories.
    sync_logs_applied: IntCounter,
}

/// Maintains block-indexed state histories for a set of pools.
///
/// New pools are warmed with a batched snapshot read and afterwards kept
/// current by applying their `Sync` logs. Histories are written only by
/// the maintenance path; pricing reads go through point-in-time snapshots
/// and never block maintenance for long.
pub struct PoolIndexer {
    reader: Arc<dyn PoolReading>,
    log_source: Arc<dyn LogRetrieving>,
    inner: RwLock<Inner>,
    /// Pools currently being warmed. This marker is the only "lock" that
    /// is logically held across a suspension point; it makes concurrent
    /// warm-ups of the same pool idempotent.
    warming: Mutex<HashSet<Address>>,
    metrics: &'static Metrics,
}

#[derive(Default)]
struct Inner {
    histories: HashMap<Address, History>,
    /// Highest block whose logs have been folded into the histories.
    last_processed: u64,
}

impl PoolIndexer {
    pub fn new(reader: Arc<dyn PoolReading>, log_source: Arc<dyn LogRetrieving>) -> Self {
        Self {
            reader,
            log_source,
            inner: Default::default(),
            warming: Default::default(),
            metrics: Metrics::instance(observe::metrics::get_storage_registry()).unwrap(),
        }
    }

    /// Snapshots any of `pools` that are not tracked yet at `block`.
    /// Already-tracked and currently-warming pools are skipped, so calling
    /// this concurrently or repeatedly is harmless.
    pub async fn warm(&self, pools: &[Address], block: u64) -> Result<()> {
        let to_warm: Vec<Address> = {
            let inner = self.inner.read().await;
            let mut warming = self.warming.lock().unwrap();
            pools
                .iter()
                .copied()
                .filter(|pool| !inner.histories.contains_key(pool) && warming.insert(*pool))
                .collect()
        };
        if to_warm.is_empty() {
            return Ok(());
        }
        scopeguard::defer! {
            let mut warming = self.warming.lock().unwrap();
            for pool in &to_warm {
                warming.remove(pool);
            }
        }

        let snapshots = self
            .reader
            .read_states(&to_warm, block)
            .await
            .context("batched pool snapshot failed")?;

        let mut inner = self.inner.write().await;
        for (pool, snapshot) in to_warm.iter().zip(snapshots) {
            let Some(snapshot) = snapshot else {
                tracing::debug!(?pool, block, "pool has no state at warm block");
                continue;
            };
            let state = PoolState {
                reserve0: snapshot.reserve0,
                reserve1: snapshot.reserve1,
                fee: snapshot.fee.unwrap_or(DEFAULT_POOL_FEE),
            };
            tracing::debug!(?pool, block, ?state, "warmed pool");
            inner.histories.entry(*pool).or_default().insert(block, state);
        }
        inner.last_processed = inner.last_processed.max(block);
        self.update_gauge(&inner);
        Ok(())
    }

    /// Returns the pool's state committed strictly before `block`, so that
    /// a pricing call at block N sees only logs up to N − 1. `None` when
    /// the pool is unknown or has no state that old; pricing then simply
    /// yields no quote for the pool.
    pub async fn pool_state(&self, pool: Address, block: u64) -> Option<PoolState> {
        self.inner
            .read()
            .await
            .histories
            .get(&pool)?
            .state_before(block)
            .copied()
    }

    /// Pulls all tracked pools' logs since the last processed block up to
    /// and including `block` and folds them into the histories.
    pub async fn run_maintenance(&self, block: u64) -> Result<()> {
        // Collect the address set without holding the lock across the log
        // fetch; pools warmed in the meantime are picked up next round.
        let (from_block, pools): (u64, Vec<Address>) = {
            let inner = self.inner.read().await;
            if block <= inner.last_processed {
                return Ok(());
            }
            (
                inner.last_processed + 1,
                inner.histories.keys().copied().collect(),
            )
        };

        let logs = if pools.is_empty() {
            vec![]
        } else {
            self.log_source
                .logs(from_block, block, &pools)
                .await
                .context("log retrieval failed")?
        };

        let mut inner = self.inner.write().await;
        for log in &logs {
            self.apply_log(&mut inner, log);
        }
        inner.last_processed = inner.last_processed.max(block);
        Ok(())
    }

    fn apply_log(&self, inner: &mut Inner, log: &PoolLog) {
        let Some(history) = inner.histories.get_mut(&log.pool) else {
            return;
        };
        let Some(base) = history.latest().copied() else {
            return;
        };
        if let Some(next) = events::process_log(&base, log) {
            history.insert(log.block_number, next);
            self.metrics.sync_logs_applied.inc();
        }
    }

    /// Drops all histories. Idempotent; part of the owning adapter's
    /// resource release.
    pub async fn release(&self) {
        let mut inner = self.inner.write().await;
        *inner = Default::default();
        self.update_gauge(&inner);
    }

    fn update_gauge(&self, inner: &Inner) {
        self.metrics
            .pools_tracked
            .set(i64::try_from(inner.histories.len()).unwrap_or(i64::MAX));
    }
}
