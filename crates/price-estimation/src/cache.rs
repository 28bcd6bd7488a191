use {anyhow::Result, dashmap::DashMap};

/// The narrow slice of the shared cache this core consumes: deleting a
/// venue's namespaced state so replicas rebuild it. Entries are ephemeral
/// hints; failures are logged and otherwise ignored.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait CacheStoring: Send + Sync + 'static {
    async fn rawdel(&self, key: &str) -> Result<()>;
}

/// Process-local cache backend for tests and single-instance deployments.
#[derive(Debug, Default)]
pub struct InMemoryCache(DashMap<String, Vec<u8>>);

impl InMemoryCache {
    pub fn insert(&self, key: &str, value: Vec<u8>) {
        self.0.insert(key.to_string(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

#[async_trait::async_trait]
impl CacheStoring for InMemoryCache {
    async fn rawdel(&self, key: &str) -> Result<()> {
        self.0.remove(key);
        Ok(())
    }
}
