use {
    once_cell::sync::Lazy,
    prometheus::Registry,
    prometheus_metric_storage::StorageRegistry,
};

/// Global metrics registry used by all other crates in this workspace.
static REGISTRY: Lazy<Registry> =
    Lazy::new(|| Registry::new_custom(Some("dex_pricing".into()), None).unwrap());

static STORAGE_REGISTRY: Lazy<StorageRegistry> =
    Lazy::new(|| StorageRegistry::new(REGISTRY.clone()));

pub fn get_registry() -> &'static Registry {
    &REGISTRY
}

pub fn get_storage_registry() -> &'static StorageRegistry {
    &STORAGE_REGISTRY
}
