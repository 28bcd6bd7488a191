use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initializes the global tracing subscriber with the given env filter
/// directives (e.g. `"debug,hyper=warn"`).
///
/// Safe to call multiple times; only the first call installs a subscriber.
/// This makes it usable from unit tests which run in a shared process.
pub fn initialize(env_filter: &str) {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::new(env_filter))
        .try_init();
}
