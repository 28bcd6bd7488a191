use {
    crate::coordinator,
    std::{
        num::{ParseFloatError, ParseIntError},
        time::Duration,
    },
};

#[derive(clap::Parser, Debug)]
pub struct Arguments {
    /// How long to wait in seconds before retrying a failed adapter
    /// initialization or release.
    #[clap(long, env, default_value = "20", value_parser = duration_from_seconds)]
    pub setup_retry_timeout: Duration,

    /// Per-adapter deadline in milliseconds for pool identifier
    /// discovery.
    #[clap(long, env, default_value = "1000", value_parser = duration_from_millis)]
    pub fetch_pool_identifier_timeout: Duration,

    /// Per-adapter deadline in milliseconds for quoting.
    #[clap(long, env, default_value = "3000", value_parser = duration_from_millis)]
    pub fetch_pool_prices_timeout: Duration,

    /// Marks this process as a replica. Replicas never invalidate the
    /// shared cache when adapters (re)initialize; only the master does.
    #[clap(long, env)]
    pub is_slave: bool,
}

impl Arguments {
    pub fn coordinator_config(&self) -> coordinator::Config {
        coordinator::Config {
            fetch_pool_identifier_timeout: self.fetch_pool_identifier_timeout,
            fetch_pool_prices_timeout: self.fetch_pool_prices_timeout,
        }
    }
}

pub fn duration_from_seconds(value: &str) -> Result<Duration, ParseFloatError> {
    Ok(Duration::from_secs_f64(value.parse()?))
}

pub fn duration_from_millis(value: &str) -> Result<Duration, ParseIntError> {
    Ok(Duration::from_millis(value.parse()?))
}
