//! Environment-driven configuration.

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub nats_url: Option<String>,
    pub discount_tick_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8083".to_string())
            .parse()
            .context("PORT is not a valid port number")?;
        let nats_url = std::env::var("NATS_URL").ok();
        let discount_tick_secs = std::env::var("DISCOUNT_TICK_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("DISCOUNT_TICK_SECS is not a valid integer")?;
        Ok(Self { database_url, port, nats_url, discount_tick_secs })
    }
}
