// src/ingest/providers/mod.rs
pub mod alpha_vantage;
pub mod finnhub;
pub mod newsapi;
pub mod sample;

pub use alpha_vantage::AlphaVantageProvider;
pub use finnhub::FinnhubProvider;
pub use newsapi::NewsApiProvider;
pub use sample::SampleNewsProvider;

use crate::ingest::config::NewsConfig;
use std::time::Duration;

/// Shared HTTP client for news providers; timeout comes from config.
pub(crate) fn http_client(cfg: &NewsConfig) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .connect_timeout(Duration::from_secs(4))
        .user_agent(concat!("market-sentiment/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
