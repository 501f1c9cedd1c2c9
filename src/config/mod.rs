// src/config/mod.rs
pub mod ai;

use crate::config::ai::OpinionConfig;
use crate::ingest::config::{load_news_config_default, NewsConfig};

/// Everything the service reads at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ai: OpinionConfig,
    pub news: NewsConfig,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            ai: OpinionConfig::load_default()?,
            news: load_news_config_default()?,
        })
    }
}
