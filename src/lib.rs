// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod api;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod metrics;
pub mod recommendation;
pub mod sentiment;

// ---- Re-exports for stable public API ----
pub use analyze::ai_adapter;
pub use crate::api::{router, AppState};

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tracing::info;

use crate::ai_adapter::build_client_from_config;
use crate::config::AppConfig;
use crate::engine::RecommendationEngine;
use crate::ingest::NewsChain;
use crate::sentiment::SentimentAnalyzer;

/// Optional replacement for the built-in lexicon (JSON object word -> weight).
pub const ENV_LEXICON_PATH: &str = "SENTIMENT_LEXICON_PATH";

/// Wire engine, news chain and metrics from an already loaded config.
pub fn build_app(cfg: AppConfig) -> anyhow::Result<Router> {
    let analyzer = match std::env::var(ENV_LEXICON_PATH) {
        Ok(path) => SentimentAnalyzer::from_lexicon_file(&path)?,
        Err(_) => SentimentAnalyzer::new(),
    };
    let opinion = build_client_from_config(&cfg.ai)?;
    let engine = RecommendationEngine::new(
        analyzer,
        opinion,
        Duration::from_secs(cfg.ai.timeout_secs),
    );
    let chain = NewsChain::from_config(&cfg.news)?;

    info!(
        lexicon_words = engine.analyzer().lexicon_len(),
        opinion_provider = engine.opinion_provider(),
        news_providers = ?chain.provider_names(),
        watchlist = ?cfg.news.watchlist,
        "app configured"
    );

    let state = AppState {
        engine: Arc::new(engine),
        news: Arc::new(chain),
        watchlist: Arc::new(cfg.news.watchlist),
    };
    let metrics = crate::metrics::Metrics::init()?;
    Ok(router(state).merge(metrics.router()))
}

/// Load config from the environment and the `config/` directory, then build the router.
pub async fn app() -> anyhow::Result<Router> {
    build_app(AppConfig::load()?)
}
