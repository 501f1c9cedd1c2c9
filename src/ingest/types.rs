// src/ingest/types.rs
use anyhow::Result;

pub use crate::recommendation::Article;

/// A source of news articles. `symbol = None` means general market news.
#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch(&self, symbol: Option<&str>) -> Result<Vec<Article>>;

    fn name(&self) -> &'static str;

    /// Providers without credentials are skipped by the chain.
    fn is_configured(&self) -> bool {
        true
    }
}
