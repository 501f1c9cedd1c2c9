// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;

use crate::ingest::config::NewsConfig;
use crate::ingest::providers::{
    AlphaVantageProvider, FinnhubProvider, NewsApiProvider, SampleNewsProvider,
};
use crate::ingest::types::{Article, NewsProvider};
use anyhow::Result;
use metrics::counter;
use once_cell::sync::OnceCell;

/// Normalize text: decode entities, strip tags, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Fold typographic quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Normalize headline and summary in place; drop articles left without a headline.
pub fn normalize_articles(articles: Vec<Article>) -> Vec<Article> {
    articles
        .into_iter()
        .filter_map(|mut a| {
            a.headline = normalize_text(&a.headline);
            a.summary = normalize_text(&a.summary);
            (!a.headline.is_empty()).then_some(a)
        })
        .collect()
}

/// Ordered provider chain with a sample fallback. First non-empty answer wins.
pub struct NewsChain {
    providers: Vec<Box<dyn NewsProvider>>,
    fallback: Option<SampleNewsProvider>,
}

impl NewsChain {
    pub fn new(providers: Vec<Box<dyn NewsProvider>>, fallback: Option<SampleNewsProvider>) -> Self {
        Self {
            providers,
            fallback,
        }
    }

    /// Finnhub, then Alpha Vantage, then NewsAPI; providers without keys are skipped.
    pub fn from_config(cfg: &NewsConfig) -> Result<Self> {
        let providers: Vec<Box<dyn NewsProvider>> = vec![
            Box::new(FinnhubProvider::new(cfg)?),
            Box::new(AlphaVantageProvider::new(cfg)?),
            Box::new(NewsApiProvider::new(cfg)?),
        ];
        let fallback = cfg.sample_fallback.then(SampleNewsProvider::new);
        Ok(Self::new(providers, fallback))
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers
            .iter()
            .filter(|p| p.is_configured())
            .map(|p| p.name())
            .collect()
    }

    /// Never fails: provider errors are logged and counted, then the next one is tried.
    pub async fn fetch_news(&self, symbol: Option<&str>) -> Vec<Article> {
        for p in &self.providers {
            if !p.is_configured() {
                continue;
            }
            match p.fetch(symbol).await {
                Ok(v) => {
                    let v = normalize_articles(v);
                    if v.is_empty() {
                        tracing::debug!(provider = p.name(), symbol = ?symbol, "provider returned no articles");
                        continue;
                    }
                    tracing::info!(provider = p.name(), symbol = ?symbol, count = v.len(), "news fetched");
                    counter!("news_articles_total").increment(v.len() as u64);
                    return v;
                }
                Err(e) => {
                    tracing::warn!(error = ?e, provider = p.name(), symbol = ?symbol, "provider error");
                    counter!("news_provider_errors_total", "provider" => p.name()).increment(1);
                }
            }
        }

        match &self.fallback {
            Some(sample) => {
                tracing::info!(symbol = ?symbol, "serving sample news");
                let v = normalize_articles(sample.articles(symbol));
                counter!("news_articles_total").increment(v.len() as u64);
                v
            }
            None => Vec::new(),
        }
    }
}

#[async_trait::async_trait]
impl NewsProvider for NewsChain {
    async fn fetch(&self, symbol: Option<&str>) -> Result<Vec<Article>> {
        Ok(self.fetch_news(symbol).await)
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct Fixed(&'static str, Vec<Article>);

    #[async_trait::async_trait]
    impl NewsProvider for Fixed {
        async fn fetch(&self, _symbol: Option<&str>) -> Result<Vec<Article>> {
            Ok(self.1.clone())
        }
        fn name(&self) -> &'static str {
            self.0
        }
    }

    struct Broken;

    #[async_trait::async_trait]
    impl NewsProvider for Broken {
        async fn fetch(&self, _symbol: Option<&str>) -> Result<Vec<Article>> {
            Err(anyhow!("boom"))
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn normalize_text_decodes_strips_and_collapses() {
        let s = "  <b>Hello</b>,&nbsp;&nbsp; \u{201C}world\u{201D}!  ";
        assert_eq!(normalize_text(s), "Hello, \"world\"!");
    }

    #[test]
    fn normalize_text_caps_length() {
        let long = "a".repeat(2000);
        assert_eq!(normalize_text(&long).chars().count(), 1500);
    }

    #[test]
    fn articles_without_headline_are_dropped() {
        let v = normalize_articles(vec![Article::new("<p></p>", "x"), Article::new("Ok", " ")]);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].headline, "Ok");
        assert_eq!(v[0].summary, "");
    }

    #[tokio::test]
    async fn error_then_empty_then_hit() {
        let chain = NewsChain::new(
            vec![
                Box::new(Broken),
                Box::new(Fixed("empty", vec![])),
                Box::new(Fixed("hit", vec![Article::new("Apple  rallies", "")])),
            ],
            Some(SampleNewsProvider::new()),
        );
        let v = chain.fetch_news(Some("AAPL")).await;
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].headline, "Apple rallies");
    }

    #[tokio::test]
    async fn all_failing_falls_back_to_sample_or_nothing() {
        let with = NewsChain::new(vec![Box::new(Broken)], Some(SampleNewsProvider::new()));
        let v = with.fetch_news(Some("TSLA")).await;
        assert_eq!(v.len(), 2);
        assert!(v[0].headline.starts_with("TSLA"));

        let without = NewsChain::new(vec![Box::new(Broken)], None);
        assert!(without.fetch_news(None).await.is_empty());
    }
}
