// src/ingest/providers/alpha_vantage.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use metrics::histogram;
use serde::Deserialize;

use super::http_client;
use crate::ingest::config::NewsConfig;
use crate::ingest::types::{Article, NewsProvider};

const BASE_URL: &str = "https://www.alphavantage.co/query";

#[derive(Debug, Deserialize)]
struct Response {
    /// Absent on rate-limit / info responses.
    #[serde(default)]
    feed: Option<Vec<Item>>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    time_published: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    banner_image: Option<String>,
    #[serde(default)]
    source: String,
}

/// `20240131T153000` (UTC) to unix seconds; 0 when unparseable.
fn parse_time_published(ts: &str) -> i64 {
    NaiveDateTime::parse_from_str(ts, "%Y%m%dT%H%M%S")
        .or_else(|_| NaiveDateTime::parse_from_str(ts, "%Y%m%dT%H%M"))
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or(0)
}

pub fn parse_feed(body: &str) -> Result<Vec<Article>> {
    let resp: Response = serde_json::from_str(body).context("parsing alpha vantage json")?;
    let out = resp
        .feed
        .unwrap_or_default()
        .into_iter()
        .filter(|it| !it.title.trim().is_empty())
        .map(|it| Article {
            id: it.title.split_whitespace().collect::<Vec<_>>().join("-"),
            datetime: parse_time_published(&it.time_published),
            headline: it.title,
            summary: it.summary,
            source: it.source,
            category: "market".to_string(),
            url: it.url,
            image: it.banner_image.unwrap_or_default(),
            related: String::new(),
        })
        .collect();
    Ok(out)
}

pub struct AlphaVantageProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl AlphaVantageProvider {
    pub fn new(cfg: &NewsConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(cfg)?,
            api_key: cfg.keys.alpha_vantage.clone(),
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl NewsProvider for AlphaVantageProvider {
    async fn fetch(&self, symbol: Option<&str>) -> Result<Vec<Article>> {
        let Some(key) = self.api_key.as_deref() else {
            return Ok(Vec::new());
        };
        let t0 = std::time::Instant::now();

        let mut params = vec![
            ("function", "NEWS_SENTIMENT"),
            ("apikey", key),
            ("limit", "10"),
        ];
        if let Some(sym) = symbol {
            params.push(("tickers", sym));
        }

        let body = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .context("alpha vantage request")?
            .error_for_status()
            .context("alpha vantage status")?
            .text()
            .await
            .context("alpha vantage body")?;
        let out = parse_feed(&body)?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("news_fetch_ms", "provider" => "alpha_vantage").record(ms);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "alpha_vantage"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
