// src/ingest/providers/finnhub.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use metrics::histogram;
use serde::Deserialize;

use super::http_client;
use crate::ingest::config::NewsConfig;
use crate::ingest::types::{Article, NewsProvider};

const BASE_URL: &str = "https://finnhub.io/api/v1";

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    datetime: Option<i64>,
    #[serde(default)]
    headline: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    related: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Map a Finnhub news array (company or general) into articles.
pub fn parse_news(body: &str) -> Result<Vec<Article>> {
    let items: Vec<Item> = serde_json::from_str(body).context("parsing finnhub news json")?;
    let out = items
        .into_iter()
        .filter_map(|it| {
            let headline = it.headline.filter(|h| !h.trim().is_empty())?;
            let source = it
                .source
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "Finnhub".to_string());
            let datetime = it.datetime.unwrap_or(0);
            let id = match it.id {
                Some(serde_json::Value::String(s)) => s,
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => format!("{source}-{datetime}"),
            };
            Some(Article {
                id,
                headline,
                summary: it.summary.unwrap_or_default(),
                source,
                datetime,
                category: it
                    .category
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| "general".to_string()),
                url: it.url.unwrap_or_default(),
                image: it.image.unwrap_or_default(),
                related: it.related.unwrap_or_default(),
            })
        })
        .collect();
    Ok(out)
}

pub struct FinnhubProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    from: String,
    base_url: String,
}

impl FinnhubProvider {
    pub fn new(cfg: &NewsConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(cfg)?,
            api_key: cfg.keys.finnhub.clone(),
            from: cfg.company_news_from.clone(),
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point at another host (local fixtures, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl NewsProvider for FinnhubProvider {
    async fn fetch(&self, symbol: Option<&str>) -> Result<Vec<Article>> {
        let Some(token) = self.api_key.as_deref() else {
            return Ok(Vec::new());
        };
        let t0 = std::time::Instant::now();

        let req = match symbol {
            Some(sym) => {
                let to = Utc::now().format("%Y-%m-%d").to_string();
                self.client
                    .get(format!("{}/company-news", self.base_url))
                    .query(&[
                        ("symbol", sym),
                        ("from", self.from.as_str()),
                        ("to", to.as_str()),
                        ("token", token),
                    ])
            }
            None => self
                .client
                .get(format!("{}/news", self.base_url))
                .query(&[("category", "general"), ("token", token)]),
        };

        let body = req
            .send()
            .await
            .context("finnhub request")?
            .error_for_status()
            .context("finnhub status")?
            .text()
            .await
            .context("finnhub body")?;
        let out = parse_news(&body)?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("news_fetch_ms", "provider" => "finnhub").record(ms);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "finnhub"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
