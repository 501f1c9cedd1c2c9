// src/ingest/providers/newsapi.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use metrics::histogram;
use serde::Deserialize;

use super::http_client;
use crate::ingest::config::NewsConfig;
use crate::ingest::types::{Article, NewsProvider};

const BASE_URL: &str = "https://newsapi.org/v2/everything";

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    articles: Vec<Item>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    #[serde(default)]
    source: SourceRef,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    url_to_image: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SourceRef {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

pub fn parse_everything(body: &str) -> Result<Vec<Article>> {
    let resp: Response = serde_json::from_str(body).context("parsing newsapi json")?;
    let out = resp
        .articles
        .into_iter()
        .filter_map(|it| {
            let headline = it.title.filter(|t| !t.trim().is_empty())?;
            let datetime = it
                .published_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.timestamp())
                .unwrap_or(0);
            let source = it.source.name.unwrap_or_default();
            let id = format!(
                "{}-{datetime}",
                it.source.id.as_deref().unwrap_or(source.as_str())
            );
            Some(Article {
                id,
                headline,
                summary: it.description.unwrap_or_default(),
                source,
                datetime,
                category: "general".to_string(),
                url: it.url.unwrap_or_default(),
                image: it.url_to_image.unwrap_or_default(),
                related: String::new(),
            })
        })
        .collect();
    Ok(out)
}

pub struct NewsApiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl NewsApiProvider {
    pub fn new(cfg: &NewsConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(cfg)?,
            api_key: cfg.keys.news_api.clone(),
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl NewsProvider for NewsApiProvider {
    async fn fetch(&self, symbol: Option<&str>) -> Result<Vec<Article>> {
        let Some(key) = self.api_key.as_deref() else {
            return Ok(Vec::new());
        };
        let t0 = std::time::Instant::now();

        let body = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", symbol.unwrap_or("stocks")),
                ("apiKey", key),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", "20"),
            ])
            .send()
            .await
            .context("newsapi request")?
            .error_for_status()
            .context("newsapi status")?
            .text()
            .await
            .context("newsapi body")?;
        let out = parse_everything(&body)?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("news_fetch_ms", "provider" => "newsapi").record(ms);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
