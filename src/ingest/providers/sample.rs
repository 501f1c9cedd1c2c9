// src/ingest/providers/sample.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use crate::ingest::types::{Article, NewsProvider};

const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300x200";

/// Built-in two-article batch served when no live provider answers.
#[derive(Debug, Clone, Default)]
pub struct SampleNewsProvider;

impl SampleNewsProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn articles(&self, symbol: Option<&str>) -> Vec<Article> {
        let now = Utc::now().timestamp();
        let subject = symbol.unwrap_or("Market");
        let coverage = symbol.unwrap_or("major stocks");
        vec![
            Article {
                id: format!("sample-{now}"),
                headline: format!("{subject} Reports Strong Quarterly Performance"),
                summary: format!(
                    "Latest market analysis shows positive momentum for {coverage} with increased investor confidence."
                ),
                source: "Financial Times".to_string(),
                datetime: now,
                category: "technology".to_string(),
                url: "https://example.com/news".to_string(),
                image: PLACEHOLDER_IMAGE.to_string(),
                related: String::new(),
            },
            Article {
                id: format!("sample-{}", now - 1),
                headline: "Economic Indicators Point to Growth".to_string(),
                summary: "Recent economic data suggests continued expansion in key sectors."
                    .to_string(),
                source: "Reuters".to_string(),
                datetime: now - 3600,
                category: "business".to_string(),
                url: "https://example.com/news2".to_string(),
                image: PLACEHOLDER_IMAGE.to_string(),
                related: String::new(),
            },
        ]
    }
}

#[async_trait]
impl NewsProvider for SampleNewsProvider {
    async fn fetch(&self, symbol: Option<&str>) -> Result<Vec<Article>> {
        Ok(self.articles(symbol))
    }

    fn name(&self) -> &'static str {
        "sample"
    }
}
