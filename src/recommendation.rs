//! Shapes for articles, sentiment results and the final recommendation.
//!
//! Everything here is created fresh per request and thrown away once the response
//! is written. Field names follow the JSON contract the dashboard consumes
//! (`llmOpinion`, `lastUpdated`, `positiveRatio`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One news item as delivered by a news provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub id: String,
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub source: String,
    /// Published time, unix seconds.
    #[serde(default)]
    pub datetime: i64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub related: String,
}

impl Article {
    /// Minimal constructor; the remaining fields stay empty.
    pub fn new(headline: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            headline: headline.into(),
            summary: summary.into(),
            source: String::new(),
            datetime: 0,
            category: String::new(),
            url: String::new(),
            image: String::new(),
            related: String::new(),
        }
    }

    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn published_at(mut self, datetime: i64) -> Self {
        self.datetime = datetime;
        self
    }

    /// Headline and summary joined by a single space; this is what gets scored.
    pub fn scoring_text(&self) -> String {
        format!("{} {}", self.headline, self.summary)
    }
}

/// Lexicon score of one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// Sum of lexicon weights.
    pub score: i32,
    /// Discrete 1..=5 rating derived from `score`.
    pub rating: u8,
    /// `score / max(token_count, 1)`.
    pub comparative: f64,
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub tokens: Vec<String>,
}

/// An article paired with its sentiment. Serialized flat, with a nested `sentiment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedArticle {
    #[serde(flatten)]
    pub article: Article,
    pub sentiment: SentimentResult,
}

/// Batch-level aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverallSentiment {
    pub rating: u8,
    /// Mean raw score over the batch.
    pub score: f64,
    pub count: usize,
}

impl OverallSentiment {
    /// Neutral default used for empty batches.
    pub fn neutral() -> Self {
        Self {
            rating: 3,
            score: 0.0,
            count: 0,
        }
    }
}

impl Default for OverallSentiment {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Keyword hits across a batch, each list ordered by descending count.
/// Serialized as `[["growth", 3], ["beat", 1]]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPatternSummary {
    pub positive_indicators: Vec<(String, u32)>,
    pub negative_indicators: Vec<(String, u32)>,
}

impl WordPatternSummary {
    pub fn positive_total(&self) -> u32 {
        self.positive_indicators.iter().map(|(_, c)| c).sum()
    }

    pub fn negative_total(&self) -> u32 {
        self.negative_indicators.iter().map(|(_, c)| c).sum()
    }
}

/// Headline digest kept in the analysis (first five articles of the batch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentHeadline {
    pub headline: String,
    /// Article rating 1..=5.
    pub sentiment: u8,
    pub source: String,
}

/// Everything the scoring step looks at, returned to the client as `reasoning`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationAnalysis {
    /// Overall rating 1..=5.
    pub overall_sentiment: u8,
    /// Mean raw score.
    pub sentiment_score: f64,
    pub news_count: usize,
    pub positive_news: usize,
    pub negative_news: usize,
    pub neutral_news: usize,
    /// Percent of `news_count`; 0 when there are no articles.
    pub positive_ratio: f64,
    pub negative_ratio: f64,
    pub word_analysis: WordPatternSummary,
    pub recent_news: Vec<RecentHeadline>,
    /// Set only on the fallback path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Five-step recommendation ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationLabel {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl RecommendationLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrongBuy => "STRONG_BUY",
            Self::Buy => "BUY",
            Self::Hold => "HOLD",
            Self::Sell => "SELL",
            Self::StrongSell => "STRONG_SELL",
        }
    }
}

impl std::fmt::Display for RecommendationLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final response for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Always uppercase.
    pub symbol: String,
    pub recommendation: RecommendationLabel,
    /// 50..=95 on the normal path, exactly 50 on fallback.
    pub confidence: u8,
    pub reasoning: RecommendationAnalysis,
    pub llm_opinion: String,
    pub last_updated: DateTime<Utc>,
}

/// Compact per-symbol row of the market overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewEntry {
    pub symbol: String,
    pub recommendation: RecommendationLabel,
    pub confidence: u8,
    pub sentiment: u8,
    pub news_count: usize,
}

impl From<&Recommendation> for OverviewEntry {
    fn from(r: &Recommendation) -> Self {
        Self {
            symbol: r.symbol.clone(),
            recommendation: r.recommendation,
            confidence: r.confidence,
            sentiment: r.reasoning.overall_sentiment,
            news_count: r.reasoning.news_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOverview {
    pub market_overview: Vec<OverviewEntry>,
    pub total_symbols: usize,
    pub last_updated: DateTime<Utc>,
}
