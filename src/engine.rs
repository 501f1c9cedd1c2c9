//! # Recommendation Engine
//! Turns an annotated news batch into a BUY/HOLD/SELL style recommendation.
//!
//! Everything except the opinion call is pure and synchronous. The opinion
//! collaborator gets exactly one attempt bounded by `opinion_timeout`; any
//! failure is replaced by a deterministic opinion built from the analysis.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use metrics::{counter, histogram};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::analyze::ai_adapter::{prompt_id, DynOpinionClient};
use crate::analyze::{self, composite_score, confidence, label_from_score, PatternAnalyzer};
use crate::ingest::types::{Article, NewsProvider};
use crate::recommendation::{
    AnnotatedArticle, MarketOverview, OverallSentiment, OverviewEntry, RecentHeadline,
    Recommendation, RecommendationAnalysis, RecommendationLabel,
};
use crate::sentiment::SentimentAnalyzer;

/// Articles echoed back in `recentNews`.
pub const RECENT_NEWS_LIMIT: usize = 5;

pub const FALLBACK_ERROR: &str = "Service temporarily unavailable";
pub const FALLBACK_OPINION: &str =
    "Unable to generate AI opinion at this time. Using fallback analysis.";

pub struct RecommendationEngine {
    analyzer: SentimentAnalyzer,
    patterns: PatternAnalyzer,
    opinion: DynOpinionClient,
    opinion_timeout: Duration,
}

impl RecommendationEngine {
    pub fn new(
        analyzer: SentimentAnalyzer,
        opinion: DynOpinionClient,
        opinion_timeout: Duration,
    ) -> Self {
        Self {
            analyzer,
            patterns: PatternAnalyzer::new(),
            opinion,
            opinion_timeout,
        }
    }

    pub fn with_patterns(mut self, patterns: PatternAnalyzer) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn analyzer(&self) -> &SentimentAnalyzer {
        &self.analyzer
    }

    pub fn opinion_provider(&self) -> &'static str {
        self.opinion.provider_name()
    }

    /// Score every article, keeping input order.
    pub fn annotate(&self, articles: Vec<Article>) -> Vec<AnnotatedArticle> {
        analyze::annotate(&self.analyzer, articles)
    }

    /// Counts, ratios, keyword hits and the recent-headline digest for one batch.
    pub fn analyze(
        &self,
        overall: &OverallSentiment,
        annotated: &[AnnotatedArticle],
    ) -> RecommendationAnalysis {
        let total = annotated.len();
        let count_where = |f: fn(u8) -> bool| {
            annotated
                .iter()
                .filter(|a| f(a.sentiment.rating))
                .count()
        };
        let positive = count_where(|r| r >= 4);
        let negative = count_where(|r| r <= 2);
        let neutral = count_where(|r| r == 3);

        let recent_news = annotated
            .iter()
            .take(RECENT_NEWS_LIMIT)
            .map(|a| RecentHeadline {
                headline: non_blank(&a.article.headline, "No headline"),
                sentiment: a.sentiment.rating,
                source: non_blank(&a.article.source, "Unknown"),
            })
            .collect();

        RecommendationAnalysis {
            overall_sentiment: overall.rating,
            sentiment_score: overall.score,
            news_count: total,
            positive_news: positive,
            negative_news: negative,
            neutral_news: neutral,
            positive_ratio: ratio(positive, total),
            negative_ratio: ratio(negative, total),
            word_analysis: self.patterns.analyze(annotated),
            recent_news,
            error: None,
        }
    }

    /// Label, confidence and opinion for an analysis. Never fails.
    pub async fn generate(&self, symbol: &str, analysis: RecommendationAnalysis) -> Recommendation {
        let symbol = symbol.trim().to_uppercase();
        let score = composite_score(&analysis);
        let label = label_from_score(score);
        let confidence = confidence(&analysis);
        let llm_opinion = self.opinion_for(&symbol, &analysis).await;

        counter!("recommendations_total", "label" => label.as_str()).increment(1);
        info!(
            symbol = %symbol,
            label = %label,
            score,
            confidence,
            news_count = analysis.news_count,
            "recommendation generated"
        );

        Recommendation {
            symbol,
            recommendation: label,
            confidence,
            reasoning: analysis,
            llm_opinion,
            last_updated: Utc::now(),
        }
    }

    /// Full pipeline for one symbol over an already fetched batch.
    pub async fn recommend(&self, symbol: &str, articles: Vec<Article>) -> Recommendation {
        let t0 = Instant::now();
        let annotated = self.annotate(articles);
        let overall = analyze::aggregate(&annotated);
        let analysis = self.analyze(&overall, &annotated);
        let rec = self.generate(symbol, analysis).await;
        histogram!("pipeline_duration_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        rec
    }

    /// Fetch and recommend every symbol in parallel; output follows `symbols` order.
    /// A symbol whose run fails gets the fixed fallback entry, the rest are unaffected.
    pub async fn market_overview(
        self: &Arc<Self>,
        news: Arc<dyn NewsProvider>,
        symbols: &[String],
    ) -> MarketOverview {
        let mut set = JoinSet::new();
        for (idx, sym) in symbols.iter().enumerate() {
            let engine = Arc::clone(self);
            let news = Arc::clone(&news);
            let sym = sym.clone();
            set.spawn(async move {
                let articles = match news.fetch(Some(sym.as_str())).await {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(error = ?e, symbol = %sym, provider = news.name(), "news fetch failed");
                        Vec::new()
                    }
                };
                (idx, engine.recommend(&sym, articles).await)
            });
        }

        let mut slots: Vec<Option<Recommendation>> = vec![None; symbols.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, rec)) => slots[idx] = Some(rec),
                Err(e) => warn!(error = %e, "overview task failed"),
            }
        }

        let market_overview: Vec<OverviewEntry> = slots
            .into_iter()
            .zip(symbols)
            .map(|(slot, sym)| {
                let rec = slot.unwrap_or_else(|| {
                    fallback_recommendation(sym, &OverallSentiment::neutral(), 0)
                });
                OverviewEntry::from(&rec)
            })
            .collect();

        MarketOverview {
            total_symbols: market_overview.len(),
            market_overview,
            last_updated: Utc::now(),
        }
    }

    async fn opinion_for(&self, symbol: &str, analysis: &RecommendationAnalysis) -> String {
        let prompt = build_prompt(symbol, analysis);
        let provider = self.opinion.provider_name();
        debug!(provider, prompt_id = %prompt_id(&prompt), "requesting opinion");

        match tokio::time::timeout(self.opinion_timeout, self.opinion.complete(&prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                if e.stage == "disabled" {
                    debug!(provider, "opinion provider disabled; using fallback");
                } else {
                    warn!(error = %e, symbol, "opinion failed; using fallback");
                }
                counter!("opinion_fallback_total", "stage" => e.stage).increment(1);
                fallback_opinion(analysis)
            }
            Err(_) => {
                warn!(
                    provider,
                    symbol,
                    timeout_ms = self.opinion_timeout.as_millis() as u64,
                    "opinion timed out; using fallback"
                );
                counter!("opinion_fallback_total", "stage" => "timeout").increment(1);
                fallback_opinion(analysis)
            }
        }
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

fn non_blank(s: &str, default: &str) -> String {
    if s.trim().is_empty() {
        default.to_string()
    } else {
        s.to_string()
    }
}

fn indicator_list(items: &[(String, u32)]) -> String {
    if items.is_empty() {
        return "None".to_string();
    }
    items
        .iter()
        .take(3)
        .map(|(w, c)| format!("{w}({c})"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Analyst prompt for the opinion provider.
pub fn build_prompt(symbol: &str, a: &RecommendationAnalysis) -> String {
    let tone = if a.sentiment_score > 0.0 {
        "Positive"
    } else if a.sentiment_score < 0.0 {
        "Negative"
    } else {
        "Neutral"
    };
    let headlines = a
        .recent_news
        .iter()
        .map(|n| format!("- {} ({}/5)", n.headline, n.sentiment))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a professional financial analyst. Based on the following market data for {symbol}, provide a brief investment opinion (2-3 sentences):\n\
         \n\
         Market Data:\n\
         - Overall Sentiment: {}/5 ({tone})\n\
         - News Analysis: {} positive, {} negative, {} neutral articles\n\
         - Positive Indicators: {}\n\
         - Negative Indicators: {}\n\
         \n\
         Recent Headlines:\n\
         {headlines}\n\
         \n\
         Provide a concise investment opinion considering this data.",
        a.overall_sentiment,
        a.positive_news,
        a.negative_news,
        a.neutral_news,
        indicator_list(&a.word_analysis.positive_indicators),
        indicator_list(&a.word_analysis.negative_indicators),
    )
}

/// Offline opinion keyed on the overall rating. Same input, same bytes.
pub fn fallback_opinion(a: &RecommendationAnalysis) -> String {
    let r = a.overall_sentiment;
    if r >= 4 {
        format!(
            "Strong positive sentiment ({r}/5) with {}% positive news coverage suggests favorable market conditions. Consider buying.",
            one_decimal(a.positive_ratio)
        )
    } else if r <= 2 {
        format!(
            "Negative sentiment ({r}/5) with {}% negative news coverage indicates market concerns. Caution advised.",
            one_decimal(a.negative_ratio)
        )
    } else {
        format!(
            "Mixed sentiment ({r}/5) with balanced news coverage suggests holding until clearer signals emerge."
        )
    }
}

/// One decimal place, halves rounded away from zero (81.25 -> "81.3").
pub fn one_decimal(x: f64) -> String {
    format!("{:.1}", (x * 10.0).round() / 10.0)
}

/// Fixed safe answer for a symbol whose run failed: HOLD at 50 with an error marker.
pub fn fallback_recommendation(
    symbol: &str,
    overall: &OverallSentiment,
    news_count: usize,
) -> Recommendation {
    Recommendation {
        symbol: symbol.trim().to_uppercase(),
        recommendation: RecommendationLabel::Hold,
        confidence: 50,
        reasoning: RecommendationAnalysis {
            overall_sentiment: overall.rating,
            sentiment_score: overall.score,
            news_count,
            positive_news: 0,
            negative_news: 0,
            neutral_news: 0,
            positive_ratio: 0.0,
            negative_ratio: 0.0,
            word_analysis: Default::default(),
            recent_news: Vec::new(),
            error: Some(FALLBACK_ERROR.to_string()),
        },
        llm_opinion: FALLBACK_OPINION.to_string(),
        last_updated: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::ai_adapter::{DailyLimited, DisabledClient, MockProvider};
    use crate::recommendation::{SentimentResult, WordPatternSummary};

    fn engine() -> RecommendationEngine {
        RecommendationEngine::new(
            SentimentAnalyzer::new(),
            Arc::new(DisabledClient),
            Duration::from_secs(1),
        )
    }

    fn rated(headline: &str, rating: u8) -> AnnotatedArticle {
        AnnotatedArticle {
            article: Article::new(headline, "").from_source("Wire"),
            sentiment: SentimentResult {
                score: 0,
                rating,
                comparative: 0.0,
                positive: vec![],
                negative: vec![],
                tokens: vec![],
            },
        }
    }

    #[test]
    fn analyze_counts_ratios_and_recent() {
        let batch: Vec<_> = [5, 4, 4, 2, 3, 3, 1]
            .iter()
            .enumerate()
            .map(|(i, r)| rated(&format!("Item {i}"), *r))
            .collect();
        let overall = OverallSentiment { rating: 4, score: 2.5, count: 7 };
        let a = engine().analyze(&overall, &batch);

        assert_eq!(a.news_count, 7);
        assert_eq!((a.positive_news, a.negative_news, a.neutral_news), (3, 2, 2));
        assert!((a.positive_ratio - 300.0 / 7.0).abs() < 1e-9);
        assert_eq!(a.recent_news.len(), 5);
        assert_eq!(a.recent_news[0].headline, "Item 0");
        assert_eq!(a.recent_news[4].headline, "Item 4");
        assert_eq!(a.overall_sentiment, 4);
    }

    #[test]
    fn analyze_empty_batch_has_zero_ratios() {
        let a = engine().analyze(&OverallSentiment::neutral(), &[]);
        assert_eq!(a.news_count, 0);
        assert_eq!(a.positive_ratio, 0.0);
        assert_eq!(a.negative_ratio, 0.0);
        assert!(a.recent_news.is_empty());
    }

    #[test]
    fn blank_headline_and_source_get_placeholders() {
        let mut item = rated("  ", 3);
        item.article.source = String::new();
        let a = engine().analyze(&OverallSentiment::neutral(), &[item]);
        assert_eq!(a.recent_news[0].headline, "No headline");
        assert_eq!(a.recent_news[0].source, "Unknown");
    }

    #[test]
    fn fallback_opinion_wording() {
        let mut a = engine().analyze(&OverallSentiment::neutral(), &[]);
        a.overall_sentiment = 5;
        a.positive_ratio = 80.0;
        let first = fallback_opinion(&a);
        assert_eq!(
            first,
            "Strong positive sentiment (5/5) with 80.0% positive news coverage suggests favorable market conditions. Consider buying."
        );
        assert_eq!(first, fallback_opinion(&a));

        a.overall_sentiment = 2;
        a.negative_ratio = 33.333;
        assert!(fallback_opinion(&a).starts_with("Negative sentiment (2/5) with 33.3% negative"));

        a.overall_sentiment = 3;
        assert!(fallback_opinion(&a).starts_with("Mixed sentiment (3/5)"));
    }

    #[test]
    fn ratio_halves_round_up() {
        assert_eq!(one_decimal(81.25), "81.3");
        assert_eq!(one_decimal(6.25), "6.3");
        assert_eq!(one_decimal(33.333), "33.3");
        assert_eq!(one_decimal(0.0), "0.0");
        assert_eq!(one_decimal(100.0), "100.0");
    }

    #[test]
    fn sixteen_article_batch_reports_81_3_percent() {
        let batch: Vec<_> = (0..16)
            .map(|i| rated(&format!("Item {i}"), if i < 13 { 4 } else { 3 }))
            .collect();
        let overall = OverallSentiment { rating: 4, score: 3.0, count: 16 };
        let a = engine().analyze(&overall, &batch);
        assert!((a.positive_ratio - 81.25).abs() < 1e-9);
        assert!(fallback_opinion(&a).contains("with 81.3% positive news coverage"));
    }

    #[test]
    fn custom_patterns_drive_indicators() {
        let e = engine().with_patterns(PatternAnalyzer::with_stems(["rally"], ["recall"]));
        let batch = vec![
            rated("Shares rally after launch", 4),
            rated("Automaker announces recall", 2),
            rated("Analysts see growth", 4),
        ];
        let a = e.analyze(&OverallSentiment::neutral(), &batch);
        assert_eq!(a.word_analysis.positive_indicators, vec![("rally".to_string(), 1)]);
        assert_eq!(a.word_analysis.negative_indicators, vec![("recall".to_string(), 1)]);
    }

    #[test]
    fn prompt_lists_top_three_indicators() {
        let mut a = engine().analyze(&OverallSentiment::neutral(), &[rated("Apple rallies", 4)]);
        a.sentiment_score = 1.5;
        a.word_analysis = WordPatternSummary {
            positive_indicators: vec![
                ("growth".into(), 3),
                ("beat".into(), 2),
                ("gain".into(), 1),
                ("strong".into(), 1),
            ],
            negative_indicators: vec![],
        };
        let p = build_prompt("AAPL", &a);
        assert!(p.contains("market data for AAPL"));
        assert!(p.contains("- Overall Sentiment: 3/5 (Positive)"));
        assert!(p.contains("- Positive Indicators: growth(3), beat(2), gain(1)\n"));
        assert!(p.contains("- Negative Indicators: None"));
        assert!(p.contains("- Apple rallies (4/5)"));
    }

    #[test]
    fn fallback_recommendation_is_hold_50() {
        let r = fallback_recommendation("msft", &OverallSentiment::neutral(), 0);
        assert_eq!(r.symbol, "MSFT");
        assert_eq!(r.recommendation, RecommendationLabel::Hold);
        assert_eq!(r.confidence, 50);
        assert_eq!(r.reasoning.error.as_deref(), Some(FALLBACK_ERROR));
        assert_eq!(r.llm_opinion, FALLBACK_OPINION);
    }

    #[tokio::test]
    async fn empty_batch_recommends_hold() {
        let r = engine().recommend("aapl", vec![]).await;
        assert_eq!(r.symbol, "AAPL");
        assert_eq!(r.recommendation, RecommendationLabel::Hold);
        assert_eq!(r.confidence, 50);
        assert!(r.llm_opinion.starts_with("Mixed sentiment (3/5)"));
    }

    #[tokio::test]
    async fn opinion_text_comes_from_provider_when_available() {
        let e = RecommendationEngine::new(
            SentimentAnalyzer::new(),
            Arc::new(DailyLimited::new(MockProvider::new("Looks fine."), 10)),
            Duration::from_secs(1),
        );
        let r = e.recommend("tsla", vec![Article::new("Tesla news", "")]).await;
        assert_eq!(r.llm_opinion, "Looks fine.");
    }
}
