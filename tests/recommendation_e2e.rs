// tests/recommendation_e2e.rs
//
// Pipeline scenarios from articles (or pre-rated articles) to a final Recommendation.
// The opinion provider is disabled, so every opinion is the offline fallback.

use std::sync::Arc;
use std::time::Duration;

use market_sentiment::ai_adapter::DisabledClient;
use market_sentiment::analyze::{aggregate, composite_score};
use market_sentiment::engine::{fallback_opinion, RecommendationEngine};
use market_sentiment::recommendation::{
    AnnotatedArticle, Article, OverallSentiment, RecommendationLabel, SentimentResult,
};
use market_sentiment::sentiment::SentimentAnalyzer;

fn engine() -> RecommendationEngine {
    RecommendationEngine::new(
        SentimentAnalyzer::new(),
        Arc::new(DisabledClient),
        Duration::from_secs(1),
    )
}

fn rated(i: usize, rating: u8) -> AnnotatedArticle {
    AnnotatedArticle {
        // no keyword stems in these headlines
        article: Article::new(format!("Company update number {i}"), "Quarterly filing published")
            .from_source("Wire"),
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

#[tokio::test]
async fn ten_articles_mostly_positive_is_strong_buy_at_85() {
    let e = engine();
    let ratings = [5, 4, 4, 5, 4, 4, 4, 2, 3, 3];
    let batch: Vec<_> = ratings.iter().enumerate().map(|(i, r)| rated(i, *r)).collect();
    let overall = OverallSentiment {
        rating: 4,
        score: 3.0,
        count: batch.len(),
    };

    let analysis = e.analyze(&overall, &batch);
    assert_eq!(analysis.positive_news, 7);
    assert_eq!(analysis.negative_news, 1);
    assert_eq!(analysis.neutral_news, 2);
    assert!((analysis.positive_ratio - 70.0).abs() < 1e-9);
    assert!((analysis.negative_ratio - 10.0).abs() < 1e-9);
    assert!(analysis.word_analysis.positive_indicators.is_empty());
    assert!(analysis.word_analysis.negative_indicators.is_empty());
    assert!((composite_score(&analysis) - 38.0).abs() < 1e-9);

    let rec = e.generate("acme", analysis).await;
    assert_eq!(rec.symbol, "ACME");
    assert_eq!(rec.recommendation, RecommendationLabel::StrongBuy);
    assert_eq!(rec.confidence, 85);
    assert_eq!(
        rec.llm_opinion,
        "Strong positive sentiment (4/5) with 70.0% positive news coverage suggests favorable market conditions. Consider buying."
    );
    assert_eq!(rec.reasoning.recent_news.len(), 5);
}

#[tokio::test]
async fn negative_news_flow_is_a_sell_side_label() {
    let e = engine();
    let articles = vec![
        Article::new("Shares fall as weak demand raises concern", "Analysts downgrade the stock"),
        Article::new("Losses widen and risk grows", "Investors worry about falling margins"),
        Article::new("Company misses estimates", "Guidance cut amid challenges"),
    ];
    let rec = e.recommend("bad", articles).await;
    assert!(matches!(
        rec.recommendation,
        RecommendationLabel::Sell | RecommendationLabel::StrongSell
    ));
    assert!(rec.reasoning.overall_sentiment <= 2);
    assert!(rec.llm_opinion.starts_with("Negative sentiment"));
    assert!(rec.reasoning.word_analysis.negative_total() >= 5);
}

#[tokio::test]
async fn annotate_keeps_count_and_order() {
    let e = engine();
    let articles: Vec<_> = (0..7)
        .map(|i| Article::new(format!("headline {i}"), "").from_source(format!("s{i}")))
        .collect();
    let annotated = e.annotate(articles);
    assert_eq!(annotated.len(), 7);
    for (i, a) in annotated.iter().enumerate() {
        assert_eq!(a.article.source, format!("s{i}"));
        assert_eq!(a.sentiment.score, 0);
        assert_eq!(a.sentiment.rating, 3);
    }
    assert_eq!(aggregate(&annotated).rating, 3);
    assert_eq!(aggregate(&[]), OverallSentiment::neutral());
}

#[test]
fn fallback_opinion_is_byte_for_byte_repeatable() {
    let e = engine();
    let mut a = e.analyze(&OverallSentiment::neutral(), &[]);
    a.overall_sentiment = 5;
    a.positive_ratio = 80.0;
    let first = fallback_opinion(&a);
    for _ in 0..10 {
        assert_eq!(fallback_opinion(&a), first);
    }
    assert!(first.contains("(5/5) with 80.0% positive"));
}
