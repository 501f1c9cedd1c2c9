// src/analyze/mod.rs
//! Analysis pipeline entry: per-article annotation and batch aggregation.
//!
//! Order inside one request:
//! 1) `annotate`: lexicon score + rating for every article (input order kept)
//! 2) `aggregate`: mean score over the batch mapped through the same rating ladder
//! 3) `patterns`: keyword hits over headline/summary text
//! 4) `scoring`: composite score, label and confidence

pub mod ai_adapter;
pub mod patterns;
pub mod scoring;

use crate::recommendation::{AnnotatedArticle, Article, OverallSentiment};
use crate::sentiment::{rating_for_score, SentimentAnalyzer};

// Re-export convenient items.
pub use crate::analyze::patterns::PatternAnalyzer;
pub use crate::analyze::scoring::{composite_score, confidence, label_from_score};

/// Score every article. Never drops or reorders; empty in, empty out.
pub fn annotate(analyzer: &SentimentAnalyzer, articles: Vec<Article>) -> Vec<AnnotatedArticle> {
    articles
        .into_iter()
        .map(|article| {
            let sentiment = analyzer.analyze_text(&article.scoring_text());
            AnnotatedArticle { article, sentiment }
        })
        .collect()
}

/// Batch aggregate. An empty batch short-circuits to the neutral default.
pub fn aggregate(annotated: &[AnnotatedArticle]) -> OverallSentiment {
    if annotated.is_empty() {
        return OverallSentiment::neutral();
    }

    let total: i64 = annotated.iter().map(|a| i64::from(a.sentiment.score)).sum();
    let mean = total as f64 / annotated.len() as f64;

    OverallSentiment {
        rating: rating_for_score(mean),
        score: mean,
        count: annotated.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn analyzer() -> SentimentAnalyzer {
        let mut lex = HashMap::new();
        lex.insert("great".to_string(), 3);
        lex.insert("record".to_string(), 3);
        lex.insert("awful".to_string(), -3);
        lex.insert("crash".to_string(), -4);
        SentimentAnalyzer::with_lexicon(lex)
    }

    #[test]
    fn annotate_keeps_count_and_order() {
        let input = vec![
            Article::new("first great", ""),
            Article::new("second", "awful"),
            Article::new("third", "nothing here"),
        ];
        let out = annotate(&analyzer(), input.clone());
        assert_eq!(out.len(), input.len());
        for (a, b) in out.iter().zip(input.iter()) {
            assert_eq!(&a.article, b);
        }
        assert_eq!(out[0].sentiment.score, 3);
        assert_eq!(out[1].sentiment.score, -3);
        assert_eq!(out[2].sentiment.score, 0);
    }

    #[test]
    fn annotate_scores_headline_and_summary_together() {
        let out = annotate(&analyzer(), vec![Article::new("great", "record")]);
        assert_eq!(out[0].sentiment.score, 6);
        assert_eq!(out[0].sentiment.rating, 5);
    }

    #[test]
    fn annotate_empty_is_empty() {
        assert!(annotate(&analyzer(), Vec::new()).is_empty());
    }

    #[test]
    fn aggregate_empty_is_neutral() {
        let o = aggregate(&[]);
        assert_eq!(o.rating, 3);
        assert_eq!(o.score, 0.0);
        assert_eq!(o.count, 0);
        assert!(!o.score.is_nan());
    }

    #[test]
    fn aggregate_uses_full_ladder_on_mean() {
        let a = analyzer();
        // mean = (6 + 6) / 2 = 6 -> 5
        let hi = annotate(&a, vec![Article::new("great record", ""), Article::new("record great", "")]);
        assert_eq!(aggregate(&hi).rating, 5);

        // mean = (-4 + -4 + -3 + -4) / 4 = -3.75 -> 2
        let lo = annotate(
            &a,
            vec![
                Article::new("crash", ""),
                Article::new("crash", ""),
                Article::new("awful", ""),
                Article::new("crash", ""),
            ],
        );
        let o = aggregate(&lo);
        assert_eq!(o.rating, 2);
        assert!((o.score + 3.75).abs() < 1e-9);
        assert_eq!(o.count, 4);

        // mean = -7 -> 1
        let very_lo = annotate(&a, vec![Article::new("crash awful", "")]);
        assert_eq!(aggregate(&very_lo).rating, 1);
    }
}
