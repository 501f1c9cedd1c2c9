//! Recommendation scoring helpers.
//!
//! Composite score = sentiment term + ratio term + keyword term:
//! - sentiment: `(overall_rating - 3) * 20`
//! - ratio:     `(positive_ratio - negative_ratio) * 0.3`
//! - keywords:  `(positive hits - negative hits) * 10`
//!
//! The composite is unbounded; it is only compared against the label ladder.

use crate::recommendation::{RecommendationAnalysis, RecommendationLabel};

pub const SENTIMENT_STEP: f64 = 20.0;
pub const RATIO_WEIGHT: f64 = 0.3;
pub const KEYWORD_WEIGHT: f64 = 10.0;

pub const CONFIDENCE_BASE: u8 = 50;
pub const CONFIDENCE_CAP: u8 = 95;

/// Weighted composite over one analysis.
pub fn composite_score(a: &RecommendationAnalysis) -> f64 {
    let sentiment = (f64::from(a.overall_sentiment) - 3.0) * SENTIMENT_STEP;
    let ratio = (a.positive_ratio - a.negative_ratio) * RATIO_WEIGHT;
    let keywords = (f64::from(a.word_analysis.positive_total())
        - f64::from(a.word_analysis.negative_total()))
        * KEYWORD_WEIGHT;
    sentiment + ratio + keywords
}

/// High-to-low ladder; boundary values belong to the higher bucket.
pub fn label_from_score(score: f64) -> RecommendationLabel {
    if score >= 30.0 {
        RecommendationLabel::StrongBuy
    } else if score >= 10.0 {
        RecommendationLabel::Buy
    } else if score >= -10.0 {
        RecommendationLabel::Hold
    } else if score >= -30.0 {
        RecommendationLabel::Sell
    } else {
        RecommendationLabel::StrongSell
    }
}

/// 50 + volume bonus + skew bonus, capped at 95. There is no lower clamp.
pub fn confidence(a: &RecommendationAnalysis) -> u8 {
    let mut c = CONFIDENCE_BASE;

    if a.news_count >= 10 {
        c += 20;
    } else if a.news_count >= 5 {
        c += 10;
    }

    let skew = (a.positive_ratio - a.negative_ratio).abs();
    if skew > 50.0 {
        c += 15;
    } else if skew > 25.0 {
        c += 10;
    }

    c.min(CONFIDENCE_CAP)
}
