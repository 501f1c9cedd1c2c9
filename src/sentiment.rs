//! Lexicon sentiment scorer and the 1..=5 rating ladder.

use anyhow::Context;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::recommendation::SentimentResult;

static LEXICON: Lazy<Arc<HashMap<String, i32>>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    Arc::new(serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon"))
});

/// Stateless scorer over a fixed word -> weight table. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SentimentAnalyzer {
    lexicon: Arc<HashMap<String, i32>>,
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentAnalyzer {
    /// Analyzer backed by the embedded lexicon.
    pub fn new() -> Self {
        Self {
            lexicon: Arc::clone(&LEXICON),
        }
    }

    /// Analyzer over a caller-supplied lexicon. Keys are lowercased.
    pub fn with_lexicon(lexicon: HashMap<String, i32>) -> Self {
        let lexicon = lexicon
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        Self {
            lexicon: Arc::new(lexicon),
        }
    }

    /// Load a JSON `{ "word": weight }` lexicon from disk.
    pub fn from_lexicon_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading sentiment lexicon from {}", path.display()))?;
        let lexicon: HashMap<String, i32> =
            serde_json::from_str(&raw).context("parsing sentiment lexicon json")?;
        Ok(Self::with_lexicon(lexicon))
    }

    pub fn lexicon_len(&self) -> usize {
        self.lexicon.len()
    }

    /// Lexicon weight for a lowercase token (0 if unknown).
    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        self.lexicon.get(w).copied().unwrap_or(0)
    }

    /// Score free text. Identical input always yields an identical result.
    pub fn analyze_text(&self, text: &str) -> SentimentResult {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score: i32 = 0;
        let mut positive = Vec::new();
        let mut negative = Vec::new();

        for tok in &tokens {
            let w = self.word_score(tok);
            if w > 0 {
                positive.push(tok.clone());
            } else if w < 0 {
                negative.push(tok.clone());
            }
            score = score.saturating_add(w);
        }

        let comparative = f64::from(score) / tokens.len().max(1) as f64;

        SentimentResult {
            score,
            rating: rating_for_score(f64::from(score)),
            comparative,
            positive,
            negative,
            tokens,
        }
    }
}

/// Alphanumeric tokens, lowercased.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

/// Map a raw (or mean) score to a 1..=5 rating. First match wins, all strict:
/// `> 5` → 5, `> 2` → 4, `< -5` → 1, `< -2` → 2, otherwise 3.
pub fn rating_for_score(score: f64) -> u8 {
    if score > 5.0 {
        5
    } else if score > 2.0 {
        4
    } else if score < -5.0 {
        1
    } else if score < -2.0 {
        2
    } else {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(pairs: &[(&str, i32)]) -> SentimentAnalyzer {
        SentimentAnalyzer::with_lexicon(pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    #[test]
    fn sums_weights_and_splits_polarity() {
        let a = lex(&[("strong", 3), ("growth", 2), ("risk", -2)]);
        let r = a.analyze_text("Strong growth, but RISK remains");
        assert_eq!(r.score, 3);
        assert_eq!(r.rating, 4);
        assert_eq!(r.positive, vec!["strong", "growth"]);
        assert_eq!(r.negative, vec!["risk"]);
        assert_eq!(r.tokens.len(), 5);
        assert!((r.comparative - 0.6).abs() < 1e-9);
    }

    #[test]
    fn unmatched_text_is_neutral() {
        let a = lex(&[("strong", 3)]);
        let r = a.analyze_text("The quarterly filing was published on Tuesday");
        assert_eq!(r.score, 0);
        assert_eq!(r.rating, 3);
        assert_eq!(r.comparative, 0.0);
        assert!(r.positive.is_empty() && r.negative.is_empty());
    }

    #[test]
    fn empty_text_does_not_divide_by_zero() {
        let r = SentimentAnalyzer::new().analyze_text("   ");
        assert_eq!(r.score, 0);
        assert_eq!(r.comparative, 0.0);
        assert!(r.tokens.is_empty());
    }

    #[test]
    fn scoring_is_deterministic() {
        let a = SentimentAnalyzer::new();
        let t = "Shares surge after the company beats estimates despite recession fears";
        assert_eq!(a.analyze_text(t), a.analyze_text(t));
    }

    #[test]
    fn embedded_lexicon_loads() {
        let a = SentimentAnalyzer::new();
        assert!(a.lexicon_len() > 100);
        assert!(a.analyze_text("strong").score > 0);
        assert!(a.analyze_text("downgrade").score < 0);
    }

    #[test]
    fn extreme_custom_weights_saturate() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut f,
            format!(r#"{{"boom": {}, "bust": {}}}"#, i32::MAX, i32::MIN).as_bytes(),
        )
        .unwrap();
        let a = SentimentAnalyzer::from_lexicon_file(f.path()).unwrap();

        let up = a.analyze_text("boom boom boom");
        assert_eq!(up.score, i32::MAX);
        assert_eq!(up.rating, 5);
        let down = a.analyze_text("bust bust");
        assert_eq!(down.score, i32::MIN);
        assert_eq!(down.rating, 1);
    }

    #[test]
    fn rating_ladder_boundaries_are_strict() {
        assert_eq!(rating_for_score(5.0), 4);
        assert_eq!(rating_for_score(5.01), 5);
        assert_eq!(rating_for_score(2.0), 3);
        assert_eq!(rating_for_score(2.5), 4);
        assert_eq!(rating_for_score(0.0), 3);
        assert_eq!(rating_for_score(-2.0), 3);
        assert_eq!(rating_for_score(-2.5), 2);
        assert_eq!(rating_for_score(-5.0), 2);
        assert_eq!(rating_for_score(-5.01), 1);
    }
}
