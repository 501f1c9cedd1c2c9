//! Keyword pattern analyzer: counts domain keyword hits across a batch of articles.
//!
//! Independent of the lexicon scores. Text is lowercased and split into words of
//! at least four characters; each word is matched against two fixed stem lists.
//! A stem matches its plain inflections (`beat` ~ `beats`, `surge` ~ `surging`,
//! `worry` ~ `worries`). Counts accumulate over the whole batch, so a word that
//! repeats inside one article counts every time.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::recommendation::{AnnotatedArticle, WordPatternSummary};

pub const POSITIVE_STEMS: [&str; 10] = [
    "surge", "soar", "gain", "profit", "growth", "beat", "exceed", "strong", "positive", "upgrade",
];

pub const NEGATIVE_STEMS: [&str; 10] = [
    "decline",
    "fall",
    "loss",
    "miss",
    "weak",
    "concern",
    "worry",
    "downgrade",
    "risk",
    "challenge",
];

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w{4,}\b").expect("word regex"));

const SUFFIXES: [&str; 16] = [
    "", "s", "es", "d", "ed", "ing", "en", "ened", "er", "ers", "est", "ly", "ness", "y", "ier",
    "able",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Positive,
    Negative,
}

#[derive(Debug, Clone)]
pub struct PatternAnalyzer {
    positive: Vec<String>,
    negative: Vec<String>,
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternAnalyzer {
    pub fn new() -> Self {
        Self::with_stems(POSITIVE_STEMS, NEGATIVE_STEMS)
    }

    pub fn with_stems<I, J, S, T>(positive: I, negative: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            positive: positive.into_iter().map(|s| s.as_ref().to_lowercase()).collect(),
            negative: negative.into_iter().map(|s| s.as_ref().to_lowercase()).collect(),
        }
    }

    /// Stem a lowercase word belongs to, positive stems checked first.
    fn classify<'a>(&'a self, word: &str) -> Option<(&'a str, Polarity)> {
        if let Some(s) = self.positive.iter().find(|s| is_inflection_of(word, s)) {
            return Some((s.as_str(), Polarity::Positive));
        }
        self.negative
            .iter()
            .find(|s| is_inflection_of(word, s))
            .map(|s| (s.as_str(), Polarity::Negative))
    }

    /// Scan headline + summary of every article. Zero-count stems are omitted;
    /// lists are sorted by descending count, ties keep first-seen order.
    pub fn analyze(&self, news: &[AnnotatedArticle]) -> WordPatternSummary {
        // stem -> slot in `counts`; `counts` keeps first-seen order.
        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut counts: Vec<(&str, Polarity, u32)> = Vec::new();

        for item in news {
            let text = item.article.scoring_text().to_lowercase();
            for m in WORD_RE.find_iter(&text) {
                let Some((stem, polarity)) = self.classify(m.as_str()) else {
                    continue;
                };
                match slots.get(stem) {
                    Some(&i) => counts[i].2 += 1,
                    None => {
                        slots.insert(stem, counts.len());
                        counts.push((stem, polarity, 1));
                    }
                }
            }
        }

        let pick = |p: Polarity| {
            let mut v: Vec<(String, u32)> = counts
                .iter()
                .filter(|(_, pol, _)| *pol == p)
                .map(|(s, _, c)| (s.to_string(), *c))
                .collect();
            // stable: ties stay in first-seen order
            v.sort_by(|a, b| b.1.cmp(&a.1));
            v
        };

        WordPatternSummary {
            positive_indicators: pick(Polarity::Positive),
            negative_indicators: pick(Polarity::Negative),
        }
    }
}

fn is_inflection_of(word: &str, stem: &str) -> bool {
    let mut bases = vec![stem.to_string()];
    if let Some(b) = stem.strip_suffix('e') {
        bases.push(b.to_string());
    }
    if let Some(b) = stem.strip_suffix('y') {
        bases.push(format!("{b}i"));
    }
    bases.iter().any(|b| {
        word.strip_prefix(b.as_str())
            .is_some_and(|rest| SUFFIXES.contains(&rest))
    })
}
