//! Lexicon-based sentiment scoring.
//!
//! Each word found in the embedded AFINN-style word list contributes its
//! valence (-5..=5) to the post's score. A negator directly in front of a
//! scored word flips that word's sign. The label is the sign of the total.

use crate::model::SentimentLabel;

/// Sentiment of a single text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub value: f64,
}

/// Scores post text.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> Sentiment;
}

const NEGATORS: &[&str] = &[
    "not", "no", "never", "dont", "don't", "doesnt", "doesn't", "isnt", "isn't", "wasnt", "wasn't", "cant", "can't",
    "wont", "won't", "aint", "ain't",
];

const LEXICON: &[(&str, i8)] = &[
    ("abandon", -2),
    ("abuse", -3),
    ("amazing", 4),
    ("angry", -3),
    ("annoying", -2),
    ("awesome", 4),
    ("awful", -3),
    ("bad", -3),
    ("beautiful", 3),
    ("best", 3),
    ("better", 2),
    ("boring", -3),
    ("broken", -1),
    ("cool", 1),
    ("crap", -3),
    ("crisis", -3),
    ("cry", -1),
    ("cute", 2),
    ("dead", -3),
    ("disappointed", -2),
    ("disaster", -2),
    ("dislike", -2),
    ("easy", 1),
    ("enjoy", 2),
    ("excellent", 3),
    ("excited", 3),
    ("fail", -2),
    ("fantastic", 4),
    ("fear", -2),
    ("fine", 2),
    ("fun", 4),
    ("funny", 4),
    ("glad", 3),
    ("good", 3),
    ("great", 3),
    ("happy", 3),
    ("hate", -3),
    ("hope", 2),
    ("horrible", -3),
    ("hurt", -2),
    ("kill", -3),
    ("like", 2),
    ("lol", 3),
    ("lost", -3),
    ("love", 3),
    ("lovely", 3),
    ("mad", -3),
    ("nice", 3),
    ("pain", -2),
    ("perfect", 3),
    ("poor", -2),
    ("proud", 2),
    ("sad", -2),
    ("scared", -2),
    ("stupid", -2),
    ("success", 2),
    ("terrible", -3),
    ("thank", 2),
    ("thanks", 2),
    ("threat", -2),
    ("ugly", -3),
    ("upset", -2),
    ("war", -2),
    ("win", 4),
    ("wonderful", 4),
    ("worst", -3),
    ("wow", 4),
    ("wrong", -2),
];

/// Scorer backed by the embedded word list.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    fn valence(word: &str) -> Option<i8> {
        LEXICON
            .binary_search_by(|(entry, _)| entry.cmp(&word))
            .ok()
            .map(|idx| LEXICON[idx].1)
    }
}

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> Sentiment {
        let mut total: i32 = 0;
        let mut negate = false;

        for raw in text.split_whitespace() {
            let word = raw
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase();
            if word.is_empty() {
                continue;
            }

            if NEGATORS.contains(&word.as_str()) {
                negate = true;
                continue;
            }

            if let Some(valence) = Self::valence(&word) {
                let valence = i32::from(valence);
                total += if negate { -valence } else { valence };
            }
            negate = false;
        }

        let value = f64::from(total);
        Sentiment { label: SentimentLabel::from_score(value), value }
    }
}
