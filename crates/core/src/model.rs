//! Query, scored post and snapshot types.
//!
//! A [`Snapshot`] is the unit stored in both cache tiers. It is produced once
//! per successful upstream fetch and never mutated afterwards; a newer
//! snapshot under the same key replaces it.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Longest accepted search term, in bytes.
pub const MAX_TERM_BYTES: usize = 480;

/// Suffix appended to the encoded term to form the storage key.
const KEY_SUFFIX: &str = "-tracker";

/// A normalized search term.
///
/// The raw input is trimmed and percent-decoded; the decoded term is what
/// gets persisted, while its re-encoded form is used as the lookup key. Any
/// two inputs that decode to the same term therefore share a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    term: String,
    encoded: String,
}

impl Query {
    /// Normalize a raw, possibly percent-encoded search term.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the term is empty after decoding,
    /// is not valid UTF-8 once decoded, or exceeds [`MAX_TERM_BYTES`].
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let term = percent_decode_str(raw.trim())
            .decode_utf8()
            .map_err(|e| Error::InvalidInput(format!("query is not valid UTF-8: {e}")))?;
        Self::from_decoded(&term)
    }

    /// Normalize a term that has already been percent-decoded, such as a
    /// URL query parameter. `%` sequences are kept literally.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the term is empty after trimming or
    /// exceeds [`MAX_TERM_BYTES`].
    pub fn from_decoded(term: &str) -> Result<Self, Error> {
        let term = term.trim().to_string();

        if term.is_empty() {
            return Err(Error::InvalidInput("query cannot be empty".into()));
        }

        if term.len() > MAX_TERM_BYTES {
            return Err(Error::InvalidInput(format!(
                "query too long: {} bytes (max {MAX_TERM_BYTES})",
                term.len()
            )));
        }

        let encoded = utf8_percent_encode(&term, NON_ALPHANUMERIC).to_string();
        Ok(Self { term, encoded })
    }

    /// The decoded term, as sent upstream and persisted in `Snapshot::key`.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Key under which both tiers store this query's snapshot.
    pub fn storage_key(&self) -> String {
        format!("{}{KEY_SUFFIX}", self.encoded)
    }
}

/// Sentiment polarity of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Label for a numeric sentiment score.
    pub fn from_score(score: f64) -> Self {
        if score > 0.0 {
            SentimentLabel::Positive
        } else if score < 0.0 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

/// A post with its sentiment score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPost {
    pub id: String,
    #[serde(rename = "sentiment")]
    pub sentiment_label: SentimentLabel,
    #[serde(rename = "sentimentValue")]
    pub sentiment_value: f64,
}

/// Timestamped result set for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Decoded search term.
    pub key: String,
    /// RFC 3339 time at which the upstream fetch completed.
    ///
    /// Missing or unparsable values decode as-is and are never fresh.
    #[serde(default)]
    pub timestamp: String,
    pub data: Vec<ScoredPost>,
}

impl Snapshot {
    pub fn new(key: impl Into<String>, fetched_at: DateTime<Utc>, data: Vec<ScoredPost>) -> Self {
        Self { key: key.into(), timestamp: fetched_at.to_rfc3339_opts(SecondsFormat::Millis, true), data }
    }

    /// Parsed `timestamp`, if it is a valid RFC 3339 string.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Whether the snapshot is younger than `window` at `now`.
    ///
    /// An age exactly equal to the window is stale.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.fetched_at() {
            Some(fetched_at) => now.signed_duration_since(fetched_at) < window,
            None => false,
        }
    }

    /// Encode as the JSON body stored in either tier.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::MalformedRecord(format!("failed to encode snapshot: {e}")))
    }

    /// Decode a JSON body read from either tier.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedRecord` if the body is not a valid snapshot.
    pub fn from_json(body: &str) -> Result<Self, Error> {
        serde_json::from_str(body).map_err(|e| Error::MalformedRecord(e.to_string()))
    }
}
