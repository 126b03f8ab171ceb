//! Recent-search request parameters and validation.

use serde::Serialize;

use crate::twitter::TwitterError;

/// Operators appended to every search term.
pub const QUERY_OPERATORS: &str = "lang:en -is:retweet";

/// Fields requested for each post.
pub const TWEET_FIELDS: &str = "author_id,created_at,id";

/// Longest query the endpoint accepts, operators included.
const MAX_QUERY_CHARS: usize = 512;

/// Search request parameters for the recent-search endpoint.
///
/// Serializes directly into the URL query string.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchRequest {
    /// Full query: the search term followed by [`QUERY_OPERATORS`].
    pub query: String,

    /// Number of results (10-100).
    pub max_results: u8,

    /// Comma-separated post fields to return.
    #[serde(rename = "tweet.fields")]
    pub tweet_fields: String,
}

impl SearchRequest {
    /// Build a request for English, non-retweet posts matching `term`.
    pub fn for_term(term: &str, max_results: u8) -> Self {
        Self {
            query: format!("{} {QUERY_OPERATORS}", term.trim()),
            max_results,
            tweet_fields: TWEET_FIELDS.to_string(),
        }
    }

    /// The search term without the appended operators.
    pub fn term(&self) -> &str {
        self.query
            .strip_suffix(QUERY_OPERATORS)
            .unwrap_or(&self.query)
            .trim_end()
    }

    /// Validate the search request parameters.
    ///
    /// Returns an error if any parameters are out of range or malformed.
    pub fn validate(&self) -> Result<(), TwitterError> {
        if self.term().is_empty() {
            return Err(TwitterError::InvalidQuery("query cannot be empty".to_string()));
        }

        let chars = self.query.chars().count();
        if chars > MAX_QUERY_CHARS {
            return Err(TwitterError::InvalidQuery(format!(
                "query too long: {chars} chars (max {MAX_QUERY_CHARS})"
            )));
        }

        if !(10..=100).contains(&self.max_results) {
            return Err(TwitterError::InvalidMaxResults);
        }

        Ok(())
    }
}
