//! Recent-search response types and normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Raw response from the recent-search endpoint.
#[derive(Debug, Deserialize)]
pub struct RecentSearchApiResponse {
    #[serde(default)]
    pub data: Option<Vec<ApiTweet>>,
    #[serde(default)]
    pub meta: Option<ApiMeta>,
    #[serde(default)]
    pub errors: Vec<ApiProblem>,
}

/// Individual post as returned by the API.
#[derive(Debug, Deserialize)]
pub struct ApiTweet {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Result metadata from the API.
#[derive(Debug, Deserialize)]
pub struct ApiMeta {
    #[serde(default)]
    pub result_count: usize,
    #[serde(default)]
    pub newest_id: Option<String>,
    #[serde(default)]
    pub oldest_id: Option<String>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// Problem object reported alongside (or instead of) data.
#[derive(Debug, Deserialize)]
pub struct ApiProblem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ApiProblem {
    pub fn describe(&self) -> String {
        match (&self.title, &self.detail) {
            (Some(title), Some(detail)) => format!("{title}: {detail}"),
            (Some(msg), None) | (None, Some(msg)) => msg.clone(),
            (None, None) => "unknown problem".to_string(),
        }
    }
}

/// Normalized search response for internal use.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub posts: Vec<Post>,
    pub meta: SearchMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

/// Normalized post.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Post {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Position in the upstream ordering (1-indexed).
    pub rank: usize,
}

/// Normalized result metadata.
#[derive(Debug, Clone, Serialize, Default)]
pub struct SearchMeta {
    pub result_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_id: Option<String>,
    pub more_results_available: bool,
}

impl From<RecentSearchApiResponse> for SearchResponse {
    /// Convert the raw API response to the normalized internal format.
    fn from(raw: RecentSearchApiResponse) -> Self {
        let posts: Vec<Post> = raw
            .data
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(idx, t)| Post { id: t.id, text: t.text, author_id: t.author_id, created_at: t.created_at, rank: idx + 1 })
            .collect();

        let meta = match raw.meta {
            Some(m) => SearchMeta {
                result_count: m.result_count,
                newest_id: m.newest_id,
                oldest_id: m.oldest_id,
                more_results_available: m.next_token.is_some(),
            },
            None => SearchMeta { result_count: posts.len(), ..Default::default() },
        };

        SearchResponse { posts, meta, elapsed_ms: None }
    }
}

impl SearchResponse {
    /// Record the time taken since `start`.
    pub fn with_timing(mut self, start: Instant) -> Self {
        self.elapsed_ms = Some(start.elapsed().as_millis() as u64);
        self
    }

    pub fn has_more(&self) -> bool {
        self.meta.more_results_available
    }

    pub fn result_count(&self) -> usize {
        self.posts.len()
    }
}
