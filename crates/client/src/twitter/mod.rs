//! Recent-search API client.
//!
//! ### Specification
//!
//! - **Endpoint**: `{base_url}/tweets/search/recent`
//! - **Authentication**: `Authorization: Bearer <token>` header.
//! - **Query**: the search term plus `lang:en -is:retweet`, a fixed
//!   `max_results` and `tweet.fields=author_id,created_at,id`. Results are
//!   not paginated.
//! - **Failures**: 401/403, 429, other non-2xx statuses, timeouts, transport
//!   and decode errors each map to a distinct [`TwitterError`]. A response
//!   without `data` is an empty result, not a failure.

pub mod error;
pub mod request;
pub mod response;
pub mod source;

pub use error::TwitterError;
pub use request::SearchRequest;
pub use response::{Post, SearchMeta, SearchResponse};
pub use source::TwitterSource;

use reqwest::header;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default base URL for the API.
const DEFAULT_BASE_URL: &str = "https://api.twitter.com/2";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "pulse/0.1";

/// Default number of posts per search.
const DEFAULT_MAX_RESULTS: u8 = 10;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct TwitterConfig {
    /// Bearer token for app-only authentication.
    pub bearer_token: String,
    /// Base URL (default: https://api.twitter.com/2).
    pub base_url: String,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    /// User-agent string (default: pulse/0.x).
    pub user_agent: String,
    /// Posts requested per search (default: 10).
    pub max_results: u8,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            bearer_token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Recent-search API client.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    http: reqwest::Client,
    config: Arc<TwitterConfig>,
}

impl TwitterClient {
    /// Create a new client with the given configuration.
    pub fn new(config: TwitterConfig) -> Result<Self, TwitterError> {
        if config.bearer_token.trim().is_empty() {
            return Err(TwitterError::MissingToken);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| TwitterError::Network(Arc::new(e)))?;

        Ok(Self { http, config: Arc::new(config) })
    }

    pub fn config(&self) -> &TwitterConfig {
        &self.config
    }

    /// Request for `term` using the configured result count.
    pub fn request_for(&self, term: &str) -> SearchRequest {
        SearchRequest::for_term(term, self.config.max_results)
    }

    /// Execute a recent-search query.
    ///
    /// This method handles request validation, status mapping and response
    /// normalization.
    pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse, TwitterError> {
        req.validate()?;

        let start = Instant::now();
        let url = format!("{}/tweets/search/recent", self.config.base_url.trim_end_matches('/'));

        tracing::debug!(query = %req.query, "searching recent posts");

        let http_response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.bearer_token)
            .header(header::ACCEPT, "application/json")
            .query(&req)
            .send()
            .await?;

        let status = http_response.status();
        tracing::debug!(%status, "recent search response status");

        if status == 401 || status == 403 {
            return Err(TwitterError::AuthError);
        }

        if status == 429 {
            return Err(TwitterError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(TwitterError::HttpError { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await?;
        let api_response: response::RecentSearchApiResponse =
            serde_json::from_slice(&bytes).map_err(|e| TwitterError::Parse(e.to_string()))?;

        if api_response.data.is_none()
            && let Some(problem) = api_response.errors.first()
        {
            return Err(TwitterError::Api(problem.describe()));
        }

        let response = SearchResponse::from(api_response).with_timing(start);
        tracing::debug!(
            elapsed_ms = response.elapsed_ms,
            results = response.result_count(),
            more_available = response.has_more(),
            "recent search completed"
        );

        Ok(response)
    }
}
