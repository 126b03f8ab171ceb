//! Scoring adapter between the search client and the orchestrator.

use async_trait::async_trait;
use std::sync::Arc;

use pulse_core::{Error, ScoredPost, SearchSource, SentimentScorer};

use super::{Post, TwitterClient};

/// Search source that scores each returned post.
#[derive(Clone)]
pub struct TwitterSource {
    client: TwitterClient,
    scorer: Arc<dyn SentimentScorer>,
}

impl TwitterSource {
    pub fn new(client: TwitterClient, scorer: Arc<dyn SentimentScorer>) -> Self {
        Self { client, scorer }
    }

    fn score(&self, post: &Post) -> ScoredPost {
        let sentiment = self.scorer.score(&post.text);
        tracing::trace!(
            id = %post.id,
            rank = post.rank,
            author_id = post.author_id.as_deref().unwrap_or(""),
            created_at = ?post.created_at,
            value = sentiment.value,
            "scored post"
        );
        ScoredPost { id: post.id.clone(), sentiment_label: sentiment.label, sentiment_value: sentiment.value }
    }
}

#[async_trait]
impl SearchSource for TwitterSource {
    async fn search(&self, term: &str) -> Result<Vec<ScoredPost>, Error> {
        let response = self.client.search(self.client.request_for(term)).await?;
        Ok(response.posts.iter().map(|post| self.score(post)).collect())
    }
}
