//! Upstream search seam.

use async_trait::async_trait;

use crate::{Error, model::ScoredPost};

/// A source of scored posts for a search term.
///
/// Implementations return posts in upstream order. An empty vector is a
/// successful search with no matches; failures must be reported as
/// `Error::UpstreamUnavailable` or `Error::UpstreamTimeout`, never as an
/// empty result.
#[async_trait]
pub trait SearchSource: Send + Sync {
    async fn search(&self, term: &str) -> Result<Vec<ScoredPost>, Error>;
}
