use crate::types::{FullArticle, RawEntry, Result};
use async_trait::async_trait;

/// Source of raw feed entries.
#[async_trait]
pub trait FeedReader: Send + Sync {
    /// Fetch and parse one feed.
    ///
    /// Never fails: a feed that cannot be downloaded or parsed yields no
    /// entries so the caller can move on to the next one.
    async fn fetch(&self, feed_url: &str) -> Vec<RawEntry>;
}

/// Retrieves the full article behind a feed entry link.
#[async_trait]
pub trait ArticleExtractor: Send + Sync {
    async fn extract(&self, link: &str) -> Result<FullArticle>;
}
