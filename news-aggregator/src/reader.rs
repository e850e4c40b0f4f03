use crate::traits::FeedReader;
use crate::types::RawEntry;
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// [`FeedReader`] backed by HTTP and `feed-rs`.
pub struct HttpFeedReader {
    fetcher: Arc<Fetcher>,
    parser: FeedParser,
}

impl HttpFeedReader {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self {
            fetcher,
            parser: FeedParser::new(),
        }
    }
}

#[async_trait]
impl FeedReader for HttpFeedReader {
    async fn fetch(&self, feed_url: &str) -> Vec<RawEntry> {
        let content = match self.fetcher.fetch_feed(feed_url).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping feed {}: {}", feed_url, e);
                return Vec::new();
            }
        };

        match self.parser.parse_feed(&content) {
            Ok(parsed) => {
                info!(
                    "Feed {} ({}): {} entries",
                    feed_url,
                    parsed.title.as_deref().unwrap_or("untitled"),
                    parsed.entries.len()
                );
                parsed.entries
            }
            Err(e) => {
                warn!("Skipping feed {}: {}", feed_url, e);
                Vec::new()
            }
        }
    }
}
