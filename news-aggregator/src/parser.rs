use crate::types::{AggregatorError, ParsedFeed, RawEntry, Result};
use feed_rs::parser;
use tracing::debug;

/// Turns RSS, Atom and JSON Feed documents into [`RawEntry`] values.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_feed(&self, content: &str) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| AggregatorError::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content);
        let entries: Vec<RawEntry> = feed.entries.into_iter().map(Self::parse_entry).collect();

        debug!("Parsed feed with {} entries", entries.len());
        Ok(ParsedFeed { title, entries })
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> RawEntry {
        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default();

        // Some feeds only carry the permalink in the guid.
        let link = entry
            .links
            .first()
            .map(|l| l.href.trim().to_string())
            .filter(|href| !href.is_empty())
            .or_else(|| {
                let id = entry.id.trim();
                is_http_url(id).then(|| id.to_string())
            })
            .unwrap_or_default();

        let summary = entry
            .summary
            .map(|s| s.content.trim().to_string())
            .filter(|s| !s.is_empty());

        let published_at = entry.published.or(entry.updated);

        RawEntry {
            title,
            link,
            summary,
            published_at,
        }
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
