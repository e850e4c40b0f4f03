#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use news_aggregator::{
    AggregatorError, Article, ArticleExtractor, ArticleStore, Config, FeedReader, FetchConfig,
    FullArticle, RawEntry,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Store in a fresh temporary directory. Keep the `TempDir` alive for the
/// duration of the test.
pub async fn temp_store() -> (TempDir, String, ArticleStore) {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("articles.db").display());
    let store = ArticleStore::connect(&url).await.expect("open store");
    (dir, url, store)
}

pub fn test_config(feeds: Vec<String>, cap: usize) -> Config {
    Config {
        feeds,
        max_items_per_run: cap,
        fetch: FetchConfig {
            user_agent: "News-Aggregator-Test/1.0".to_string(),
            timeout_seconds: 5,
            max_retries: 0,
            retry_delay_ms: 10,
            max_body_mb: 10,
            max_redirects: 5,
        },
        ..Config::default()
    }
}

/// `count` distinct words, long enough to pass the default gates when
/// `count >= 150`.
pub fn words(count: usize) -> String {
    (0..count)
        .map(|i| format!("siasa{}", i))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn article_page(title: &str, word_count: usize, og_image: Option<&str>, inline_img: Option<&str>) -> String {
    let og = og_image
        .map(|src| format!(r#"<meta property="og:image" content="{}">"#, src))
        .unwrap_or_default();
    let img = inline_img
        .map(|src| format!(r#"<img alt="lead" src="{}">"#, src))
        .unwrap_or_default();

    let body = words(word_count);
    let paragraphs: Vec<String> = body
        .split_whitespace()
        .collect::<Vec<_>>()
        .chunks(40)
        .map(|chunk| format!("<p>{}</p>", chunk.join(" ")))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{title} | Site</title>{og}</head>
<body>
<nav><p>Menu</p></nav>
<article>
<h1>{title}</h1>
{img}
{paragraphs}
</article>
</body>
</html>"#,
        title = title,
        og = og,
        img = img,
        paragraphs = paragraphs.join("\n"),
    )
}

pub fn rss_feed(items: &[(String, String)]) -> String {
    let items: String = items
        .iter()
        .map(|(title, link)| {
            format!(
                r#"
    <item>
      <title>{}</title>
      <link>{}</link>
      <description>Summary of {}</description>
      <pubDate>Mon, 03 Nov 2025 07:28:00 GMT</pubDate>
    </item>"#,
                title, link, title
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>http://example.com/</link>
    <description>Test description</description>{}
  </channel>
</rss>"#,
        items
    )
}

pub fn entry(title: &str, link: &str) -> RawEntry {
    RawEntry {
        title: title.to_string(),
        link: link.to_string(),
        summary: None,
        published_at: None,
    }
}

pub fn article(url: &str, created_at: DateTime<Utc>) -> Article {
    Article {
        id: Uuid::new_v4(),
        title: format!("Title for {}", url),
        content: words(200),
        source_url: url.to_string(),
        image_url: news_aggregator::image::PLACEHOLDER_IMAGE_URL.to_string(),
        published_at: None,
        created_at,
    }
}

/// Feed reader that serves fixed entries per feed URL.
pub struct StaticFeedReader {
    feeds: HashMap<String, Vec<RawEntry>>,
}

impl StaticFeedReader {
    pub fn new(feeds: Vec<(&str, Vec<RawEntry>)>) -> Self {
        Self {
            feeds: feeds
                .into_iter()
                .map(|(url, entries)| (url.to_string(), entries))
                .collect(),
        }
    }
}

#[async_trait]
impl FeedReader for StaticFeedReader {
    async fn fetch(&self, feed_url: &str) -> Vec<RawEntry> {
        self.feeds.get(feed_url).cloned().unwrap_or_default()
    }
}

/// Extractor that returns a long article for every link after `delay`,
/// recording how many extractions overlap.
pub struct SlowExtractor {
    delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

impl SlowExtractor {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ArticleExtractor for SlowExtractor {
    async fn extract(&self, link: &str) -> Result<FullArticle, AggregatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(FullArticle {
            title: Some(format!("Story at {}", link)),
            body_text: words(200),
            html: String::new(),
            top_image: None,
        })
    }
}
