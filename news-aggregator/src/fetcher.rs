use crate::types::{AggregatorError, FetchConfig, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const BYTES_PER_MB: usize = 1024 * 1024;

/// Shared HTTP client for feed and article downloads.
///
/// Every request is bounded by the configured timeout so a hung server costs
/// at most one timeout per call.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    /// Download a feed document, retrying with exponential backoff.
    pub async fn fetch_feed(&self, url: &str) -> Result<String> {
        let start_time = Instant::now();
        debug!("Fetching feed: {}", url);

        let delay = Duration::from_millis(self.config.retry_delay_ms);
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: delay,
            initial_interval: delay,
            max_interval: delay * 32,
            multiplier: 2.0,
            max_elapsed_time: Some(delay * 60),
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.get_body(url).await {
                Ok(content) => {
                    info!(
                        "Fetched feed: {} ({} bytes, {}ms)",
                        url,
                        content.len(),
                        start_time.elapsed().as_millis()
                    );
                    return Ok(content);
                }
                Err(e) => {
                    // Oversized bodies and client errors will not change on retry.
                    if !is_retryable(&e) {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }

            if attempt < self.config.max_retries {
                if let Some(wait) = backoff.next_backoff() {
                    warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, wait);
                    tokio::time::sleep(wait).await;
                    continue;
                }
            }
            break;
        }

        Err(last_error.unwrap_or_else(|| AggregatorError::Parse(format!("no response from {}", url))))
    }

    /// Download an article page. Failures are returned immediately; the item
    /// stays eligible for the next run because nothing was persisted.
    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        debug!("Fetching page: {}", url);
        self.get_body(url).await
    }

    async fn get_body(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let mut response = Self::check_status(response, url)?;

        let limit = self.config.max_body_mb * BYTES_PER_MB;
        if let Some(content_length) = response.content_length() {
            if content_length as usize > limit {
                return Err(AggregatorError::BodyTooLarge {
                    size_mb: content_length as usize / BYTES_PER_MB,
                });
            }
        }

        // Chunked responses carry no length up front; count as we read.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                warn!("Body of {} exceeds {}MB, aborting download", url, self.config.max_body_mb);
                return Err(AggregatorError::BodyTooLarge {
                    size_mb: (body.len() + chunk.len()) / BYTES_PER_MB,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn check_status(response: Response, url: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(AggregatorError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            })
        }
    }
}

fn is_retryable(error: &AggregatorError) -> bool {
    match error {
        AggregatorError::BodyTooLarge { .. } => false,
        // Timeouts and rate limits are the client errors worth another try.
        AggregatorError::HttpStatus { status, .. } => {
            !(400..500).contains(status) || matches!(status, 408 | 429)
        }
        _ => true,
    }
}
