use crate::filter::ContentFilter;
use crate::types::{AggregatorError, FetchConfig, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Feeds ingested when `NEWS_FEEDS` is not set.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://allafrica.com/misc/tools/rss/en/kenya.html",
    "https://feeds.bbci.co.uk/swahili/rss.xml",
    "https://www.dw.com/swahili/s-11616/rss",
    "https://www.africanews.com/rss.xml",
    "https://www.standardmedia.co.ke/rss/headlines.php",
    "https://www.the-star.co.ke/rss",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub hour: u32,
    pub minute: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { hour: 8, minute: 0 }
    }
}

impl ScheduleConfig {
    /// Six-field cron expression firing once a day at `hour:minute`.
    pub fn cron_expression(&self) -> String {
        format!("0 {} {} * * *", self.minute, self.hour)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Processed in this order; earlier feeds may use up the per-run cap.
    pub feeds: Vec<String>,
    /// Ceiling on new articles per run, across all feeds combined.
    pub max_items_per_run: usize,
    pub filter: ContentFilter,
    pub schedule: ScheduleConfig,
    pub database_url: String,
    pub fetch: FetchConfig,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            max_items_per_run: 30,
            filter: ContentFilter::default(),
            schedule: ScheduleConfig::default(),
            database_url: "sqlite://articles.db".to_string(),
            fetch: FetchConfig::default(),
            bind_addr: "0.0.0.0:5000".to_string(),
        }
    }
}

impl Config {
    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(feeds) = lookup("NEWS_FEEDS") {
            config.feeds = split_list(&feeds);
        }
        if let Some(keywords) = lookup("NEWS_TOPIC_KEYWORDS") {
            config.filter.topic_keywords = split_list(&keywords)
                .into_iter()
                .map(|k| k.to_lowercase())
                .collect();
        }
        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(addr) = lookup("NEWS_BIND_ADDR") {
            config.bind_addr = addr;
        }

        parse_into(&lookup, "NEWS_MAX_ITEMS_PER_RUN", &mut config.max_items_per_run)?;
        parse_into(&lookup, "NEWS_MIN_CHARS", &mut config.filter.min_chars)?;
        parse_into(&lookup, "NEWS_MIN_WORDS", &mut config.filter.min_words)?;
        parse_into(&lookup, "NEWS_MAX_WORDS", &mut config.filter.max_words)?;
        parse_into(&lookup, "NEWS_MIN_WORDS_AFTER_TRIM", &mut config.filter.min_words_after_trim)?;
        parse_into(&lookup, "NEWS_SCHEDULE_HOUR", &mut config.schedule.hour)?;
        parse_into(&lookup, "NEWS_SCHEDULE_MINUTE", &mut config.schedule.minute)?;
        parse_into(&lookup, "NEWS_FETCH_TIMEOUT_SECS", &mut config.fetch.timeout_seconds)?;
        parse_into(&lookup, "NEWS_FEED_RETRIES", &mut config.fetch.max_retries)?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.feeds.is_empty() {
            return Err(AggregatorError::Config("feed list is empty".to_string()));
        }
        if self.max_items_per_run == 0 {
            return Err(AggregatorError::Config("max_items_per_run must be at least 1".to_string()));
        }
        if self.filter.min_words > self.filter.max_words {
            return Err(AggregatorError::Config(format!(
                "min_words ({}) exceeds max_words ({})",
                self.filter.min_words, self.filter.max_words
            )));
        }
        if self.schedule.hour > 23 || self.schedule.minute > 59 {
            return Err(AggregatorError::Config(format!(
                "invalid schedule time {:02}:{:02}",
                self.schedule.hour, self.schedule.minute
            )));
        }
        if self.fetch.timeout_seconds == 0 {
            return Err(AggregatorError::Config("fetch timeout must be positive".to_string()));
        }
        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_into<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| AggregatorError::Config(format!("{} has invalid value {:?}", key, raw)))?;
    }
    Ok(())
}
