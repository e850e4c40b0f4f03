use crate::config::Config;
use crate::extractor::HttpArticleExtractor;
use crate::filter::{ContentFilter, Rejection};
use crate::image::select_image;
use crate::reader::HttpFeedReader;
use crate::store::{ArticleStore, InsertOutcome, StagedBatch};
use crate::traits::{ArticleExtractor, FeedReader};
use crate::types::{Article, RawEntry, Result, MAX_TITLE_CHARS};
use crate::utils::truncate_chars;
use crate::Fetcher;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Why a feed entry contributed no article this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyLink,
    OffTopic,
    AlreadyStored,
    ExtractionFailed,
    TooShort,
    TooFewWords,
    EmptyTitle,
}

impl From<Rejection> for SkipReason {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::TooShort => SkipReason::TooShort,
            Rejection::TooFewWords => SkipReason::TooFewWords,
            Rejection::OffTopic => SkipReason::OffTopic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Staged,
    /// Passed every gate but lost the uniqueness check at insert time.
    Duplicate,
    Skipped(SkipReason),
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub feeds_attempted: usize,
    pub feeds_empty: usize,
    pub entries_seen: usize,
    /// Entries that counted towards the per-run cap.
    pub processed: usize,
    pub staged: usize,
    pub committed: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl RunReport {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            feeds_attempted: 0,
            feeds_empty: 0,
            entries_seen: 0,
            processed: 0,
            staged: 0,
            committed: 0,
            skipped: BTreeMap::new(),
        }
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }
}

/// Ingestion orchestrator: feeds → extraction → filtering → dedup → one commit.
///
/// At most one run is in flight at a time; callers of [`NewsAggregator::run`]
/// queue on an internal lock.
pub struct NewsAggregator {
    feeds: Vec<String>,
    max_items_per_run: usize,
    filter: ContentFilter,
    reader: Arc<dyn FeedReader>,
    extractor: Arc<dyn ArticleExtractor>,
    store: ArticleStore,
    run_lock: Mutex<()>,
}

impl NewsAggregator {
    pub fn new(
        config: &Config,
        reader: Arc<dyn FeedReader>,
        extractor: Arc<dyn ArticleExtractor>,
        store: ArticleStore,
    ) -> Self {
        Self {
            feeds: config.feeds.clone(),
            max_items_per_run: config.max_items_per_run,
            filter: config.filter.clone(),
            reader,
            extractor,
            store,
            run_lock: Mutex::new(()),
        }
    }

    /// Wire the HTTP reader and extractor around one shared [`Fetcher`].
    pub fn from_config(config: &Config, store: ArticleStore) -> Result<Self> {
        let fetcher = Arc::new(Fetcher::new(config.fetch.clone())?);
        let reader = Arc::new(HttpFeedReader::new(fetcher.clone()));
        let extractor = Arc::new(HttpArticleExtractor::new(fetcher));
        Ok(Self::new(config, reader, extractor, store))
    }

    pub fn store(&self) -> &ArticleStore {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Run once, waiting for any in-flight run to finish first.
    pub async fn run(&self) -> Result<RunReport> {
        let _guard = self.run_lock.lock().await;
        self.run_locked().await
    }

    /// Resolve once no run is in flight.
    pub async fn wait_idle(&self) {
        drop(self.run_lock.lock().await);
    }

    /// Run once unless a run is already in flight, in which case `None`.
    pub async fn try_run(&self) -> Option<Result<RunReport>> {
        let _guard = self.run_lock.try_lock().ok()?;
        Some(self.run_locked().await)
    }

    async fn run_locked(&self) -> Result<RunReport> {
        let mut report = RunReport::new();
        let mut batch = self.store.begin_batch();
        let cap = self.max_items_per_run;

        info!("Starting ingestion run over {} feeds (cap {})", self.feeds.len(), cap);

        // The cap is shared by all feeds in configured order; early feeds can
        // exhaust it before later ones are read.
        'feeds: for feed_url in &self.feeds {
            if report.processed >= cap {
                break;
            }

            report.feeds_attempted += 1;
            let entries = self.reader.fetch(feed_url).await;
            if entries.is_empty() {
                report.feeds_empty += 1;
                continue;
            }

            for entry in &entries {
                if report.processed >= cap {
                    break 'feeds;
                }
                report.entries_seen += 1;

                match self.process_entry(entry, &mut batch).await? {
                    ItemOutcome::Staged => {
                        report.processed += 1;
                        report.staged += 1;
                    }
                    ItemOutcome::Duplicate => {
                        report.processed += 1;
                    }
                    ItemOutcome::Skipped(reason) => {
                        *report.skipped.entry(reason).or_insert(0) += 1;
                    }
                }
            }
        }

        report.committed = match self.store.commit(batch).await {
            Ok(count) => count,
            Err(e) => {
                error!("Ingestion run failed at commit, nothing persisted: {}", e);
                return Err(e);
            }
        };
        report.finished_at = Utc::now();

        info!(
            "Ingestion run finished for {}: {} new articles ({} entries seen, {} feeds empty)",
            Local::now().date_naive(),
            report.committed,
            report.entries_seen,
            report.feeds_empty
        );
        Ok(report)
    }

    /// Push one entry through extraction, filtering and staging.
    ///
    /// Only store failures are returned as errors; everything else becomes a
    /// [`SkipReason`].
    async fn process_entry(&self, entry: &RawEntry, batch: &mut StagedBatch) -> Result<ItemOutcome> {
        let link = entry.link.trim();
        if link.is_empty() {
            return Ok(ItemOutcome::Skipped(SkipReason::EmptyLink));
        }

        if let Err(rejection) = self.filter.check_topic(&entry.title, entry.summary.as_deref()) {
            debug!("Off topic: {}", link);
            return Ok(ItemOutcome::Skipped(rejection.into()));
        }

        if batch.contains(link) || self.store.contains(link).await? {
            return Ok(ItemOutcome::Skipped(SkipReason::AlreadyStored));
        }

        let full = match self.extractor.extract(link).await {
            Ok(full) => full,
            Err(e) => {
                warn!("Extraction failed for {}: {}", link, e);
                return Ok(ItemOutcome::Skipped(SkipReason::ExtractionFailed));
            }
        };

        let content = match self.filter.filter(&full.body_text) {
            Ok(content) => content,
            Err(rejection) => {
                debug!("Filtered {}: {:?}", link, rejection);
                return Ok(ItemOutcome::Skipped(rejection.into()));
            }
        };

        let title = full
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| entry.title.trim());
        if title.is_empty() {
            return Ok(ItemOutcome::Skipped(SkipReason::EmptyTitle));
        }

        let mut created_at = Utc::now();
        if let Some(last) = batch.last_created_at() {
            created_at = created_at.max(last);
        }

        let article = Article {
            id: Uuid::new_v4(),
            title: truncate_chars(title, MAX_TITLE_CHARS),
            content,
            source_url: link.to_string(),
            image_url: select_image(&full),
            published_at: entry.published_at,
            created_at,
        };

        match self.store.try_insert(batch, article).await? {
            InsertOutcome::Inserted => {
                debug!("Staged {}", link);
                Ok(ItemOutcome::Staged)
            }
            InsertOutcome::AlreadyExists => Ok(ItemOutcome::Duplicate),
        }
    }
}
