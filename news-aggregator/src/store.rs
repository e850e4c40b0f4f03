use crate::types::{Article, DayGroup, Result};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use tracing::{debug, info};

/// Outcome of staging an article for insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Articles staged during one run, written together by [`ArticleStore::commit`].
#[derive(Debug, Default)]
pub struct StagedBatch {
    articles: Vec<Article>,
    urls: HashSet<String>,
}

impl StagedBatch {
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn contains(&self, source_url: &str) -> bool {
        self.urls.contains(source_url)
    }

    /// Creation time of the most recently staged article.
    pub fn last_created_at(&self) -> Option<DateTime<Utc>> {
        self.articles.last().map(|a| a.created_at)
    }
}

/// SQLite-backed article collection. Sole writer of the `articles` table.
#[derive(Clone)]
pub struct ArticleStore {
    db: SqlitePool,
}

impl ArticleStore {
    /// Open (creating if needed) the database and apply migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let db = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&db).await?;

        info!("Connected to article store");
        Ok(Self { db })
    }

    pub async fn close(&self) {
        self.db.close().await;
    }

    pub fn begin_batch(&self) -> StagedBatch {
        StagedBatch::default()
    }

    pub async fn contains(&self, source_url: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM articles WHERE source_url = ?")
            .bind(source_url)
            .fetch_one(&self.db)
            .await?;
        Ok(row.try_get::<i64, _>("count")? > 0)
    }

    /// Stage `article` unless its `source_url` is already stored or staged.
    pub async fn try_insert(&self, batch: &mut StagedBatch, article: Article) -> Result<InsertOutcome> {
        if batch.contains(&article.source_url) || self.contains(&article.source_url).await? {
            debug!("Already have {}", article.source_url);
            return Ok(InsertOutcome::AlreadyExists);
        }

        batch.urls.insert(article.source_url.clone());
        batch.articles.push(article);
        Ok(InsertOutcome::Inserted)
    }

    /// Write every staged article in a single transaction.
    ///
    /// Returns the number of rows written. On error nothing from the batch
    /// is persisted.
    pub async fn commit(&self, batch: StagedBatch) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut tx = self.db.begin().await?;
        let mut stored_count = 0;

        for article in &batch.articles {
            let result = sqlx::query(
                r#"
                INSERT INTO articles (id, title, content, source_url, image_url, published_at, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (source_url) DO NOTHING
                "#,
            )
            .bind(article.id)
            .bind(&article.title)
            .bind(&article.content)
            .bind(&article.source_url)
            .bind(&article.image_url)
            .bind(article.published_at)
            .bind(article.created_at)
            .execute(&mut *tx)
            .await?;

            stored_count += result.rows_affected() as usize;
        }

        tx.commit().await?;

        info!("Committed {} new articles out of {} staged", stored_count, batch.len());
        Ok(stored_count)
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM articles")
            .fetch_one(&self.db)
            .await?;
        Ok(row.try_get("count")?)
    }

    /// Articles with `start <= created_at < end`.
    pub async fn count_created_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM articles WHERE created_at >= ? AND created_at < ?",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.db)
        .await?;
        Ok(row.try_get("count")?)
    }

    /// Articles ingested on the given local calendar day.
    pub async fn count_created_on(&self, day: NaiveDate) -> Result<i64> {
        let (start, end) = crate::utils::local_day_bounds(day);
        self.count_created_between(start, end).await
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<Article>> {
        let rows = sqlx::query("SELECT * FROM articles ORDER BY created_at DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(row_to_article).collect()
    }

    pub async fn list_all(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query("SELECT * FROM articles ORDER BY created_at DESC")
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(row_to_article).collect()
    }

    /// Every article grouped by local calendar day of ingestion.
    pub async fn list_grouped_by_day(&self) -> Result<Vec<DayGroup>> {
        let articles = self.list_all().await?;
        Ok(group_by_day(articles, &Local))
    }

    /// Articles ingested today, newest first.
    pub async fn list_today(&self) -> Result<Vec<Article>> {
        let (start, end) = crate::utils::local_day_bounds(Local::now().date_naive());
        let rows = sqlx::query(
            "SELECT * FROM articles WHERE created_at >= ? AND created_at < ? ORDER BY created_at DESC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(row_to_article).collect()
    }
}

fn row_to_article(row: &SqliteRow) -> Result<Article> {
    Ok(Article {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        source_url: row.try_get("source_url")?,
        image_url: row.try_get("image_url")?,
        published_at: row.try_get::<Option<DateTime<Utc>>, _>("published_at")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

/// Group articles by the calendar day of `created_at` in `tz`.
///
/// Days are returned most recent first; articles inside a day are ordered by
/// `created_at` descending.
pub fn group_by_day<Tz: TimeZone>(articles: Vec<Article>, tz: &Tz) -> Vec<DayGroup> {
    let mut days: BTreeMap<NaiveDate, Vec<Article>> = BTreeMap::new();

    for article in articles {
        let day = article.created_at.with_timezone(tz).date_naive();
        days.entry(day).or_default().push(article);
    }

    days.into_iter()
        .rev()
        .map(|(day, mut articles)| {
            articles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            DayGroup { day, articles }
        })
        .collect()
}
