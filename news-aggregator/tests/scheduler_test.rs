mod common;

use chrono::{Local, Timelike};
use common::*;
use news_aggregator::config::ScheduleConfig;
use news_aggregator::{NewsAggregator, Scheduler, SkipReason};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

const FEED: &str = "https://feeds.example/politics";

fn entries(count: usize) -> Vec<news_aggregator::RawEntry> {
    (0..count)
        .map(|i| entry(&format!("Story {}", i), &format!("https://news.example/story/{}", i)))
        .collect()
}

async fn slow_aggregator(count: usize, delay: Duration) -> (tempfile::TempDir, Arc<NewsAggregator>, Arc<SlowExtractor>) {
    let (dir, _url, store) = temp_store().await;
    let config = test_config(vec![FEED.to_string()], 30);
    let reader = Arc::new(StaticFeedReader::new(vec![(FEED, entries(count))]));
    let extractor = Arc::new(SlowExtractor::new(delay));
    let aggregator = Arc::new(NewsAggregator::new(&config, reader, extractor.clone(), store));
    (dir, aggregator, extractor)
}

#[tokio::test]
async fn startup_run_only_happens_on_an_empty_day() {
    init_tracing();
    let (_dir, aggregator, _extractor) = slow_aggregator(3, Duration::from_millis(1)).await;
    let scheduler = Scheduler::new(aggregator.clone(), ScheduleConfig::default());

    let first = scheduler.run_startup_if_empty().await.unwrap();
    assert_eq!(first.map(|r| r.committed), Some(3));

    assert!(scheduler.run_startup_if_empty().await.unwrap().is_none());
    assert_eq!(aggregator.store().count().await.unwrap(), 3);
}

#[tokio::test]
async fn concurrent_runs_are_serialized() {
    init_tracing();
    let (_dir, aggregator, extractor) = slow_aggregator(4, Duration::from_millis(20)).await;

    let (a, b) = tokio::join!(aggregator.run(), aggregator.run());
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(extractor.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 4);
    assert_eq!(a.committed + b.committed, 4);
    assert_eq!(a.skipped_for(SkipReason::AlreadyStored) + b.skipped_for(SkipReason::AlreadyStored), 4);

    let articles = aggregator.store().list_all().await.unwrap();
    assert_eq!(articles.len(), 4);
}

#[tokio::test]
async fn try_run_declines_while_a_run_is_in_flight() {
    init_tracing();
    let (_dir, aggregator, _extractor) = slow_aggregator(3, Duration::from_millis(100)).await;

    let background = {
        let aggregator = aggregator.clone();
        tokio::spawn(async move { aggregator.run().await })
    };

    while !aggregator.is_running() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(aggregator.try_run().await.is_none());

    let report = background.await.unwrap().unwrap();
    assert_eq!(report.committed, 3);

    let again = aggregator.try_run().await.expect("idle aggregator runs");
    assert_eq!(again.unwrap().committed, 0);
}

#[tokio::test]
async fn manual_trigger_runs_the_aggregator() {
    init_tracing();
    let (_dir, aggregator, _extractor) = slow_aggregator(2, Duration::from_millis(1)).await;
    let scheduler = Scheduler::new(aggregator.clone(), ScheduleConfig::default());

    let report = scheduler.trigger().await.unwrap();
    assert_eq!(report.committed, 2);
    assert_eq!(report.processed, 2);
    assert_eq!(aggregator.store().count().await.unwrap(), 2);
}

#[tokio::test]
async fn start_and_stop_the_daily_job() {
    init_tracing();
    let (_dir, aggregator, extractor) = slow_aggregator(2, Duration::from_millis(1)).await;
    let far_hour = (Local::now().hour() + 12) % 24;
    let scheduler = Scheduler::new(aggregator, ScheduleConfig { hour: far_hour, minute: 0 });
    assert_eq!(scheduler.cron(), format!("0 0 {} * * *", far_hour));

    assert!(!scheduler.is_started().await);
    scheduler.start().await.unwrap();
    assert!(scheduler.is_started().await);

    // A second start keeps the existing scheduler.
    scheduler.start().await.unwrap();
    assert!(scheduler.is_started().await);

    tokio::time::timeout(Duration::from_secs(5), scheduler.stop())
        .await
        .expect("stop returns promptly");
    assert!(!scheduler.is_started().await);

    // The job is hours away and never fired.
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);

    // Restarting after a stop is allowed.
    scheduler.start().await.unwrap();
    assert!(scheduler.is_started().await);
    scheduler.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scheduled_job_fires_and_commits() {
    init_tracing();
    let (_dir, aggregator, _extractor) = slow_aggregator(3, Duration::from_millis(1)).await;
    let scheduler = Scheduler::with_cron(aggregator.clone(), "* * * * * *");

    scheduler.start().await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while aggregator.store().count().await.unwrap() < 3 {
        assert!(tokio::time::Instant::now() < deadline, "scheduled run never committed");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    scheduler.stop().await;
    assert_eq!(aggregator.store().count().await.unwrap(), 3);
}

#[tokio::test]
async fn invalid_cron_expression_fails_to_start() {
    init_tracing();
    let (_dir, aggregator, _extractor) = slow_aggregator(1, Duration::from_millis(1)).await;
    let scheduler = Scheduler::with_cron(aggregator, "not a schedule");

    assert!(scheduler.start().await.is_err());
    assert!(!scheduler.is_started().await);
}
