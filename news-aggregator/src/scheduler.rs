use crate::aggregator::{NewsAggregator, RunReport};
use crate::config::ScheduleConfig;
use crate::types::{AggregatorError, Result};
use chrono::Local;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// Drives the aggregator: once at startup when today has no articles, then
/// on a cron schedule in local time. Manual triggers share the aggregator's
/// run lock with the scheduled job.
pub struct Scheduler {
    aggregator: Arc<NewsAggregator>,
    cron: String,
    jobs: Mutex<Option<JobScheduler>>,
}

impl Scheduler {
    /// Daily run at `schedule.hour:schedule.minute` local time.
    pub fn new(aggregator: Arc<NewsAggregator>, schedule: ScheduleConfig) -> Self {
        Self::with_cron(aggregator, schedule.cron_expression())
    }

    /// Run on an arbitrary six-field cron expression (`sec min hour dom mon dow`).
    pub fn with_cron(aggregator: Arc<NewsAggregator>, cron: impl Into<String>) -> Self {
        Self {
            aggregator,
            cron: cron.into(),
            jobs: Mutex::new(None),
        }
    }

    pub fn aggregator(&self) -> &Arc<NewsAggregator> {
        &self.aggregator
    }

    pub fn cron(&self) -> &str {
        &self.cron
    }

    /// Run the aggregator if nothing has been ingested today yet.
    ///
    /// Returns the report when a run happened.
    pub async fn run_startup_if_empty(&self) -> Result<Option<RunReport>> {
        let today = Local::now().date_naive();
        let existing = self.aggregator.store().count_created_on(today).await?;
        if existing > 0 {
            info!("{} articles already ingested for {}, skipping startup run", existing, today);
            return Ok(None);
        }

        info!("No articles for {}, running startup ingestion", today);
        self.aggregator.run().await.map(Some)
    }

    /// Manual trigger; waits behind any run already in flight.
    pub async fn trigger(&self) -> Result<RunReport> {
        info!("Manual ingestion triggered");
        self.aggregator.run().await
    }

    /// Register the scheduled job and start ticking. Calling `start` twice
    /// keeps the first scheduler.
    pub async fn start(&self) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        if jobs.is_some() {
            warn!("Scheduler already started");
            return Ok(());
        }

        let aggregator = self.aggregator.clone();
        let job = Job::new_async_tz(self.cron.as_str(), Local, move |_uuid, _lock| {
            let aggregator = aggregator.clone();
            Box::pin(async move {
                match aggregator.run().await {
                    Ok(report) => info!("Scheduled ingestion added {} articles", report.committed),
                    Err(e) => error!("Scheduled ingestion failed: {}", e),
                }
            })
        })
        .map_err(|e| AggregatorError::Config(format!("invalid cron expression {:?}: {:?}", self.cron, e)))?;

        let sched = JobScheduler::new().await.map_err(scheduler_error)?;
        sched.add(job).await.map_err(scheduler_error)?;
        sched.start().await.map_err(scheduler_error)?;
        *jobs = Some(sched);

        info!("Scheduler started with cron {:?} (local time)", self.cron);
        Ok(())
    }

    /// Stop the scheduler, letting an in-flight run finish first.
    pub async fn stop(&self) {
        let sched = self.jobs.lock().await.take();
        if let Some(mut sched) = sched {
            if let Err(e) = sched.shutdown().await {
                error!("Scheduler shutdown failed: {:?}", e);
            }
            self.aggregator.wait_idle().await;
            info!("Scheduler stopped");
        }
    }

    pub async fn is_started(&self) -> bool {
        self.jobs.lock().await.is_some()
    }
}

fn scheduler_error(e: tokio_cron_scheduler::JobSchedulerError) -> AggregatorError {
    AggregatorError::Scheduler(format!("{:?}", e))
}
