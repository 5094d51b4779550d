//! Per-source fetch scheduling.
//!
//! Each active feed source owns exactly one timer task: it sleeps for the
//! source's refresh interval, runs the fetch→parse→dedup→enqueue pipeline,
//! and reschedules itself — at the normal interval on success, or with
//! exponential backoff on consecutive failures. Activating or manually
//! refreshing a source replaces its timer (never duplicates it), and
//! deactivation cancels it without retracting already-enqueued items.
//!
//! A recurring reconcile job keeps the in-memory timer map aligned with
//! database state, picking up sources created or toggled by other
//! processes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use argus_ingest::FeedFetcher;
use argus_pipeline::FetchRun;

/// Floor for the failure backoff, in seconds.
const FAILURE_BACKOFF_BASE_SECS: u64 = 300;
/// Ceiling for the failure backoff, in seconds.
const FAILURE_BACKOFF_MAX_SECS: u64 = 3600;
/// Delay before the first fetch of a newly scheduled source.
const IMMEDIATE_DELAY: Duration = Duration::from_secs(1);

/// Backoff after `consecutive_failures` failed fetches:
/// `min(300 * 2^failures, 3600)` seconds.
fn failure_backoff_secs(consecutive_failures: i32) -> u64 {
    let shift = u32::try_from(consecutive_failures).unwrap_or(0).min(10);
    FAILURE_BACKOFF_BASE_SECS
        .saturating_mul(1u64 << shift)
        .min(FAILURE_BACKOFF_MAX_SECS)
}

struct SchedulerInner {
    pool: PgPool,
    fetcher: Arc<FeedFetcher>,
    timers: Mutex<HashMap<i64, JoinHandle<()>>>,
}

/// Owns the per-source timers.
pub struct FeedScheduler {
    inner: Arc<SchedulerInner>,
}

impl FeedScheduler {
    #[must_use]
    pub fn new(pool: PgPool, fetcher: Arc<FeedFetcher>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                pool,
                fetcher,
                timers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Load active feed sources and schedule each at its refresh interval.
    ///
    /// # Errors
    ///
    /// Returns [`argus_db::DbError`] if the source list cannot be loaded.
    pub async fn start(&self) -> Result<(), argus_db::DbError> {
        let sources = argus_db::list_active_feed_sources(&self.inner.pool).await?;
        tracing::info!(count = sources.len(), "scheduler: scheduling active feed sources");

        for source in sources {
            let interval = interval_of(source.refresh_interval_secs);
            self.schedule(source.id, interval).await;
        }
        Ok(())
    }

    /// Replace the source's timer with one firing after `delay`.
    ///
    /// There is never more than one outstanding timer per source: an
    /// existing timer is aborted before the new one is stored.
    pub async fn schedule(&self, source_id: i64, delay: Duration) {
        let handle = spawn_timer(Arc::clone(&self.inner), source_id, delay);
        let mut timers = self.inner.timers.lock().await;
        if let Some(previous) = timers.insert(source_id, handle) {
            previous.abort();
        }
        tracing::debug!(source_id, delay_secs = delay.as_secs(), "scheduler: timer set");
    }

    /// Reschedule the source to fetch immediately (manual refresh or
    /// activation).
    pub async fn refresh_now(&self, source_id: i64) {
        self.schedule(source_id, IMMEDIATE_DELAY).await;
    }

    /// Cancel the source's pending timer. Already-enqueued queue entries
    /// are untouched.
    pub async fn cancel(&self, source_id: i64) {
        let mut timers = self.inner.timers.lock().await;
        if let Some(handle) = timers.remove(&source_id) {
            handle.abort();
            tracing::info!(source_id, "scheduler: timer cancelled");
        }
    }

    /// Align the timer map with database state: schedule active sources
    /// that lost their timer, drop timers for deactivated or deleted
    /// sources.
    pub async fn reconcile(&self) {
        let sources = match argus_db::list_active_feed_sources(&self.inner.pool).await {
            Ok(sources) => sources,
            Err(e) => {
                tracing::error!(error = %e, "scheduler: reconcile failed to list sources");
                return;
            }
        };

        let active_ids: std::collections::HashSet<i64> = sources.iter().map(|s| s.id).collect();

        let mut to_schedule = Vec::new();
        {
            let mut timers = self.inner.timers.lock().await;
            timers.retain(|source_id, handle| {
                if active_ids.contains(source_id) && !handle.is_finished() {
                    true
                } else {
                    handle.abort();
                    false
                }
            });

            for source in &sources {
                if !timers.contains_key(&source.id) {
                    to_schedule.push((source.id, interval_of(source.refresh_interval_secs)));
                }
            }
        }

        for (source_id, interval) in to_schedule {
            tracing::info!(source_id, "scheduler: reconcile scheduling source");
            self.schedule(source_id, interval).await;
        }
    }
}

fn interval_of(refresh_interval_secs: i64) -> Duration {
    Duration::from_secs(u64::try_from(refresh_interval_secs).unwrap_or(3600))
}

/// One timer task: sleep, fetch, decide the next delay, repeat. Ends when
/// the source is deactivated or deleted; reconcile cleans up the map entry.
fn spawn_timer(inner: Arc<SchedulerInner>, source_id: i64, initial_delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut delay = initial_delay;
        loop {
            tokio::time::sleep(delay).await;

            match argus_pipeline::run_source_fetch(&inner.pool, &inner.fetcher, source_id).await {
                Ok(FetchRun::Completed(outcome)) => {
                    tracing::debug!(
                        source_id,
                        new = outcome.new_items,
                        duplicates = outcome.duplicates,
                        "scheduler: fetch complete"
                    );
                    match argus_db::get_source(&inner.pool, source_id).await {
                        Ok(source) if source.active => {
                            delay = interval_of(source.refresh_interval_secs);
                        }
                        _ => break,
                    }
                }
                Ok(FetchRun::Failed {
                    consecutive_failures,
                    ..
                }) => {
                    let backoff = failure_backoff_secs(consecutive_failures);
                    tracing::warn!(
                        source_id,
                        consecutive_failures,
                        retry_in_secs = backoff,
                        "scheduler: fetch failed; backing off"
                    );
                    delay = Duration::from_secs(backoff);
                }
                Ok(FetchRun::Skipped) => break,
                Err(e) => {
                    tracing::error!(source_id, error = %e, "scheduler: fetch run errored");
                    delay = Duration::from_secs(FAILURE_BACKOFF_BASE_SECS);
                }
            }
        }
    })
}

/// Builds and starts the background job scheduler.
///
/// Registers the recurring schedule-reconcile job and starts the
/// scheduler. Returns the running [`JobScheduler`] handle, which must be
/// kept alive for the lifetime of the process — dropping it shuts down all
/// jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    feed_scheduler: Arc<FeedScheduler>,
    reconcile_cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(reconcile_cron, move |_uuid, _lock| {
        let feed_scheduler = Arc::clone(&feed_scheduler);
        Box::pin(async move {
            tracing::debug!("scheduler: starting reconcile run");
            feed_scheduler.reconcile().await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = reconcile_cron, "scheduler: registered reconcile job");

    scheduler.start().await?;
    Ok(scheduler)
}
