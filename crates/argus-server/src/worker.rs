//! Classification worker pool.
//!
//! Workers drain the processing queue independently of the source timers:
//! claim the next pending entry, classify it, advance it. An empty queue
//! idles the worker for a short poll interval.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;

use argus_classify::ClassificationService;
use argus_core::AppConfig;

/// Spawn the configured number of queue workers.
pub fn spawn_workers(
    pool: PgPool,
    service: Arc<ClassificationService>,
    config: &AppConfig,
) -> Vec<JoinHandle<()>> {
    let poll_interval = Duration::from_secs(config.worker_poll_interval_secs);
    let backoff_base_secs = config.queue_retry_backoff_base_secs;

    (0..config.worker_count)
        .map(|worker| {
            let pool = pool.clone();
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                worker_loop(worker, pool, service, backoff_base_secs, poll_interval).await;
            })
        })
        .collect()
}

async fn worker_loop(
    worker: usize,
    pool: PgPool,
    service: Arc<ClassificationService>,
    backoff_base_secs: u64,
    poll_interval: Duration,
) {
    tracing::info!(worker, "classification worker started");
    loop {
        match argus_pipeline::process_next(&pool, &service, backoff_base_secs).await {
            Ok(Some(outcome)) => {
                tracing::debug!(
                    worker,
                    entry_id = outcome.entry_id,
                    disposition = ?outcome.disposition,
                    "worker processed entry"
                );
            }
            Ok(None) => tokio::time::sleep(poll_interval).await,
            Err(e) => {
                // Storage hiccups must not kill the worker; idle and retry.
                tracing::error!(worker, error = %e, "worker iteration failed");
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
}
