//! Source ingestion runs: fetch → parse → dedup → enqueue.

use sqlx::PgPool;

use argus_db::{insert_item_if_new, NewIngestedItem, SourceRow};
use argus_ingest::{parse_csv, parse_feed, CanonicalItem, FeedFetcher};

use crate::error::PipelineError;

/// Base queue priority for ingested items, before the source's boost.
pub const DEFAULT_PRIORITY: i32 = 5;

/// Queue priority for analyst-entered items.
pub const MANUAL_PRIORITY: i32 = 8;

/// Counts from one ingestion run.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct IngestOutcome {
    /// Items present in the fetched document or file.
    pub fetched: usize,
    /// Items that were new and got enqueued.
    pub new_items: usize,
    /// Dedup no-ops (already-ingested content).
    pub duplicates: usize,
    /// Items that failed to store; logged and skipped.
    pub errors: usize,
}

/// Result of a scheduled or manual fetch of one source, with bookkeeping
/// applied.
#[derive(Debug, Clone)]
pub enum FetchRun {
    Completed(IngestOutcome),
    /// The fetch or parse failed; carries the updated consecutive-failure
    /// count for backoff decisions.
    Failed {
        consecutive_failures: i32,
        error: String,
    },
    /// The source was inactive or not fetchable when the timer fired.
    Skipped,
}

/// Ingest one canonical item: dedup-insert, then enqueue when new.
///
/// Returns the new queue entry id, or `None` for a duplicate (logged at low
/// severity and treated as success).
///
/// # Errors
///
/// Returns [`PipelineError::Db`] on storage failure.
pub async fn ingest_canonical(
    pool: &PgPool,
    source: &SourceRow,
    item: &CanonicalItem,
    base_priority: i32,
) -> Result<Option<i64>, PipelineError> {
    let content_hash = item.content_hash();

    let inserted = insert_item_if_new(
        pool,
        &NewIngestedItem {
            source_id: source.id,
            title: &item.title,
            body: &item.body,
            summary: item.summary.as_deref(),
            link: item.link.as_deref(),
            guid: item.guid.as_deref(),
            author: item.author.as_deref(),
            published_at: item.published_at,
            categories: &item.categories,
            content_hash: &content_hash,
        },
    )
    .await?;

    let Some(item_id) = inserted else {
        tracing::debug!(
            source = %source.slug,
            title = %item.title,
            "skipping duplicate item"
        );
        return Ok(None);
    };

    let entry = argus_db::enqueue(pool, item_id, base_priority + source.priority_boost).await?;
    tracing::debug!(
        source = %source.slug,
        item_id,
        entry_id = entry.id,
        priority = entry.priority,
        "item enqueued for classification"
    );
    Ok(Some(entry.id))
}

/// Fetch and ingest one feed source. Items are processed in feed-document
/// order; a bad item is logged and skipped, never aborting the run.
///
/// Does not touch source bookkeeping — see [`run_source_fetch`].
///
/// # Errors
///
/// Returns [`PipelineError::Ingest`] when the fetch or parse fails, and
/// [`PipelineError::Db`] only for the final success bookkeeping; per-item
/// storage failures are counted in the outcome instead.
pub async fn ingest_source(
    pool: &PgPool,
    fetcher: &FeedFetcher,
    source: &SourceRow,
) -> Result<IngestOutcome, PipelineError> {
    let Some(url) = source.url.as_deref() else {
        tracing::warn!(source = %source.slug, "feed source has no URL; nothing to fetch");
        return Ok(IngestOutcome::default());
    };

    let raw = fetcher.fetch(url).await?;
    let mut doc = parse_feed(&raw)?;
    let items = std::mem::take(&mut doc.items);

    let mut outcome = IngestOutcome {
        fetched: items.len(),
        ..IngestOutcome::default()
    };

    for feed_item in items {
        let canonical = feed_item.into_canonical();
        match ingest_canonical(pool, source, &canonical, DEFAULT_PRIORITY).await {
            Ok(Some(_)) => outcome.new_items += 1,
            Ok(None) => outcome.duplicates += 1,
            Err(e) => {
                outcome.errors += 1;
                tracing::error!(
                    source = %source.slug,
                    title = %canonical.title,
                    error = %e,
                    "failed to store feed item; continuing"
                );
            }
        }
    }

    argus_db::record_fetch_success(
        pool,
        source.id,
        (!doc.title.is_empty()).then_some(doc.title.as_str()),
        (!doc.description.is_empty()).then_some(doc.description.as_str()),
    )
    .await?;

    tracing::info!(
        source = %source.slug,
        fetched = outcome.fetched,
        new = outcome.new_items,
        duplicates = outcome.duplicates,
        errors = outcome.errors,
        "feed ingestion complete"
    );
    Ok(outcome)
}

/// Load a source by id, fetch it, and apply fetch bookkeeping.
///
/// A failure increments the source's consecutive-failure counter and stores
/// the error message; the counter is returned so the scheduler can compute
/// its backoff. Inactive or vanished sources are skipped.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] only when the bookkeeping itself fails;
/// fetch and parse errors are folded into [`FetchRun::Failed`].
pub async fn run_source_fetch(
    pool: &PgPool,
    fetcher: &FeedFetcher,
    source_id: i64,
) -> Result<FetchRun, PipelineError> {
    let source = match argus_db::get_source(pool, source_id).await {
        Ok(source) => source,
        Err(argus_db::DbError::NotFound) => {
            tracing::warn!(source_id, "scheduled source no longer exists; skipping");
            return Ok(FetchRun::Skipped);
        }
        Err(e) => return Err(e.into()),
    };

    if !source.active {
        tracing::debug!(source = %source.slug, "source deactivated; skipping fetch");
        return Ok(FetchRun::Skipped);
    }

    match ingest_source(pool, fetcher, &source).await {
        Ok(outcome) => Ok(FetchRun::Completed(outcome)),
        Err(PipelineError::Db(e)) => Err(e.into()),
        Err(e) => {
            let message = e.to_string();
            let consecutive_failures =
                argus_db::record_fetch_failure(pool, source.id, &message).await?;
            tracing::warn!(
                source = %source.slug,
                consecutive_failures,
                error = %message,
                "source fetch failed"
            );
            Ok(FetchRun::Failed {
                consecutive_failures,
                error: message,
            })
        }
    }
}

/// Ingest a CSV upload against a source.
///
/// Malformed rows are already skipped by the parser; storage failures are
/// isolated per row.
///
/// # Errors
///
/// Returns [`PipelineError::Ingest`] when the file itself is unusable
/// (fewer than two lines).
pub async fn ingest_csv(
    pool: &PgPool,
    source: &SourceRow,
    text: &str,
    label: &str,
) -> Result<IngestOutcome, PipelineError> {
    let items = parse_csv(text, label)?;

    let mut outcome = IngestOutcome {
        fetched: items.len(),
        ..IngestOutcome::default()
    };

    for item in &items {
        match ingest_canonical(pool, source, item, DEFAULT_PRIORITY).await {
            Ok(Some(_)) => outcome.new_items += 1,
            Ok(None) => outcome.duplicates += 1,
            Err(e) => {
                outcome.errors += 1;
                tracing::error!(
                    source = %source.slug,
                    file = label,
                    error = %e,
                    "failed to store CSV row; continuing"
                );
            }
        }
    }

    tracing::info!(
        source = %source.slug,
        file = label,
        rows = outcome.fetched,
        new = outcome.new_items,
        duplicates = outcome.duplicates,
        "CSV ingestion complete"
    );
    Ok(outcome)
}

/// Ingest a single analyst-entered item at elevated priority.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] on storage failure.
pub async fn ingest_manual(
    pool: &PgPool,
    source: &SourceRow,
    item: &CanonicalItem,
) -> Result<Option<i64>, PipelineError> {
    ingest_canonical(pool, source, item, MANUAL_PRIORITY).await
}
