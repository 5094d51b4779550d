//! Database operations for the `processing_queue` table.
//!
//! The queue is served by descending priority, then insertion order. Claims
//! use `FOR UPDATE SKIP LOCKED` so exactly one worker holds an entry in
//! `processing` at a time, across threads and across process instances.
//! Status updates against a row an operator has deleted mid-flight return
//! `None` rather than erroring.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use argus_core::Classification;

use crate::DbError;

/// A row from the `processing_queue` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueueEntryRow {
    pub id: i64,
    pub item_id: i64,
    pub status: String,
    pub priority: i32,
    pub attempts: i32,
    pub max_attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub error_message: Option<String>,
    pub relevant: Option<bool>,
    pub category: Option<String>,
    pub class_priority: Option<String>,
    pub confidence: Option<i32>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub quote: Option<String>,
    pub reasoning: Option<String>,
    pub tags: Vec<String>,
    pub decision: String,
    pub decided_by: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of recording a failed classification attempt.
#[derive(Debug, Clone, Copy)]
pub struct AttemptOutcome {
    pub attempts: i32,
    pub max_attempts: i32,
    /// `true` when the entry moved to the terminal `error` status.
    pub exhausted: bool,
}

/// Enqueue an item for classification.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure (including enqueueing the
/// same item twice — `item_id` is unique).
pub async fn enqueue(pool: &PgPool, item_id: i64, priority: i32) -> Result<QueueEntryRow, DbError> {
    let row = sqlx::query_as::<_, QueueEntryRow>(
        "INSERT INTO processing_queue (item_id, priority) VALUES ($1, $2) \
         RETURNING id, item_id, status, priority, attempts, max_attempts, next_attempt_at, \
                   error_message, relevant, category, class_priority, confidence, title, summary, \
                   quote, reasoning, tags, decision, decided_by, decided_at, published_at, \
                   created_at, updated_at",
    )
    .bind(item_id)
    .bind(priority)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Atomically claim the next pending entry, moving it to `processing`.
///
/// Serves descending priority, FIFO within equal priority, and skips
/// entries whose retry backoff (`next_attempt_at`) has not elapsed.
/// Returns `None` when the queue is empty.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn claim_next_pending(pool: &PgPool) -> Result<Option<QueueEntryRow>, DbError> {
    let row = sqlx::query_as::<_, QueueEntryRow>(
        "UPDATE processing_queue SET status = 'processing', updated_at = NOW() \
         WHERE id = ( \
             SELECT id FROM processing_queue \
             WHERE status = 'pending' AND next_attempt_at <= NOW() \
             ORDER BY priority DESC, created_at ASC, id ASC \
             LIMIT 1 \
             FOR UPDATE SKIP LOCKED \
         ) \
         RETURNING id, item_id, status, priority, attempts, max_attempts, next_attempt_at, \
                   error_message, relevant, category, class_priority, confidence, title, summary, \
                   quote, reasoning, tags, decision, decided_by, decided_at, published_at, \
                   created_at, updated_at",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Fetch a single queue entry, or `None` when it no longer exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn get_queue_entry(pool: &PgPool, id: i64) -> Result<Option<QueueEntryRow>, DbError> {
    Ok(sqlx::query_as::<_, QueueEntryRow>(
        "SELECT id, item_id, status, priority, attempts, max_attempts, next_attempt_at, \
                error_message, relevant, category, class_priority, confidence, title, summary, \
                quote, reasoning, tags, decision, decided_by, decided_at, published_at, \
                created_at, updated_at \
         FROM processing_queue WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?)
}

/// List queue entries in a given status, in serving order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_by_status(
    pool: &PgPool,
    status: &str,
    limit: i64,
) -> Result<Vec<QueueEntryRow>, DbError> {
    Ok(sqlx::query_as::<_, QueueEntryRow>(
        "SELECT id, item_id, status, priority, attempts, max_attempts, next_attempt_at, \
                error_message, relevant, category, class_priority, confidence, title, summary, \
                quote, reasoning, tags, decision, decided_by, decided_at, published_at, \
                created_at, updated_at \
         FROM processing_queue \
         WHERE status = $1 \
         ORDER BY priority DESC, created_at ASC, id ASC \
         LIMIT $2",
    )
    .bind(status)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

/// Store a classification result and advance the entry out of `processing`.
///
/// Relevant items move to `review`; irrelevant ones complete immediately —
/// an entry with `relevant = false` can never reach the review set.
///
/// Returns `None` when the entry no longer exists (deleted mid-flight).
///
/// # Errors
///
/// Returns [`DbError::InvalidQueueTransition`] when the entry exists but is
/// not in `processing`, [`DbError::Sqlx`] on query failure.
pub async fn record_classification(
    pool: &PgPool,
    id: i64,
    classification: &Classification,
) -> Result<Option<QueueEntryRow>, DbError> {
    let row = sqlx::query_as::<_, QueueEntryRow>(
        "UPDATE processing_queue SET \
             status = CASE WHEN $2 THEN 'review' ELSE 'completed' END, \
             relevant = $2, \
             category = $3, \
             class_priority = $4, \
             confidence = $5, \
             title = $6, \
             summary = $7, \
             quote = $8, \
             reasoning = $9, \
             tags = $10, \
             error_message = NULL, \
             updated_at = NOW() \
         WHERE id = $1 AND status = 'processing' \
         RETURNING id, item_id, status, priority, attempts, max_attempts, next_attempt_at, \
                   error_message, relevant, category, class_priority, confidence, title, summary, \
                   quote, reasoning, tags, decision, decided_by, decided_at, published_at, \
                   created_at, updated_at",
    )
    .bind(id)
    .bind(classification.relevant)
    .bind(&classification.category)
    .bind(classification.priority.as_str())
    .bind(i32::from(classification.confidence))
    .bind(&classification.title)
    .bind(&classification.summary)
    .bind(&classification.quote)
    .bind(&classification.reasoning)
    .bind(&classification.tags)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = row {
        return Ok(Some(row));
    }

    match get_queue_entry(pool, id).await? {
        None => Ok(None),
        Some(_) => Err(DbError::InvalidQueueTransition {
            id,
            expected: "processing",
        }),
    }
}

/// Record a failed classification attempt.
///
/// Increments the attempt counter and either returns the entry to `pending`
/// with a retry gate `delay_secs` in the future, or — once the counter
/// reaches `max_attempts` — moves it to the terminal `error` status for
/// operator attention. The error message is preserved either way.
///
/// Returns `None` when the entry no longer exists.
///
/// # Errors
///
/// Returns [`DbError::InvalidQueueTransition`] when the entry exists but is
/// not in `processing`, [`DbError::Sqlx`] on query failure.
pub async fn record_attempt_failure(
    pool: &PgPool,
    id: i64,
    error: &str,
    delay_secs: f64,
) -> Result<Option<AttemptOutcome>, DbError> {
    let row = sqlx::query_as::<_, (i32, i32, String)>(
        "UPDATE processing_queue SET \
             attempts = attempts + 1, \
             status = CASE WHEN attempts + 1 >= max_attempts THEN 'error' ELSE 'pending' END, \
             error_message = $2, \
             next_attempt_at = NOW() + make_interval(secs => $3), \
             updated_at = NOW() \
         WHERE id = $1 AND status = 'processing' \
         RETURNING attempts, max_attempts, status",
    )
    .bind(id)
    .bind(error)
    .bind(delay_secs)
    .fetch_optional(pool)
    .await?;

    if let Some((attempts, max_attempts, status)) = row {
        return Ok(Some(AttemptOutcome {
            attempts,
            max_attempts,
            exhausted: status == "error",
        }));
    }

    match get_queue_entry(pool, id).await? {
        None => Ok(None),
        Some(_) => Err(DbError::InvalidQueueTransition {
            id,
            expected: "processing",
        }),
    }
}

/// Delete a queue entry (operator cleanup). Returns `false` when it was
/// already gone.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn delete_queue_entry(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM processing_queue WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
