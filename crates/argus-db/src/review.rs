//! Database operations for the review workflow and the published feed.
//!
//! Review state lives on the queue row: `status = 'review'` with
//! `decision = 'undecided'` is the pending-review set. Approval keeps the
//! row in `review` until publication succeeds, so a failed publish is
//! retryable without reverting the analyst's decision. Rejection completes
//! the row immediately.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use argus_core::Decision;

use crate::queue::{get_queue_entry, QueueEntryRow};
use crate::DbError;

/// A pending-review entry joined with its item and source.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewItemRow {
    pub id: i64,
    pub item_id: i64,
    pub priority: i32,
    pub category: Option<String>,
    pub class_priority: Option<String>,
    pub confidence: Option<i32>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub quote: Option<String>,
    pub reasoning: Option<String>,
    pub tags: Vec<String>,
    pub decision: String,
    pub created_at: DateTime<Utc>,
    pub item_title: String,
    pub body: String,
    pub link: Option<String>,
    pub source_name: String,
}

/// Analyst edits applied with a decision; each set field overrides the
/// AI-provided value wholesale.
#[derive(Debug, Clone, Default)]
pub struct ReviewEdits {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub quote: Option<String>,
    pub category: Option<String>,
    pub class_priority: Option<String>,
    pub confidence: Option<i32>,
}

/// A row from the `intel_items` table (the published intelligence feed).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IntelItemRow {
    pub id: i64,
    pub public_id: Uuid,
    pub queue_id: i64,
    pub source_name: String,
    pub title: String,
    pub summary: Option<String>,
    pub quote: Option<String>,
    pub category: String,
    pub priority: String,
    pub confidence: i32,
    pub reasoning: Option<String>,
    pub link: Option<String>,
    pub tags: Vec<String>,
    pub published_at: DateTime<Utc>,
}

/// List entries awaiting an analyst decision, in serving order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_pending_review(pool: &PgPool) -> Result<Vec<ReviewItemRow>, DbError> {
    Ok(sqlx::query_as::<_, ReviewItemRow>(
        "SELECT q.id, q.item_id, q.priority, q.category, q.class_priority, q.confidence, \
                q.title, q.summary, q.quote, q.reasoning, q.tags, q.decision, q.created_at, \
                i.title AS item_title, i.body, i.link, s.name AS source_name \
         FROM processing_queue q \
         JOIN ingested_items i ON i.id = q.item_id \
         JOIN sources s ON s.id = i.source_id \
         WHERE q.status = 'review' AND q.decision = 'undecided' \
         ORDER BY q.priority DESC, q.created_at ASC, q.id ASC",
    )
    .fetch_all(pool)
    .await?)
}

/// Record an analyst decision on a pending-review entry.
///
/// Legal only while the entry is in `review` with no prior decision.
/// Rejection completes the entry; approval leaves it in `review` for the
/// publish step. Edits override stored classification fields per field.
///
/// Returns `None` when the entry no longer exists.
///
/// # Errors
///
/// Returns [`DbError::InvalidQueueTransition`] when the entry exists but is
/// not awaiting a decision (or `decision` is `Undecided`), [`DbError::Sqlx`]
/// on query failure.
pub async fn record_decision(
    pool: &PgPool,
    id: i64,
    decision: Decision,
    decided_by: &str,
    edits: &ReviewEdits,
) -> Result<Option<QueueEntryRow>, DbError> {
    if decision == Decision::Undecided {
        return Err(DbError::InvalidQueueTransition {
            id,
            expected: "approved or rejected",
        });
    }

    let row = sqlx::query_as::<_, QueueEntryRow>(
        "UPDATE processing_queue SET \
             decision = $2, \
             decided_by = $3, \
             decided_at = NOW(), \
             status = CASE WHEN $2 = 'rejected' THEN 'completed' ELSE status END, \
             title = COALESCE($4, title), \
             summary = COALESCE($5, summary), \
             quote = COALESCE($6, quote), \
             category = COALESCE($7, category), \
             class_priority = COALESCE($8, class_priority), \
             confidence = COALESCE($9, confidence), \
             updated_at = NOW() \
         WHERE id = $1 AND status = 'review' AND decision = 'undecided' \
         RETURNING id, item_id, status, priority, attempts, max_attempts, next_attempt_at, \
                   error_message, relevant, category, class_priority, confidence, title, summary, \
                   quote, reasoning, tags, decision, decided_by, decided_at, published_at, \
                   created_at, updated_at",
    )
    .bind(id)
    .bind(decision.as_str())
    .bind(decided_by)
    .bind(edits.title.as_deref())
    .bind(edits.summary.as_deref())
    .bind(edits.quote.as_deref())
    .bind(edits.category.as_deref())
    .bind(edits.class_priority.as_deref())
    .bind(edits.confidence)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = row {
        return Ok(Some(row));
    }

    match get_queue_entry(pool, id).await? {
        None => Ok(None),
        Some(_) => Err(DbError::InvalidQueueTransition {
            id,
            expected: "review/undecided",
        }),
    }
}

/// List approved entries still awaiting publication.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_approved_unpublished(pool: &PgPool) -> Result<Vec<QueueEntryRow>, DbError> {
    Ok(sqlx::query_as::<_, QueueEntryRow>(
        "SELECT id, item_id, status, priority, attempts, max_attempts, next_attempt_at, \
                error_message, relevant, category, class_priority, confidence, title, summary, \
                quote, reasoning, tags, decision, decided_by, decided_at, published_at, \
                created_at, updated_at \
         FROM processing_queue \
         WHERE status = 'review' AND decision = 'approved' AND published_at IS NULL \
         ORDER BY decided_at ASC, id ASC",
    )
    .fetch_all(pool)
    .await?)
}

#[derive(Debug, sqlx::FromRow)]
struct PublishSource {
    category: Option<String>,
    class_priority: Option<String>,
    confidence: Option<i32>,
    title: Option<String>,
    summary: Option<String>,
    quote: Option<String>,
    reasoning: Option<String>,
    tags: Vec<String>,
    item_title: String,
    link: Option<String>,
    source_name: String,
}

/// Publish one approved entry into the intelligence feed.
///
/// Inserts the `intel_items` row and completes the queue entry inside a
/// single transaction; if anything fails, the entry stays approved and the
/// publish is retryable.
///
/// Returns the new intel item id, or `None` when the entry no longer
/// exists.
///
/// # Errors
///
/// Returns [`DbError::InvalidQueueTransition`] when the entry exists but is
/// not approved-and-unpublished, [`DbError::Sqlx`] on query failure.
pub async fn publish_entry(pool: &PgPool, id: i64) -> Result<Option<i64>, DbError> {
    let mut tx = pool.begin().await?;

    let source = sqlx::query_as::<_, PublishSource>(
        "SELECT q.category, q.class_priority, q.confidence, q.title, q.summary, q.quote, \
                q.reasoning, q.tags, i.title AS item_title, i.link, s.name AS source_name \
         FROM processing_queue q \
         JOIN ingested_items i ON i.id = q.item_id \
         JOIN sources s ON s.id = i.source_id \
         WHERE q.id = $1 AND q.status = 'review' AND q.decision = 'approved' \
           AND q.published_at IS NULL \
         FOR UPDATE OF q",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(source) = source else {
        tx.rollback().await?;
        return match get_queue_entry(pool, id).await? {
            None => Ok(None),
            Some(_) => Err(DbError::InvalidQueueTransition {
                id,
                expected: "review/approved/unpublished",
            }),
        };
    };

    let intel_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO intel_items \
             (public_id, queue_id, source_name, title, summary, quote, category, priority, \
              confidence, reasoning, link, tags) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(id)
    .bind(&source.source_name)
    .bind(source.title.as_deref().unwrap_or(&source.item_title))
    .bind(source.summary.as_deref())
    .bind(source.quote.as_deref())
    .bind(source.category.as_deref().unwrap_or("none"))
    .bind(source.class_priority.as_deref().unwrap_or("medium"))
    .bind(source.confidence.unwrap_or(0))
    .bind(source.reasoning.as_deref())
    .bind(source.link.as_deref())
    .bind(&source.tags)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE processing_queue SET status = 'completed', published_at = NOW(), \
             updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(intel_id))
}

/// List published intelligence items, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_intel_items(pool: &PgPool, limit: i64) -> Result<Vec<IntelItemRow>, DbError> {
    Ok(sqlx::query_as::<_, IntelItemRow>(
        "SELECT id, public_id, queue_id, source_name, title, summary, quote, category, \
                priority, confidence, reasoning, link, tags, published_at \
         FROM intel_items \
         ORDER BY published_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?)
}
