//! Database operations for the `ingested_items` table.
//!
//! Dedup lives here: the table carries unique keys on `content_hash` and on
//! `(source_id, guid)`, and inserts go through `ON CONFLICT DO NOTHING`.
//! Concurrent fetchers that race on the same new item cannot produce two
//! rows — the loser's insert is a no-op, not an error.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `ingested_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IngestedItemRow {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    pub body: String,
    pub summary: Option<String>,
    pub link: Option<String>,
    pub guid: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

pub struct NewIngestedItem<'a> {
    pub source_id: i64,
    pub title: &'a str,
    pub body: &'a str,
    pub summary: Option<&'a str>,
    pub link: Option<&'a str>,
    pub guid: Option<&'a str>,
    pub author: Option<&'a str>,
    pub published_at: Option<DateTime<Utc>>,
    pub categories: &'a [String],
    pub content_hash: &'a str,
}

/// Insert an item unless either dedup key already exists.
///
/// Returns `Some(id)` for a new row, `None` when the content hash or the
/// `(source, guid)` pair has been seen before — the duplicate signal is a
/// no-op, never an error the caller must avoid.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn insert_item_if_new(
    pool: &PgPool,
    item: &NewIngestedItem<'_>,
) -> Result<Option<i64>, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO ingested_items \
             (source_id, title, body, summary, link, guid, author, published_at, categories, content_hash) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT DO NOTHING \
         RETURNING id",
    )
    .bind(item.source_id)
    .bind(item.title)
    .bind(item.body)
    .bind(item.summary)
    .bind(item.link)
    .bind(item.guid)
    .bind(item.author)
    .bind(item.published_at)
    .bind(item.categories)
    .bind(item.content_hash)
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

/// Look up an item by its content hash.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn find_by_content_hash(
    pool: &PgPool,
    content_hash: &str,
) -> Result<Option<IngestedItemRow>, DbError> {
    Ok(sqlx::query_as::<_, IngestedItemRow>(
        "SELECT id, source_id, title, body, summary, link, guid, author, published_at, \
                categories, content_hash, created_at \
         FROM ingested_items WHERE content_hash = $1",
    )
    .bind(content_hash)
    .fetch_optional(pool)
    .await?)
}

/// Look up an item by its feed-native identifier within one source.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn find_by_native_id(
    pool: &PgPool,
    source_id: i64,
    guid: &str,
) -> Result<Option<IngestedItemRow>, DbError> {
    Ok(sqlx::query_as::<_, IngestedItemRow>(
        "SELECT id, source_id, title, body, summary, link, guid, author, published_at, \
                categories, content_hash, created_at \
         FROM ingested_items WHERE source_id = $1 AND guid = $2",
    )
    .bind(source_id)
    .bind(guid)
    .fetch_optional(pool)
    .await?)
}

/// Fetch a single item by internal id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, [`DbError::Sqlx`] on
/// query failure.
pub async fn get_item(pool: &PgPool, id: i64) -> Result<IngestedItemRow, DbError> {
    sqlx::query_as::<_, IngestedItemRow>(
        "SELECT id, source_id, title, body, summary, link, guid, author, published_at, \
                categories, content_hash, created_at \
         FROM ingested_items WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
