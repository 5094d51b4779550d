//! Database operations for the `sources` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `sources` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourceRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub slug: String,
    pub kind: String,
    pub url: Option<String>,
    pub refresh_interval_secs: i64,
    pub active: bool,
    pub priority_boost: i32,
    pub target_pirs: Vec<String>,
    pub consecutive_failures: i32,
    pub feed_title: Option<String>,
    pub feed_description: Option<String>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewSource<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub kind: &'a str,
    pub url: Option<&'a str>,
    pub refresh_interval_secs: i64,
    pub active: bool,
    pub priority_boost: i32,
    pub target_pirs: &'a [String],
}

/// Insert a new source and return the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a duplicate slug).
pub async fn create_source(pool: &PgPool, source: &NewSource<'_>) -> Result<SourceRow, DbError> {
    let row = sqlx::query_as::<_, SourceRow>(
        "INSERT INTO sources \
             (public_id, name, slug, kind, url, refresh_interval_secs, active, priority_boost, target_pirs) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING id, public_id, name, slug, kind, url, refresh_interval_secs, active, \
                   priority_boost, target_pirs, consecutive_failures, feed_title, feed_description, \
                   last_fetched_at, last_success_at, last_error, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(source.name)
    .bind(source.slug)
    .bind(source.kind)
    .bind(source.url)
    .bind(source.refresh_interval_secs)
    .bind(source.active)
    .bind(source.priority_boost)
    .bind(source.target_pirs)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch a single source by internal id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, [`DbError::Sqlx`] on
/// query failure.
pub async fn get_source(pool: &PgPool, id: i64) -> Result<SourceRow, DbError> {
    sqlx::query_as::<_, SourceRow>(
        "SELECT id, public_id, name, slug, kind, url, refresh_interval_secs, active, \
                priority_boost, target_pirs, consecutive_failures, feed_title, feed_description, \
                last_fetched_at, last_success_at, last_error, created_at, updated_at \
         FROM sources WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Fetch a single source by slug.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, [`DbError::Sqlx`] on
/// query failure.
pub async fn get_source_by_slug(pool: &PgPool, slug: &str) -> Result<SourceRow, DbError> {
    sqlx::query_as::<_, SourceRow>(
        "SELECT id, public_id, name, slug, kind, url, refresh_interval_secs, active, \
                priority_boost, target_pirs, consecutive_failures, feed_title, feed_description, \
                last_fetched_at, last_success_at, last_error, created_at, updated_at \
         FROM sources WHERE slug = $1",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// List all sources, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_sources(pool: &PgPool) -> Result<Vec<SourceRow>, DbError> {
    Ok(sqlx::query_as::<_, SourceRow>(
        "SELECT id, public_id, name, slug, kind, url, refresh_interval_secs, active, \
                priority_boost, target_pirs, consecutive_failures, feed_title, feed_description, \
                last_fetched_at, last_success_at, last_error, created_at, updated_at \
         FROM sources ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await?)
}

/// List active feed sources eligible for scheduled fetching.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_active_feed_sources(pool: &PgPool) -> Result<Vec<SourceRow>, DbError> {
    Ok(sqlx::query_as::<_, SourceRow>(
        "SELECT id, public_id, name, slug, kind, url, refresh_interval_secs, active, \
                priority_boost, target_pirs, consecutive_failures, feed_title, feed_description, \
                last_fetched_at, last_success_at, last_error, created_at, updated_at \
         FROM sources \
         WHERE active = TRUE AND kind = 'rss' AND url IS NOT NULL \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?)
}

/// Flip a source's active flag. Sources are soft-deactivated, never deleted.
///
/// Returns the updated row, or `None` when the source no longer exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn set_source_active(
    pool: &PgPool,
    id: i64,
    active: bool,
) -> Result<Option<SourceRow>, DbError> {
    let row = sqlx::query_as::<_, SourceRow>(
        "UPDATE sources SET active = $1, updated_at = NOW() WHERE id = $2 \
         RETURNING id, public_id, name, slug, kind, url, refresh_interval_secs, active, \
                   priority_boost, target_pirs, consecutive_failures, feed_title, feed_description, \
                   last_fetched_at, last_success_at, last_error, created_at, updated_at",
    )
    .bind(active)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Record a successful fetch: reset the failure counter, stamp
/// `last_success_at`, clear the last error, and store feed metadata.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn record_fetch_success(
    pool: &PgPool,
    id: i64,
    feed_title: Option<&str>,
    feed_description: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE sources SET \
             consecutive_failures = 0, \
             last_fetched_at = NOW(), \
             last_success_at = NOW(), \
             last_error = NULL, \
             feed_title = COALESCE($1, feed_title), \
             feed_description = COALESCE($2, feed_description), \
             updated_at = NOW() \
         WHERE id = $3",
    )
    .bind(feed_title)
    .bind(feed_description)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a failed fetch: increment the failure counter and store the error.
///
/// Returns the new consecutive-failure count so the scheduler can compute
/// its backoff.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] when the source no longer exists,
/// [`DbError::Sqlx`] on query failure.
pub async fn record_fetch_failure(pool: &PgPool, id: i64, error: &str) -> Result<i32, DbError> {
    sqlx::query_scalar::<_, i32>(
        "UPDATE sources SET \
             consecutive_failures = consecutive_failures + 1, \
             last_fetched_at = NOW(), \
             last_error = $1, \
             updated_at = NOW() \
         WHERE id = $2 \
         RETURNING consecutive_failures",
    )
    .bind(error)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
