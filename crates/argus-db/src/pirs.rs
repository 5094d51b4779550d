//! Database operations for the `pirs` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use argus_core::Pir;

use crate::DbError;

/// A row from the `pirs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PirRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub category_code: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub confidence_threshold: i32,
    pub active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PirRow {
    /// Project into the domain type consumed by classification.
    #[must_use]
    pub fn to_pir(&self) -> Pir {
        Pir {
            name: self.name.clone(),
            category_code: self.category_code.clone(),
            description: self.description.clone(),
            keywords: self.keywords.clone(),
            confidence_threshold: self.confidence_threshold,
        }
    }
}

/// List active PIRs in display order.
///
/// An empty result is normal and must not fail the pipeline — callers
/// degrade to the built-in default set.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn get_active_pirs(pool: &PgPool) -> Result<Vec<PirRow>, DbError> {
    Ok(sqlx::query_as::<_, PirRow>(
        "SELECT id, public_id, name, category_code, description, keywords, \
                confidence_threshold, active, sort_order, created_at, updated_at \
         FROM pirs \
         WHERE active = TRUE \
         ORDER BY sort_order, name",
    )
    .fetch_all(pool)
    .await?)
}
