//! Bootstrap seeding from operator-curated YAML config.

use sqlx::PgPool;
use uuid::Uuid;

use argus_core::BootstrapFile;

use crate::DbError;

/// Upsert sources and PIRs from bootstrap config into the database.
///
/// Returns `(sources, pirs)` counts of rows processed. All upserts run
/// inside a single transaction; if any operation fails the entire batch is
/// rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_bootstrap(
    pool: &PgPool,
    bootstrap: &BootstrapFile,
) -> Result<(usize, usize), DbError> {
    let mut tx = pool.begin().await?;

    let mut source_count = 0usize;
    for source in &bootstrap.sources {
        sqlx::query(
            "INSERT INTO sources \
                 (public_id, name, slug, kind, url, refresh_interval_secs, active, \
                  priority_boost, target_pirs) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (slug) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 kind = EXCLUDED.kind, \
                 url = EXCLUDED.url, \
                 refresh_interval_secs = EXCLUDED.refresh_interval_secs, \
                 active = EXCLUDED.active, \
                 priority_boost = EXCLUDED.priority_boost, \
                 target_pirs = EXCLUDED.target_pirs, \
                 updated_at = NOW()",
        )
        .bind(Uuid::new_v4())
        .bind(&source.name)
        .bind(source.slug())
        .bind(source.kind.as_str())
        .bind(source.url.as_deref())
        .bind(source.refresh_interval_secs)
        .bind(source.active)
        .bind(source.priority_boost)
        .bind(&source.target_pirs)
        .execute(&mut *tx)
        .await?;
        source_count += 1;
    }

    let mut pir_count = 0usize;
    for pir in &bootstrap.pirs {
        sqlx::query(
            "INSERT INTO pirs \
                 (public_id, name, category_code, description, keywords, \
                  confidence_threshold, active, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (category_code) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 description = EXCLUDED.description, \
                 keywords = EXCLUDED.keywords, \
                 confidence_threshold = EXCLUDED.confidence_threshold, \
                 active = EXCLUDED.active, \
                 sort_order = EXCLUDED.sort_order, \
                 updated_at = NOW()",
        )
        .bind(Uuid::new_v4())
        .bind(&pir.name)
        .bind(&pir.category_code)
        .bind(&pir.description)
        .bind(&pir.keywords)
        .bind(pir.confidence_threshold)
        .bind(pir.active)
        .bind(pir.sort_order)
        .execute(&mut *tx)
        .await?;
        pir_count += 1;
    }

    tx.commit().await?;
    Ok((source_count, pir_count))
}
