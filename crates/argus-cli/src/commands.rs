//! CLI command implementations.

use std::path::Path;

use sqlx::PgPool;

use argus_core::{AppConfig, Decision};
use argus_db::{NewSource, ReviewEdits};
use argus_ingest::CanonicalItem;
use argus_pipeline::FetchRun;

/// Seed sources and PIRs from the bootstrap file.
pub async fn seed(pool: &PgPool, path: &Path) -> anyhow::Result<()> {
    let bootstrap = argus_core::load_bootstrap(path)?;
    let (sources, pirs) = argus_db::seed_bootstrap(pool, &bootstrap).await?;
    println!("seeded {sources} sources and {pirs} PIRs from {}", path.display());
    Ok(())
}

/// Ingest a CSV file against an upload source, creating the source on
/// first use.
pub async fn ingest_csv(pool: &PgPool, file: &Path, source_slug: &str) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)?;
    let label = file
        .file_name()
        .map_or_else(|| file.display().to_string(), |n| n.to_string_lossy().into_owned());

    let source = upload_source(pool, source_slug, "csv").await?;
    let outcome = argus_pipeline::ingest_csv(pool, &source, &text, &label).await?;
    println!(
        "{label}: {} rows, {} enqueued, {} duplicates, {} errors",
        outcome.fetched, outcome.new_items, outcome.duplicates, outcome.errors
    );
    Ok(())
}

/// Add a single analyst-entered item at elevated priority.
pub async fn add_manual(
    pool: &PgPool,
    title: &str,
    body: &str,
    link: Option<&str>,
) -> anyhow::Result<()> {
    let source = upload_source(pool, "manual-entry", "manual").await?;
    let item = CanonicalItem {
        title: title.to_string(),
        body: body.to_string(),
        summary: None,
        link: link.map(ToString::to_string),
        guid: None,
        author: None,
        published_at: None,
        categories: Vec::new(),
    };

    match argus_pipeline::ingest_manual(pool, &source, &item).await? {
        Some(entry_id) => println!("enqueued as entry {entry_id}"),
        None => println!("duplicate of an already-ingested item; nothing enqueued"),
    }
    Ok(())
}

/// Fetch one source by slug, or every active feed source.
pub async fn refresh(
    pool: &PgPool,
    config: &AppConfig,
    source_slug: Option<&str>,
) -> anyhow::Result<()> {
    let fetcher = argus_ingest::FeedFetcher::from_config(config)?;

    let sources = match source_slug {
        Some(slug) => vec![argus_db::get_source_by_slug(pool, slug).await?],
        None => argus_db::list_active_feed_sources(pool).await?,
    };

    if sources.is_empty() {
        println!("no active feed sources configured");
        return Ok(());
    }

    for source in sources {
        match argus_pipeline::run_source_fetch(pool, &fetcher, source.id).await {
            Ok(FetchRun::Completed(outcome)) => println!(
                "{}: {} items, {} enqueued, {} duplicates",
                source.slug, outcome.fetched, outcome.new_items, outcome.duplicates
            ),
            Ok(FetchRun::Failed {
                consecutive_failures,
                error,
            }) => println!(
                "{}: fetch failed ({consecutive_failures} consecutive): {error}",
                source.slug
            ),
            Ok(FetchRun::Skipped) => println!("{}: skipped (inactive)", source.slug),
            Err(e) => println!("{}: error: {e}", source.slug),
        }
    }
    Ok(())
}

/// Drain pending queue entries through the classification service.
pub async fn process(pool: &PgPool, config: &AppConfig, limit: usize) -> anyhow::Result<()> {
    let service = argus_classify::ClassificationService::from_config(config)?;
    if service.is_degraded() {
        println!("note: no AI credential configured; using keyword fallback");
    }

    let summary = argus_pipeline::drain_queue(
        pool,
        &service,
        config.queue_retry_backoff_base_secs,
        limit,
    )
    .await?;
    println!(
        "processed {}: {} to review, {} filtered, {} retrying, {} exhausted",
        summary.processed, summary.review, summary.filtered, summary.retrying, summary.exhausted
    );
    Ok(())
}

/// Print queue entries in a given status.
pub async fn list_queue(pool: &PgPool, status: &str) -> anyhow::Result<()> {
    status.parse::<argus_core::QueueStatus>().map_err(|e| {
        anyhow::anyhow!("{e}")
    })?;

    let entries = argus_db::list_by_status(pool, status, 100).await?;
    if entries.is_empty() {
        println!("no {status} entries");
        return Ok(());
    }

    for entry in entries {
        println!(
            "#{} item={} priority={} attempts={}/{} {}",
            entry.id,
            entry.item_id,
            entry.priority,
            entry.attempts,
            entry.max_attempts,
            entry.error_message.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Print entries awaiting an analyst decision.
pub async fn list_review(pool: &PgPool) -> anyhow::Result<()> {
    let entries = argus_db::list_pending_review(pool).await?;
    if entries.is_empty() {
        println!("no entries pending review");
        return Ok(());
    }

    for entry in entries {
        println!(
            "#{} [{}] {} ({}% via {})",
            entry.id,
            entry.category.as_deref().unwrap_or("none"),
            entry.title.as_deref().unwrap_or(&entry.item_title),
            entry.confidence.unwrap_or(0),
            entry.source_name
        );
    }
    Ok(())
}

/// Record an approve/reject decision on one entry.
pub async fn decide(pool: &PgPool, id: i64, decision: Decision, by: &str) -> anyhow::Result<()> {
    match argus_pipeline::decide(pool, id, decision, by, &ReviewEdits::default()).await? {
        Some(row) => println!("entry {} is now {} ({})", row.id, row.decision, row.status),
        None => println!("entry {id} no longer exists"),
    }
    Ok(())
}

/// Publish all approved entries to the intelligence feed.
pub async fn publish(pool: &PgPool) -> anyhow::Result<()> {
    let outcomes = argus_pipeline::publish_approved(pool).await?;
    if outcomes.is_empty() {
        println!("nothing approved to publish");
        return Ok(());
    }

    for outcome in &outcomes {
        if outcome.success {
            println!("published entry {}", outcome.entry_id);
        } else {
            println!(
                "entry {} failed to publish (kept for retry): {}",
                outcome.entry_id,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    Ok(())
}

/// Get or create the upload/manual source used to attribute CLI items.
async fn upload_source(
    pool: &PgPool,
    slug: &str,
    kind: &str,
) -> anyhow::Result<argus_db::SourceRow> {
    match argus_db::get_source_by_slug(pool, slug).await {
        Ok(source) => Ok(source),
        Err(argus_db::DbError::NotFound) => {
            let source = argus_db::create_source(
                pool,
                &NewSource {
                    name: slug,
                    slug,
                    kind,
                    url: None,
                    refresh_interval_secs: 3600,
                    active: true,
                    priority_boost: 0,
                    target_pirs: &[],
                },
            )
            .await?;
            tracing::info!(slug, kind, "created upload source");
            Ok(source)
        }
        Err(e) => Err(e.into()),
    }
}
