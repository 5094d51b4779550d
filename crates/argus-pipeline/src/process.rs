//! Queue draining: claim → classify → advance.

use sqlx::PgPool;

use argus_classify::ClassificationService;
use argus_core::{Classification, Pir};
use argus_db::{claim_next_pending, get_item, get_source, record_attempt_failure,
    record_classification};

use crate::error::PipelineError;
use crate::retry::backoff_secs;

/// Where one processed entry ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessDisposition {
    /// Relevant: advanced to the pending-review set.
    Review,
    /// Not relevant: completed without review.
    Filtered,
    /// Classification failed; returned to pending behind a backoff gate.
    Retrying,
    /// Attempts exhausted; terminal error state for operator attention.
    Exhausted,
    /// The entry was deleted mid-flight by an operator.
    Vanished,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ProcessOutcome {
    pub entry_id: i64,
    pub disposition: ProcessDisposition,
}

/// Counts from one [`drain_queue`] call.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct DrainSummary {
    pub processed: usize,
    pub review: usize,
    pub filtered: usize,
    pub retrying: usize,
    pub exhausted: usize,
}

/// Normalize a classification so the review gate holds: an item whose
/// category is `"none"` is never relevant, whatever the classifier said.
fn normalize(mut classification: Classification) -> Classification {
    if classification.category == "none" {
        classification.relevant = false;
    }
    classification
}

/// Claim and process the next pending queue entry.
///
/// Returns `None` when nothing is pending. Classification errors are not
/// retried here — they feed the entry's attempt counter and backoff gate,
/// and exhaustion parks the entry in the terminal `error` status with the
/// original message preserved.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] on storage failure. Classifier errors are
/// absorbed into the retry bookkeeping.
pub async fn process_next(
    pool: &PgPool,
    service: &ClassificationService,
    backoff_base_secs: u64,
) -> Result<Option<ProcessOutcome>, PipelineError> {
    let Some(entry) = claim_next_pending(pool).await? else {
        return Ok(None);
    };

    let item = get_item(pool, entry.item_id).await?;
    let source = get_source(pool, item.source_id).await?;

    // PIR loading degrades to the built-in defaults rather than failing
    // the pipeline.
    let pirs: Vec<Pir> = match argus_db::get_active_pirs(pool).await {
        Ok(rows) => rows.iter().map(argus_db::PirRow::to_pir).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to load active PIRs; using defaults");
            Vec::new()
        }
    };

    match service.classify(&item.body, &source.name, &pirs).await {
        Ok(classification) => {
            let classification = normalize(classification);
            match record_classification(pool, entry.id, &classification).await? {
                Some(row) => {
                    let disposition = if row.status == "review" {
                        ProcessDisposition::Review
                    } else {
                        ProcessDisposition::Filtered
                    };
                    tracing::info!(
                        entry_id = entry.id,
                        category = %classification.category,
                        confidence = classification.confidence,
                        ?disposition,
                        "entry classified"
                    );
                    Ok(Some(ProcessOutcome {
                        entry_id: entry.id,
                        disposition,
                    }))
                }
                None => Ok(Some(ProcessOutcome {
                    entry_id: entry.id,
                    disposition: ProcessDisposition::Vanished,
                })),
            }
        }
        Err(e) => {
            let delay = backoff_secs(backoff_base_secs, entry.attempts);
            let message = e.to_string();
            match record_attempt_failure(pool, entry.id, &message, delay).await? {
                Some(outcome) if outcome.exhausted => {
                    tracing::error!(
                        entry_id = entry.id,
                        attempts = outcome.attempts,
                        error = %message,
                        "classification attempts exhausted; entry needs operator attention"
                    );
                    Ok(Some(ProcessOutcome {
                        entry_id: entry.id,
                        disposition: ProcessDisposition::Exhausted,
                    }))
                }
                Some(outcome) => {
                    tracing::warn!(
                        entry_id = entry.id,
                        attempts = outcome.attempts,
                        max_attempts = outcome.max_attempts,
                        delay_secs = delay,
                        error = %message,
                        "classification failed; entry returned to pending"
                    );
                    Ok(Some(ProcessOutcome {
                        entry_id: entry.id,
                        disposition: ProcessDisposition::Retrying,
                    }))
                }
                None => Ok(Some(ProcessOutcome {
                    entry_id: entry.id,
                    disposition: ProcessDisposition::Vanished,
                })),
            }
        }
    }
}

/// Process pending entries until the queue is empty or `limit` entries have
/// been handled.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] on storage failure.
pub async fn drain_queue(
    pool: &PgPool,
    service: &ClassificationService,
    backoff_base_secs: u64,
    limit: usize,
) -> Result<DrainSummary, PipelineError> {
    let mut summary = DrainSummary::default();

    while summary.processed < limit {
        let Some(outcome) = process_next(pool, service, backoff_base_secs).await? else {
            break;
        };
        summary.processed += 1;
        match outcome.disposition {
            ProcessDisposition::Review => summary.review += 1,
            ProcessDisposition::Filtered => summary.filtered += 1,
            ProcessDisposition::Retrying => summary.retrying += 1,
            ProcessDisposition::Exhausted => summary.exhausted += 1,
            ProcessDisposition::Vanished => {}
        }
    }

    Ok(summary)
}
