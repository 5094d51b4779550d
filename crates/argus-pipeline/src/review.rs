//! Review command handlers.
//!
//! Bulk operations apply each item's transition independently and report a
//! per-item outcome list; one failure never prevents attempting the rest,
//! and nothing is rolled back across items.

use sqlx::PgPool;

use argus_core::Decision;
use argus_db::{list_approved_unpublished, list_pending_review, publish_entry, record_decision,
    QueueEntryRow, ReviewEdits};

use crate::error::PipelineError;

/// Per-item result of a bulk review operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DecisionOutcome {
    pub entry_id: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DecisionOutcome {
    fn ok(entry_id: i64) -> Self {
        Self {
            entry_id,
            success: true,
            error: None,
        }
    }

    fn failed(entry_id: i64, error: String) -> Self {
        Self {
            entry_id,
            success: false,
            error: Some(error),
        }
    }
}

/// Record a single analyst decision, with optional field edits.
///
/// Returns `None` when the entry no longer exists.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] on storage failure or an illegal
/// transition.
pub async fn decide(
    pool: &PgPool,
    entry_id: i64,
    decision: Decision,
    decided_by: &str,
    edits: &ReviewEdits,
) -> Result<Option<QueueEntryRow>, PipelineError> {
    Ok(record_decision(pool, entry_id, decision, decided_by, edits).await?)
}

/// Apply the same decision to every pending-review entry.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] only when the pending set cannot be
/// listed; individual transition failures land in the outcome list.
pub async fn decide_all(
    pool: &PgPool,
    decision: Decision,
    decided_by: &str,
) -> Result<Vec<DecisionOutcome>, PipelineError> {
    let pending = list_pending_review(pool).await?;
    let mut outcomes = Vec::with_capacity(pending.len());

    for entry in pending {
        match record_decision(pool, entry.id, decision, decided_by, &ReviewEdits::default()).await
        {
            Ok(Some(_)) => outcomes.push(DecisionOutcome::ok(entry.id)),
            Ok(None) => outcomes.push(DecisionOutcome::failed(
                entry.id,
                "entry no longer exists".to_string(),
            )),
            Err(e) => {
                tracing::warn!(entry_id = entry.id, error = %e, "bulk decision failed for entry");
                outcomes.push(DecisionOutcome::failed(entry.id, e.to_string()));
            }
        }
    }

    tracing::info!(
        decision = %decision,
        total = outcomes.len(),
        failed = outcomes.iter().filter(|o| !o.success).count(),
        "bulk review decision applied"
    );
    Ok(outcomes)
}

/// Publish every approved, unpublished entry into the intelligence feed.
///
/// An entry whose publish fails stays approved and is retried on the next
/// call.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] only when the approved set cannot be
/// listed.
pub async fn publish_approved(pool: &PgPool) -> Result<Vec<DecisionOutcome>, PipelineError> {
    let approved = list_approved_unpublished(pool).await?;
    let mut outcomes = Vec::with_capacity(approved.len());

    for entry in approved {
        match publish_entry(pool, entry.id).await {
            Ok(Some(intel_id)) => {
                tracing::info!(entry_id = entry.id, intel_id, "entry published to feed");
                outcomes.push(DecisionOutcome::ok(entry.id));
            }
            Ok(None) => outcomes.push(DecisionOutcome::failed(
                entry.id,
                "entry no longer exists".to_string(),
            )),
            Err(e) => {
                tracing::warn!(
                    entry_id = entry.id,
                    error = %e,
                    "publish failed; entry remains approved for retry"
                );
                outcomes.push(DecisionOutcome::failed(entry.id, e.to_string()));
            }
        }
    }

    Ok(outcomes)
}
