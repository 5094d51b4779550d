use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use argus_core::Decision;
use argus_db::ReviewEdits;
use argus_pipeline::DecisionOutcome;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ReviewItem {
    pub id: i64,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub quote: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub confidence: Option<i32>,
    pub reasoning: Option<String>,
    pub tags: Vec<String>,
    pub source_name: String,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Optional analyst edits accompanying a decision; any set field overrides
/// the AI-provided value.
#[derive(Debug, Default, Deserialize)]
pub(super) struct DecisionBody {
    #[serde(default)]
    pub decided_by: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub quote: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub confidence: Option<i32>,
}

impl DecisionBody {
    fn edits(&self) -> ReviewEdits {
        ReviewEdits {
            title: self.title.clone(),
            summary: self.summary.clone(),
            quote: self.quote.clone(),
            category: self.category.clone(),
            class_priority: self.priority.clone(),
            confidence: self.confidence,
        }
    }

    fn analyst(&self) -> &str {
        self.decided_by.as_deref().unwrap_or("analyst")
    }
}

#[derive(Debug, Deserialize, Default)]
pub(super) struct BulkDecisionBody {
    #[serde(default)]
    pub decided_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct DecisionData {
    pub id: i64,
    pub decision: String,
    pub status: String,
}

pub(super) async fn list_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<ReviewItem>>>, ApiError> {
    let rows = argus_db::list_pending_review(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| ReviewItem {
            id: row.id,
            title: row.title.or(Some(row.item_title)),
            summary: row.summary,
            quote: row.quote,
            category: row.category,
            priority: row.class_priority,
            confidence: row.confidence,
            reasoning: row.reasoning,
            tags: row.tags,
            source_name: row.source_name,
            link: row.link,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn approve_entry(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    body: Option<Json<DecisionBody>>,
) -> Result<Json<ApiResponse<DecisionData>>, ApiError> {
    decide(state, req_id, id, Decision::Approved, body).await
}

pub(super) async fn reject_entry(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    body: Option<Json<DecisionBody>>,
) -> Result<Json<ApiResponse<DecisionData>>, ApiError> {
    decide(state, req_id, id, Decision::Rejected, body).await
}

async fn decide(
    state: AppState,
    req_id: RequestId,
    id: i64,
    decision: Decision,
    body: Option<Json<DecisionBody>>,
) -> Result<Json<ApiResponse<DecisionData>>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let row = argus_pipeline::decide(&state.pool, id, decision, body.analyst(), &body.edits())
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "review entry not found"))?;

    Ok(Json(ApiResponse {
        data: DecisionData {
            id: row.id,
            decision: row.decision,
            status: row.status,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn approve_all(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Option<Json<BulkDecisionBody>>,
) -> Result<Json<ApiResponse<Vec<DecisionOutcome>>>, ApiError> {
    bulk_decide(state, req_id, Decision::Approved, body).await
}

pub(super) async fn reject_all(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Option<Json<BulkDecisionBody>>,
) -> Result<Json<ApiResponse<Vec<DecisionOutcome>>>, ApiError> {
    bulk_decide(state, req_id, Decision::Rejected, body).await
}

async fn bulk_decide(
    state: AppState,
    req_id: RequestId,
    decision: Decision,
    body: Option<Json<BulkDecisionBody>>,
) -> Result<Json<ApiResponse<Vec<DecisionOutcome>>>, ApiError> {
    let decided_by = body
        .and_then(|Json(b)| b.decided_by)
        .unwrap_or_else(|| "analyst".to_string());

    let outcomes = argus_pipeline::decide_all(&state.pool, decision, &decided_by)
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: outcomes,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn publish(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<DecisionOutcome>>>, ApiError> {
    let outcomes = argus_pipeline::publish_approved(&state.pool)
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: outcomes,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct FeedItem {
    pub id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub quote: Option<String>,
    pub category: String,
    pub priority: String,
    pub confidence: i32,
    pub source_name: String,
    pub link: Option<String>,
    pub tags: Vec<String>,
    pub published_at: DateTime<Utc>,
}

pub(super) async fn list_feed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<FeedItem>>>, ApiError> {
    let rows = argus_db::list_intel_items(&state.pool, 100)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| FeedItem {
            id: row.id,
            title: row.title,
            summary: row.summary,
            quote: row.quote,
            category: row.category,
            priority: row.priority,
            confidence: row.confidence,
            source_name: row.source_name,
            link: row.link,
            tags: row.tags,
            published_at: row.published_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn map_pipeline_error(request_id: String, error: &argus_pipeline::PipelineError) -> ApiError {
    match error {
        argus_pipeline::PipelineError::Db(e) => map_db_error(request_id, e),
        _ => {
            tracing::error!(error = %error, "pipeline operation failed");
            ApiError::new(request_id, "internal_error", "pipeline operation failed")
        }
    }
}
