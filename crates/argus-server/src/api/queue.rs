use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct QueueItem {
    pub id: i64,
    pub item_id: i64,
    pub status: String,
    pub priority: i32,
    pub attempts: i32,
    pub max_attempts: i32,
    pub error_message: Option<String>,
    pub category: Option<String>,
    pub confidence: Option<i32>,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct QueueQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub(super) async fn list_queue(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<QueueQuery>,
) -> Result<Json<ApiResponse<Vec<QueueItem>>>, ApiError> {
    let status = query.status.as_deref().unwrap_or("pending");
    if status
        .parse::<argus_core::QueueStatus>()
        .is_err()
    {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("unknown queue status: {status}"),
        ));
    }

    let rows = argus_db::list_by_status(&state.pool, status, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| QueueItem {
            id: row.id,
            item_id: row.item_id,
            status: row.status,
            priority: row.priority,
            attempts: row.attempts,
            max_attempts: row.max_attempts,
            error_message: row.error_message,
            category: row.category,
            confidence: row.confidence,
            title: row.title,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
