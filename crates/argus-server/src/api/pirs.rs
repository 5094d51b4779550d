use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct PirItem {
    pub id: i64,
    pub name: String,
    pub category_code: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub confidence_threshold: i32,
    pub sort_order: i32,
}

pub(super) async fn list_pirs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<PirItem>>>, ApiError> {
    let rows = argus_db::get_active_pirs(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| PirItem {
            id: row.id,
            name: row.name,
            category_code: row.category_code,
            description: row.description,
            keywords: row.keywords,
            confidence_threshold: row.confidence_threshold,
            sort_order: row.sort_order,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
