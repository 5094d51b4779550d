use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use argus_db::NewSource;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct SourceItem {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub kind: String,
    pub url: Option<String>,
    pub refresh_interval_secs: i64,
    pub active: bool,
    pub priority_boost: i32,
    pub target_pirs: Vec<String>,
    pub consecutive_failures: i32,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl From<argus_db::SourceRow> for SourceItem {
    fn from(row: argus_db::SourceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            kind: row.kind,
            url: row.url,
            refresh_interval_secs: row.refresh_interval_secs,
            active: row.active,
            priority_boost: row.priority_boost,
            target_pirs: row.target_pirs,
            consecutive_failures: row.consecutive_failures,
            last_success_at: row.last_success_at,
            last_error: row.last_error,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateSourceBody {
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    pub url: Option<String>,
    #[serde(default = "default_interval")]
    pub refresh_interval_secs: i64,
    #[serde(default)]
    pub priority_boost: i32,
    #[serde(default)]
    pub target_pirs: Vec<String>,
}

fn default_kind() -> String {
    "rss".to_string()
}

fn default_interval() -> i64 {
    3600
}

pub(super) async fn list_sources(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<SourceItem>>>, ApiError> {
    let rows = argus_db::list_sources(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(SourceItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn create_source(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateSourceBody>,
) -> Result<Json<ApiResponse<SourceItem>>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "source name must be non-empty",
        ));
    }
    if body.kind == "rss" && body.url.is_none() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "rss sources must have a url",
        ));
    }

    let slug = slugify(&body.name);
    let row = argus_db::create_source(
        &state.pool,
        &NewSource {
            name: &body.name,
            slug: &slug,
            kind: &body.kind,
            url: body.url.as_deref(),
            refresh_interval_secs: body.refresh_interval_secs,
            active: true,
            priority_boost: body.priority_boost,
            target_pirs: &body.target_pirs,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    // New sources are active; put them on the schedule right away.
    state.scheduler.refresh_now(row.id).await;

    Ok(Json(ApiResponse {
        data: SourceItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn activate_source(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SourceItem>>, ApiError> {
    let row = argus_db::set_source_active(&state.pool, id, true)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "source not found"))?;

    // Activation schedules an immediate fetch; an already-scheduled source
    // is rescheduled, never duplicated.
    state.scheduler.refresh_now(row.id).await;

    Ok(Json(ApiResponse {
        data: SourceItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn deactivate_source(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SourceItem>>, ApiError> {
    let row = argus_db::set_source_active(&state.pool, id, false)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "source not found"))?;

    // Cancel the pending timer; already-enqueued items are not retracted.
    state.scheduler.cancel(row.id).await;

    Ok(Json(ApiResponse {
        data: SourceItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn refresh_source(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SourceItem>>, ApiError> {
    let row = argus_db::get_source(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if !row.active {
        return Err(ApiError::new(
            req_id.0,
            "conflict",
            "source is deactivated; activate it before refreshing",
        ));
    }

    state.scheduler.refresh_now(row.id).await;

    Ok(Json(ApiResponse {
        data: SourceItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c == ' ' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_matches_bootstrap_slugs() {
        assert_eq!(slugify("BBC World  News!"), "bbc-world-news");
        assert_eq!(slugify("plain"), "plain");
    }
}
