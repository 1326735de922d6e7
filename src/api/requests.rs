//! Read-only dashboard endpoints. No auth gate — these are the views the
//! dashboard polls/subscribes to constantly and spec.md §4.J scopes the
//! admin gate to mutating routes only.

use std::sync::Arc;

use axum::{Router, extract::{Path, State}, routing::get};

use crate::api::types::{ApiResponse, DeletionLogDto, EpisodeDto, RequestDetailDto, RequestDto, TimelineEventDto};
use crate::api::{AppState, ApiError};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/requests", get(list_requests))
        .route("/requests/{id}", get(get_request))
        .route("/deletion-logs", get(list_deletion_logs))
}

async fn list_requests(
    State(state): State<Arc<AppState>>,
) -> Result<axum::Json<ApiResponse<Vec<RequestDto>>>, ApiError> {
    let requests = state.shared.store.list_active_requests().await?;
    let dtos: Vec<RequestDto> = requests.into_iter().map(Into::into).collect();
    Ok(axum::Json(ApiResponse::success(dtos)))
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<axum::Json<ApiResponse<RequestDetailDto>>, ApiError> {
    let request = state
        .shared
        .store
        .get_request(id)
        .await?
        .ok_or_else(|| ApiError::request_not_found(id))?;

    let episodes = state.shared.store.episodes_for_request(id).await?;
    let timeline = state.shared.store.timeline_for_request(id).await?;

    let detail = RequestDetailDto {
        request: request.into(),
        episodes: episodes.into_iter().map(EpisodeDto::from).collect(),
        timeline: timeline.into_iter().map(TimelineEventDto::from).collect(),
    };
    Ok(axum::Json(ApiResponse::success(detail)))
}

async fn list_deletion_logs(
    State(state): State<Arc<AppState>>,
) -> Result<axum::Json<ApiResponse<Vec<DeletionLogDto>>>, ApiError> {
    let logs = state.shared.store.list_deletion_logs(100).await?;
    let dtos: Vec<DeletionLogDto> = logs.into_iter().map(Into::into).collect();
    Ok(axum::Json(ApiResponse::success(dtos)))
}
