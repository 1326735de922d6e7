//! Admin-gated mutating routes (spec §4.J): delete/bulk-delete a request,
//! and trigger a library-sync backfill. All three sit behind
//! `auth::auth_middleware` in the router.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::post,
};
use serde::Deserialize;

use crate::api::auth::AdminUserId;
use crate::api::types::ApiResponse;
use crate::api::{ApiError, AppState};
use crate::domain::model::DeletionSource;
use crate::services::deletion::{self, DeletionRequest};
use crate::services::library_sync::{LibrarySyncJob, SyncReport};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/requests/{id}/delete", post(delete_request))
        .route("/requests/bulk-delete", post(bulk_delete))
        .route("/admin/sync/library", post(sync_library))
}

#[derive(Debug, Deserialize)]
pub struct DeleteOptions {
    #[serde(default)]
    pub delete_files: bool,
}

async fn delete_request(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AdminUserId>,
    Path(id): Path<i64>,
    Json(opts): Json<DeleteOptions>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let request = state
        .shared
        .store
        .get_request(id)
        .await?
        .ok_or_else(|| ApiError::request_not_found(id))?;

    let ctx = state.shared.ingest_context();
    deletion::orchestrate(
        &ctx,
        DeletionRequest {
            request,
            source: DeletionSource::Dashboard,
            actor_user_id: Some(actor.id),
            actor_display_name: Some(actor.display_name),
            delete_files: opts.delete_files,
        },
    )
    .await?;

    Ok(Json(ApiResponse::success(())))
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub request_ids: Vec<i64>,
    #[serde(default)]
    pub delete_files: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct BulkDeleteResult {
    pub requested: usize,
    pub started: usize,
    pub not_found: Vec<i64>,
}

async fn bulk_delete(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AdminUserId>,
    Json(body): Json<BulkDeleteRequest>,
) -> Result<Json<ApiResponse<BulkDeleteResult>>, ApiError> {
    let mut not_found = Vec::new();
    let mut started = 0usize;
    let ctx = state.shared.ingest_context();

    for id in &body.request_ids {
        match state.shared.store.get_request(*id).await? {
            Some(request) => {
                deletion::orchestrate(
                    &ctx,
                    DeletionRequest {
                        request,
                        source: DeletionSource::Dashboard,
                        actor_user_id: Some(actor.id.clone()),
                        actor_display_name: Some(actor.display_name.clone()),
                        delete_files: body.delete_files,
                    },
                )
                .await?;
                started += 1;
            }
            None => not_found.push(*id),
        }
    }

    Ok(Json(ApiResponse::success(BulkDeleteResult {
        requested: body.request_ids.len(),
        started,
        not_found,
    })))
}

async fn sync_library(
    State(state): State<Arc<AppState>>,
    Extension(_actor): Extension<AdminUserId>,
) -> Result<Json<ApiResponse<SyncReport>>, ApiError> {
    let job = LibrarySyncJob::new(
        state.shared.store.clone(),
        state.shared.media_server.clone() as Arc<dyn crate::clients::media_server::MediaServerClient>,
    );
    let report = job.run_backfill().await?;
    state.shared.event_bus.send(crate::domain::events::NotificationEvent::LibrarySyncCompleted {
        created: report.created,
        skipped: report.skipped,
    }).ok();
    Ok(Json(ApiResponse::success(report)))
}
