//! Inbound webhook endpoints (spec §6). Each handler deserializes the
//! service-specific payload, hands it to the matching ingest adapter, and
//! always returns 200 — a malformed or unhandled event is logged, never
//! surfaced as an HTTP error, so the upstream service never retries a
//! webhook we've already given up on (spec §7 propagation policy).

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use tracing::warn;

use crate::api::AppState;
use crate::services::ingest::{indexer_movies, indexer_tv, media_server, request_manager, torrent};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/hooks/request-manager", post(request_manager_hook))
        .route("/hooks/indexer-movies", post(indexer_movies_hook))
        .route("/hooks/indexer-tv", post(indexer_tv_hook))
        .route("/hooks/torrent-client", post(torrent_hook))
        .route("/hooks/media-server", post(media_server_hook))
}

async fn request_manager_hook(
    State(state): State<Arc<AppState>>,
    Json(event): Json<request_manager::RequestManagerEvent>,
) -> StatusCode {
    let ctx = state.shared.ingest_context();
    if let Err(err) = request_manager::handle(&ctx, event).await {
        warn!(%err, "request-manager webhook handling failed");
    }
    StatusCode::OK
}

async fn indexer_movies_hook(
    State(state): State<Arc<AppState>>,
    Json(event): Json<indexer_movies::IndexerMoviesEvent>,
) -> StatusCode {
    let ctx = state.shared.ingest_context();
    if let Err(err) = indexer_movies::handle(&ctx, event).await {
        warn!(%err, "indexer-movies webhook handling failed");
    }
    StatusCode::OK
}

async fn indexer_tv_hook(
    State(state): State<Arc<AppState>>,
    Json(event): Json<indexer_tv::IndexerTvEvent>,
) -> StatusCode {
    let ctx = state.shared.ingest_context();
    if let Err(err) = indexer_tv::handle(&ctx, event).await {
        warn!(%err, "indexer-tv webhook handling failed");
    }
    StatusCode::OK
}

async fn torrent_hook(
    State(state): State<Arc<AppState>>,
    Json(event): Json<torrent::TorrentCompleteEvent>,
) -> StatusCode {
    let ctx = state.shared.ingest_context();
    if let Err(err) = torrent::handle(&ctx, event).await {
        warn!(%err, "torrent-client webhook handling failed");
    }
    StatusCode::OK
}

async fn media_server_hook(
    State(state): State<Arc<AppState>>,
    Json(event): Json<media_server::MediaServerEvent>,
) -> StatusCode {
    let ctx = state.shared.ingest_context();
    if let Err(err) = media_server::handle(&ctx, event).await {
        warn!(%err, "media-server webhook handling failed");
    }
    StatusCode::OK
}
