use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::correlator::CorrelationKeys;
use crate::domain::events::{NotificationEvent, RequestSnapshot};
use crate::domain::model::{IsAnime, MediaKind, RequestState, ServiceLabel};
use crate::entities::requests;
use crate::services::ingest::IngestContext;
use crate::services::transitions::{apply_request_transition, record_request_created};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestManagerEvent {
    pub notification_type: String,
    pub request: RequestManagerRequestPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestManagerRequestPayload {
    pub request_id: String,
    pub requested_by: String,
    pub media: RequestManagerMediaPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestManagerMediaPayload {
    pub tmdb_id: String,
    pub tvdb_id: Option<String>,
    pub media_type: String,
    pub title: String,
    pub release_year: Option<i32>,
    pub poster_path: Option<String>,
}

#[instrument(skip_all, fields(notification_type = %event.notification_type))]
pub async fn handle(ctx: &IngestContext, event: RequestManagerEvent) -> anyhow::Result<()> {
    let media_kind = match event.request.media.media_type.as_str() {
        "movie" | "Movie" => MediaKind::Movie,
        _ => MediaKind::Tv,
    };

    match event.notification_type.as_str() {
        "MEDIA_PENDING" => create_or_ignore(ctx, &event, media_kind, RequestState::Requested).await,
        "MEDIA_AUTO_APPROVED" | "MEDIA_APPROVED" => {
            create_or_approve(ctx, &event, media_kind).await
        }
        "MEDIA_AVAILABLE" => mark_available(ctx, &event, media_kind).await,
        "MEDIA_FAILED" => mark_failed(ctx, &event, media_kind).await,
        other => {
            info!(notification_type = other, "unrecognized request-manager event, ignoring");
            Ok(())
        }
    }
}

fn keys_for(event: &RequestManagerEvent, media_kind: MediaKind) -> CorrelationKeys {
    CorrelationKeys {
        request_manager_id: Some(event.request.request_id.clone()),
        content_db_id: Some(event.request.media.tmdb_id.clone()),
        tvdb_id: event.request.media.tvdb_id.clone(),
        media_kind: Some(media_kind),
        title: Some(event.request.media.title.clone()),
        year: event.request.media.release_year,
        ..Default::default()
    }
}

async fn create_or_ignore(
    ctx: &IngestContext,
    event: &RequestManagerEvent,
    media_kind: MediaKind,
    initial_state: RequestState,
) -> anyhow::Result<()> {
    if ctx.correlator.resolve(&keys_for(event, media_kind)).await?.is_some() {
        return Ok(());
    }
    let (request, created) = create_request(ctx, event, media_kind, initial_state).await?;
    if created {
        ctx.broadcast(NotificationEvent::RequestCreated(snapshot(&request)));
    }
    Ok(())
}

async fn create_or_approve(
    ctx: &IngestContext,
    event: &RequestManagerEvent,
    media_kind: MediaKind,
) -> anyhow::Result<()> {
    let existing = ctx.correlator.resolve(&keys_for(event, media_kind)).await?;

    let (request, created) = match existing {
        Some(request) => (request, false),
        None => create_request(ctx, event, media_kind, RequestState::Requested).await?,
    };

    if created {
        ctx.broadcast(NotificationEvent::RequestCreated(snapshot(&request)));
    }

    let txn = ctx.store.begin().await?;
    let (updated, applied) = apply_request_transition(
        &txn,
        request,
        RequestState::Approved,
        ServiceLabel::RequestManager,
        "approved",
        "request approved by request manager",
    )
    .await?;
    txn.commit().await?;

    if let Some(applied) = applied {
        ctx.broadcast(NotificationEvent::RequestTransitioned {
            request_id: updated.request_id,
            from: applied.from,
            to: applied.to,
        });
    }
    Ok(())
}

async fn mark_available(
    ctx: &IngestContext,
    event: &RequestManagerEvent,
    media_kind: MediaKind,
) -> anyhow::Result<()> {
    let Some(request) = ctx.correlator.resolve(&keys_for(event, media_kind)).await? else {
        info!("no active request to mark available");
        return Ok(());
    };

    // Provider-ID lookup against the media server must not block this
    // ingest path (§4.E): it is scheduled as a background task and applied
    // on its own commit once it resolves.
    let media_server = ctx.media_server.clone();
    let store = ctx.store.clone();
    let bus = ctx.bus.clone();
    let request_id = request.request_id;
    let provider_id = if media_kind == MediaKind::Tv {
        request.tvdb_id.clone()
    } else {
        request.content_db_id.clone()
    };
    let provider = if media_kind == MediaKind::Tv { "tvdb" } else { "tmdb" };

    tokio::spawn(async move {
        let Some(provider_id) = provider_id else {
            return;
        };
        let is_series = media_kind == MediaKind::Tv;
        if let Ok(Some(item)) = media_server
            .search_by_provider_id(provider, &provider_id, is_series)
            .await
        {
            if let Ok(Some(mut req)) = store.get_request(request_id).await {
                req.media_server_id = Some(item.id);
                let active: requests::ActiveModel = req.into();
                if let Ok(saved) = active.update(&store.conn).await {
                    let _ = bus.send(NotificationEvent::RequestUpdated(RequestSnapshot {
                        request_id: saved.request_id,
                        title: saved.title.clone(),
                        state: RequestState::parse(&saved.state).unwrap_or(RequestState::Available),
                        download_percentage: Some(saved.download_percentage),
                        poster_url: saved.poster_url.clone(),
                    }));
                }
            }
        }
    });

    let episodes = ctx.store.episodes_for_request(request.request_id).await?;
    let txn = ctx.store.begin().await?;

    for episode in episodes {
        let mut active: crate::entities::episodes::ActiveModel = episode.into();
        active.state = Set(RequestState::Available.as_str().to_string());
        active.updated_at = Set(Utc::now().to_rfc3339());
        active.update(&txn).await?;
    }

    let (updated, applied) = apply_request_transition(
        &txn,
        request,
        RequestState::Available,
        ServiceLabel::RequestManager,
        "available",
        "media marked available by request manager",
    )
    .await?;
    txn.commit().await?;

    if let Some(applied) = applied {
        ctx.broadcast(NotificationEvent::RequestTransitioned {
            request_id: updated.request_id,
            from: applied.from,
            to: applied.to,
        });
    }
    Ok(())
}

async fn mark_failed(
    ctx: &IngestContext,
    event: &RequestManagerEvent,
    media_kind: MediaKind,
) -> anyhow::Result<()> {
    let Some(request) = ctx.correlator.resolve(&keys_for(event, media_kind)).await? else {
        return Ok(());
    };
    let txn = ctx.store.begin().await?;
    let (updated, applied) = apply_request_transition(
        &txn,
        request,
        RequestState::Failed,
        ServiceLabel::RequestManager,
        "failed",
        "request manager reported failure",
    )
    .await?;
    txn.commit().await?;

    if let Some(applied) = applied {
        ctx.broadcast(NotificationEvent::RequestTransitioned {
            request_id: updated.request_id,
            from: applied.from,
            to: applied.to,
        });
    }
    Ok(())
}

async fn create_request(
    ctx: &IngestContext,
    event: &RequestManagerEvent,
    media_kind: MediaKind,
    initial_state: RequestState,
) -> anyhow::Result<(requests::Model, bool)> {
    let now = Utc::now().to_rfc3339();
    let active = requests::ActiveModel {
        request_id: Default::default(),
        request_manager_id: Set(Some(event.request.request_id.clone())),
        content_db_id: Set(Some(event.request.media.tmdb_id.clone())),
        tvdb_id: Set(event.request.media.tvdb_id.clone()),
        downloader_a_id: Set(None),
        downloader_b_id: Set(None),
        content_hash: Set(None),
        media_server_id: Set(None),
        media_kind: Set(media_kind.as_str().to_string()),
        is_anime: Set(IsAnime::Unknown.as_str().to_string()),
        title: Set(event.request.media.title.clone()),
        year: Set(event.request.media.release_year),
        poster_url: Set(event.request.media.poster_path.clone()),
        requesting_user: Set(event.request.requested_by.clone()),
        quality_label: Set(None),
        indexer_label: Set(None),
        requested_season_descriptor: Set(None),
        file_size: Set(None),
        release_group_label: Set(None),
        state: Set(initial_state.as_str().to_string()),
        download_percentage: Set(0.0),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        available_at: Set(None),
        final_path: Set(None),
    };

    let txn = ctx.store.begin().await?;
    match active.insert(&txn).await {
        Ok(model) => {
            record_request_created(
                &txn,
                model.request_id,
                initial_state,
                ServiceLabel::RequestManager,
                "request created",
            )
            .await?;
            txn.commit().await?;
            Ok((model, true))
        }
        Err(err) if is_unique_violation(&err) => {
            txn.rollback().await.ok();
            // Another concurrent webhook won the race; re-read via the
            // correlator and use its row instead of creating a duplicate.
            match ctx.correlator.resolve(&keys_for(event, media_kind)).await? {
                Some(existing) => Ok((existing, false)),
                None => Err(err.into()),
            }
        }
        Err(err) => Err(err.into()),
    }
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    err.to_string().to_lowercase().contains("unique")
}

fn snapshot(request: &requests::Model) -> RequestSnapshot {
    RequestSnapshot {
        request_id: request.request_id,
        title: request.title.clone(),
        state: RequestState::parse(&request.state).unwrap_or(RequestState::Requested),
        download_percentage: Some(request.download_percentage),
        poster_url: request.poster_url.clone(),
    }
}
