use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::correlator::CorrelationKeys;
use crate::domain::events::NotificationEvent;
use crate::domain::model::{DeletionSource, MediaKind, RequestState, ServiceLabel};
use crate::entities::requests;
use crate::services::deletion::{self, DeletionRequest};
use crate::services::ingest::IngestContext;
use crate::services::transitions::apply_request_transition;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaServerEvent {
    pub notification_type: String,
    pub item: MediaServerItemPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaServerItemPayload {
    pub item_id: String,
    pub item_type: String,
    #[serde(default)]
    pub provider_ids: std::collections::HashMap<String, String>,
    pub path: Option<String>,
}

#[instrument(skip_all, fields(notification_type = %event.notification_type))]
pub async fn handle(ctx: &IngestContext, event: MediaServerEvent) -> anyhow::Result<()> {
    match event.notification_type.as_str() {
        "ItemAdded" => handle_item_added(ctx, event.item).await,
        "ItemRemoved" => handle_item_removed(ctx, event.item).await,
        other => {
            info!(notification_type = other, "unrecognized media-server event, ignoring");
            Ok(())
        }
    }
}

fn media_kind_for(item_type: &str) -> Option<MediaKind> {
    match item_type {
        "Movie" => Some(MediaKind::Movie),
        "Series" | "Episode" => Some(MediaKind::Tv),
        _ => None,
    }
}

async fn handle_item_added(ctx: &IngestContext, item: MediaServerItemPayload) -> anyhow::Result<()> {
    let Some(media_kind) = media_kind_for(&item.item_type) else {
        return Ok(());
    };
    let keys = CorrelationKeys {
        content_db_id: item.provider_ids.get("tmdb").or_else(|| item.provider_ids.get("imdb")).cloned(),
        tvdb_id: item.provider_ids.get("tvdb").cloned(),
        media_kind: Some(media_kind),
        final_path: item.path.clone(),
        ..Default::default()
    };
    let Some(request) = ctx.correlator.resolve(&keys).await? else {
        info!(item_id = %item.item_id, "item-added event had no matching active request");
        return Ok(());
    };

    let current = RequestState::parse(&request.state).unwrap_or(RequestState::Requested);
    let now = Utc::now().to_rfc3339();
    let txn = ctx.store.begin().await?;

    let mut active: requests::ActiveModel = request.clone().into();
    active.media_server_id = Set(Some(item.item_id.clone()));
    active.updated_at = Set(now.clone());
    let updated = active.update(&txn).await?;

    if !matches!(current, RequestState::Importing | RequestState::AnimeMatching) {
        txn.commit().await?;
        return Ok(());
    }

    for episode in crate::db::repositories::episode::EpisodeRepository::for_request_in_txn(
        &txn,
        updated.request_id,
    )
    .await?
    {
        let mut ep_active: crate::entities::episodes::ActiveModel = episode.into();
        ep_active.state = Set(RequestState::Available.as_str().to_string());
        ep_active.updated_at = Set(now.clone());
        ep_active.update(&txn).await?;
    }

    let (updated, applied) = apply_request_transition(
        &txn,
        updated,
        RequestState::Available,
        ServiceLabel::MediaServer,
        "item_added",
        "media server reported item available",
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

/// Exact `ItemRemoved` payload shape varies by deployment (spec §9 open
/// question); provider ids may be absent, so this falls back to the
/// media-server id we stored ourselves on a previous `ItemAdded`/verifier hit.
async fn handle_item_removed(ctx: &IngestContext, item: MediaServerItemPayload) -> anyhow::Result<()> {
    let media_kind = media_kind_for(&item.item_type);
    let by_provider = if let Some(media_kind) = media_kind {
        let keys = CorrelationKeys {
            content_db_id: item.provider_ids.get("tmdb").or_else(|| item.provider_ids.get("imdb")).cloned(),
            tvdb_id: item.provider_ids.get("tvdb").cloned(),
            media_kind: Some(media_kind),
            ..Default::default()
        };
        ctx.correlator.resolve(&keys).await?
    } else {
        None
    };

    let request = match by_provider {
        Some(request) => Some(request),
        None => ctx.store.request_by_media_server_id(&item.item_id).await?,
    };

    let Some(request) = request else {
        info!(item_id = %item.item_id, "item-removed event had no matching active request");
        return Ok(());
    };

    deletion::orchestrate(
        ctx,
        DeletionRequest {
            request,
            source: DeletionSource::MediaServer,
            actor_user_id: None,
            actor_display_name: None,
            delete_files: true,
        },
    )
    .await?;
    Ok(())
}
