//! Torrent client "on complete" webhook (spec §6). A fallback/fast-path for
//! the same DOWNLOADED transition the progress provider reaches by polling
//! — whichever one fires first wins, the other is a no-op `InvalidTransition`
//! the caller discards.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::correlator::CorrelationKeys;
use crate::domain::events::NotificationEvent;
use crate::domain::model::{RequestState, ServiceLabel};
use crate::entities::episodes;
use crate::services::ingest::IngestContext;
use crate::services::transitions::apply_request_transition;

#[derive(Debug, Deserialize)]
pub struct TorrentCompleteEvent {
    pub hash: String,
    #[serde(default)]
    pub name: Option<String>,
    pub path: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
}

#[instrument(skip_all, fields(hash = %event.hash))]
pub async fn handle(ctx: &IngestContext, event: TorrentCompleteEvent) -> anyhow::Result<()> {
    let hash = event.hash.to_lowercase();
    let keys = CorrelationKeys {
        content_hash: Some(hash.clone()),
        ..Default::default()
    };
    let Some(request) = ctx.correlator.resolve(&keys).await? else {
        info!(%hash, "torrent-complete event had no matching active request");
        return Ok(());
    };

    let now = Utc::now().to_rfc3339();
    let txn = ctx.store.begin().await?;

    let mut active: crate::entities::requests::ActiveModel = request.into();
    active.download_percentage = Set(100.0);
    if let Some(size) = event.size {
        active.file_size = Set(Some(size));
    }
    active.updated_at = Set(now.clone());
    let updated = active.update(&txn).await?;

    let (updated, applied) = apply_request_transition(
        &txn,
        updated,
        RequestState::Downloaded,
        ServiceLabel::Torrent,
        "complete",
        "torrent client reported download complete",
    )
    .await?;

    for episode in
        crate::db::repositories::episode::EpisodeRepository::for_request_in_txn(&txn, updated.request_id)
            .await?
    {
        if episode.content_hash.as_deref() != Some(hash.as_str()) {
            continue;
        }
        let current = RequestState::parse(&episode.state).unwrap_or(RequestState::Grabbing);
        if crate::domain::state_machine::check_transition(
            crate::domain::state_machine::FsmKind::Episode,
            current,
            RequestState::Downloaded,
        )
        .is_ok()
        {
            let mut ep_active: episodes::ActiveModel = episode.into();
            ep_active.state = Set(RequestState::Downloaded.as_str().to_string());
            ep_active.updated_at = Set(now.clone());
            ep_active.update(&txn).await?;
        }
    }

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
