use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::correlator::CorrelationKeys;
use crate::domain::aggregator::aggregate;
use crate::domain::events::NotificationEvent;
use crate::domain::model::{IsAnime, MediaKind, RequestState, ServiceLabel};
use crate::entities::{episodes, requests};
use crate::services::deletion::{self, DeletionRequest};
use crate::services::ingest::IngestContext;
use crate::services::transitions::apply_request_transition;

#[derive(Debug, Deserialize)]
#[serde(tag = "eventType", rename_all = "PascalCase")]
pub enum IndexerTvEvent {
    Grab {
        series: SeriesPayload,
        #[serde(rename = "downloadId")]
        download_id: String,
        episodes: Vec<EpisodePayload>,
    },
    Download {
        series: SeriesPayload,
        #[serde(rename = "episodeFiles")]
        episode_files: Vec<EpisodeFilePayload>,
    },
    SeriesDelete {
        series: SeriesPayload,
        #[serde(rename = "deletedFiles")]
        deleted_files: bool,
    },
    EpisodeFileDelete {
        series: SeriesPayload,
        episodes: Vec<EpisodePayload>,
        #[serde(rename = "deletedFiles")]
        deleted_files: bool,
    },
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPayload {
    pub tvdb_id: String,
    pub title: String,
    pub year: Option<i32>,
    #[serde(default)]
    pub series_type: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EpisodePayload {
    pub season_number: i32,
    pub episode_number: i32,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeFilePayload {
    pub season_number: i32,
    pub episode_number: i32,
    pub path: String,
}

#[instrument(skip_all)]
pub async fn handle(ctx: &IngestContext, event: IndexerTvEvent) -> anyhow::Result<()> {
    match event {
        IndexerTvEvent::Grab {
            series,
            download_id,
            episodes,
        } => handle_grab(ctx, series, download_id, episodes).await,
        IndexerTvEvent::Download {
            series,
            episode_files,
        } => handle_import(ctx, series, episode_files).await,
        IndexerTvEvent::SeriesDelete {
            series,
            deleted_files,
        } => handle_series_delete(ctx, series, deleted_files).await,
        IndexerTvEvent::EpisodeFileDelete {
            series,
            episodes,
            deleted_files,
        } => handle_episode_delete(ctx, series, episodes, deleted_files).await,
    }
}

async fn handle_grab(
    ctx: &IngestContext,
    series: SeriesPayload,
    download_id: String,
    episode_payloads: Vec<EpisodePayload>,
) -> anyhow::Result<()> {
    let keys = CorrelationKeys {
        tvdb_id: Some(series.tvdb_id.clone()),
        media_kind: Some(MediaKind::Tv),
        title: Some(series.title.clone()),
        year: series.year,
        ..Default::default()
    };
    let Some(request) = ctx.correlator.resolve(&keys).await? else {
        info!(tvdb_id = %series.tvdb_id, "grab event had no matching active request");
        return Ok(());
    };

    let inferred_anime = IsAnime::parse(&request.is_anime).is_true()
        || series
            .series_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("anime"));

    let now = Utc::now().to_rfc3339();
    let txn = ctx.store.begin().await?;

    let mut req_active: requests::ActiveModel = request.into();
    req_active.content_hash = Set(Some(download_id.to_lowercase()));
    req_active.downloader_b_id = Set(series.id.clone());
    if inferred_anime {
        req_active.is_anime = Set(IsAnime::True.as_str().to_string());
    }
    req_active.updated_at = Set(now.clone());
    let updated = req_active.update(&txn).await?;

    for ep in &episode_payloads {
        if crate::db::repositories::episode::EpisodeRepository::find_by_season_episode_in_txn(
            &txn,
            updated.request_id,
            ep.season_number,
            ep.episode_number,
        )
        .await?
        .is_some()
        {
            continue;
        }

        let active = episodes::ActiveModel {
            episode_id: Default::default(),
            request_id: Set(updated.request_id),
            season_number: Set(ep.season_number),
            episode_number: Set(ep.episode_number),
            episode_title: Set(ep.title.clone()),
            content_hash: Set(Some(download_id.to_lowercase())),
            final_path: Set(None),
            media_server_id: Set(None),
            anime_file_id: Set(None),
            state: Set(RequestState::Grabbing.as_str().to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
        };
        active.insert(&txn).await?;
    }

    let (updated, applied) = apply_request_transition(
        &txn,
        updated,
        RequestState::Grabbing,
        ServiceLabel::IndexerTv,
        "grab",
        &format!("grabbed {} episode(s)", episode_payloads.len()),
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

async fn handle_import(
    ctx: &IngestContext,
    series: SeriesPayload,
    episode_files: Vec<EpisodeFilePayload>,
) -> anyhow::Result<()> {
    let keys = CorrelationKeys {
        tvdb_id: Some(series.tvdb_id.clone()),
        media_kind: Some(MediaKind::Tv),
        ..Default::default()
    };
    let Some(request) = ctx.correlator.resolve(&keys).await? else {
        info!(tvdb_id = %series.tvdb_id, "import event had no matching active request");
        return Ok(());
    };

    let is_anime = IsAnime::parse(&request.is_anime).is_true();
    let target = crate::domain::state_machine::post_import_target(is_anime);
    let now = Utc::now().to_rfc3339();
    let txn = ctx.store.begin().await?;

    for file in &episode_files {
        let Some(episode) =
            crate::db::repositories::episode::EpisodeRepository::find_by_season_episode_in_txn(
                &txn,
                request.request_id,
                file.season_number,
                file.episode_number,
            )
            .await?
        else {
            continue;
        };
        let mut active: episodes::ActiveModel = episode.into();
        active.final_path = Set(Some(file.path.clone()));
        active.state = Set(target.as_str().to_string());
        active.updated_at = Set(now.clone());
        active.update(&txn).await?;
    }

    let all_episodes =
        crate::db::repositories::episode::EpisodeRepository::for_request_in_txn(&txn, request.request_id)
            .await?;
    let states: Vec<RequestState> = all_episodes
        .iter()
        .map(|e| RequestState::parse(&e.state).unwrap_or(target))
        .collect();

    let mut updated_request = request;
    let mut last_applied = None;
    if let Some(aggregated) = aggregate(&states) {
        let (req, applied) = apply_request_transition(
            &txn,
            updated_request,
            aggregated,
            ServiceLabel::IndexerTv,
            "import",
            "episode(s) imported",
        )
        .await?;
        updated_request = req;
        last_applied = applied;
    }

    txn.commit().await?;

    if let Some(applied) = last_applied {
        ctx.broadcast(NotificationEvent::RequestTransitioned {
            request_id: updated_request.request_id,
            from: applied.from,
            to: applied.to,
        });
    }
    Ok(())
}

async fn handle_series_delete(
    ctx: &IngestContext,
    series: SeriesPayload,
    deleted_files: bool,
) -> anyhow::Result<()> {
    let keys = CorrelationKeys {
        tvdb_id: Some(series.tvdb_id.clone()),
        media_kind: Some(MediaKind::Tv),
        ..Default::default()
    };
    let Some(request) = ctx.correlator.resolve(&keys).await? else {
        return Ok(());
    };

    deletion::orchestrate(
        ctx,
        DeletionRequest {
            request,
            source: crate::domain::model::DeletionSource::IndexerB,
            actor_user_id: None,
            actor_display_name: None,
            delete_files: deleted_files,
        },
    )
    .await?;
    Ok(())
}

async fn handle_episode_delete(
    ctx: &IngestContext,
    series: SeriesPayload,
    _episodes: Vec<EpisodePayload>,
    _deleted_files: bool,
) -> anyhow::Result<()> {
    // A partial episode-file delete within an otherwise-kept series does
    // not remove the MediaRequest; spec §4.H models deletion at the
    // request granularity only. Surface it as an audit log line instead.
    info!(tvdb_id = %series.tvdb_id, "episode file delete received; request-level deletion not triggered");
    Ok(())
}
