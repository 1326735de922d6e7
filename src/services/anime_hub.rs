//! Long-lived connection to the anime-metadata service's streaming hub
//! (spec §6 "Outbound (streaming)", feeds `shoko,file,movie,episode`).
//!
//! Per spec §5 "Shared-resource policy", this stream is strictly
//! single-threaded: events are drained and handled one at a time in this
//! task, never spawned out, because events within a batch concern the same
//! file and must stay ordered. Connection loss triggers a bounded-backoff
//! reconnect loop rather than ending the task.

use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use rand::Rng;
use sea_orm::{ActiveModelTrait, Set};
use tracing::{info, instrument, warn};

use crate::clients::anime_service::AnimeHubEvent;
use crate::domain::events::NotificationEvent;
use crate::domain::model::{RequestState, ServiceLabel};
use crate::entities::{episodes, requests};
use crate::services::ingest::IngestContext;
use crate::services::transitions::apply_request_transition;

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Runs the reconnect loop forever. Intended to be spawned once at startup
/// and left running until process shutdown.
pub async fn run(ctx: IngestContext, base_url: String, api_key: String) {
    let mut attempt: u32 = 0;
    loop {
        info!(attempt, "connecting to anime-service streaming hub");
        match connect_and_drain(&ctx, &base_url, &api_key).await {
            Ok(()) => {
                warn!("anime-service hub connection closed, reconnecting");
                attempt = 0;
            }
            Err(err) => {
                warn!(%err, attempt, "anime-service hub connection failed");
                attempt += 1;
            }
        }
        let base = Duration::from_millis(500 * 2u64.saturating_pow(attempt.min(6))).min(MAX_BACKOFF);
        let jitter_ms = rand::rng().random_range(0..=base.as_millis() as u64 / 4);
        tokio::time::sleep(base + Duration::from_millis(jitter_ms)).await;
    }
}

async fn connect_and_drain(
    ctx: &IngestContext,
    base_url: &str,
    api_key: &str,
) -> anyhow::Result<()> {
    let url = format!(
        "{}/hub?feeds=shoko,file,movie,episode",
        base_url.trim_end_matches('/')
    );
    let response = reqwest::Client::new()
        .get(&url)
        .header("apikey", api_key)
        .send()
        .await?
        .error_for_status()?;

    let mut stream = response.bytes_stream();
    let mut buf: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
        while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buf.drain(..=pos).collect();
            let line = &line[..line.len().saturating_sub(1)];
            if line.is_empty() {
                continue;
            }
            match serde_json::from_slice::<AnimeHubEvent>(line) {
                Ok(event) => {
                    if let Err(err) = handle_event(ctx, event).await {
                        warn!(%err, "anime-service hub event handling failed");
                    }
                }
                Err(err) => warn!(%err, "failed to decode anime-service hub message"),
            }
        }
    }
    Ok(())
}

#[instrument(skip_all)]
async fn handle_event(ctx: &IngestContext, event: AnimeHubEvent) -> anyhow::Result<()> {
    match event {
        AnimeHubEvent::FileMatched {
            file_id,
            relative_path,
            cross_references,
        } => handle_file_matched(ctx, file_id, relative_path, !cross_references.is_empty()).await,
        AnimeHubEvent::FileDetected { file_id, relative_path } => {
            info!(file_id, %relative_path, "anime hub: file detected");
            Ok(())
        }
        AnimeHubEvent::FileHashed { file_id, hash } => {
            info!(file_id, %hash, "anime hub: file hashed");
            Ok(())
        }
        AnimeHubEvent::FileDeleted { file_id } => {
            info!(file_id, "anime hub: file deleted upstream");
            Ok(())
        }
        AnimeHubEvent::SeriesUpdated { series_id, reason } => {
            info!(series_id, %reason, "anime hub: series updated");
            Ok(())
        }
        AnimeHubEvent::EpisodeUpdated { episode_id, reason } => {
            info!(episode_id, %reason, "anime hub: episode updated");
            Ok(())
        }
        AnimeHubEvent::MovieUpdated { movie_id, reason } => {
            info!(movie_id, %reason, "anime hub: movie updated");
            Ok(())
        }
    }
}

/// Locates the Episode or MediaRequest a matched file belongs to and moves
/// it to AVAILABLE (cross-referenced) or ANIME_MATCHING (still pending a
/// cross-reference), per spec §4.E.
async fn handle_file_matched(
    ctx: &IngestContext,
    file_id: i64,
    relative_path: String,
    has_cross_reference: bool,
) -> anyhow::Result<()> {
    let target = if has_cross_reference {
        RequestState::Available
    } else {
        RequestState::AnimeMatching
    };

    if let Some((_, episode)) = ctx
        .correlator
        .resolve_episode_by_relative_path(&relative_path)
        .await?
    {
        return apply_to_episode(ctx, episode, file_id, target).await;
    }

    if let Some(request) = ctx
        .correlator
        .resolve_request_by_relative_path(&relative_path)
        .await?
    {
        return apply_to_request(ctx, request, target).await;
    }

    info!(file_id, %relative_path, "file-matched event had no matching episode or request");
    Ok(())
}

async fn apply_to_episode(
    ctx: &IngestContext,
    episode: episodes::Model,
    file_id: i64,
    target: RequestState,
) -> anyhow::Result<()> {
    let request_id = episode.request_id;
    let now = Utc::now().to_rfc3339();
    let txn = ctx.store.begin().await?;

    let mut active: episodes::ActiveModel = episode.into();
    active.anime_file_id = Set(Some(file_id.to_string()));
    active.state = Set(target.as_str().to_string());
    active.updated_at = Set(now.clone());
    active.update(&txn).await?;

    let all_episodes =
        crate::db::repositories::episode::EpisodeRepository::for_request_in_txn(&txn, request_id)
            .await?;
    let states: Vec<RequestState> = all_episodes
        .iter()
        .map(|e| RequestState::parse(&e.state).unwrap_or(target))
        .collect();

    let Some(request) = crate::db::repositories::request::RequestRepository::get_in_txn(&txn, request_id).await? else {
        txn.commit().await?;
        return Ok(());
    };

    let mut applied = None;
    let mut updated_request = request;
    if let Some(aggregated) = crate::domain::aggregator::aggregate(&states) {
        let (req, app) = apply_request_transition(
            &txn,
            updated_request,
            aggregated,
            ServiceLabel::AnimeService,
            "file_matched",
            "anime-service file match propagated from episode",
        )
        .await?;
        updated_request = req;
        applied = app;
    }
    txn.commit().await?;

    if let Some(applied) = applied {
        ctx.broadcast(NotificationEvent::RequestTransitioned {
            request_id: updated_request.request_id,
            from: applied.from,
            to: applied.to,
        });
    }
    Ok(())
}

async fn apply_to_request(
    ctx: &IngestContext,
    request: requests::Model,
    target: RequestState,
) -> anyhow::Result<()> {
    let txn = ctx.store.begin().await?;
    let (updated, applied) = apply_request_transition(
        &txn,
        request,
        target,
        ServiceLabel::AnimeService,
        "file_matched",
        "anime-service matched movie file",
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
