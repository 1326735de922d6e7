//! Deletion orchestrator (spec §4.H). A delete can be triggered from the
//! dashboard or observed externally (an indexer or the media server already
//! removed its own copy) — either way the same eight-step sequence runs:
//! snapshot, create per-service sync rows, hard-delete the MediaRequest,
//! broadcast start, fan out to each applicable service in a fixed order,
//! schedule a delayed verification pass per confirmed service, and finally
//! close out the DeletionLog once every row is terminal.

use std::time::Duration;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use tracing::{error, info, warn};

use crate::db::repositories::request::RequestRepository;
use crate::domain::events::NotificationEvent;
use crate::domain::model::{
    DeletionSource, DeletionStatus, DeletionTargetService, MediaKind, SyncStatus,
};
use crate::entities::{deletion_logs, deletion_sync_events, requests};
use crate::error::DeletionError;
use crate::services::ingest::IngestContext;

/// Fixed fan-out order per spec §4.H step 6.
const FANOUT_ORDER: [DeletionTargetService; 6] = [
    DeletionTargetService::Torrent,
    DeletionTargetService::IndexerMovies,
    DeletionTargetService::IndexerTv,
    DeletionTargetService::AnimeService,
    DeletionTargetService::MediaServer,
    DeletionTargetService::RequestManager,
];

const VERIFICATION_DELAY: Duration = Duration::from_secs(crate::constants::DELETION_VERIFICATION_DELAY_SECS);

pub struct DeletionRequest {
    pub request: requests::Model,
    pub source: DeletionSource,
    pub actor_user_id: Option<String>,
    /// The media-server-resolved display name for `actor_user_id`, per spec
    /// §3's DeletionLog "Actor: user id and display name". `None` for
    /// dashboard-triggered deletes whose caller didn't have a name handy —
    /// falls back to the id itself rather than a generic placeholder.
    pub actor_display_name: Option<String>,
    pub delete_files: bool,
}

pub async fn orchestrate(ctx: &IngestContext, req: DeletionRequest) -> Result<(), DeletionError> {
    let DeletionRequest {
        request,
        source,
        actor_user_id,
        actor_display_name,
        delete_files,
    } = req;

    let media_kind = MediaKind::parse(&request.media_kind).unwrap_or(MediaKind::Movie);
    let plan = classify_services(&request, media_kind, delete_files);

    let actor_display_name = match (&actor_user_id, actor_display_name) {
        (Some(_), Some(name)) => name,
        (Some(id), None) => id.clone(),
        (None, _) => source.external_actor_display().to_string(),
    };

    let now = Utc::now().to_rfc3339();
    let log_active = deletion_logs::ActiveModel {
        deletion_log_id: Default::default(),
        request_id: Set(request.request_id),
        title: Set(request.title.clone()),
        media_kind: Set(request.media_kind.clone()),
        request_manager_id: Set(request.request_manager_id.clone()),
        content_db_id: Set(request.content_db_id.clone()),
        tvdb_id: Set(request.tvdb_id.clone()),
        downloader_a_id: Set(request.downloader_a_id.clone()),
        downloader_b_id: Set(request.downloader_b_id.clone()),
        content_hash: Set(request.content_hash.clone()),
        media_server_id: Set(request.media_server_id.clone()),
        poster_url: Set(request.poster_url.clone()),
        year: Set(request.year),
        source: Set(source.as_str().to_string()),
        actor_user_id: Set(actor_user_id),
        actor_display_name: Set(actor_display_name),
        delete_files: Set(delete_files),
        status: Set(DeletionStatus::InProgress.as_str().to_string()),
        initiated_at: Set(now),
        completed_at: Set(None),
    };

    let txn = ctx.store.begin().await?;
    let log = deletion_logs::Entity::insert(log_active)
        .exec_with_returning(&txn)
        .await
        .map_err(crate::error::StoreError::Database)?;

    for service in FANOUT_ORDER {
        let (status, detail) = plan.status_for(service);
        let active = deletion_sync_events::ActiveModel {
            deletion_sync_event_id: Default::default(),
            deletion_log_id: Set(log.deletion_log_id),
            service_label: Set(service.as_str().to_string()),
            status: Set(status.as_str().to_string()),
            detail: Set(detail),
            error: Set(None),
            raw_response: Set(None),
            created_at: Set(Utc::now().to_rfc3339()),
        };
        active
            .insert(&txn)
            .await
            .map_err(crate::error::StoreError::Database)?;
    }

    RequestRepository::delete_in_txn(&txn, request.request_id).await?;
    txn.commit()
        .await
        .map_err(crate::error::StoreError::Database)?;

    ctx.broadcast(NotificationEvent::DeletionStarted {
        deletion_log_id: log.deletion_log_id,
        request_id: request.request_id,
    });

    fan_out(ctx, &request, log.deletion_log_id, &plan, delete_files).await;

    Ok(())
}

/// Per-service applicability, computed once up front (spec §4.H step 3).
/// `NotApplicable` is the wrong-kind/wrong-flavor case (e.g. indexer-B for a
/// movie); `NotNeeded` is the "should apply but has no id to act on" case,
/// which spec §4.H calls out as a warning-worthy surface on its own.
struct DeletionPlan {
    entries: Vec<(DeletionTargetService, SyncStatus, String)>,
}

impl DeletionPlan {
    fn status_for(&self, service: DeletionTargetService) -> (SyncStatus, String) {
        self.entries
            .iter()
            .find(|(s, ..)| *s == service)
            .map(|(_, status, detail)| (*status, detail.clone()))
            .unwrap_or((SyncStatus::NotApplicable, format!("{service} not applicable")))
    }

    fn is_pending(&self, service: DeletionTargetService) -> bool {
        matches!(self.status_for(service).0, SyncStatus::Pending)
    }
}

fn classify_services(
    request: &requests::Model,
    media_kind: MediaKind,
    delete_files: bool,
) -> DeletionPlan {
    use DeletionTargetService::{AnimeService, IndexerMovies, IndexerTv, MediaServer, RequestManager, Torrent};
    use SyncStatus::{NotApplicable, NotNeeded, Pending, Skipped};

    let is_anime = crate::domain::model::IsAnime::parse(&request.is_anime).is_true();
    let mut entries = Vec::new();

    entries.push(if request.content_hash.is_some() {
        (Torrent, Pending, "queued for torrent client".to_string())
    } else {
        (Torrent, NotApplicable, "no content hash on record".to_string())
    });

    let (indexer_service, indexer_applicable, indexer_id) = match media_kind {
        MediaKind::Movie => (IndexerMovies, true, request.downloader_a_id.is_some()),
        MediaKind::Tv => (IndexerTv, true, request.downloader_b_id.is_some()),
    };
    let other_indexer = match media_kind {
        MediaKind::Movie => IndexerTv,
        MediaKind::Tv => IndexerMovies,
    };
    entries.push(if !indexer_applicable {
        (indexer_service, NotApplicable, "wrong media kind".to_string())
    } else if !indexer_id {
        (indexer_service, NotNeeded, "no indexer id on record".to_string())
    } else {
        (indexer_service, Pending, "queued for indexer".to_string())
    });
    entries.push((other_indexer, NotApplicable, "wrong media kind".to_string()));

    entries.push(if !is_anime {
        (AnimeService, NotApplicable, "request is not anime".to_string())
    } else if !delete_files {
        (AnimeService, Skipped, "files retained, cross-reference left in place".to_string())
    } else {
        (AnimeService, Pending, "queued for anime service".to_string())
    });

    entries.push(if !delete_files {
        (MediaServer, Skipped, "files retained, library rescan skipped".to_string())
    } else if request.media_server_id.is_none() {
        (MediaServer, NotNeeded, "no media-server id on record".to_string())
    } else {
        (MediaServer, Pending, "queued for media-server rescan".to_string())
    });

    entries.push(if request.request_manager_id.is_some() {
        (RequestManager, Pending, "queued for request manager".to_string())
    } else {
        (RequestManager, NotNeeded, "no request-manager id on record".to_string())
    });

    DeletionPlan { entries }
}

async fn fan_out(
    ctx: &IngestContext,
    request: &requests::Model,
    deletion_log_id: i64,
    plan: &DeletionPlan,
    delete_files: bool,
) {
    let events = match ctx.store.sync_events_for_log(deletion_log_id).await {
        Ok(events) => events,
        Err(err) => {
            error!(%err, deletion_log_id, "failed to load sync events for fan-out");
            return;
        }
    };

    for service in FANOUT_ORDER {
        if !plan.is_pending(service) {
            continue;
        }
        let Some(event) = events.iter().find(|e| e.service_label == service.as_str()) else {
            continue;
        };

        mark(ctx, event.deletion_sync_event_id, SyncStatus::Acknowledged, "contacting service").await;

        let result = call_service(ctx, request, service, delete_files).await;

        match result {
            Ok(()) => {
                mark(ctx, event.deletion_sync_event_id, SyncStatus::Confirmed, "service confirmed deletion").await;
                schedule_verification(ctx, deletion_log_id, event.deletion_sync_event_id, service);
            }
            Err(err) => {
                warn!(%err, %service, request_id = request.request_id, "deletion fan-out call failed");
                mark_with_error(
                    ctx,
                    event.deletion_sync_event_id,
                    SyncStatus::Failed,
                    "service call failed",
                    err.to_string(),
                )
                .await;
            }
        }
    }

    finalize_if_terminal(ctx, deletion_log_id, request.request_id).await;
}

async fn call_service(
    ctx: &IngestContext,
    request: &requests::Model,
    service: DeletionTargetService,
    delete_files: bool,
) -> Result<(), crate::error::ClientError> {
    match service {
        DeletionTargetService::Torrent => {
            if let Some(hash) = &request.content_hash {
                ctx.torrent.delete_by_hash(hash, delete_files).await?;
            }
            Ok(())
        }
        DeletionTargetService::IndexerMovies => {
            if let Some(id) = &request.downloader_a_id {
                ctx.indexer_movies.delete_movie(id, delete_files).await?;
            }
            Ok(())
        }
        DeletionTargetService::IndexerTv => {
            if let Some(id) = &request.downloader_b_id {
                ctx.indexer_tv.delete_series(id, delete_files).await?;
            }
            Ok(())
        }
        DeletionTargetService::AnimeService => {
            // The anime service exposes no delete API of its own; its
            // cross-reference record is orphaned, not removed, so this is
            // always a no-op confirm rather than a real outbound call.
            Ok(())
        }
        DeletionTargetService::MediaServer => {
            ctx.media_server.trigger_library_rescan().await
        }
        DeletionTargetService::RequestManager => {
            if let Some(id) = &request.request_manager_id {
                ctx.request_manager.delete_request(id).await?;
            }
            Ok(())
        }
    }
}

/// Queues the §4.H step-7 re-check. Only the torrent client and media server
/// expose a lookup we can use to actually confirm absence; the other
/// services have no "get by id" call, so a confirmed delete against them is
/// accepted on trust once the original call succeeded.
fn schedule_verification(
    ctx: &IngestContext,
    deletion_log_id: i64,
    sync_event_id: i64,
    service: DeletionTargetService,
) {
    let ctx = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(VERIFICATION_DELAY).await;
        match verify_absent(&ctx, deletion_log_id, service).await {
            Ok(true) => {
                mark(&ctx, sync_event_id, SyncStatus::Verified, "confirmed absent on re-check").await;
            }
            Ok(false) => {
                mark_with_error(
                    &ctx,
                    sync_event_id,
                    SyncStatus::Failed,
                    "still present on re-check",
                    "entity still found at source after confirmed delete".to_string(),
                )
                .await;
            }
            Err(()) => {
                mark(&ctx, sync_event_id, SyncStatus::Verified, "re-check unsupported, accepted on trust").await;
            }
        }
        if let Ok(Some(log)) = ctx.store.get_deletion_log(deletion_log_id).await {
            finalize_if_terminal(&ctx, deletion_log_id, log.request_id).await;
        }
    });
}

/// `Ok(true)` = confirmed gone, `Ok(false)` = still present, `Err(())` =
/// this service has no re-fetch capability to check against.
async fn verify_absent(
    ctx: &IngestContext,
    deletion_log_id: i64,
    service: DeletionTargetService,
) -> Result<bool, ()> {
    let log = ctx
        .store
        .get_deletion_log(deletion_log_id)
        .await
        .ok()
        .flatten()
        .ok_or(())?;

    match service {
        DeletionTargetService::Torrent => {
            let hash = log.content_hash.ok_or(())?;
            ctx.torrent
                .progress_for_hashes(&[hash])
                .await
                .map(|results| results.is_empty())
                .map_err(|_| ())
        }
        DeletionTargetService::MediaServer => {
            let media_kind = MediaKind::parse(&log.media_kind).unwrap_or(MediaKind::Movie);
            let is_series = media_kind == MediaKind::Tv;
            let provider = if is_series { "tvdb" } else { "tmdb" };
            let provider_id = if is_series { log.tvdb_id } else { log.content_db_id };
            let provider_id = provider_id.ok_or(())?;
            ctx.media_server
                .search_by_provider_id(provider, &provider_id, is_series)
                .await
                .map(|item| item.is_none())
                .map_err(|_| ())
        }
        _ => Err(()),
    }
}

async fn mark(ctx: &IngestContext, sync_event_id: i64, status: SyncStatus, detail: &str) {
    if let Err(err) = ctx
        .store
        .update_sync_event_status(sync_event_id, status.as_str(), detail, None, None)
        .await
    {
        error!(%err, sync_event_id, "failed to update deletion sync event");
    }
}

async fn mark_with_error(
    ctx: &IngestContext,
    sync_event_id: i64,
    status: SyncStatus,
    detail: &str,
    error: String,
) {
    if let Err(err) = ctx
        .store
        .update_sync_event_status(sync_event_id, status.as_str(), detail, Some(error), None)
        .await
    {
        error!(%err, sync_event_id, "failed to update deletion sync event");
    }
}

async fn finalize_if_terminal(ctx: &IngestContext, deletion_log_id: i64, request_id: i64) {
    let events = match ctx.store.sync_events_for_log(deletion_log_id).await {
        Ok(events) => events,
        Err(err) => {
            error!(%err, deletion_log_id, "failed to load sync events while finalizing");
            return;
        }
    };
    let all_terminal = events
        .iter()
        .all(|e| SyncStatus::parse(&e.status).is_some_and(SyncStatus::is_terminal));
    if !all_terminal {
        return;
    }

    let Ok(Some(log)) = ctx.store.get_deletion_log(deletion_log_id).await else {
        return;
    };
    if log.completed_at.is_some() {
        return;
    }

    let final_status = if events
        .iter()
        .any(|e| e.status == SyncStatus::Failed.as_str())
    {
        DeletionStatus::Incomplete
    } else {
        DeletionStatus::Complete
    };

    let mut active: deletion_logs::ActiveModel = log.into();
    active.status = Set(final_status.as_str().to_string());
    active.completed_at = Set(Some(Utc::now().to_rfc3339()));
    let Ok(saved) = active.update(&ctx.store.conn).await else {
        return;
    };

    info!(deletion_log_id, %final_status, "deletion log finalized");
    ctx.broadcast(NotificationEvent::DeletionCompleted {
        deletion_log_id: saved.deletion_log_id,
        request_id,
        status: final_status,
    });
}
