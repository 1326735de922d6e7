//! The "fallback checker" (spec §4.G). Runs every 30s and rescues requests
//! that ingest events alone never closed out — a media-server webhook that
//! never fired, an anime-service hub message that got dropped, and so on.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, Set};
use tracing::{info, warn};

use crate::clients::media_server::{MediaServerClient, MediaServerItem};
use crate::constants::{DEFAULT_STALENESS_WINDOW_MINUTES, VERIFIER_TICK_SECS};
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::domain::model::{IsAnime, MediaKind, RequestState, ServiceLabel};
use crate::entities::{episodes, requests};
use crate::services::transitions::apply_request_transition;

pub struct VerifierLoop {
    store: Arc<Store>,
    media_server: Arc<dyn MediaServerClient>,
    bus: tokio::sync::broadcast::Sender<NotificationEvent>,
    staleness_window: chrono::Duration,
}

impl VerifierLoop {
    pub fn new(
        store: Arc<Store>,
        media_server: Arc<dyn MediaServerClient>,
        bus: tokio::sync::broadcast::Sender<NotificationEvent>,
    ) -> Self {
        Self {
            store,
            media_server,
            bus,
            staleness_window: chrono::Duration::minutes(DEFAULT_STALENESS_WINDOW_MINUTES),
        }
    }

    pub fn with_staleness_window(mut self, minutes: i64) -> Self {
        self.staleness_window = chrono::Duration::minutes(minutes);
        self
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(Duration::from_secs(VERIFIER_TICK_SECS));
        loop {
            ticker.tick().await;
            if let Err(err) = self.tick().await {
                warn!(%err, "verifier tick failed");
            }
        }
    }

    /// Runs one verification pass immediately, for the `waypoint check` CLI command.
    pub async fn tick_once(&self) -> anyhow::Result<()> {
        self.tick().await
    }

    async fn tick(&self) -> anyhow::Result<()> {
        let now = Utc::now();
        let candidates: Vec<requests::Model> = self
            .store
            .list_active_requests()
            .await?
            .into_iter()
            .filter(|r| {
                matches!(
                    RequestState::parse(&r.state),
                    Some(RequestState::Downloaded | RequestState::Importing | RequestState::AnimeMatching)
                ) && is_stale(r, now, self.staleness_window)
            })
            .collect();

        if candidates.is_empty() {
            return Ok(());
        }

        let needs_rescan = candidates.iter().any(|r| {
            matches!(
                RequestState::parse(&r.state),
                Some(RequestState::Importing | RequestState::AnimeMatching)
            )
        });
        if needs_rescan {
            if let Err(err) = self.media_server.trigger_library_rescan().await {
                warn!(%err, "verifier library rescan failed");
            }
        }

        for request in candidates {
            if let Err(err) = self.verify_one(request).await {
                warn!(%err, "verifier lookup failed for request");
            }
        }
        Ok(())
    }

    async fn verify_one(&self, request: requests::Model) -> anyhow::Result<()> {
        let media_kind = MediaKind::parse(&request.media_kind).unwrap_or(MediaKind::Movie);
        let is_anime = IsAnime::parse(&request.is_anime).is_true();

        let Some(item) = self.lookup(&request, media_kind, is_anime).await? else {
            return Ok(());
        };

        let now = Utc::now().to_rfc3339();
        let txn = self.store.begin().await?;

        let mut active: requests::ActiveModel = request.into();
        active.media_server_id = Set(Some(item.id.clone()));
        active.updated_at = Set(now.clone());
        let updated = active.update(&txn).await?;

        for episode in
            crate::db::repositories::episode::EpisodeRepository::for_request_in_txn(&txn, updated.request_id)
                .await?
        {
            let mut ep_active: episodes::ActiveModel = episode.into();
            ep_active.media_server_id = Set(Some(item.id.clone()));
            ep_active.state = Set(RequestState::Available.as_str().to_string());
            ep_active.updated_at = Set(now.clone());
            ep_active.update(&txn).await?;
        }

        let (updated, applied) = apply_request_transition(
            &txn,
            updated,
            RequestState::Available,
            ServiceLabel::Verifier,
            "verified",
            "verifier confirmed item is live in media server",
        )
        .await?;
        txn.commit().await?;

        if let Some(applied) = applied {
            info!(request_id = updated.request_id, "verifier rescued stalled request");
            let _ = self.bus.send(NotificationEvent::RequestTransitioned {
                request_id: updated.request_id,
                from: applied.from,
                to: applied.to,
            });
        }
        Ok(())
    }

    /// Priority-ordered lookup per spec §4.G step 2. Each candidate query
    /// only fires if the request has the correlation id it needs; the first
    /// *playable* hit wins.
    async fn lookup(
        &self,
        request: &requests::Model,
        media_kind: MediaKind,
        is_anime: bool,
    ) -> anyhow::Result<Option<MediaServerItem>> {
        if media_kind == MediaKind::Tv {
            if let Some(id) = &request.tvdb_id {
                if let Some(item) = self.try_search(self.media_server.search_by_provider_id("tvdb", id, true)).await? {
                    return Ok(Some(item));
                }
            }
        }

        if media_kind == MediaKind::Movie {
            if let Some(id) = &request.content_db_id {
                if let Some(item) = self.try_search(self.media_server.search_by_provider_id("tmdb", id, false)).await? {
                    return Ok(Some(item));
                }
            }
        }

        if is_anime {
            if let Some(id) = &request.content_db_id {
                if let Some(item) = self.try_search(self.media_server.search_by_provider_id("tmdb", id, true)).await? {
                    return Ok(Some(item));
                }
            }
        }

        if let Some(id) = &request.content_db_id {
            if let Some(item) = self.try_search(self.media_server.search_by_provider_id_any_type("tmdb", id)).await? {
                return Ok(Some(item));
            }
        }

        if let Some(item) = self
            .try_search(self.media_server.search_by_title_year(&request.title, request.year))
            .await?
        {
            return Ok(Some(item));
        }

        Ok(None)
    }

    async fn try_search(
        &self,
        call: impl std::future::Future<Output = Result<Option<MediaServerItem>, crate::error::ClientError>>,
    ) -> anyhow::Result<Option<MediaServerItem>> {
        match call.await {
            Ok(Some(item)) if item.is_playable() => Ok(Some(item)),
            Ok(_) => Ok(None),
            Err(err) => {
                warn!(%err, "verifier media-server lookup failed");
                Ok(None)
            }
        }
    }
}

fn is_stale(request: &requests::Model, now: DateTime<Utc>, window: chrono::Duration) -> bool {
    let Ok(updated_at) = DateTime::parse_from_rfc3339(&request.updated_at) else {
        return false;
    };
    now.signed_duration_since(updated_at) >= window
}
