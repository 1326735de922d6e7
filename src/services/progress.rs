//! Torrent-client progress provider (spec §4.F). Polls adaptively: fast
//! while any active request is mid-download, slow otherwise. Never touches a
//! torrent with no matching active request — those are old completed
//! requests that must never be resurrected.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use tracing::{debug, warn};

use crate::clients::torrent::TorrentClient;
use crate::constants::{DEFAULT_POLL_FAST_SECS, DEFAULT_POLL_SLOW_SECS, SIGNIFICANT_PROGRESS_DELTA};
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::domain::model::RequestState;
use crate::entities::{episodes, requests};

pub struct ProgressProvider {
    store: Arc<Store>,
    torrent: Arc<dyn TorrentClient>,
    bus: tokio::sync::broadcast::Sender<crate::domain::events::NotificationEvent>,
    fast_interval: Duration,
    slow_interval: Duration,
}

impl ProgressProvider {
    pub fn new(
        store: Arc<Store>,
        torrent: Arc<dyn TorrentClient>,
        bus: tokio::sync::broadcast::Sender<NotificationEvent>,
    ) -> Self {
        Self {
            store,
            torrent,
            bus,
            fast_interval: Duration::from_secs(DEFAULT_POLL_FAST_SECS),
            slow_interval: Duration::from_secs(DEFAULT_POLL_SLOW_SECS),
        }
    }

    pub fn with_intervals(mut self, fast: Duration, slow: Duration) -> Self {
        self.fast_interval = fast;
        self.slow_interval = slow;
        self
    }

    /// Runs forever, re-evaluating the poll cadence after every cycle.
    pub async fn run(self) {
        loop {
            let interval = match self.poll_once().await {
                Ok(fast) if fast => self.fast_interval,
                Ok(_) => self.slow_interval,
                Err(err) => {
                    warn!(%err, "progress poll cycle failed");
                    self.slow_interval
                }
            };
            tokio::time::sleep(interval).await;
        }
    }

    /// Runs a single poll cycle; returns whether the fast interval should be
    /// used for the next cycle (i.e. at least one request is still
    /// in-flight).
    async fn poll_once(&self) -> anyhow::Result<bool> {
        let active = self.store.list_active_requests().await?;
        let in_flight: Vec<&requests::Model> = active
            .iter()
            .filter(|r| {
                matches!(
                    RequestState::parse(&r.state),
                    Some(RequestState::Grabbing | RequestState::Downloading)
                )
            })
            .collect();

        if in_flight.is_empty() {
            return Ok(false);
        }

        let hashes: Vec<String> = in_flight
            .iter()
            .filter_map(|r| r.content_hash.clone())
            .collect();
        if hashes.is_empty() {
            return Ok(true);
        }

        let progresses = self.torrent.progress_for_hashes(&hashes).await?;
        for progress in progresses {
            if let Err(err) = self.apply_progress(&active, &progress).await {
                warn!(%err, hash = %progress.hash, "failed to apply torrent progress");
            }
        }

        Ok(true)
    }

    async fn apply_progress(
        &self,
        active: &[requests::Model],
        progress: &crate::clients::torrent::TorrentProgress,
    ) -> anyhow::Result<()> {
        let hash = progress.hash.to_lowercase();
        let percentage = (progress.progress * 100.0).clamp(0.0, 100.0);

        let Some(request) = active.iter().find(|r| r.content_hash.as_deref() == Some(hash.as_str())) else {
            return Ok(());
        };

        let current = RequestState::parse(&request.state).unwrap_or(RequestState::Grabbing);
        let delta = (percentage - request.download_percentage).abs();
        if delta > SIGNIFICANT_PROGRESS_DELTA {
            debug!(request_id = request.request_id, %hash, percentage, "significant progress change");
        }

        let target = if percentage >= 100.0 {
            Some(RequestState::Downloaded)
        } else if percentage > 0.0 && current == RequestState::Grabbing {
            Some(RequestState::Downloading)
        } else {
            None
        };

        let now = Utc::now().to_rfc3339();
        let txn = self.store.begin().await?;

        let mut active_model: requests::ActiveModel = request.clone().into();
        active_model.download_percentage = Set(percentage);
        active_model.updated_at = Set(now.clone());
        let mut updated = active_model.update(&txn).await?;

        let mut applied = None;
        if let Some(target) = target {
            let (req, app) = crate::services::transitions::apply_request_transition(
                &txn,
                updated,
                target,
                crate::domain::model::ServiceLabel::ProgressProvider,
                "progress",
                &format!("progress reached {percentage:.1}%"),
            )
            .await?;
            updated = req;
            applied = app;

            if target == RequestState::Downloading || target == RequestState::Downloaded {
                for episode in
                    crate::db::repositories::episode::EpisodeRepository::for_request_in_txn(&txn, updated.request_id)
                        .await?
                {
                    if episode.content_hash.as_deref() != Some(hash.as_str()) {
                        continue;
                    }
                    let ep_current = RequestState::parse(&episode.state).unwrap_or(RequestState::Grabbing);
                    if crate::domain::state_machine::check_transition(
                        crate::domain::state_machine::FsmKind::Episode,
                        ep_current,
                        target,
                    )
                    .is_ok()
                    {
                        let mut ep_active: episodes::ActiveModel = episode.into();
                        ep_active.state = Set(target.as_str().to_string());
                        ep_active.updated_at = Set(now.clone());
                        ep_active.update(&txn).await?;
                    }
                }
            }
        }

        txn.commit().await?;

        let _ = self.bus.send(NotificationEvent::RequestProgress {
            request_id: updated.request_id,
            percentage,
        });
        if let Some(applied) = applied {
            let _ = self.bus.send(NotificationEvent::RequestTransitioned {
                request_id: updated.request_id,
                from: applied.from,
                to: applied.to,
            });
        }

        Ok(())
    }
}
