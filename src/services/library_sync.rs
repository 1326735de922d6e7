//! Two-phase library-sync backfill (spec §4.K), triggered manually from the
//! admin API. Phase 1 is required for correctness: any media-server item
//! with provider-id metadata that isn't represented by a MediaRequest gets
//! one created in AVAILABLE. Phase 2 (backfilling missing correlation ids on
//! existing requests) is explicitly not required for correctness per spec
//! and is left as a logged no-op stub.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use tracing::info;

use crate::clients::media_server::MediaServerClient;
use crate::db::Store;
use crate::domain::model::{IsAnime, MediaKind, RequestState, ServiceLabel};
use crate::entities::requests;
use crate::error::SyncError;
use crate::services::transitions::record_request_created;

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct SyncReport {
    pub created: i32,
    pub skipped: i32,
}

pub struct LibrarySyncJob {
    store: Arc<Store>,
    media_server: Arc<dyn MediaServerClient>,
}

impl LibrarySyncJob {
    pub fn new(store: Arc<Store>, media_server: Arc<dyn MediaServerClient>) -> Self {
        Self { store, media_server }
    }

    /// Budget: one bulk media-server query, one bulk store query; every
    /// per-item decision after that is in-memory (spec §4.K "O(1) per
    /// external service, not O(items)").
    pub async fn run_backfill(&self) -> Result<SyncReport, SyncError> {
        let items = self.media_server.list_items_with_provider_ids().await?;
        let existing = self.store.list_all_requests().await?;

        let known_ids: std::collections::HashSet<String> = existing
            .iter()
            .flat_map(|r| {
                [r.content_db_id.clone(), r.tvdb_id.clone(), r.media_server_id.clone()]
                    .into_iter()
                    .flatten()
            })
            .collect();

        let mut report = SyncReport::default();

        for item in items {
            let provider_id = item
                .provider_ids
                .get("tmdb")
                .or_else(|| item.provider_ids.get("tvdb"))
                .or_else(|| item.provider_ids.get("imdb"));

            let already_known = known_ids.contains(&item.id)
                || provider_id.is_some_and(|id| known_ids.contains(id));
            if already_known {
                report.skipped += 1;
                continue;
            }

            self.create_backfilled_request(&item).await?;
            report.created += 1;
        }

        info!(created = report.created, skipped = report.skipped, "library sync backfill complete");
        self.run_id_backfill().await;
        Ok(report)
    }

    async fn create_backfilled_request(
        &self,
        item: &crate::clients::media_server::MediaServerItem,
    ) -> Result<(), SyncError> {
        let media_kind = if item.provider_ids.contains_key("tvdb") {
            MediaKind::Tv
        } else {
            MediaKind::Movie
        };
        let now = Utc::now().to_rfc3339();
        let active = requests::ActiveModel {
            request_id: Default::default(),
            request_manager_id: Set(None),
            content_db_id: Set(item.provider_ids.get("tmdb").or_else(|| item.provider_ids.get("imdb")).cloned()),
            tvdb_id: Set(item.provider_ids.get("tvdb").cloned()),
            downloader_a_id: Set(None),
            downloader_b_id: Set(None),
            content_hash: Set(None),
            media_server_id: Set(Some(item.id.clone())),
            media_kind: Set(media_kind.as_str().to_string()),
            is_anime: Set(IsAnime::Unknown.as_str().to_string()),
            title: Set(item.id.clone()),
            year: Set(None),
            poster_url: Set(None),
            requesting_user: Set("system".to_string()),
            quality_label: Set(None),
            indexer_label: Set(None),
            requested_season_descriptor: Set(None),
            file_size: Set(None),
            release_group_label: Set(None),
            state: Set(RequestState::Available.as_str().to_string()),
            download_percentage: Set(100.0),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            available_at: Set(Some(now)),
            final_path: Set(item.path.clone()),
        };

        let txn = self.store.begin().await?;
        let model = active
            .insert(&txn)
            .await
            .map_err(crate::error::StoreError::Database)?;
        record_request_created(
            &txn,
            model.request_id,
            RequestState::Available,
            ServiceLabel::LibrarySync,
            "backfilled from existing media-server library during sync",
        )
        .await
        .map_err(|e| {
            SyncError::Store(crate::error::StoreError::Database(sea_orm::DbErr::Custom(
                e.to_string(),
            )))
        })?;
        txn.commit()
            .await
            .map_err(crate::error::StoreError::Database)?;
        Ok(())
    }

    /// Phase 2 (spec §4.K: "planned, not required for correctness"). Left
    /// unimplemented on purpose; never overwrite a non-null field is the
    /// constraint that would govern it if it's built out.
    async fn run_id_backfill(&self) {
        info!("library sync phase 2 (id backfill) is not implemented; skipping");
    }
}
