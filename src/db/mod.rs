use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::info;

pub mod migrator;
pub mod repositories;

use crate::entities::{deletion_logs, deletion_sync_events, episodes, requests, timeline_events};
use repositories::deletion::DeletionRepository;
use repositories::episode::EpisodeRepository;
use repositories::request::RequestRepository;
use repositories::timeline::TimelineRepository;

pub use repositories::deletion::DeletionRepository as DeletionRepo;

/// Facade over the transactional store (spec §4.A). Thin per-aggregate
/// repositories hold their own connection clone for simple reads; anything
/// that must mutate several tables atomically borrows `conn` directly and
/// opens its own transaction, so the state machine and timeline writer
/// share one commit boundary.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with("sqlite::memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn begin(&self) -> Result<DatabaseTransaction> {
        Ok(self.conn.begin().await?)
    }

    fn requests_repo(&self) -> RequestRepository {
        RequestRepository::new(self.conn.clone())
    }

    fn episodes_repo(&self) -> EpisodeRepository {
        EpisodeRepository::new(self.conn.clone())
    }

    fn timeline_repo(&self) -> TimelineRepository {
        TimelineRepository::new(self.conn.clone())
    }

    fn deletion_repo(&self) -> DeletionRepository {
        DeletionRepository::new(self.conn.clone())
    }

    // ── Requests ─────────────────────────────────────────────────────────

    pub async fn get_request(&self, id: i64) -> Result<Option<requests::Model>> {
        Ok(self.requests_repo().get(id).await?)
    }

    pub async fn get_active_request(&self, id: i64) -> Result<Option<requests::Model>> {
        Ok(self.requests_repo().get_active(id).await?)
    }

    pub async fn list_active_requests(&self) -> Result<Vec<requests::Model>> {
        Ok(self.requests_repo().list_active().await?)
    }

    pub async fn list_all_requests(&self) -> Result<Vec<requests::Model>> {
        Ok(self.requests_repo().list_all().await?)
    }

    pub async fn request_by_content_hash(
        &self,
        hash: &str,
    ) -> Result<Option<requests::Model>> {
        Ok(self.requests_repo().by_content_hash(hash).await?)
    }

    pub async fn request_by_request_manager_id(
        &self,
        id: &str,
    ) -> Result<Option<requests::Model>> {
        Ok(self.requests_repo().by_request_manager_id(id).await?)
    }

    pub async fn request_by_content_db_id(
        &self,
        id: &str,
        media_kind: &str,
    ) -> Result<Option<requests::Model>> {
        Ok(self.requests_repo().by_content_db_id(id, media_kind).await?)
    }

    pub async fn request_by_tvdb_id(
        &self,
        id: &str,
        media_kind: &str,
    ) -> Result<Option<requests::Model>> {
        Ok(self.requests_repo().by_tvdb_id(id, media_kind).await?)
    }

    pub async fn request_by_final_path_exact(
        &self,
        path: &str,
    ) -> Result<Option<requests::Model>> {
        Ok(self.requests_repo().by_final_path_exact(path).await?)
    }

    pub async fn request_by_media_server_id(
        &self,
        id: &str,
    ) -> Result<Option<requests::Model>> {
        Ok(self.requests_repo().by_media_server_id(id).await?)
    }

    pub async fn request_candidates_by_year(
        &self,
        year: i32,
    ) -> Result<Vec<requests::Model>> {
        Ok(self.requests_repo().candidates_by_year(year).await?)
    }

    // ── Episodes ─────────────────────────────────────────────────────────

    pub async fn episodes_for_request(
        &self,
        request_id: i64,
    ) -> Result<Vec<episodes::Model>> {
        Ok(self.episodes_repo().for_request(request_id).await?)
    }

    pub async fn episodes_by_content_hash(
        &self,
        hash: &str,
    ) -> Result<Vec<episodes::Model>> {
        Ok(self.episodes_repo().by_content_hash(hash).await?)
    }

    pub async fn episode_by_final_path(
        &self,
        path: &str,
    ) -> Result<Option<episodes::Model>> {
        Ok(self.episodes_repo().by_final_path(path).await?)
    }

    // ── Timeline ─────────────────────────────────────────────────────────

    pub async fn timeline_for_request(
        &self,
        request_id: i64,
    ) -> Result<Vec<timeline_events::Model>> {
        Ok(self.timeline_repo().for_request(request_id).await?)
    }

    // ── Deletion ─────────────────────────────────────────────────────────

    pub async fn get_deletion_log(&self, id: i64) -> Result<Option<deletion_logs::Model>> {
        Ok(self.deletion_repo().get(id).await?)
    }

    pub async fn list_deletion_logs(&self, limit: u64) -> Result<Vec<deletion_logs::Model>> {
        Ok(self.deletion_repo().list(limit).await?)
    }

    pub async fn list_in_progress_deletion_logs(&self) -> Result<Vec<deletion_logs::Model>> {
        Ok(self.deletion_repo().list_in_progress().await?)
    }

    pub async fn create_deletion_log(
        &self,
        active: deletion_logs::ActiveModel,
    ) -> Result<deletion_logs::Model> {
        Ok(self.deletion_repo().create(active).await?)
    }

    pub async fn save_deletion_log(
        &self,
        active: deletion_logs::ActiveModel,
    ) -> Result<deletion_logs::Model> {
        Ok(self.deletion_repo().save(active).await?)
    }

    pub async fn sync_events_for_log(
        &self,
        deletion_log_id: i64,
    ) -> Result<Vec<deletion_sync_events::Model>> {
        Ok(self.deletion_repo().sync_events_for_log(deletion_log_id).await?)
    }

    pub async fn create_sync_event(
        &self,
        deletion_log_id: i64,
        service_label: &str,
        status: &str,
        detail: &str,
    ) -> Result<deletion_sync_events::Model> {
        Ok(self
            .deletion_repo()
            .create_sync_event(deletion_log_id, service_label, status, detail)
            .await?)
    }

    pub async fn update_sync_event_status(
        &self,
        id: i64,
        status: &str,
        detail: &str,
        error: Option<String>,
        raw_response: Option<String>,
    ) -> Result<()> {
        self.deletion_repo()
            .update_sync_event_status(id, status, detail, error, raw_response)
            .await?;
        Ok(())
    }
}
