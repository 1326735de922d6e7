//! Shared test scaffolding: an in-memory store plus no-op fake clients for
//! every external service, wired into an `IngestContext` the same way
//! `SharedState::ingest_context` does in production.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use waypoint::clients::anime_service::AnimeServiceClient;
use waypoint::clients::indexer_movies::IndexerMoviesClient;
use waypoint::clients::indexer_tv::IndexerTvClient;
use waypoint::clients::media_server::{MediaServerClient, MediaServerItem, MediaServerUser};
use waypoint::clients::request_manager::RequestManagerClient;
use waypoint::clients::torrent::{TorrentClient, TorrentProgress};
use waypoint::correlator::import_folder::ImportFolderCache;
use waypoint::correlator::Correlator;
use waypoint::db::Store;
use waypoint::domain::events::NotificationEvent;
use waypoint::services::ingest::IngestContext;

pub struct FakeRequestManagerClient;

#[async_trait]
impl RequestManagerClient for FakeRequestManagerClient {
    async fn delete_request(&self, _request_manager_id: &str) -> Result<(), waypoint::error::ClientError> {
        Ok(())
    }
}

pub struct FakeIndexerMoviesClient;

#[async_trait]
impl IndexerMoviesClient for FakeIndexerMoviesClient {
    async fn delete_movie(&self, _movie_service_id: &str, _delete_files: bool) -> Result<(), waypoint::error::ClientError> {
        Ok(())
    }
}

pub struct FakeIndexerTvClient;

#[async_trait]
impl IndexerTvClient for FakeIndexerTvClient {
    async fn delete_series(&self, _series_service_id: &str, _delete_files: bool) -> Result<(), waypoint::error::ClientError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTorrentClient {
    pub present_hashes: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl TorrentClient for FakeTorrentClient {
    async fn progress_for_hashes(
        &self,
        hashes: &[String],
    ) -> Result<Vec<TorrentProgress>, waypoint::error::ClientError> {
        let present = self.present_hashes.lock().unwrap();
        Ok(hashes
            .iter()
            .filter(|h| present.contains(h))
            .map(|h| TorrentProgress {
                hash: h.clone(),
                progress: 1.0,
            })
            .collect())
    }

    async fn delete_by_hash(&self, hash: &str, _delete_files: bool) -> Result<(), waypoint::error::ClientError> {
        self.present_hashes.lock().unwrap().retain(|h| h != hash);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMediaServerClient {
    pub items_by_provider_id: std::sync::Mutex<std::collections::HashMap<String, MediaServerItem>>,
    pub admin_user_id: Option<String>,
}

#[async_trait]
impl MediaServerClient for FakeMediaServerClient {
    async fn search_by_provider_id(
        &self,
        _provider: &str,
        provider_id: &str,
        _is_series: bool,
    ) -> Result<Option<MediaServerItem>, waypoint::error::ClientError> {
        Ok(self.items_by_provider_id.lock().unwrap().get(provider_id).cloned())
    }

    async fn search_by_provider_id_any_type(
        &self,
        _provider: &str,
        provider_id: &str,
    ) -> Result<Option<MediaServerItem>, waypoint::error::ClientError> {
        Ok(self.items_by_provider_id.lock().unwrap().get(provider_id).cloned())
    }

    async fn search_by_title_year(
        &self,
        _title: &str,
        _year: Option<i32>,
    ) -> Result<Option<MediaServerItem>, waypoint::error::ClientError> {
        Ok(None)
    }

    async fn list_items_with_provider_ids(&self) -> Result<Vec<MediaServerItem>, waypoint::error::ClientError> {
        Ok(self.items_by_provider_id.lock().unwrap().values().cloned().collect())
    }

    async fn trigger_library_rescan(&self) -> Result<(), waypoint::error::ClientError> {
        Ok(())
    }

    async fn validate_user_token(&self, _token: &str) -> Result<Option<MediaServerUser>, waypoint::error::ClientError> {
        Ok(self.admin_user_id.clone().map(|id| MediaServerUser {
            id,
            name: "test admin".to_string(),
        }))
    }
}

pub struct FakeAnimeServiceClient;

#[async_trait]
impl AnimeServiceClient for FakeAnimeServiceClient {
    async fn list_import_folders(
        &self,
    ) -> Result<Vec<waypoint::clients::anime_service::ImportFolder>, waypoint::error::ClientError> {
        Ok(vec![waypoint::clients::anime_service::ImportFolder {
            id: 1,
            root_path: "/anime".to_string(),
        }])
    }
}

pub struct TestEnv {
    pub store: Arc<Store>,
    pub bus: broadcast::Sender<NotificationEvent>,
    pub torrent: Arc<FakeTorrentClient>,
    pub media_server: Arc<FakeMediaServerClient>,
}

impl TestEnv {
    pub async fn new() -> Self {
        let store = Arc::new(Store::new("sqlite::memory:").await.expect("in-memory store"));
        let (bus, _rx) = broadcast::channel(64);
        let torrent = Arc::new(FakeTorrentClient::default());
        let media_server = Arc::new(FakeMediaServerClient::default());
        Self {
            store,
            bus,
            torrent,
            media_server,
        }
    }

    pub fn ingest_context(&self) -> IngestContext {
        let anime_service: Arc<dyn AnimeServiceClient> = Arc::new(FakeAnimeServiceClient);
        let import_folders = ImportFolderCache::new(anime_service, std::time::Duration::from_secs(60));
        let correlator = Arc::new(Correlator::new(self.store.clone(), import_folders));

        IngestContext {
            store: self.store.clone(),
            correlator,
            bus: self.bus.clone(),
            media_server: self.media_server.clone() as Arc<dyn MediaServerClient>,
            torrent: self.torrent.clone() as Arc<dyn TorrentClient>,
            indexer_movies: Arc::new(FakeIndexerMoviesClient) as Arc<dyn IndexerMoviesClient>,
            indexer_tv: Arc::new(FakeIndexerTvClient) as Arc<dyn IndexerTvClient>,
            request_manager: Arc::new(FakeRequestManagerClient) as Arc<dyn RequestManagerClient>,
        }
    }
}
