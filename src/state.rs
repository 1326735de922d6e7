//! Shared application state wiring every client, repository facade, and
//! background service off of one `Config` (teacher pattern: `SharedState`).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, broadcast};

use crate::clients::anime_service::HttpAnimeServiceClient;
use crate::clients::indexer_movies::HttpIndexerMoviesClient;
use crate::clients::indexer_tv::HttpIndexerTvClient;
use crate::clients::media_server::{HttpMediaServerClient, MediaServerClient};
use crate::clients::request_manager::HttpRequestManagerClient;
use crate::clients::torrent::{HttpTorrentClient, TorrentClient};
use crate::config::Config;
use crate::correlator::Correlator;
use crate::correlator::import_folder::ImportFolderCache;
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::services::ingest::IngestContext;

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Arc<Store>,

    pub correlator: Arc<Correlator>,

    pub event_bus: broadcast::Sender<NotificationEvent>,

    pub request_manager: Arc<HttpRequestManagerClient>,

    pub indexer_movies: Arc<HttpIndexerMoviesClient>,

    pub indexer_tv: Arc<HttpIndexerTvClient>,

    pub torrent: Arc<HttpTorrentClient>,

    pub anime_service: Arc<HttpAnimeServiceClient>,

    pub media_server: Arc<HttpMediaServerClient>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size);
        Self::init_with_event_bus(config, event_bus).await
    }

    pub async fn with_event_bus(
        config: Config,
        event_bus: broadcast::Sender<NotificationEvent>,
    ) -> anyhow::Result<Self> {
        Self::init_with_event_bus(config, event_bus).await
    }

    async fn init_with_event_bus(
        config: Config,
        event_bus: broadcast::Sender<NotificationEvent>,
    ) -> anyhow::Result<Self> {
        let store = Arc::new(Store::new(&config.general.database_path).await?);

        let request_manager = Arc::new(HttpRequestManagerClient::new(
            config.request_manager.base_url.clone(),
            config.request_manager.api_key.clone(),
            Duration::from_secs(config.request_manager.timeout_seconds),
        ));
        let indexer_movies = Arc::new(HttpIndexerMoviesClient::new(
            config.indexer_movies.base_url.clone(),
            config.indexer_movies.api_key.clone(),
            Duration::from_secs(config.indexer_movies.timeout_seconds),
        ));
        let indexer_tv = Arc::new(HttpIndexerTvClient::new(
            config.indexer_tv.base_url.clone(),
            config.indexer_tv.api_key.clone(),
            Duration::from_secs(config.indexer_tv.timeout_seconds),
        ));
        let torrent = Arc::new(HttpTorrentClient::new(
            config.torrent.base_url.clone(),
            config.torrent.username.clone(),
            config.torrent.password.clone(),
            Duration::from_secs(config.torrent.timeout_seconds),
        ));
        let anime_service = Arc::new(HttpAnimeServiceClient::new(
            config.anime_service.base_url.clone(),
            config.anime_service.api_key.clone(),
            Duration::from_secs(config.anime_service.timeout_seconds),
        ));
        let media_server = Arc::new(HttpMediaServerClient::new(
            config.media_server.base_url.clone(),
            config.media_server.api_key.clone(),
            Duration::from_secs(config.media_server.timeout_seconds),
        ));

        let import_folders = ImportFolderCache::new(
            anime_service.clone() as Arc<dyn crate::clients::anime_service::AnimeServiceClient>,
            Duration::from_secs(config.anime_service.import_folder_cache_ttl_seconds),
        );
        let correlator = Arc::new(Correlator::new(store.clone(), import_folders));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            correlator,
            event_bus,
            request_manager,
            indexer_movies,
            indexer_tv,
            torrent,
            anime_service,
            media_server,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }

    /// Builds the shared bag of dependencies every ingest adapter and
    /// background service depends on (spec §4.E/§4.F/§4.G/§4.H).
    #[must_use]
    pub fn ingest_context(&self) -> IngestContext {
        IngestContext {
            store: self.store.clone(),
            correlator: self.correlator.clone(),
            bus: self.event_bus.clone(),
            media_server: self.media_server.clone() as Arc<dyn MediaServerClient>,
            torrent: self.torrent.clone() as Arc<dyn TorrentClient>,
            indexer_movies: self.indexer_movies.clone()
                as Arc<dyn crate::clients::indexer_movies::IndexerMoviesClient>,
            indexer_tv: self.indexer_tv.clone() as Arc<dyn crate::clients::indexer_tv::IndexerTvClient>,
            request_manager: self.request_manager.clone()
                as Arc<dyn crate::clients::request_manager::RequestManagerClient>,
        }
    }
}
