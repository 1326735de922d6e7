//! One adapter per external event source (spec §4.E). Each adapter performs
//! extract → correlate → mutate → transition → broadcast without blocking
//! the other sources, and never surfaces an error to its caller except on
//! malformed payloads (spec §7 propagation policy).

pub mod indexer_movies;
pub mod indexer_tv;
pub mod media_server;
pub mod request_manager;
pub mod torrent;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;

use crate::clients::indexer_movies::IndexerMoviesClient;
use crate::clients::indexer_tv::IndexerTvClient;
use crate::clients::media_server::MediaServerClient;
use crate::clients::request_manager::RequestManagerClient;
use crate::clients::torrent::TorrentClient;
use crate::correlator::Correlator;
use crate::db::Store;
use crate::domain::events::NotificationEvent;

/// Shared dependencies every ingest adapter needs. Grouped so adding a new
/// adapter doesn't mean widening every function signature in this module.
#[derive(Clone)]
pub struct IngestContext {
    pub store: Arc<Store>,
    pub correlator: Arc<Correlator>,
    pub bus: broadcast::Sender<NotificationEvent>,
    pub media_server: Arc<dyn MediaServerClient>,
    pub torrent: Arc<dyn TorrentClient>,
    pub indexer_movies: Arc<dyn IndexerMoviesClient>,
    pub indexer_tv: Arc<dyn IndexerTvClient>,
    pub request_manager: Arc<dyn RequestManagerClient>,
}

impl IngestContext {
    /// Broadcasts are best-effort: a `SendError` just means there were no
    /// subscribers, which is the common case and not worth logging.
    pub fn broadcast(&self, event: NotificationEvent) {
        let _ = self.bus.send(event);
    }

    pub fn broadcast_ambiguous(&self, detail: impl Into<String>) {
        let detail = detail.into();
        warn!(%detail, "correlation ambiguous");
        self.broadcast(NotificationEvent::CorrelationAmbiguous { detail });
    }
}
