use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::clients::anime_service::{AnimeServiceClient, ImportFolder};
use crate::error::ClientError;

/// Cache of anime-service import-folder metadata (spec §4.B, Design Notes
/// "Cache of anime-service import folders"). TV and movies live under
/// different import roots, so path correlation needs the actual folder
/// list rather than one hardcoded prefix. Scoped acquisition with TTL,
/// single-flight refresh so concurrent path lookups don't double-fetch.
pub struct ImportFolderCache {
    client: Arc<dyn AnimeServiceClient>,
    ttl: Duration,
    inner: Mutex<Option<(Instant, Arc<Vec<ImportFolder>>)>>,
}

impl ImportFolderCache {
    pub fn new(client: Arc<dyn AnimeServiceClient>, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            inner: Mutex::new(None),
        }
    }

    pub async fn get(&self) -> Result<Arc<Vec<ImportFolder>>, ClientError> {
        let mut guard = self.inner.lock().await;
        if let Some((fetched_at, folders)) = guard.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(folders.clone());
            }
        }
        let folders = Arc::new(self.client.list_import_folders().await?);
        *guard = Some((Instant::now(), folders.clone()));
        Ok(folders)
    }

    /// Drop the cached value so the next `get` refetches. Invoked on config
    /// reload at startup.
    pub async fn invalidate(&self) {
        *self.inner.lock().await = None;
    }

    /// Resolve an event-relative path (as emitted by the anime service) to
    /// an absolute candidate path by joining it under the best-matching
    /// import folder root.
    pub async fn resolve_absolute(
        &self,
        relative: &str,
    ) -> Result<Vec<String>, ClientError> {
        let folders = self.get().await?;
        let relative = relative.trim_start_matches('/');
        Ok(folders
            .iter()
            .map(|f| format!("{}/{}", f.root_path.trim_end_matches('/'), relative))
            .collect())
    }
}
