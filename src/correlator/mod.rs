//! Resolves heterogeneous inbound events onto the right active request
//! (spec §4.B). Every query here is scoped to the active set by the
//! underlying `Store` repository methods — AVAILABLE/FAILED rows are never
//! returned, which is what lets a re-request create a fresh row instead of
//! being absorbed by the previous completed one.

pub mod import_folder;

use std::path::Path;
use std::sync::Arc;

use crate::db::Store;
use crate::domain::model::MediaKind;
use crate::entities::{episodes, requests};
use crate::error::{CorrelatorError, StoreError};

pub use import_folder::ImportFolderCache;

/// Candidate keys extracted from an inbound event. Any subset may be
/// populated; resolution tries them in the fixed priority from §4.B.
#[derive(Debug, Default, Clone)]
pub struct CorrelationKeys {
    pub content_hash: Option<String>,
    pub request_manager_id: Option<String>,
    pub content_db_id: Option<String>,
    pub tvdb_id: Option<String>,
    pub media_kind: Option<MediaKind>,
    pub final_path: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
}

pub struct Correlator {
    store: Arc<Store>,
    pub import_folders: ImportFolderCache,
}

impl Correlator {
    pub fn new(store: Arc<Store>, import_folders: ImportFolderCache) -> Self {
        Self {
            store,
            import_folders,
        }
    }

    pub async fn resolve(
        &self,
        keys: &CorrelationKeys,
    ) -> Result<Option<requests::Model>, CorrelatorError> {
        if let Some(hash) = keys.content_hash.as_deref() {
            if let Some(req) = self.store.request_by_content_hash(hash).await? {
                return Ok(Some(req));
            }
            if let Some(req) = self.resolve_by_episode_hash(hash).await? {
                return Ok(Some(req));
            }
        }

        if let Some(id) = keys.request_manager_id.as_deref() {
            if let Some(req) = self.store.request_by_request_manager_id(id).await? {
                return Ok(Some(req));
            }
        }

        if let (Some(id), Some(kind)) = (keys.content_db_id.as_deref(), keys.media_kind) {
            if let Some(req) = self.store.request_by_content_db_id(id, kind.as_str()).await? {
                return Ok(Some(req));
            }
        }

        if let (Some(id), Some(kind)) = (keys.tvdb_id.as_deref(), keys.media_kind) {
            if let Some(req) = self.store.request_by_tvdb_id(id, kind.as_str()).await? {
                return Ok(Some(req));
            }
        }

        if let Some(path) = keys.final_path.as_deref() {
            if let Some(req) = self.resolve_by_path(path).await? {
                return Ok(Some(req));
            }
        }

        let any_upstream_key = keys.content_hash.is_some()
            || keys.request_manager_id.is_some()
            || keys.content_db_id.is_some()
            || keys.tvdb_id.is_some()
            || keys.final_path.is_some();

        if !any_upstream_key {
            if let (Some(title), Some(year)) = (keys.title.as_deref(), keys.year) {
                return self.resolve_by_title_year(title, year).await;
            }
        }

        Ok(None)
    }

    async fn resolve_by_episode_hash(
        &self,
        hash: &str,
    ) -> Result<Option<requests::Model>, CorrelatorError> {
        let episodes = self.store.episodes_by_content_hash(hash).await?;
        let mut candidates = Vec::new();
        for episode in episodes {
            if let Some(req) = self.store.get_active_request(episode.request_id).await? {
                candidates.push(req);
            }
        }
        Ok(pick_most_recent(candidates))
    }

    /// Request-level final-path match: exact, then suffix-after-normalizing
    /// against every known import-folder root, then basename fallback
    /// scoped to a shared parent directory (§4.B path rules).
    async fn resolve_by_path(
        &self,
        path: &str,
    ) -> Result<Option<requests::Model>, CorrelatorError> {
        if let Some(req) = self.store.request_by_final_path_exact(path).await? {
            return Ok(Some(req));
        }

        let all_active = self.store.list_active_requests().await?;
        let relative = path.trim_start_matches('/');

        let suffix_matches: Vec<_> = all_active
            .iter()
            .filter(|r| {
                r.final_path
                    .as_deref()
                    .is_some_and(|p| p.trim_start_matches('/').ends_with(relative))
            })
            .cloned()
            .collect();
        if let Some(req) = pick_most_recent(suffix_matches) {
            return Ok(Some(req));
        }

        let basename = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path);
        let basename_matches: Vec<_> = all_active
            .into_iter()
            .filter(|r| {
                r.final_path.as_deref().is_some_and(|p| {
                    Path::new(p).file_name().and_then(|n| n.to_str()) == Some(basename)
                })
            })
            .collect();

        if basename_matches.len() > 1 {
            let probe_parent = parent_component(path);
            let parent_matches: Vec<_> = basename_matches
                .iter()
                .filter(|r| r.final_path.as_deref().and_then(parent_component) == probe_parent)
                .cloned()
                .collect();
            let narrowed = if parent_matches.is_empty() { basename_matches } else { parent_matches };

            if narrowed.len() > 1 {
                return Err(CorrelatorError::Ambiguous(format!(
                    "{} requests share basename {} even after parent-directory restriction",
                    narrowed.len(),
                    basename
                )));
            }
            return Ok(narrowed.into_iter().next());
        }

        Ok(pick_most_recent(basename_matches))
    }

    /// Resolves an episode by an anime-service event-relative path: builds
    /// absolute candidates under every import-folder root, then matches
    /// against stored episode final_path the same way as request paths.
    pub async fn resolve_episode_by_relative_path(
        &self,
        relative_path: &str,
    ) -> Result<Option<(requests::Model, episodes::Model)>, CorrelatorError> {
        let candidates = self
            .import_folders
            .resolve_absolute(relative_path)
            .await
            .map_err(|_| {
                CorrelatorError::Ambiguous(
                    "failed to fetch import-folder metadata for path resolution".to_string(),
                )
            })?;

        for candidate in &candidates {
            if let Some(episode) = self.store.episode_by_final_path(candidate).await? {
                if let Some(req) = self.store.get_active_request(episode.request_id).await? {
                    return Ok(Some((req, episode)));
                }
            }
        }

        let basename = Path::new(relative_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(relative_path);
        let all_active = self.store.list_active_requests().await?;
        let mut matches = Vec::new();
        for req in all_active {
            for episode in self.store.episodes_for_request(req.request_id).await? {
                if episode.final_path.as_deref().is_some_and(|p| {
                    Path::new(p).file_name().and_then(|n| n.to_str()) == Some(basename)
                }) {
                    matches.push((req.clone(), episode));
                }
            }
        }

        if matches.len() > 1 {
            let probe_parent = parent_component(relative_path);
            let parent_matches: Vec<_> = matches
                .iter()
                .filter(|(_, ep)| ep.final_path.as_deref().and_then(parent_component) == probe_parent)
                .cloned()
                .collect();
            let narrowed = if parent_matches.is_empty() { matches } else { parent_matches };

            if narrowed.len() > 1 {
                return Err(CorrelatorError::Ambiguous(format!(
                    "{} episodes share basename {} even after parent-directory restriction",
                    narrowed.len(),
                    basename
                )));
            }
            return Ok(narrowed.into_iter().next());
        }

        Ok(matches.into_iter().next())
    }

    /// Request-level counterpart of [`Self::resolve_episode_by_relative_path`]
    /// for anime-service events that turn out to belong to a movie request
    /// rather than an episode: resolves the event-relative path to absolute
    /// candidates and runs the same path rules `resolve_by_path` uses for
    /// every other inbound path match.
    pub async fn resolve_request_by_relative_path(
        &self,
        relative_path: &str,
    ) -> Result<Option<requests::Model>, CorrelatorError> {
        let candidates = self
            .import_folders
            .resolve_absolute(relative_path)
            .await
            .map_err(|_| {
                CorrelatorError::Ambiguous(
                    "failed to fetch import-folder metadata for path resolution".to_string(),
                )
            })?;

        for candidate in &candidates {
            if let Some(req) = self.resolve_by_path(candidate).await? {
                return Ok(Some(req));
            }
        }
        Ok(None)
    }

    async fn resolve_by_title_year(
        &self,
        title: &str,
        year: i32,
    ) -> Result<Option<requests::Model>, CorrelatorError> {
        let candidates = self.store.request_candidates_by_year(year).await?;
        let needle = normalize_title(title);
        let matches: Vec<_> = candidates
            .into_iter()
            .filter(|r| normalize_title(&r.title) == needle)
            .collect();

        if matches.len() > 1 {
            return Err(CorrelatorError::Ambiguous(format!(
                "{} requests match title {:?} year {}",
                matches.len(),
                title,
                year
            )));
        }

        Ok(matches.into_iter().next())
    }
}

/// The name of a path's containing directory, used to disambiguate
/// basename-only matches per §4.B's "restrict by matching parent directory"
/// rule.
fn parent_component(path: &str) -> Option<&str> {
    Path::new(path).parent()?.file_name()?.to_str()
}

fn pick_most_recent(mut candidates: Vec<requests::Model>) -> Option<requests::Model> {
    candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    candidates.into_iter().next()
}

/// Lowercase, strip punctuation/whitespace runs, for last-resort fuzzy
/// title matching. Deliberately conservative: exact containment-free
/// substring matching is never used here since it produces cross-title
/// false positives (e.g. "Up" matching "Kung Fu Panda").
fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_title_strips_punctuation_and_case() {
        assert_eq!(normalize_title("Film (2020)"), "film2020");
        assert_eq!(normalize_title("  Spider-Man: Far From Home "), "spidermanfarfromhome");
    }

    #[test]
    fn pick_most_recent_prefers_latest_created_at() {
        let older = requests::Model {
            request_id: 1,
            request_manager_id: None,
            content_db_id: None,
            tvdb_id: None,
            downloader_a_id: None,
            downloader_b_id: None,
            content_hash: None,
            media_server_id: None,
            media_kind: "movie".into(),
            is_anime: "false".into(),
            title: "A".into(),
            year: None,
            poster_url: None,
            requesting_user: "u".into(),
            quality_label: None,
            indexer_label: None,
            requested_season_descriptor: None,
            file_size: None,
            release_group_label: None,
            state: "REQUESTED".into(),
            download_percentage: 0.0,
            created_at: "2020-01-01T00:00:00Z".into(),
            updated_at: "2020-01-01T00:00:00Z".into(),
            available_at: None,
            final_path: None,
        };
        let mut newer = older.clone();
        newer.request_id = 2;
        newer.created_at = "2021-01-01T00:00:00Z".into();

        let picked = pick_most_recent(vec![older, newer]).unwrap();
        assert_eq!(picked.request_id, 2);
    }
}
