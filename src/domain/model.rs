//! Plain domain enums shared across the correlator, state machine, store, and API.
//!
//! These are kept separate from the `sea-orm` entities in `crate::entities` so the
//! pure logic in [`crate::domain::state_machine`] and [`crate::domain::aggregator`]
//! never has to import `sea_orm`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a `MediaRequest` (and, with a restricted edge set, an `Episode`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    Requested,
    Approved,
    Grabbing,
    Downloading,
    Downloaded,
    Importing,
    AnimeMatching,
    Available,
    Failed,
}

impl RequestState {
    /// States excluded from the active set used by every correlation query.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Available | Self::Failed)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "REQUESTED",
            Self::Approved => "APPROVED",
            Self::Grabbing => "GRABBING",
            Self::Downloading => "DOWNLOADING",
            Self::Downloaded => "DOWNLOADED",
            Self::Importing => "IMPORTING",
            Self::AnimeMatching => "ANIME_MATCHING",
            Self::Available => "AVAILABLE",
            Self::Failed => "FAILED",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "REQUESTED" => Self::Requested,
            "APPROVED" => Self::Approved,
            "GRABBING" => Self::Grabbing,
            "DOWNLOADING" => Self::Downloading,
            "DOWNLOADED" => Self::Downloaded,
            "IMPORTING" => Self::Importing,
            "ANIME_MATCHING" => Self::AnimeMatching,
            "AVAILABLE" => Self::Available,
            "FAILED" => Self::Failed,
            _ => return None,
        })
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The media kind a `MediaRequest` was made for. Decides which indexer/downloader
/// pair is applicable and whether episodes exist at all.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "movie" => Some(Self::Movie),
            "tv" => Some(Self::Tv),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tri-state anime classification. `Unknown` is resolved via the bypass rule in
/// the state machine's branching policy the first time it matters (grab time).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsAnime {
    True,
    False,
    Unknown,
}

impl IsAnime {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::True => "true",
            Self::False => "false",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "true" => Self::True,
            "false" => Self::False,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn is_true(self) -> bool {
        matches!(self, Self::True)
    }
}

/// Source of an inbound event or a deletion, used in `TimelineEvent::emitter` and
/// `DeletionLog::source`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceLabel {
    Dashboard,
    RequestManager,
    IndexerMovies,
    IndexerTv,
    Torrent,
    AnimeService,
    MediaServer,
    External,
    Verifier,
    ProgressProvider,
    LibrarySync,
}

impl ServiceLabel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::RequestManager => "request-manager",
            Self::IndexerMovies => "indexer-movies",
            Self::IndexerTv => "indexer-tv",
            Self::Torrent => "torrent",
            Self::AnimeService => "anime-service",
            Self::MediaServer => "media-server",
            Self::External => "external",
            Self::Verifier => "verifier",
            Self::ProgressProvider => "progress-provider",
            Self::LibrarySync => "library-sync",
        }
    }
}

impl fmt::Display for ServiceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `DeletionLog::source` per spec §3.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeletionSource {
    Dashboard,
    IndexerA,
    IndexerB,
    MediaServer,
    AnimeService,
    External,
}

impl DeletionSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::IndexerA => "indexer-a",
            Self::IndexerB => "indexer-b",
            Self::MediaServer => "media-server",
            Self::AnimeService => "anime-service",
            Self::External => "external",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "dashboard" => Self::Dashboard,
            "indexer-a" => Self::IndexerA,
            "indexer-b" => Self::IndexerB,
            "media-server" => Self::MediaServer,
            "anime-service" => Self::AnimeService,
            "external" => Self::External,
            _ => return None,
        })
    }

    /// Actor display name for `source = external` services, per spec §4.H.
    #[must_use]
    pub fn external_actor_display(self) -> &'static str {
        match self {
            Self::IndexerA => "Indexer-A (external)",
            Self::IndexerB => "Indexer-B (external)",
            Self::MediaServer => "Media-Server (external)",
            Self::AnimeService => "Anime-Service (external)",
            Self::External => "System",
            Self::Dashboard => "Dashboard",
        }
    }
}

/// `DeletionLog::status`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeletionStatus {
    InProgress,
    Complete,
    Incomplete,
}

impl DeletionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in-progress",
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "in-progress" => Self::InProgress,
            "complete" => Self::Complete,
            "incomplete" => Self::Incomplete,
            _ => return None,
        })
    }
}

/// `DeletionSyncEvent::status` per spec §3.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    Pending,
    Acknowledged,
    Confirmed,
    Verified,
    Failed,
    Skipped,
    NotApplicable,
    NotNeeded,
}

impl SyncStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Acknowledged => "acknowledged",
            Self::Confirmed => "confirmed",
            Self::Verified => "verified",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::NotApplicable => "not-applicable",
            Self::NotNeeded => "not-needed",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => Self::Pending,
            "acknowledged" => Self::Acknowledged,
            "confirmed" => Self::Confirmed,
            "verified" => Self::Verified,
            "failed" => Self::Failed,
            "skipped" => Self::Skipped,
            "not-applicable" => Self::NotApplicable,
            "not-needed" => Self::NotNeeded,
            _ => return None,
        })
    }

    /// Terminal statuses per spec §4.H step 8: the point a `DeletionSyncEvent`
    /// is done moving and contributes to `DeletionLog.completed_at`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Verified | Self::Skipped | Self::NotApplicable | Self::NotNeeded | Self::Failed
        )
    }
}

/// External service a deletion fans out to, fixed order per spec §4.H step 6.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeletionTargetService {
    Torrent,
    IndexerMovies,
    IndexerTv,
    AnimeService,
    MediaServer,
    RequestManager,
}

impl DeletionTargetService {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Torrent => "torrent",
            Self::IndexerMovies => "indexer-movies",
            Self::IndexerTv => "indexer-tv",
            Self::AnimeService => "anime-service",
            Self::MediaServer => "media-server",
            Self::RequestManager => "request-manager",
        }
    }
}

impl fmt::Display for DeletionTargetService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_state_roundtrips() {
        for s in [
            RequestState::Requested,
            RequestState::Approved,
            RequestState::Grabbing,
            RequestState::Downloading,
            RequestState::Downloaded,
            RequestState::Importing,
            RequestState::AnimeMatching,
            RequestState::Available,
            RequestState::Failed,
        ] {
            assert_eq!(RequestState::parse(s.as_str()), Some(s));
        }
    }

    #[test]
    fn terminal_states_match_active_set_definition() {
        assert!(RequestState::Available.is_terminal());
        assert!(RequestState::Failed.is_terminal());
        assert!(!RequestState::Downloading.is_terminal());
    }

    #[test]
    fn external_actor_display_matches_table() {
        assert_eq!(
            DeletionSource::IndexerA.external_actor_display(),
            "Indexer-A (external)"
        );
        assert_eq!(DeletionSource::External.external_actor_display(), "System");
    }
}
