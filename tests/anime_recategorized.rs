//! An anime movie whose anime-service cross-reference never arrives can
//! still get closed out by the verifier: a movie-by-TMDB lookup misses, but
//! the is_anime branch tries a series-by-TMDB lookup next and that hits
//! (spec §8 scenario 4 — "anime movie recategorized as TV special").

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, Set};
use waypoint::clients::media_server::{MediaServerClient, MediaServerItem, MediaServerUser};
use waypoint::domain::model::RequestState;
use waypoint::entities::requests;
use waypoint::error::ClientError;
use waypoint::services::verifier::VerifierLoop;

/// Distinguishes movie vs. series lookups the way the real media server
/// would, unlike the shared `FakeMediaServerClient` which answers both
/// the same way — needed here because the scenario hinges on the movie
/// query missing and the series query hitting for the same provider id.
#[derive(Default)]
struct SeriesOnlyMediaServerClient {
    series_items: Mutex<HashMap<String, MediaServerItem>>,
}

#[async_trait]
impl MediaServerClient for SeriesOnlyMediaServerClient {
    async fn search_by_provider_id(
        &self,
        _provider: &str,
        provider_id: &str,
        is_series: bool,
    ) -> Result<Option<MediaServerItem>, ClientError> {
        if !is_series {
            return Ok(None);
        }
        Ok(self.series_items.lock().unwrap().get(provider_id).cloned())
    }

    async fn search_by_provider_id_any_type(
        &self,
        _provider: &str,
        _provider_id: &str,
    ) -> Result<Option<MediaServerItem>, ClientError> {
        Ok(None)
    }

    async fn search_by_title_year(
        &self,
        _title: &str,
        _year: Option<i32>,
    ) -> Result<Option<MediaServerItem>, ClientError> {
        Ok(None)
    }

    async fn list_items_with_provider_ids(&self) -> Result<Vec<MediaServerItem>, ClientError> {
        Ok(self.series_items.lock().unwrap().values().cloned().collect())
    }

    async fn trigger_library_rescan(&self) -> Result<(), ClientError> {
        Ok(())
    }

    async fn validate_user_token(&self, _token: &str) -> Result<Option<MediaServerUser>, ClientError> {
        Ok(None)
    }
}

async fn insert_anime_matching_request(store: &waypoint::db::Store, updated_at: &str) -> i64 {
    let active = requests::ActiveModel {
        request_id: Default::default(),
        request_manager_id: Set(Some("rm-anime-1".to_string())),
        content_db_id: Set(Some("1052946".to_string())),
        tvdb_id: Set(None),
        downloader_a_id: Set(Some("radarr-anime-1".to_string())),
        downloader_b_id: Set(None),
        content_hash: Set(Some("animehash".to_string())),
        media_server_id: Set(None),
        media_kind: Set("movie".to_string()),
        is_anime: Set("true".to_string()),
        title: Set("Weathering with You".to_string()),
        year: Set(Some(2019)),
        poster_url: Set(None),
        requesting_user: Set("erin".to_string()),
        quality_label: Set(None),
        indexer_label: Set(None),
        requested_season_descriptor: Set(None),
        file_size: Set(None),
        release_group_label: Set(None),
        state: Set(RequestState::AnimeMatching.as_str().to_string()),
        download_percentage: Set(100.0),
        created_at: Set(updated_at.to_string()),
        updated_at: Set(updated_at.to_string()),
        available_at: Set(None),
        final_path: Set(Some("/data/anime/movies/Weathering With You/movie.mkv".to_string())),
    };
    active.insert(&store.conn).await.unwrap().request_id
}

#[tokio::test]
async fn movie_miss_then_series_hit_closes_out_recategorized_anime() {
    let env = common::TestEnv::new().await;
    let stale_timestamp = (chrono::Utc::now() - chrono::Duration::hours(1)).to_rfc3339();
    let request_id = insert_anime_matching_request(&env.store, &stale_timestamp).await;

    let media_server = Arc::new(SeriesOnlyMediaServerClient::default());
    media_server.series_items.lock().unwrap().insert(
        "1052946".to_string(),
        MediaServerItem {
            id: "jellyfin-series-hit".to_string(),
            provider_ids: [("tmdb".to_string(), "1052946".to_string())].into_iter().collect(),
            path: None,
            media_sources: vec![serde_json::json!({"Path": "/data/anime/movies/Weathering With You/movie.mkv"})],
        },
    );

    let verifier = VerifierLoop::new(
        env.store.clone(),
        media_server as Arc<dyn MediaServerClient>,
        env.bus.clone(),
    )
    .with_staleness_window(30);

    verifier.tick_once().await.expect("verifier tick");

    let request = env.store.get_request(request_id).await.unwrap().unwrap();
    assert_eq!(request.state, RequestState::Available.as_str());
    assert_eq!(request.media_server_id.as_deref(), Some("jellyfin-series-hit"));

    let timeline = env.store.timeline_for_request(request_id).await.unwrap();
    let last = timeline.last().expect("at least one timeline event");
    assert_eq!(last.to_state, RequestState::Available.as_str());
    assert_eq!(last.emitter_service, waypoint::domain::model::ServiceLabel::Verifier.as_str());
}
