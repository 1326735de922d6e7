//! A request stuck at IMPORTING past the staleness window, with no inbound
//! webhook ever arriving to close it out, must be rescued by the verifier
//! loop's media-server lookup (spec §4.G).

mod common;

use sea_orm::{ActiveModelTrait, Set};
use waypoint::clients::media_server::MediaServerItem;
use waypoint::domain::model::RequestState;
use waypoint::entities::requests;
use waypoint::services::verifier::VerifierLoop;

async fn insert_stuck_request(store: &waypoint::db::Store, updated_at: &str) -> i64 {
    let active = requests::ActiveModel {
        request_id: Default::default(),
        request_manager_id: Set(Some("rm-stuck".to_string())),
        content_db_id: Set(Some("550".to_string())),
        tvdb_id: Set(None),
        downloader_a_id: Set(Some("radarr-7".to_string())),
        downloader_b_id: Set(None),
        content_hash: Set(Some("deadbeef".to_string())),
        media_server_id: Set(None),
        media_kind: Set("movie".to_string()),
        is_anime: Set("false".to_string()),
        title: Set("Fight Club".to_string()),
        year: Set(Some(1999)),
        poster_url: Set(None),
        requesting_user: Set("dave".to_string()),
        quality_label: Set(None),
        indexer_label: Set(None),
        requested_season_descriptor: Set(None),
        file_size: Set(None),
        release_group_label: Set(None),
        state: Set(RequestState::Importing.as_str().to_string()),
        download_percentage: Set(100.0),
        created_at: Set(updated_at.to_string()),
        updated_at: Set(updated_at.to_string()),
        available_at: Set(None),
        final_path: Set(Some("/movies/Fight Club (1999)/Fight.Club.1999.mkv".to_string())),
    };
    active.insert(&store.conn).await.unwrap().request_id
}

#[tokio::test]
async fn verifier_rescues_a_request_stuck_at_importing() {
    let env = common::TestEnv::new().await;

    let stale_timestamp = (chrono::Utc::now() - chrono::Duration::hours(2)).to_rfc3339();
    let request_id = insert_stuck_request(&env.store, &stale_timestamp).await;

    env.media_server.items_by_provider_id.lock().unwrap().insert(
        "550".to_string(),
        MediaServerItem {
            id: "jellyfin-fight-club".to_string(),
            provider_ids: [("tmdb".to_string(), "550".to_string())].into_iter().collect(),
            path: Some("/movies/Fight Club (1999)/Fight.Club.1999.mkv".to_string()),
            media_sources: vec![],
        },
    );

    let verifier = VerifierLoop::new(
        env.store.clone(),
        env.media_server.clone() as std::sync::Arc<dyn waypoint::clients::media_server::MediaServerClient>,
        env.bus.clone(),
    )
    .with_staleness_window(30);

    verifier.tick_once().await.expect("verifier tick");

    let request = env.store.get_request(request_id).await.unwrap().unwrap();
    assert_eq!(request.state, RequestState::Available.as_str());
    assert_eq!(request.media_server_id.as_deref(), Some("jellyfin-fight-club"));
}

#[tokio::test]
async fn verifier_leaves_a_fresh_importing_request_alone() {
    let env = common::TestEnv::new().await;
    let fresh_timestamp = chrono::Utc::now().to_rfc3339();
    let request_id = insert_stuck_request(&env.store, &fresh_timestamp).await;

    env.media_server.items_by_provider_id.lock().unwrap().insert(
        "550".to_string(),
        MediaServerItem {
            id: "jellyfin-fight-club".to_string(),
            provider_ids: Default::default(),
            path: Some("/movies/Fight Club (1999)/Fight.Club.1999.mkv".to_string()),
            media_sources: vec![],
        },
    );

    let verifier = VerifierLoop::new(
        env.store.clone(),
        env.media_server.clone() as std::sync::Arc<dyn waypoint::clients::media_server::MediaServerClient>,
        env.bus.clone(),
    )
    .with_staleness_window(30);

    verifier.tick_once().await.expect("verifier tick");

    let request = env.store.get_request(request_id).await.unwrap().unwrap();
    assert_eq!(
        request.state,
        RequestState::Importing.as_str(),
        "a request inside the staleness window must not be touched yet"
    );
}
