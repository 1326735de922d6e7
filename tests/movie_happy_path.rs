//! End-to-end movie lifecycle: request-manager create/approve, indexer-movies
//! grab/import, torrent-client complete webhook, media-server item-added —
//! driven through the real ingest handlers against an in-memory store.

mod common;

use waypoint::domain::model::RequestState;
use waypoint::services::ingest::{indexer_movies, media_server, request_manager, torrent};
use waypoint::services::transitions::apply_request_transition;

fn request_manager_event(notification_type: &str) -> request_manager::RequestManagerEvent {
    request_manager::RequestManagerEvent {
        notification_type: notification_type.to_string(),
        request: request_manager::RequestManagerRequestPayload {
            request_id: "rm-1".to_string(),
            requested_by: "alice".to_string(),
            media: request_manager::RequestManagerMediaPayload {
                tmdb_id: "603".to_string(),
                tvdb_id: None,
                media_type: "movie".to_string(),
                title: "The Matrix".to_string(),
                release_year: Some(1999),
                poster_path: Some("/poster.jpg".to_string()),
            },
        },
    }
}

#[tokio::test]
async fn movie_flows_from_request_to_available() {
    let env = common::TestEnv::new().await;
    let ctx = env.ingest_context();

    request_manager::handle(&ctx, request_manager_event("MEDIA_AUTO_APPROVED"))
        .await
        .expect("create+approve");

    let requests = env.store.list_active_requests().await.expect("list");
    assert_eq!(requests.len(), 1);
    let request_id = requests[0].request_id;
    assert_eq!(requests[0].state, RequestState::Approved.as_str());

    indexer_movies::handle(
        &ctx,
        indexer_movies::IndexerMoviesEvent::Grab {
            movie: indexer_movies::MoviePayload {
                tmdb_id: "603".to_string(),
                title: "The Matrix".to_string(),
                year: Some(1999),
                tags: vec![],
                id: Some("radarr-movie-1".to_string()),
            },
            download_id: "ABCDEF1234".to_string(),
            release: indexer_movies::ReleasePayload {
                quality: Some("1080p".to_string()),
                indexer: Some("some-indexer".to_string()),
                size: Some(4_000_000_000),
                release_group: Some("GROUP".to_string()),
            },
        },
    )
    .await
    .expect("grab");

    let request = env.store.get_request(request_id).await.unwrap().unwrap();
    assert_eq!(request.state, RequestState::Grabbing.as_str());
    assert_eq!(request.content_hash.as_deref(), Some("abcdef1234"));

    // Simulate the progress provider advancing Grabbing -> Downloading; that
    // poll loop is covered by its own unit tests, so the webhook-driven
    // scenario here only needs the request to be in the right state before
    // the torrent-complete webhook fires.
    let txn = env.store.begin().await.unwrap();
    let (request, _) = apply_request_transition(
        &txn,
        request,
        RequestState::Downloading,
        waypoint::domain::model::ServiceLabel::ProgressProvider,
        "progress",
        "progress reached 10.0%",
    )
    .await
    .unwrap();
    txn.commit().await.unwrap();
    assert_eq!(request.state, RequestState::Downloading.as_str());

    torrent::handle(
        &ctx,
        torrent::TorrentCompleteEvent {
            hash: "ABCDEF1234".to_string(),
            name: Some("The.Matrix.1999.1080p".to_string()),
            path: None,
            size: Some(4_200_000_000),
        },
    )
    .await
    .expect("torrent complete");

    let request = env.store.get_request(request_id).await.unwrap().unwrap();
    assert_eq!(request.state, RequestState::Downloaded.as_str());
    assert_eq!(request.download_percentage, 100.0);

    indexer_movies::handle(
        &ctx,
        indexer_movies::IndexerMoviesEvent::Download {
            movie: indexer_movies::MoviePayload {
                tmdb_id: "603".to_string(),
                title: "The Matrix".to_string(),
                year: Some(1999),
                tags: vec![],
                id: Some("radarr-movie-1".to_string()),
            },
            movie_file: indexer_movies::MovieFilePayload {
                path: "/movies/The Matrix (1999)/The.Matrix.1999.1080p.mkv".to_string(),
            },
        },
    )
    .await
    .expect("import");

    let request = env.store.get_request(request_id).await.unwrap().unwrap();
    assert_eq!(request.state, RequestState::Importing.as_str());
    assert!(request.final_path.is_some());

    media_server::handle(
        &ctx,
        media_server::MediaServerEvent {
            notification_type: "ItemAdded".to_string(),
            item: media_server::MediaServerItemPayload {
                item_id: "jellyfin-item-1".to_string(),
                item_type: "Movie".to_string(),
                provider_ids: [("tmdb".to_string(), "603".to_string())].into_iter().collect(),
                path: request.final_path.clone(),
            },
        },
    )
    .await
    .expect("item added");

    let request = env.store.get_request(request_id).await.unwrap().unwrap();
    assert_eq!(request.state, RequestState::Available.as_str());
    assert_eq!(request.media_server_id.as_deref(), Some("jellyfin-item-1"));

    let active = env.store.list_active_requests().await.unwrap();
    assert!(active.is_empty(), "AVAILABLE requests must drop out of the active set");
}
