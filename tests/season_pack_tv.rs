//! A season-pack grab creates one request and N episodes sharing a single
//! content hash; a single torrent-complete webhook must transition the
//! request and every one of those episodes together.

mod common;

use waypoint::domain::model::RequestState;
use waypoint::services::ingest::{indexer_tv, request_manager, torrent};
use waypoint::services::transitions::{apply_episode_transition, apply_request_transition};

fn pending_event() -> request_manager::RequestManagerEvent {
    request_manager::RequestManagerEvent {
        notification_type: "MEDIA_AUTO_APPROVED".to_string(),
        request: request_manager::RequestManagerRequestPayload {
            request_id: "rm-42".to_string(),
            requested_by: "carol".to_string(),
            media: request_manager::RequestManagerMediaPayload {
                tmdb_id: "9999".to_string(),
                tvdb_id: Some("81189".to_string()),
                media_type: "tv".to_string(),
                title: "Breaking Bad".to_string(),
                release_year: Some(2008),
                poster_path: None,
            },
        },
    }
}

#[tokio::test]
async fn season_pack_complete_advances_request_and_every_episode() {
    let env = common::TestEnv::new().await;
    let ctx = env.ingest_context();

    request_manager::handle(&ctx, pending_event()).await.expect("create+approve");
    let request = env.store.list_active_requests().await.unwrap().into_iter().next().unwrap();
    let request_id = request.request_id;

    indexer_tv::handle(
        &ctx,
        indexer_tv::IndexerTvEvent::Grab {
            series: indexer_tv::SeriesPayload {
                tvdb_id: "81189".to_string(),
                title: "Breaking Bad".to_string(),
                year: Some(2008),
                series_type: None,
                id: Some("sonarr-series-1".to_string()),
            },
            download_id: "SEASONPACKHASH".to_string(),
            episodes: vec![
                indexer_tv::EpisodePayload { season_number: 1, episode_number: 1, title: Some("Pilot".to_string()) },
                indexer_tv::EpisodePayload { season_number: 1, episode_number: 2, title: Some("Cat's in the Bag...".to_string()) },
                indexer_tv::EpisodePayload { season_number: 1, episode_number: 3, title: Some("...And the Bag's in the River".to_string()) },
            ],
        },
    )
    .await
    .expect("season grab");

    let request = env.store.get_request(request_id).await.unwrap().unwrap();
    assert_eq!(request.state, RequestState::Grabbing.as_str());
    let episodes = env.store.episodes_for_request(request_id).await.unwrap();
    assert_eq!(episodes.len(), 3);
    assert!(episodes.iter().all(|e| e.content_hash.as_deref() == Some("seasonpackhash")));

    // Progress provider would normally move request + episodes sharing the
    // hash into DOWNLOADING together; replicate that here directly so the
    // torrent webhook below has a legal Downloading -> Downloaded edge.
    let txn = env.store.begin().await.unwrap();
    apply_request_transition(
        &txn,
        request,
        RequestState::Downloading,
        waypoint::domain::model::ServiceLabel::ProgressProvider,
        "progress",
        "progress reached 5.0%",
    )
    .await
    .unwrap();
    for episode in episodes {
        apply_episode_transition(&txn, episode, RequestState::Downloading).await.unwrap();
    }
    txn.commit().await.unwrap();

    torrent::handle(
        &ctx,
        torrent::TorrentCompleteEvent {
            hash: "SEASONPACKHASH".to_string(),
            name: Some("Breaking.Bad.S01".to_string()),
            path: None,
            size: Some(10_000_000_000),
        },
    )
    .await
    .expect("torrent complete");

    let request = env.store.get_request(request_id).await.unwrap().unwrap();
    assert_eq!(request.state, RequestState::Downloaded.as_str());

    let episodes = env.store.episodes_for_request(request_id).await.unwrap();
    assert_eq!(episodes.len(), 3);
    assert!(
        episodes.iter().all(|e| e.state == RequestState::Downloaded.as_str()),
        "every episode sharing the season-pack hash must advance together"
    );
}
