//! Re-requesting the same title after a completed request was deleted must
//! create a fresh row rather than resurrecting (or colliding with) the old
//! one — the correlator only ever looks at the active set.

mod common;

use waypoint::domain::model::DeletionSource;
use waypoint::services::deletion::{self, DeletionRequest};
use waypoint::services::ingest::request_manager;

fn pending_event() -> request_manager::RequestManagerEvent {
    request_manager::RequestManagerEvent {
        notification_type: "MEDIA_PENDING".to_string(),
        request: request_manager::RequestManagerRequestPayload {
            request_id: "rm-9".to_string(),
            requested_by: "bob".to_string(),
            media: request_manager::RequestManagerMediaPayload {
                tmdb_id: "12345".to_string(),
                tvdb_id: None,
                media_type: "movie".to_string(),
                title: "Re-Requested Movie".to_string(),
                release_year: Some(2020),
                poster_path: None,
            },
        },
    }
}

#[tokio::test]
async fn deleted_request_does_not_block_a_fresh_request() {
    let env = common::TestEnv::new().await;
    let ctx = env.ingest_context();

    request_manager::handle(&ctx, pending_event()).await.expect("first create");
    let first = env.store.list_all_requests().await.unwrap();
    assert_eq!(first.len(), 1);
    let first_id = first[0].request_id;

    deletion::orchestrate(
        &ctx,
        DeletionRequest {
            request: first[0].clone(),
            source: DeletionSource::Dashboard,
            actor_user_id: Some("admin-1".to_string()),
            actor_display_name: Some("Admin One".to_string()),
            delete_files: false,
        },
    )
    .await
    .expect("delete");

    assert!(env.store.get_request(first_id).await.unwrap().is_none());

    // Second event carries an identical tmdb id but the old row is gone, so
    // the correlator (active-set-only) must not find it.
    request_manager::handle(&ctx, pending_event()).await.expect("second create");

    let active = env.store.list_active_requests().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_ne!(active[0].request_id, first_id);
    assert_eq!(active[0].content_db_id.as_deref(), Some("12345"));

    let log = env.store.list_deletion_logs(10).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].request_id, first_id);
}
