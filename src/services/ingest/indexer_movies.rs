use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::correlator::CorrelationKeys;
use crate::domain::events::NotificationEvent;
use crate::domain::model::{IsAnime, MediaKind, RequestState, ServiceLabel};
use crate::entities::requests;
use crate::services::deletion::{self, DeletionRequest};
use crate::services::ingest::IngestContext;
use crate::services::transitions::apply_request_transition;

#[derive(Debug, Deserialize)]
#[serde(tag = "eventType", rename_all = "PascalCase")]
pub enum IndexerMoviesEvent {
    Grab {
        movie: MoviePayload,
        #[serde(rename = "downloadId")]
        download_id: String,
        release: ReleasePayload,
    },
    Download {
        movie: MoviePayload,
        #[serde(rename = "movieFile")]
        movie_file: MovieFilePayload,
    },
    MovieDelete {
        movie: MoviePayload,
        #[serde(rename = "deletedFiles")]
        deleted_files: bool,
    },
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MoviePayload {
    pub tmdb_id: String,
    pub title: String,
    pub year: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleasePayload {
    pub quality: Option<String>,
    pub indexer: Option<String>,
    pub size: Option<i64>,
    pub release_group: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieFilePayload {
    pub path: String,
}

#[instrument(skip_all)]
pub async fn handle(ctx: &IngestContext, event: IndexerMoviesEvent) -> anyhow::Result<()> {
    match event {
        IndexerMoviesEvent::Grab {
            movie,
            download_id,
            release,
        } => handle_grab(ctx, movie, download_id, release).await,
        IndexerMoviesEvent::Download { movie, movie_file } => {
            handle_import(ctx, movie, movie_file).await
        }
        IndexerMoviesEvent::MovieDelete {
            movie,
            deleted_files,
        } => handle_delete(ctx, movie, deleted_files).await,
    }
}

async fn handle_grab(
    ctx: &IngestContext,
    movie: MoviePayload,
    download_id: String,
    release: ReleasePayload,
) -> anyhow::Result<()> {
    let keys = CorrelationKeys {
        content_db_id: Some(movie.tmdb_id.clone()),
        media_kind: Some(MediaKind::Movie),
        title: Some(movie.title.clone()),
        year: movie.year,
        ..Default::default()
    };
    let Some(request) = ctx.correlator.resolve(&keys).await? else {
        info!(tmdb_id = %movie.tmdb_id, "grab event had no matching active request");
        return Ok(());
    };

    let is_anime = IsAnime::parse(&request.is_anime);
    let inferred_anime =
        is_anime.is_true() || movie.tags.iter().any(|t| t.eq_ignore_ascii_case("anime"));

    let txn = ctx.store.begin().await?;
    let mut active: requests::ActiveModel = request.into();
    active.content_hash = Set(Some(download_id.to_lowercase()));
    active.downloader_a_id = Set(movie.id.clone());
    active.quality_label = Set(release.quality);
    active.indexer_label = Set(release.indexer);
    active.file_size = Set(release.size);
    active.release_group_label = Set(release.release_group);
    if inferred_anime {
        active.is_anime = Set(IsAnime::True.as_str().to_string());
    }
    active.updated_at = Set(Utc::now().to_rfc3339());
    let updated = active.update(&txn).await?;

    let (updated, applied) = apply_request_transition(
        &txn,
        updated,
        RequestState::Grabbing,
        ServiceLabel::IndexerMovies,
        "grab",
        "grabbed by indexer-movies",
    )
    .await?;
    txn.commit().await?;

    if let Some(applied) = applied {
        ctx.broadcast(NotificationEvent::RequestTransitioned {
            request_id: updated.request_id,
            from: applied.from,
            to: applied.to,
        });
    }
    Ok(())
}

async fn handle_import(
    ctx: &IngestContext,
    movie: MoviePayload,
    movie_file: MovieFilePayload,
) -> anyhow::Result<()> {
    let keys = CorrelationKeys {
        content_db_id: Some(movie.tmdb_id.clone()),
        media_kind: Some(MediaKind::Movie),
        ..Default::default()
    };
    let Some(request) = ctx.correlator.resolve(&keys).await? else {
        info!(tmdb_id = %movie.tmdb_id, "import event had no matching active request");
        return Ok(());
    };

    let is_anime = IsAnime::parse(&request.is_anime).is_true();
    let target = crate::domain::state_machine::post_import_target(is_anime);

    let txn = ctx.store.begin().await?;
    let mut active: requests::ActiveModel = request.into();
    active.final_path = Set(Some(movie_file.path));
    active.updated_at = Set(Utc::now().to_rfc3339());
    let updated = active.update(&txn).await?;

    let (updated, applied) = apply_request_transition(
        &txn,
        updated,
        target,
        ServiceLabel::IndexerMovies,
        "import",
        "movie imported",
    )
    .await?;
    txn.commit().await?;

    if let Some(applied) = applied {
        ctx.broadcast(NotificationEvent::RequestTransitioned {
            request_id: updated.request_id,
            from: applied.from,
            to: applied.to,
        });
    }
    Ok(())
}

async fn handle_delete(
    ctx: &IngestContext,
    movie: MoviePayload,
    deleted_files: bool,
) -> anyhow::Result<()> {
    let keys = CorrelationKeys {
        content_db_id: Some(movie.tmdb_id.clone()),
        media_kind: Some(MediaKind::Movie),
        ..Default::default()
    };
    let Some(request) = ctx.correlator.resolve(&keys).await? else {
        return Ok(());
    };

    deletion::orchestrate(
        ctx,
        DeletionRequest {
            request,
            source: crate::domain::model::DeletionSource::IndexerA,
            actor_user_id: None,
            actor_display_name: None,
            delete_files: deleted_files,
        },
    )
    .await?;
    Ok(())
}
