use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

use crate::entities::prelude::*;
use crate::entities::{deletion_sync_events, episodes, requests, timeline_events};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Requests)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Episodes)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(TimelineEvents)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(DeletionLogs)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(DeletionSyncEvents)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_episodes_request")
                    .table(Episodes)
                    .col(episodes::Column::RequestId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_episodes_content_hash")
                    .table(Episodes)
                    .col(episodes::Column::ContentHash)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_episodes_final_path")
                    .table(Episodes)
                    .col(episodes::Column::FinalPath)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_episodes_season_episode")
                    .table(Episodes)
                    .col(episodes::Column::RequestId)
                    .col(episodes::Column::SeasonNumber)
                    .col(episodes::Column::EpisodeNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_timeline_events_request")
                    .table(TimelineEvents)
                    .col(timeline_events::Column::RequestId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_deletion_sync_events_log")
                    .table(DeletionSyncEvents)
                    .col(deletion_sync_events::Column::DeletionLogId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requests_content_hash")
                    .table(Requests)
                    .col(requests::Column::ContentHash)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requests_final_path")
                    .table(Requests)
                    .col(requests::Column::FinalPath)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requests_title_year")
                    .table(Requests)
                    .col(requests::Column::Title)
                    .col(requests::Column::Year)
                    .to_owned(),
            )
            .await?;

        // sea-orm's query builder has no first-class "partial/filtered unique
        // index" construct, so the active-set uniqueness constraint from
        // spec §5's locking discipline is expressed as raw SQL. SQLite
        // supports partial indexes directly.
        let conn = manager.get_connection();
        conn.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_requests_active_request_manager_id \
             ON requests(request_manager_id) \
             WHERE request_manager_id IS NOT NULL \
             AND state NOT IN ('AVAILABLE', 'FAILED')",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeletionSyncEvents).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DeletionLogs).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TimelineEvents).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Episodes).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Requests).to_owned())
            .await?;
        Ok(())
    }
}
