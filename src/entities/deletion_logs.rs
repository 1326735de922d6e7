use sea_orm::entity::prelude::*;

/// Snapshot + progress record for a deletion. Survives the deletion of its
/// MediaRequest (hard-delete of that row does not cascade here). See spec §3
/// "DeletionLog" and §4.H.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "deletion_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub deletion_log_id: i64,

    // ── Snapshot of the request at deletion-initiation time ─────────────
    pub request_id: i64,
    pub title: String,
    pub media_kind: String,
    pub request_manager_id: Option<String>,
    pub content_db_id: Option<String>,
    pub tvdb_id: Option<String>,
    pub downloader_a_id: Option<String>,
    pub downloader_b_id: Option<String>,
    pub content_hash: Option<String>,
    pub media_server_id: Option<String>,
    pub poster_url: Option<String>,
    pub year: Option<i32>,

    // ── Request context ──────────────────────────────────────────────────
    pub source: String,
    pub actor_user_id: Option<String>,
    pub actor_display_name: String,
    pub delete_files: bool,

    // ── Progress ─────────────────────────────────────────────────────────
    pub status: String,
    pub initiated_at: String,
    pub completed_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::deletion_sync_events::Entity")]
    DeletionSyncEvents,
}

impl Related<super::deletion_sync_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeletionSyncEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
