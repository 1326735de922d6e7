use sea_orm::entity::prelude::*;

/// The logical unit a user asked for. See spec §3 "MediaRequest".
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub request_id: i64,

    // ── Correlation ids (all nullable except request_id) ───────────────
    pub request_manager_id: Option<String>,
    pub content_db_id: Option<String>,
    pub tvdb_id: Option<String>,
    pub downloader_a_id: Option<String>,
    pub downloader_b_id: Option<String>,
    pub content_hash: Option<String>,
    pub media_server_id: Option<String>,

    // ── Classification ──────────────────────────────────────────────────
    pub media_kind: String,
    pub is_anime: String,

    // ── Display ──────────────────────────────────────────────────────────
    pub title: String,
    pub year: Option<i32>,
    pub poster_url: Option<String>,
    pub requesting_user: String,
    pub quality_label: Option<String>,
    pub indexer_label: Option<String>,
    pub requested_season_descriptor: Option<String>,
    pub file_size: Option<i64>,
    pub release_group_label: Option<String>,

    // ── Lifecycle ────────────────────────────────────────────────────────
    pub state: String,
    pub download_percentage: f32,
    pub created_at: String,
    pub updated_at: String,
    pub available_at: Option<String>,

    // ── Paths ────────────────────────────────────────────────────────────
    pub final_path: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::episodes::Entity")]
    Episodes,
    #[sea_orm(has_many = "super::timeline_events::Entity")]
    TimelineEvents,
}

impl Related<super::episodes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Episodes.def()
    }
}

impl Related<super::timeline_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TimelineEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
