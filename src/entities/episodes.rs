use sea_orm::entity::prelude::*;

/// One row per individual TV episode. Never created for movies. See spec §3
/// "Episode".
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "episodes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub episode_id: i64,
    pub request_id: i64,
    pub season_number: i32,
    pub episode_number: i32,

    pub episode_title: Option<String>,

    // ── Correlation ──────────────────────────────────────────────────────
    pub content_hash: Option<String>,
    pub final_path: Option<String>,
    pub media_server_id: Option<String>,
    pub anime_file_id: Option<String>,

    // ── Lifecycle ────────────────────────────────────────────────────────
    pub state: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::requests::Entity",
        from = "Column::RequestId",
        to = "super::requests::Column::RequestId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Requests,
}

impl Related<super::requests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
