use sea_orm::entity::prelude::*;

/// One row per service state step within a DeletionLog. See spec §3
/// "DeletionSyncEvent" and §4.H step 6-8.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "deletion_sync_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub deletion_sync_event_id: i64,
    pub deletion_log_id: i64,

    pub service_label: String,
    pub status: String,
    pub detail: String,
    pub error: Option<String>,
    pub raw_response: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::deletion_logs::Entity",
        from = "Column::DeletionLogId",
        to = "super::deletion_logs::Column::DeletionLogId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    DeletionLogs,
}

impl Related<super::deletion_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeletionLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
